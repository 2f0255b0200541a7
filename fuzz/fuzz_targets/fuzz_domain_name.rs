#![no_main]

use libfuzzer_sys::fuzz_target;
use regdns::types::{DomainName, MAX_DOMAIN_LEN};

fuzz_target!(|data: (&str, &str)| {
    let (host, zone) = data;
    let Some(domain) = DomainName::from_dotted(host) else {
        return;
    };
    assert!(domain.wire_len() <= MAX_DOMAIN_LEN);

    // Re-parsing the dotted form yields an equal name
    let reparsed = DomainName::from_dotted(&domain.to_dotted()).expect("to_dotted must reparse");
    assert_eq!(domain, reparsed);

    if let Some(zone) = DomainName::from_dotted(zone) {
        match domain.relative_to(&zone) {
            Some(relative) => {
                assert!(domain.is_within(&zone));
                assert!(!relative.is_empty());
            }
            None => assert!(!domain.is_within(&zone)),
        }
    }
});
