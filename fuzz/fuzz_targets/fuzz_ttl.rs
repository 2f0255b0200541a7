#![no_main]

use libfuzzer_sys::fuzz_target;
use regdns::types::Ttl;

fuzz_target!(|data: u64| {
    let ttl = Ttl::saturating_from_u64(data);
    assert!(ttl.as_secs() <= Ttl::MAX.as_secs());

    match u32::try_from(data).ok().and_then(Ttl::try_new) {
        Some(valid) => assert_eq!(valid, ttl),
        None => assert_eq!(ttl, Ttl::MAX),
    }
});
