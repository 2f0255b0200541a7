#![no_main]

use libfuzzer_sys::fuzz_target;
use regdns::transip::{parse_record_id, record_id};

fuzz_target!(|data: &str| {
    if let Some((name, typ, content)) = parse_record_id(data) {
        assert!(!name.contains('/'));
        assert!(!typ.contains('/'));
        assert_eq!(record_id(name, typ, content), data);
    }
});
