#![no_main]

use libfuzzer_sys::fuzz_target;
use regdns::types::RecordType;

fuzz_target!(|data: &str| {
    if let Some(record_type) = RecordType::from_str(data) {
        let parsed = RecordType::from_str(&record_type.to_string()).expect("Should roundtrip");
        assert_eq!(record_type, parsed);

        let from_code =
            RecordType::from_u16(record_type.as_u16()).expect("Should roundtrip from code");
        assert_eq!(record_type, from_code);
    }
});
