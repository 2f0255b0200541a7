#![no_main]

use libfuzzer_sys::fuzz_target;
use regdns::RecordData;

fuzz_target!(|data: (&str, &str)| {
    let (typ, value) = data;
    let parsed = RecordData::from_raw(typ, value);

    // Unparseable values are kept as-is
    if let RecordData::Other { typ: t, value: v } = &parsed {
        assert_eq!(t, typ);
        assert_eq!(v, value);
    }

    // Typed variants reproduce their input type
    assert_eq!(parsed.get_type(), typ);
});
