#![no_main]

use libfuzzer_sys::fuzz_target;
use packet_bridge::{synthesize, PendingFields, WireType};

fuzz_target!(|data: &[u8]| {
    // Arbitrary values through a fixed layout must always read back intact
    let mut fields = PendingFields::new();
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let _ = fields.push(WireType::VarInt, i32::from_be_bytes(word));
    }

    let expected = fields.len();
    let read = synthesize(fields, |buf| {
        let mut count = 0;
        while buf.is_readable() {
            buf.read_var_int()?;
            count += 1;
        }
        Ok(count)
    });
    assert_eq!(read.ok(), Some(expected));
});
