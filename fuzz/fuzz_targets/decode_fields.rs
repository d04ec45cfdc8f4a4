#![no_main]

use libfuzzer_sys::fuzz_target;
use packet_bridge::{PacketBuf, WireType};

const TAGS: [WireType; 15] = [
    WireType::VarInt,
    WireType::VarLong,
    WireType::UnsignedByte,
    WireType::Byte,
    WireType::String,
    WireType::NbtCompoundOrNull,
    WireType::BitSet,
    WireType::Boolean,
    WireType::Short,
    WireType::Int,
    WireType::Long,
    WireType::Float,
    WireType::Double,
    WireType::Identifier,
    WireType::Uuid,
];

fuzz_target!(|data: &[u8]| {
    // First byte picks the sequence of types to decode, the rest is input
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };

    let mut buf = PacketBuf::from_slice(rest);
    let mut tag = selector as usize;
    while buf.is_readable() {
        let before = buf.reader_index();
        if buf.skip_value(TAGS[tag % TAGS.len()]).is_err() {
            break;
        }
        assert!(buf.reader_index() > before, "decode made no progress");
        assert!(buf.reader_index() <= buf.writer_index());
        tag = tag.wrapping_mul(31).wrapping_add(7);
    }
});
