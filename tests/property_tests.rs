//! Property-based tests using proptest
//!
//! These tests validate codec and synthesis invariants across a wide range of
//! randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use packet_bridge::core::codec::var_int_size;
use packet_bridge::{
    synthesize, BitSet, Identifier, NbtCompound, NbtTag, PacketBuf, PendingFields, WireType,
};
use proptest::prelude::*;

fn nbt_leaf() -> impl Strategy<Value = NbtTag> {
    prop_oneof![
        any::<i8>().prop_map(NbtTag::Byte),
        any::<i16>().prop_map(NbtTag::Short),
        any::<i32>().prop_map(NbtTag::Int),
        any::<i64>().prop_map(NbtTag::Long),
        "\\PC{0,32}".prop_map(NbtTag::String),
        prop::collection::vec(any::<i32>(), 0..16).prop_map(NbtTag::IntArray),
        prop::collection::vec(any::<i64>(), 0..8).prop_map(NbtTag::LongArray),
    ]
}

fn nbt_compound() -> impl Strategy<Value = NbtCompound> {
    let leaves = prop::collection::btree_map("[a-zA-Z_]{1,12}", nbt_leaf(), 0..8);
    let nested = prop::collection::btree_map("[a-z]{1,6}", nbt_leaf(), 0..4);
    (leaves, nested).prop_map(|(leaves, nested)| {
        let mut child = NbtCompound::new();
        for (key, value) in nested {
            child.insert(key, value);
        }
        let mut root = NbtCompound::new();
        for (key, value) in leaves {
            root.insert(key, value);
        }
        root.insert("child", child);
        root
    })
}

// Property: every i32 survives a VarInt round trip in at most 5 bytes
proptest! {
    #[test]
    fn prop_var_int_roundtrip(value in any::<i32>()) {
        let mut buf = PacketBuf::new();
        buf.write_var_int(value);

        prop_assert!(buf.writer_index() <= 5);
        prop_assert_eq!(buf.writer_index(), var_int_size(value));
        prop_assert_eq!(buf.read_var_int().unwrap(), value);
        prop_assert!(!buf.is_readable());
    }
}

// Property: every i64 survives a VarLong round trip in at most 10 bytes
proptest! {
    #[test]
    fn prop_var_long_roundtrip(value in any::<i64>()) {
        let mut buf = PacketBuf::new();
        buf.write_var_long(value);

        prop_assert!(buf.writer_index() <= 10);
        prop_assert_eq!(buf.read_var_long().unwrap(), value);
    }
}

// Property: strings within the character bound read back unchanged
proptest! {
    #[test]
    fn prop_string_roundtrip(value in "\\PC{0,256}") {
        let mut buf = PacketBuf::new();
        buf.write_string(&value);
        prop_assert_eq!(buf.read_string().unwrap(), value);
    }
}

// Property: bit sets read back with the same members
proptest! {
    #[test]
    fn prop_bit_set_roundtrip(bits in prop::collection::btree_set(0usize..1024, 0..64)) {
        let set: BitSet = bits.iter().copied().collect();
        let mut buf = PacketBuf::new();
        buf.write_bit_set(&set);

        let read = buf.read_bit_set().unwrap();
        prop_assert_eq!(read.iter().collect::<Vec<_>>(), bits.into_iter().collect::<Vec<_>>());
    }
}

// Property: decoding arbitrary bytes never panics
proptest! {
    #[test]
    fn prop_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = PacketBuf::from_slice(&data).read_var_int();
        let _ = PacketBuf::from_slice(&data).read_var_long();
        let _ = PacketBuf::from_slice(&data).read_string();
        let _ = PacketBuf::from_slice(&data).read_bit_set();
        let _ = PacketBuf::from_slice(&data).read_nbt_compound();
        let _ = PacketBuf::from_slice(&data).read_identifier();
    }
}

// Property: synthesis hands back exactly the values that were pushed
proptest! {
    #[test]
    fn prop_synthesis_preserves_values(
        id in any::<i32>(),
        timestamp in any::<i64>(),
        flags in any::<u8>(),
        name in "[a-z_]{0,32}",
    ) {
        let mut fields = PendingFields::new();
        fields.push(WireType::VarInt, id).unwrap();
        fields.push(WireType::VarLong, timestamp).unwrap();
        fields.push(WireType::UnsignedByte, flags).unwrap();
        fields.push(WireType::String, name.clone()).unwrap();

        let read = synthesize(fields, |buf| {
            Ok((
                buf.read_var_int()?,
                buf.read_var_long()?,
                buf.read_unsigned_byte()?,
                buf.read_string()?,
            ))
        })
        .unwrap();
        prop_assert_eq!(read, (id, timestamp, flags, name));
    }
}

// Property: dropping the last read always faults
proptest! {
    #[test]
    fn prop_short_reader_always_faults(values in prop::collection::vec(any::<i32>(), 1..16)) {
        let mut fields = PendingFields::new();
        for value in &values {
            fields.push(WireType::VarInt, *value).unwrap();
        }

        let count = values.len() - 1;
        let result = synthesize(fields, |buf| {
            for _ in 0..count {
                buf.read_var_int()?;
            }
            Ok(())
        });
        prop_assert!(result.is_err());
    }
}

// Property: NBT compounds survive a round trip and consume exactly their bytes
proptest! {
    #[test]
    fn prop_nbt_compound_roundtrip(compound in nbt_compound()) {
        let mut buf = PacketBuf::new();
        buf.write_nbt_compound(Some(&compound)).unwrap();
        buf.write_u8(0xAB);

        let read = buf.read_nbt_compound().unwrap();
        prop_assert_eq!(read, Some(compound));
        prop_assert_eq!(buf.read_u8().unwrap(), 0xAB);
    }
}

// Property: identifiers and UUIDs read back unchanged
proptest! {
    #[test]
    fn prop_identifier_and_uuid_roundtrip(
        namespace in "[a-z0-9_.-]{1,16}",
        path in "[a-z0-9_./-]{1,32}",
        uuid in any::<u128>(),
    ) {
        let id = Identifier::new(namespace, path);
        let mut buf = PacketBuf::new();
        buf.write_identifier(&id);
        buf.write_uuid(uuid);

        prop_assert_eq!(buf.read_identifier().unwrap(), id);
        prop_assert_eq!(buf.read_uuid().unwrap(), uuid);
        prop_assert!(!buf.is_readable());
    }
}
