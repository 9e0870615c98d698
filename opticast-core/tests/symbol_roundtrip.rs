use opticast_core::symbol::{pack_symbols, unpack_symbols};
use proptest::prelude::*;

#[test]
fn known_vector_packs_msb_first() {
    // 0x12 0x34 -> 00 01 00 10 00 11 01 00
    assert_eq!(pack_symbols(&[0x12, 0x34], 2), vec![0, 1, 0, 2, 0, 3, 1, 0]);
}

#[test]
fn empty_input_round_trips() {
    assert!(pack_symbols(&[], 2).is_empty());
    assert!(unpack_symbols(&[], 2).is_empty());
}

/// Property: unpack(pack(x, 2), 2) == x for arbitrary byte strings.
#[test]
fn prop_pack_unpack_identity() {
    proptest!(|(data in proptest::collection::vec(any::<u8>(), 0..2048))| {
        let symbols = pack_symbols(&data, 2);
        prop_assert_eq!(symbols.len(), data.len() * 4);
        prop_assert!(symbols.iter().all(|&s| s < 4));
        prop_assert_eq!(unpack_symbols(&symbols, 2), data);
    });
}

/// Zero-padding symbols past the data, as the frame grid does, must not
/// disturb the prefix bytes.
#[test]
fn prop_zero_padding_extends_cleanly() {
    proptest!(|(data in proptest::collection::vec(any::<u8>(), 0..512), pad in 0usize..64)| {
        let mut symbols = pack_symbols(&data, 2);
        symbols.extend(std::iter::repeat(0).take(pad * 4));
        let bytes = unpack_symbols(&symbols, 2);
        prop_assert_eq!(&bytes[..data.len()], &data[..]);
        prop_assert!(bytes[data.len()..].iter().all(|&b| b == 0));
    });
}
