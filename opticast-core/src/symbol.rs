//! Bit-level packing between byte streams and k-bit symbol streams.
//!
//! Both directions are MSB-first: the high bits of the first byte become
//! the first symbol, and the first symbol becomes the high bits of the
//! first output byte.

/// Pack bytes into `bits`-wide symbols. If the residual bit count is
/// non-zero, the final symbol is left-shifted so its useful bits occupy
/// the high positions of the field.
pub fn pack_symbols(data: &[u8], bits: u32) -> Vec<u8> {
    debug_assert!((1..=8).contains(&bits));
    let mask = (1u32 << bits) - 1;
    let mut out = Vec::with_capacity(data.len() * 8 / bits as usize + 1);
    let mut buf = 0u32;
    let mut filled = 0u32;
    for &b in data {
        buf = (buf << 8) | u32::from(b);
        filled += 8;
        while filled >= bits {
            filled -= bits;
            out.push(((buf >> filled) & mask) as u8);
            buf &= (1u32 << filled) - 1;
        }
    }
    if filled > 0 {
        out.push(((buf << (bits - filled)) & mask) as u8);
    }
    out
}

/// Concatenate `bits`-wide symbols and emit whole bytes. Residual bits
/// (fewer than 8) at the end are discarded.
pub fn unpack_symbols(symbols: &[u8], bits: u32) -> Vec<u8> {
    debug_assert!((1..=8).contains(&bits));
    let mut out = Vec::with_capacity(symbols.len() * bits as usize / 8);
    let mut buf = 0u32;
    let mut filled = 0u32;
    for &sym in symbols {
        buf = (buf << bits) | u32::from(sym);
        filled += bits;
        if filled >= 8 {
            filled -= 8;
            out.push((buf >> filled) as u8);
            buf &= (1u32 << filled) - 1;
        }
    }
    out
}
