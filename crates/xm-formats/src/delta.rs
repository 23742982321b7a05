//! Delta coding of XM sample data.
//!
//! Samples are stored as differences between successive frames. Decoding is
//! a running sum that wraps at the sample width.

/// Decode 8-bit deltas in place.
pub fn delta_decode_8(data: &mut [u8]) {
    let mut prev = 0u8;
    for byte in data.iter_mut() {
        prev = prev.wrapping_add(*byte);
        *byte = prev;
    }
}

/// Decode 16-bit deltas in place.
pub fn delta_decode_16(data: &mut [u16]) {
    let mut prev = 0u16;
    for word in data.iter_mut() {
        prev = prev.wrapping_add(*word);
        *word = prev;
    }
}

/// Encode 8-bit frames as deltas in place.
pub fn delta_encode_8(data: &mut [u8]) {
    let mut prev = 0u8;
    for byte in data.iter_mut() {
        let cur = *byte;
        *byte = cur.wrapping_sub(prev);
        prev = cur;
    }
}

/// Encode 16-bit frames as deltas in place.
pub fn delta_encode_16(data: &mut [u16]) {
    let mut prev = 0u16;
    for word in data.iter_mut() {
        let cur = *word;
        *word = cur.wrapping_sub(prev);
        prev = cur;
    }
}
