/// 32-bit rolling string hash: `h = h * 31 + unit` over UTF-16 code units,
/// wrapped to a signed 32-bit integer, returned as its absolute value.
///
/// Units are UTF-16, matching the web frontend's hash for non-ASCII titles.
pub fn hash32(input: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}

/// Render an unsigned integer in lowercase base-36.
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    // Only ASCII digits were pushed
    String::from_utf8(out).unwrap_or_default()
}

/// One step of the linear-congruential generator used for synthetic fill:
/// `seed = (seed * 1103515245 + 12345) mod 2^31`.
#[inline]
pub fn lcg_next(seed: u32) -> u32 {
    let next = (seed as u64)
        .wrapping_mul(1_103_515_245)
        .wrapping_add(12_345);
    (next & 0x7fff_ffff) as u32
}
