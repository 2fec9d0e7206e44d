//! Keystream obfuscation shared by binary trees and archive headers.
//!
//! The keystream is a Park-Miller generator; each step yields one key whose
//! low byte is XORed into the data.

/// Seed written in front of obfuscated trees produced by this crate.
pub const DEFAULT_SEED: u32 = 0x3017_1609;

/// Advance the keystream by one step.
#[must_use]
pub const fn crypt_round(key: i32) -> i32 {
    let key = key as i64;
    let quotient = key / 0x1F31D;
    let mut next = (key - quotient * 0x1F31D) * 0x41A7 - quotient * 0xB14;
    if next <= 0 {
        next += 0x7FFF_FFFF;
    }
    next as i32
}

/// XOR `data` in place with the keystream seeded by `seed`.
///
/// Applying it twice with the same seed restores the input.
pub fn apply_keystream(seed: u32, data: &mut [u8]) {
    apply_keystream_with_xor(seed, data, 0);
}

/// XOR `data` in place with the keystream and an additional constant byte.
pub fn apply_keystream_with_xor(seed: u32, data: &mut [u8], xor: u8) {
    let mut key = seed as i32;
    for byte in data {
        key = crypt_round(key);
        *byte ^= (key as u8) ^ xor;
    }
}

/// Prefix `plain` with `seed` and obfuscate the remainder.
#[must_use]
pub fn obfuscate(seed: u32, plain: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(plain.len() + 4);
    out.extend_from_slice(&seed.to_le_bytes());
    let start = out.len();
    out.extend_from_slice(plain);
    apply_keystream(seed, &mut out[start..]);
    out
}

/// Reverse [`obfuscate`]: read the seed prefix and decode the remainder.
///
/// Returns `None` when the input is too short to hold a seed.
#[must_use]
pub fn deobfuscate(data: &[u8]) -> Option<Vec<u8>> {
    let (seed, body) = data.split_first_chunk::<4>()?;
    let mut plain = body.to_vec();
    apply_keystream(u32::from_le_bytes(*seed), &mut plain);
    Some(plain)
}
