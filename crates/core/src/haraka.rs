//! C1: opaque byte-to-digest primitives — SHA-256d and the Haraka AES-based permutations.
//!
//! The round structure here (`AES4`/`MIX4`/`TRUNCSTORE`, and the 2-lane `AES2`/`MIX2`
//! used by the CLHash engine's "mini-Haraka-2" cases) is reconstructed from the public
//! Haraka reference implementation, since the defining header (`verus_hash.h`) was not
//! present in the retrieved original source — see DESIGN.md's Open Question ledger.
//! `TRUNCSTORE`'s exact byte selection follows SPEC_FULL.md §4.1 directly.

use sha2::{Digest, Sha256};

use crate::lane::Lane;
use crate::params::HARAKA_RC;

/// SHA-256d: double SHA-256 (§4.1).
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// One `AES4` round: two AES rounds per lane across four lanes, consuming 8 consecutive
/// round constants starting at `rc[base]`.
#[inline]
fn aes4(s: &mut [Lane; 4], rc: &[[u8; 16]; 40], base: usize) {
    for i in 0..4 {
        s[i] = s[i].aesenc(Lane::from_bytes(&rc[base + i]));
    }
    for i in 0..4 {
        s[i] = s[i].aesenc(Lane::from_bytes(&rc[base + 4 + i]));
    }
}

/// `MIX4`: the 4-lane 32-bit word interleave that diffuses state between AES4 rounds.
#[inline]
fn mix4(s: &mut [Lane; 4]) {
    let tmp = s[0].unpacklo_epi32(s[1]);
    let u0 = s[0].unpackhi_epi32(s[1]);
    let u1 = s[2].unpacklo_epi32(s[3]);
    let u2 = s[2].unpackhi_epi32(s[3]);

    s[3] = u0.unpacklo_epi32(u2);
    s[0] = u0.unpackhi_epi32(u2);
    s[2] = u1.unpackhi_epi32(tmp);
    s[1] = u1.unpacklo_epi32(tmp);
}

/// Haraka-512 keyed permutation: 5 rounds of `AES4` + `MIX4`, final feed-forward XOR of
/// the input, then `TRUNCSTORE` to 32 bytes (§4.1).
pub fn haraka512_keyed(input: &[u8; 64], rc: &[[u8; 16]; 40]) -> [u8; 32] {
    let mut s = [
        Lane::from_bytes(input[0..16].try_into().unwrap()),
        Lane::from_bytes(input[16..32].try_into().unwrap()),
        Lane::from_bytes(input[32..48].try_into().unwrap()),
        Lane::from_bytes(input[48..64].try_into().unwrap()),
    ];
    let orig = s;

    for round in 0..5 {
        aes4(&mut s, rc, round * 8);
        mix4(&mut s);
    }

    for i in 0..4 {
        s[i] = s[i].xor(orig[i]);
    }

    truncstore(&s)
}

/// Convenience entry point using the shared round-constant table (§6).
pub fn haraka512(input: &[u8; 64]) -> [u8; 32] {
    haraka512_keyed(input, &HARAKA_RC)
}

/// `TRUNCSTORE`: bytes 8..16 of lane 0, 8..16 of lane 1, 0..8 of lane 2, 0..8 of lane 3
/// (§4.1), producing the 32-byte Haraka-512 digest.
fn truncstore(s: &[Lane; 4]) -> [u8; 32] {
    let b0 = s[0].to_bytes();
    let b1 = s[1].to_bytes();
    let b2 = s[2].to_bytes();
    let b3 = s[3].to_bytes();

    let mut out = [0u8; 32];
    out[0..8].copy_from_slice(&b0[8..16]);
    out[8..16].copy_from_slice(&b1[8..16]);
    out[16..24].copy_from_slice(&b2[0..8]);
    out[24..32].copy_from_slice(&b3[0..8]);
    out
}

/// `AES2`: the 2-lane analogue of `AES4` used by the CLHash engine's "mini-Haraka-2"
/// cases (§4.3), consuming 4 consecutive round constants starting at `rc[base]`.
pub fn aes2(s0: Lane, s1: Lane, rc: &[[u8; 16]; 40], base: usize) -> (Lane, Lane) {
    let s0 = s0.aesenc(Lane::from_bytes(&rc[base]));
    let s1 = s1.aesenc(Lane::from_bytes(&rc[base + 1]));
    let s0 = s0.aesenc(Lane::from_bytes(&rc[base + 2]));
    let s1 = s1.aesenc(Lane::from_bytes(&rc[base + 3]));
    (s0, s1)
}

/// `AES2` keyed from a live table slice instead of the fixed round-constant table: cases
/// `0x10`/`0x14` of the CLHash engine locally rebind their round-constant pointer to the
/// random-key table before calling `AES2`, so by C macro hygiene those rounds draw their
/// keys from the table slots the engine is already reading and writing, not from Haraka's
/// own constants (§4.3). Same four-round structure as [`aes2`], consuming `table[base..
/// base + 4]` instead of `rc[base..base + 4]`.
pub fn aes2_keyed_from_table(s0: Lane, s1: Lane, table: &[Lane], base: usize) -> (Lane, Lane) {
    let s0 = s0.aesenc(table[base]);
    let s1 = s1.aesenc(table[base + 1]);
    let s0 = s0.aesenc(table[base + 2]);
    let s1 = s1.aesenc(table[base + 3]);
    (s0, s1)
}

/// `MIX2`: the 2-lane 32-bit word interleave.
pub fn mix2(s0: Lane, s1: Lane) -> (Lane, Lane) {
    let tmp = s0.unpacklo_epi32(s1);
    let new_s1 = s0.unpackhi_epi32(s1);
    (tmp, new_s1)
}

/// Haraka-256: the unkeyed 2-lane permutation used to derive the per-hash random-key
/// table from the running Haraka-512 state (§4.6). Same AES2/MIX2 structure as the
/// CLHash engine's mini-Haraka-2 cases, run for 5 rounds with feed-forward XOR.
pub fn haraka256(input: &[u8; 32]) -> [u8; 32] {
    let mut s0 = Lane::from_bytes(input[0..16].try_into().unwrap());
    let mut s1 = Lane::from_bytes(input[16..32].try_into().unwrap());
    let orig = (s0, s1);

    for round in 0..5 {
        let (a, b) = aes2(s0, s1, &HARAKA_RC, round * 4);
        let (a, b) = mix2(a, b);
        s0 = a;
        s1 = b;
    }

    s0 = s0.xor(orig.0);
    s1 = s1.xor(orig.1);

    let mut out = [0u8; 32];
    out[0..16].copy_from_slice(&s0.to_bytes());
    out[16..32].copy_from_slice(&s1.to_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256d_matches_double_digest() {
        let data = b"verus";
        let once = Sha256::digest(data);
        let twice = Sha256::digest(once);
        assert_eq!(sha256d(data), <[u8; 32]>::from(twice));
    }

    #[test]
    fn haraka512_is_deterministic() {
        let input = [7u8; 64];
        assert_eq!(haraka512(&input), haraka512(&input));
    }

    #[test]
    fn haraka512_differs_from_input_and_is_32_bytes() {
        let input = [0u8; 64];
        let out = haraka512(&input);
        assert_eq!(out.len(), 32);
        assert_ne!(out, [0u8; 32]);
    }

    #[test]
    fn haraka256_is_deterministic_and_avalanches() {
        let a = [0u8; 32];
        let mut b = [0u8; 32];
        b[0] = 1;
        assert_eq!(haraka256(&a), haraka256(&a));
        assert_ne!(haraka256(&a), haraka256(&b));
    }
}
