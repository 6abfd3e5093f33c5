//! C3: the CLHash engine — 32 rounds of carry-less-multiply/AES/mulhrs mixing over a
//! per-hash random key table, in the three variants selected by solution version (§4.3).
//!
//! Grounded directly on `verus_clhash.cpp`'s `__verusclmulwithoutreduction64alignedrepeat`
//! (v1), `..._sv2_1`, and `..._sv2_2`, which is the sole source of truth for the 8 switch
//! cases and the exact CLMUL/mulhrs cross-term wiring at every step. `randomsource`
//! pointer arithmetic there becomes plain index arithmetic into `table` here; the
//! move-scratch trail (the list of table slots mutated this call) is returned to the
//! caller so [`crate::keystore`] can restore the master key afterward.

use alloc::vec::Vec;

use crate::haraka::{aes2_keyed_from_table, mix2};
use crate::lane::Lane;
use crate::params::{REDUCTION_POLY, REDUCTION_SHUFFLE_TABLE};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Variant {
    V1,
    Sv2_1,
    Sv2_2,
}

/// Runs the original `v1` CLHash variant, used below the VerusHash 2.1 activation height.
pub fn verusclhash_v1(table: &mut [Lane], buf: &[u8; 64], key_mask_bytes: u64, trail: &mut Vec<usize>) -> u64 {
    let source = load_buf(buf);
    let acc = run(table, &source, key_mask_bytes, trail, Variant::V1);
    finalize(acc)
}

/// Runs the `sv2_1` variant (VerusHash 2.1).
pub fn verusclhash_sv2_1(table: &mut [Lane], buf: &[u8; 64], key_mask_bytes: u64, trail: &mut Vec<usize>) -> u64 {
    let source = pbuf_copy(&load_buf(buf));
    let acc = run(table, &source, key_mask_bytes, trail, Variant::Sv2_1);
    finalize(acc)
}

/// Runs the `sv2_2` variant (VerusHash 2.2 and later).
pub fn verusclhash_sv2_2(table: &mut [Lane], buf: &[u8; 64], key_mask_bytes: u64, trail: &mut Vec<usize>) -> u64 {
    let source = pbuf_copy(&load_buf(buf));
    let acc = run(table, &source, key_mask_bytes, trail, Variant::Sv2_2);
    finalize(acc)
}

fn load_buf(buf: &[u8; 64]) -> [Lane; 4] {
    [
        Lane::from_bytes(buf[0..16].try_into().unwrap()),
        Lane::from_bytes(buf[16..32].try_into().unwrap()),
        Lane::from_bytes(buf[32..48].try_into().unwrap()),
        Lane::from_bytes(buf[48..64].try_into().unwrap()),
    ]
}

/// `sv2_1`/`sv2_2`'s pre-processing: `[buf0^buf2, buf1^buf3, buf2, buf3]`.
fn pbuf_copy(buf: &[Lane; 4]) -> [Lane; 4] {
    [buf[0].xor(buf[2]), buf[1].xor(buf[3]), buf[2], buf[3]]
}

fn finalize(acc: Lane) -> u64 {
    precomp_reduction64(acc.xor(lazy_length_hash(1024, 64)))
}

/// `lazyLengthHash`: `CLMUL(low64 = length, high64 = keylength)`, no reduction.
fn lazy_length_hash(keylength: u64, length: u64) -> Lane {
    let v = Lane::from_lo_hi(length, keylength);
    v.clmul(v, 0x10)
}

/// `precompReduction64_si128`: folds the 128-bit CLMUL accumulator down to a 64-bit value
/// modulo the GF(2^64) reduction polynomial, leaving garbage in the high 64 bits.
fn precomp_reduction64_si128(a: Lane) -> Lane {
    let c = Lane::from_lo_hi(REDUCTION_POLY, 0);
    let q2 = a.clmul(c, 0x01);
    let table = Lane::from_bytes(&REDUCTION_SHUFFLE_TABLE);
    let q3 = table.shuffle_epi8(q2.srli_bytes(8));
    let q4 = q2.xor(a);
    q3.xor(q4)
}

fn precomp_reduction64(a: Lane) -> u64 {
    precomp_reduction64_si128(a).lo64()
}

fn run(table: &mut [Lane], source: &[Lane; 4], key_mask_bytes: u64, trail: &mut Vec<usize>, variant: Variant) -> Lane {
    let key_mask = key_mask_bytes >> 4;
    let mut acc = table[(key_mask + 2) as usize];

    for _ in 0..32 {
        let selector = acc.lo64();

        let prand_idx = ((selector >> 5) & key_mask) as usize;
        let prandex_idx = ((selector >> 32) & key_mask) as usize;
        trail.push(prand_idx);
        trail.push(prandex_idx);

        let buf_idx = (selector & 3) as usize;
        let pbuf = source[buf_idx];
        let nbr_idx = if selector & 1 == 0 { buf_idx + 1 } else { buf_idx - 1 };
        let pbuf_nbr = source[nbr_idx];

        match selector & 0x1c {
            0x00 => {
                let temp1 = table[prandex_idx];
                let add1 = temp1.xor(pbuf_nbr);
                let clprod1 = add1.clmul(add1, 0x10);
                acc = acc.xor(clprod1);

                let tempa2 = acc.mulhrs_mix(temp1);

                let temp12 = table[prand_idx];
                table[prand_idx] = tempa2;

                let add12 = temp12.xor(pbuf);
                let clprod12 = add12.clmul(add12, 0x10);
                acc = acc.xor(clprod12);

                let tempb2 = acc.mulhrs_mix(temp12);
                table[prandex_idx] = tempb2;
            }
            0x04 => {
                let temp1 = table[prand_idx];
                let add1 = temp1.xor(pbuf);
                let clprod1 = add1.clmul(add1, 0x10);
                acc = acc.xor(clprod1);
                let clprod2 = pbuf.clmul(pbuf, 0x10);
                acc = acc.xor(clprod2);

                let tempa2 = acc.mulhrs_mix(temp1);

                let temp12 = table[prandex_idx];
                table[prandex_idx] = tempa2;

                let add12 = temp12.xor(pbuf_nbr);
                acc = acc.xor(add12);

                let tempb2 = acc.mulhrs_mix(temp12);
                table[prand_idx] = tempb2;
            }
            0x08 => {
                let temp1 = table[prandex_idx];
                let add1 = temp1.xor(pbuf);
                acc = acc.xor(add1);

                let tempa2 = acc.mulhrs_mix(temp1);

                let temp12 = table[prand_idx];
                table[prand_idx] = tempa2;

                let add12 = temp12.xor(pbuf_nbr);
                let clprod12 = add12.clmul(add12, 0x10);
                acc = acc.xor(clprod12);
                let clprod22 = pbuf_nbr.clmul(pbuf_nbr, 0x10);
                acc = acc.xor(clprod22);

                let tempb2 = acc.mulhrs_mix(temp12);
                table[prandex_idx] = tempb2;
            }
            0x0c => {
                let temp1 = table[prand_idx];
                let add1 = temp1.xor(pbuf_nbr);

                // cannot be zero here
                let divisor = selector as u32 as i32;

                acc = acc.xor(add1);

                let dividend = acc.lo64() as i64;
                let rem = (dividend % divisor as i64) as i32 as u32 as u64;
                acc = acc.xor(Lane::from_lo_hi(rem, 0));

                let tempa2 = acc.mulhrs_mix(temp1);

                if dividend & 1 != 0 {
                    let temp12 = table[prandex_idx];
                    table[prandex_idx] = tempa2;

                    let add12 = temp12.xor(pbuf);
                    let clprod12 = add12.clmul(add12, 0x10);
                    acc = acc.xor(clprod12);
                    let clprod22 = pbuf.clmul(pbuf, 0x10);
                    acc = acc.xor(clprod22);

                    let tempb2 = acc.mulhrs_mix(temp12);
                    table[prand_idx] = tempb2;
                } else {
                    let tempb3 = table[prandex_idx];
                    table[prandex_idx] = tempa2;
                    table[prand_idx] = tempb3;

                    // sv2_2 additionally folds pbuf into the accumulator here; v1/sv2_1 don't.
                    if variant == Variant::Sv2_2 {
                        acc = acc.xor(pbuf);
                    }
                }
            }
            0x10 => {
                let mut t1 = pbuf_nbr;
                let mut t2 = pbuf;

                // the round-constant pointer is rebound to `prand` here, so these three
                // AES2 rounds key from the live table at prand_idx, not from HARAKA_RC.
                let (a, b) = aes2_keyed_from_table(t1, t2, table, prand_idx);
                let (a, b) = mix2(a, b);
                t1 = a;
                t2 = b;

                let (a, b) = aes2_keyed_from_table(t1, t2, table, prand_idx + 4);
                let (a, b) = mix2(a, b);
                t1 = a;
                t2 = b;

                let (a, b) = aes2_keyed_from_table(t1, t2, table, prand_idx + 8);
                let (a, b) = mix2(a, b);
                t1 = a;
                t2 = b;

                acc = acc.xor(t1).xor(t2);

                let tempa1 = table[prand_idx];
                let tempa3 = acc.mulhrs_mix(tempa1);

                let tempa4 = table[prandex_idx];
                table[prandex_idx] = tempa3;
                table[prand_idx] = tempa4;
            }
            0x14 => {
                // the "monkins loop", inspired by Chris: a data-dependent run of 1 to 8
                // AES-or-CLMUL rounds fed from consecutive key-table slots.
                let mut rounds = selector >> 61;
                let mut rc_idx = prand_idx;
                let mut aesroundoffset = 0usize;

                loop {
                    if selector & (0x1000_0000u64 << rounds) != 0 {
                        let onekey = table[rc_idx];
                        rc_idx += 1;
                        let temp2 = if rounds & 1 != 0 { pbuf } else { pbuf_nbr };
                        let add1 = onekey.xor(temp2);
                        let clprod1 = add1.clmul(add1, 0x10);
                        acc = acc.xor(clprod1);
                    } else {
                        let onekey = table[rc_idx];
                        rc_idx += 1;
                        let temp2 = if rounds & 1 != 0 { pbuf_nbr } else { pbuf };
                        // `rc` is the already-advanced table pointer at this point, so the
                        // AES2 round keys come from `table[rc_idx + aesroundoffset..]`, not
                        // HARAKA_RC.
                        let (a, b) = aes2_keyed_from_table(onekey, temp2, table, rc_idx + aesroundoffset);
                        aesroundoffset += 4;
                        let (a, b) = mix2(a, b);
                        acc = acc.xor(a).xor(b);
                    }

                    if rounds == 0 {
                        break;
                    }
                    rounds -= 1;
                }

                let tempa1 = table[prand_idx];
                let tempa3 = acc.mulhrs_mix(tempa1);

                let tempa4 = table[prandex_idx];
                table[prandex_idx] = tempa3;
                table[prand_idx] = tempa4;
            }
            0x18 => {
                if variant == Variant::V1 {
                    let temp2 = table[prand_idx];
                    let add1 = pbuf_nbr.xor(temp2);
                    let clprod1 = add1.clmul(add1, 0x10);
                    acc = acc.xor(clprod1);

                    let tempa2 = acc.mulhrs_mix(temp2);

                    let tempb3 = table[prandex_idx];
                    table[prandex_idx] = tempa2;
                    table[prand_idx] = tempb3;
                } else {
                    let mut rounds = selector >> 61;
                    let mut rc_idx = prand_idx;
                    let mut onekey = Lane::ZERO;

                    loop {
                        if selector & (0x1000_0000u64 << rounds) != 0 {
                            onekey = table[rc_idx];
                            rc_idx += 1;
                            let temp2 = if rounds & 1 != 0 { pbuf } else { pbuf_nbr };
                            let add1 = onekey.xor(temp2);
                            // sv2_2 folds the xor result back into `onekey` before the
                            // modulo; sv2_1 leaves `onekey` as the raw table load.
                            if variant == Variant::Sv2_2 {
                                onekey = add1;
                            }
                            let divisor = selector as u32 as i32;
                            let dividend = add1.lo64() as i64;
                            let rem = (dividend % divisor as i64) as i32 as u32 as u64;
                            acc = acc.xor(Lane::from_lo_hi(rem, 0));
                        } else {
                            onekey = table[rc_idx];
                            rc_idx += 1;
                            let temp2 = if rounds & 1 != 0 { pbuf_nbr } else { pbuf };
                            let add1 = onekey.xor(temp2);
                            let clprod1 = add1.clmul(add1, 0x10);
                            // sv2_2 folds the CLMUL product back into `onekey` before the
                            // mulhrs mix; sv2_1 keeps `onekey` as the raw table load and
                            // mixes the product in separately.
                            let clprod2 = if variant == Variant::Sv2_2 {
                                onekey = clprod1;
                                acc.mulhrs(onekey)
                            } else {
                                acc.mulhrs(clprod1)
                            };
                            acc = acc.xor(clprod2);
                        }

                        if rounds == 0 {
                            break;
                        }
                        rounds -= 1;
                    }

                    let tempa3 = table[prandex_idx];
                    let tempa4 = tempa3.xor(acc);

                    // sv2_2 writes the two slots in swapped order relative to sv2_1 — a
                    // faithfully reproduced quirk, not "fixed".
                    if variant == Variant::Sv2_2 {
                        table[prandex_idx] = onekey;
                        table[prand_idx] = tempa4;
                    } else {
                        table[prandex_idx] = tempa4;
                        table[prand_idx] = onekey;
                    }
                }
            }
            0x1c => {
                let temp2 = table[prandex_idx];
                let add1 = pbuf.xor(temp2);
                let clprod1 = add1.clmul(add1, 0x10);
                acc = acc.xor(clprod1);

                let tempa2 = acc.mulhrs_mix(temp2);

                let tempa3 = table[prand_idx];
                table[prand_idx] = tempa2;

                acc = acc.xor(tempa3);

                // sv2_2 additionally folds the buf neighbor into acc here; v1/sv2_1 don't.
                if variant == Variant::Sv2_2 {
                    acc = acc.xor(pbuf_nbr);
                }

                let tempb2 = acc.mulhrs_mix(tempa3);
                table[prandex_idx] = tempb2;
            }
            _ => unreachable!("selector & 0x1c is always one of the 8 handled cases"),
        }
    }

    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_table(seed: u64, key_mask_bytes: u64) -> Vec<Lane> {
        let key_mask = key_mask_bytes >> 4;
        let mut table = vec![Lane::ZERO; (key_mask as usize) + 64];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = Lane::from_lo_hi(seed.wrapping_mul(i as u64 + 1), i as u64);
        }
        table
    }

    #[test]
    fn v1_is_deterministic() {
        let buf = [7u8; 64];
        let mut t1 = seeded_table(0x1234_5678, 0xff0);
        let mut t2 = t1.clone();
        let mut trail1 = Vec::new();
        let mut trail2 = Vec::new();
        let h1 = verusclhash_v1(&mut t1, &buf, 0xff0, &mut trail1);
        let h2 = verusclhash_v1(&mut t2, &buf, 0xff0, &mut trail2);
        assert_eq!(h1, h2);
        assert_eq!(trail1, trail2);
        assert_eq!(trail1.len(), 64);
    }

    #[test]
    fn variants_diverge_on_identical_input() {
        let buf = [3u8; 64];
        let key_mask_bytes = 0xff0;
        let mut trail = Vec::new();

        let mut t_v1 = seeded_table(0xdead_beef, key_mask_bytes);
        let h_v1 = verusclhash_v1(&mut t_v1, &buf, key_mask_bytes, &mut trail);

        trail.clear();
        let mut t_sv21 = seeded_table(0xdead_beef, key_mask_bytes);
        let h_sv21 = verusclhash_sv2_1(&mut t_sv21, &buf, key_mask_bytes, &mut trail);

        trail.clear();
        let mut t_sv22 = seeded_table(0xdead_beef, key_mask_bytes);
        let h_sv22 = verusclhash_sv2_2(&mut t_sv22, &buf, key_mask_bytes, &mut trail);

        assert_ne!(h_v1, h_sv21);
        assert_ne!(h_sv21, h_sv22);
    }

    #[test]
    fn lazy_length_hash_matches_expected_operand_order() {
        let v = Lane::from_lo_hi(64, 1024);
        let expected = v.clmul(v, 0x10);
        assert_eq!(lazy_length_hash(1024, 64), expected);
    }

    #[test]
    fn precomp_reduction64_is_deterministic() {
        let a = Lane::from_lo_hi(0x1111_2222_3333_4444, 0x5555_6666_7777_8888);
        assert_eq!(precomp_reduction64(a), precomp_reduction64(a));
    }
}
