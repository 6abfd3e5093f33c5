//! C6: the VerusHash v2/2.1/2.2 driver — composes C1 (Haraka/SHA-256d), C3 (CLHash), C4
//! (solution descriptor), and C5 (canonicalization) into the one externally visible
//! operation, `compute_block_hash` (§4.6, §6).

use alloc::vec::Vec;

use crate::clhash::{verusclhash_sv2_2, verusclhash_v1};
use crate::haraka::{haraka512, sha256d};
use crate::header::BlockHeader;
use crate::keystore;
use crate::params::{ACTIVATE_PBAAS_HEADER, SOLUTION_VERUSV5, VERUS_KEY_SIZE_BYTES, VERUS_V2};
use crate::solution::Solution;

/// Computes the 32-byte proof-of-work hash for a block header (§4.6, §6): SHA-256d for
/// the genesis block and for any header that isn't on the VerusHash v2 code path, the full
/// VerusHash v2/2.1/2.2 pipeline otherwise.
pub fn compute_block_hash(header: &BlockHeader) -> [u8; 32] {
    if header.is_genesis() {
        return sha256d(&header.serialize_full());
    }
    if header.version == VERUS_V2 {
        return verus_v2_hash(header);
    }
    sha256d(&header.serialize_full())
}

fn verus_v2_hash(header: &BlockHeader) -> [u8; 32] {
    let mut solution_scratch = header.solution.clone();
    let solution_version = Solution::new(&mut solution_scratch).version();

    let mut canon = header.clone();
    canon.clear_non_canonical(ACTIVATE_PBAAS_HEADER as u32);
    let bytes = canon.serialize_full();

    let (key_seed, final_block) = chain_to_final_block(&bytes);

    let key_mask_bytes = (VERUS_KEY_SIZE_BYTES - 16) as u64;
    let mut trail = Vec::new();

    let clhash_result = keystore::with_key_store(&key_seed, VERUS_KEY_SIZE_BYTES, |store| {
        let table = store.table_mut();
        let result = if solution_version >= SOLUTION_VERUSV5 {
            verusclhash_sv2_2(table, &final_block, key_mask_bytes, &mut trail)
        } else {
            verusclhash_v1(table, &final_block, key_mask_bytes, &mut trail)
        };
        store.restore(&trail);
        result
    });

    let final_state = haraka512(&final_block);
    let mut out = final_state;
    out[24..32].copy_from_slice(&clhash_result.to_le_bytes());
    out
}

/// Runs the Merkle–Damgård chain of Haraka-512 compressions over 32-byte message blocks
/// (§4.6's "Haraka-512 sponge"), returning the state entering the final compression (used
/// to seed the key table) and the final 64-byte compression input (state || last data
/// block, zero-padded to 32 bytes if the input didn't end on a 32-byte boundary).
fn chain_to_final_block(bytes: &[u8]) -> ([u8; 32], [u8; 64]) {
    let mut state = [0u8; 32];
    let mut offset = 0;

    while bytes.len() - offset > 32 {
        let mut block = [0u8; 64];
        block[0..32].copy_from_slice(&state);
        block[32..64].copy_from_slice(&bytes[offset..offset + 32]);
        state = haraka512(&block);
        offset += 32;
    }

    let key_seed = state;
    let mut final_block = [0u8; 64];
    final_block[0..32].copy_from_slice(&state);
    let tail = &bytes[offset..];
    final_block[32..32 + tail.len()].copy_from_slice(tail);

    (key_seed, final_block)
}
