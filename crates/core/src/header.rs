//! C5: the block header and its canonicalization/merge-mining glue.
//!
//! Grounded on `solutiondata.h`'s `CBlockHeader` (field layout, `ClearNonCanonicalData`)
//! and `examples/original_source/verushash/blockhash.cpp` (`CheckNonCanonicalData`'s two
//! overloads, `GetPBaaSHeader(chain_id)`, pre-header construction and hashing).

use alloc::vec::Vec;

use crate::error::HeaderError;
use crate::params::{pre_header_personalization, ASSETCHAINS_CHAINID, HEADER_BASESIZE};
use crate::solution::{Solution, SubHeader};

/// Size of the fixed fields preceding the compact-size-prefixed solution: `version` (4) +
/// `prev_block` (32) + `merkle_root` (32) + `final_sapling_root` (32) + `time` (4) +
/// `bits` (4) + `nonce` (32).
const FIXED_FIELDS_SIZE: usize = 4 + 32 + 32 + 32 + 4 + 4 + 32;

/// A VerusHash v2 block header (§3): the fixed 143-byte base fields plus a variable-length
/// solution trailer.
#[derive(Clone, Debug)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: [u8; 32],
    pub merkle_root: [u8; 32],
    pub final_sapling_root: [u8; 32],
    pub time: u32,
    pub bits: u32,
    pub nonce: [u8; 32],
    pub solution: Vec<u8>,
}

/// The seven fields hashed to produce a sub-header's `pre_header_hash` (§3): everything
/// that's shared across merge-mined chains except `version` and `solution` itself.
#[derive(Clone, Copy, Debug)]
pub struct PreHeader {
    pub prev_block: [u8; 32],
    pub merkle_root: [u8; 32],
    pub final_sapling_root: [u8; 32],
    pub nonce: [u8; 32],
    pub bits: u32,
    pub prev_mmr_root: [u8; 32],
    pub block_mmr_root: [u8; 32],
}

impl BlockHeader {
    pub fn is_genesis(&self) -> bool {
        self.prev_block == [0u8; 32]
    }

    /// Builds the pre-header for this header, pulling `prev_mmr_root`/`block_mmr_root`
    /// from the solution descriptor once PBaaS sub-headers are active, matching
    /// `CPBaaSPreHeader(const CBlockHeader&)`'s conditional field fill.
    pub fn pre_header(&mut self, activate_pbaas_header: u32) -> PreHeader {
        let descr = Solution::new(&mut self.solution).descriptor();
        let (prev_mmr_root, block_mmr_root) = if descr.version >= activate_pbaas_header {
            (descr.hash_prev_mmr_root, descr.hash_block_mmr_root)
        } else {
            ([0u8; 32], [0u8; 32])
        };
        PreHeader {
            prev_block: self.prev_block,
            merkle_root: self.merkle_root,
            final_sapling_root: self.final_sapling_root,
            nonce: self.nonce,
            bits: self.bits,
            prev_mmr_root,
            block_mmr_root,
        }
    }

    fn serialize_pre_header(ph: &PreHeader) -> [u8; 32 * 4 + 4 + 32 + 32] {
        let mut buf = [0u8; 32 * 4 + 4 + 32 + 32];
        buf[0..32].copy_from_slice(&ph.prev_block);
        buf[32..64].copy_from_slice(&ph.merkle_root);
        buf[64..96].copy_from_slice(&ph.final_sapling_root);
        buf[96..128].copy_from_slice(&ph.nonce);
        buf[128..132].copy_from_slice(&ph.bits.to_le_bytes());
        buf[132..164].copy_from_slice(&ph.prev_mmr_root);
        buf[164..196].copy_from_slice(&ph.block_mmr_root);
        buf
    }

    /// `CPBaaSBlockHeader(chain_id, pre_header)`: the sub-header a merge-mined chain
    /// records for `chain_id`, keyed via personalized BLAKE2b over the serialized
    /// pre-header.
    pub fn pre_header_hash(chain_id: [u8; 20], pre_header: &PreHeader) -> SubHeader {
        let buf = Self::serialize_pre_header(pre_header);
        let hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(&pre_header_personalization())
            .to_state()
            .update(&buf)
            .finalize();
        let mut pre_header_hash = [0u8; 32];
        pre_header_hash.copy_from_slice(hash.as_bytes());
        SubHeader { chain_id, pre_header_hash }
    }

    /// `ClearNonCanonicalData`: strips everything that legitimately differs between
    /// merge-mined chains sharing one solution (§4.5), leaving only `version`, `time`,
    /// and `solution` — which is how merge-mined blocks are meant to share one proof of
    /// work across otherwise-distinct headers.
    pub fn clear_non_canonical(&mut self, activate_pbaas_header: u32) {
        self.prev_block = [0u8; 32];
        self.merkle_root = [0u8; 32];
        self.final_sapling_root = [0u8; 32];
        self.bits = 0;
        self.nonce = [0u8; 32];

        let mut sol = Solution::new(&mut self.solution);
        let mut descr = sol.descriptor();
        if descr.version >= activate_pbaas_header {
            descr.hash_prev_mmr_root = [0u8; 32];
            descr.hash_block_mmr_root = [0u8; 32];
            sol.set_descriptor(descr);
        }
    }

    /// `GetPBaaSHeader(pbh, chain_id)`: the sub-header recorded for `chain_id`, or `None`
    /// if this solution has no merge-mining trailer or doesn't mention that chain.
    pub fn get_sub_header_by_chain(&mut self, chain_id: &[u8; 20], activate_pbaas_header: u32) -> Option<SubHeader> {
        let idx = Solution::new(&mut self.solution).find_sub_header(chain_id, activate_pbaas_header)?;
        Solution::new(&mut self.solution).get_sub_header(idx)
    }

    /// `CheckNonCanonicalData(chain_id)`: recomputes the pre-header hash this header would
    /// produce for `chain_id` and compares it against what the solution's sub-header table
    /// actually records for that chain — confirming the header's non-canonical fields are
    /// consistent with the committed pre-header, not tampered with after merge-mining.
    pub fn check_non_canonical_for_chain(&mut self, chain_id: [u8; 20], activate_pbaas_header: u32) -> bool {
        let expected = {
            let ph = self.pre_header(activate_pbaas_header);
            Self::pre_header_hash(chain_id, &ph)
        };
        match self.get_sub_header_by_chain(&chain_id, activate_pbaas_header) {
            Some(recorded) => recorded.pre_header_hash == expected.pre_header_hash,
            None => false,
        }
    }

    /// `CheckNonCanonicalData()`: checks this chain first for speed, then falls back to
    /// scanning every other recorded sub-header, matching the original's early-return
    /// short-circuit and its skip of the local chain id inside the scan.
    pub fn check_non_canonical(&mut self, activate_pbaas_header: u32) -> bool {
        if self.check_non_canonical_for_chain(ASSETCHAINS_CHAINID, activate_pbaas_header) {
            return true;
        }
        let chain_ids: Vec<[u8; 20]> = Solution::new(&mut self.solution)
            .sub_headers(activate_pbaas_header)
            .iter()
            .map(|h| h.chain_id)
            .collect();
        for chain_id in chain_ids {
            if chain_id == ASSETCHAINS_CHAINID {
                continue;
            }
            if self.check_non_canonical_for_chain(chain_id, activate_pbaas_header) {
                return true;
            }
        }
        false
    }

    /// Serializes the fixed 143-byte base (everything but the solution), matching
    /// `CBlockHeader::HEADER_SIZE`'s field order.
    pub fn serialize_base(&self) -> [u8; HEADER_BASESIZE] {
        let mut buf = [0u8; HEADER_BASESIZE];
        buf[0..4].copy_from_slice(&self.version.to_le_bytes());
        buf[4..36].copy_from_slice(&self.prev_block);
        buf[36..68].copy_from_slice(&self.merkle_root);
        buf[68..100].copy_from_slice(&self.final_sapling_root);
        buf[100..104].copy_from_slice(&self.time.to_le_bytes());
        buf[104..108].copy_from_slice(&self.bits.to_le_bytes());
        buf[108..140].copy_from_slice(&self.nonce);
        // remaining 3 bytes belong to the solution's compact-size length prefix, filled
        // in by the caller once the solution's final size is known.
        buf
    }

    /// The full wire serialization: the 140-byte fixed field block, a compact-size length
    /// prefix for the solution (§6), then the solution bytes themselves.
    pub fn serialize_full(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(140 + 5 + self.solution.len());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.prev_block);
        out.extend_from_slice(&self.merkle_root);
        out.extend_from_slice(&self.final_sapling_root);
        out.extend_from_slice(&self.time.to_le_bytes());
        out.extend_from_slice(&self.bits.to_le_bytes());
        out.extend_from_slice(&self.nonce);
        write_compact_size(&mut out, self.solution.len());
        out.extend_from_slice(&self.solution);
        out
    }

    /// Parses the wire format produced by [`serialize_full`](Self::serialize_full),
    /// the collaborator-boundary operation where §7 requires an observable failure
    /// instead of a silent fallback: a slice shorter than the fixed fields plus a
    /// compact-size byte is [`HeaderError::Truncated`], a non-canonical compact-size
    /// encoding is [`HeaderError::BadCompactSize`], and bytes left over once the
    /// declared solution length is consumed are [`HeaderError::TrailingBytes`].
    pub fn parse(bytes: &[u8]) -> Result<BlockHeader, HeaderError> {
        if bytes.len() < FIXED_FIELDS_SIZE + 1 {
            return Err(HeaderError::Truncated);
        }

        let version = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let mut prev_block = [0u8; 32];
        prev_block.copy_from_slice(&bytes[4..36]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&bytes[36..68]);
        let mut final_sapling_root = [0u8; 32];
        final_sapling_root.copy_from_slice(&bytes[68..100]);
        let time = u32::from_le_bytes(bytes[100..104].try_into().unwrap());
        let bits = u32::from_le_bytes(bytes[104..108].try_into().unwrap());
        let mut nonce = [0u8; 32];
        nonce.copy_from_slice(&bytes[108..140]);

        let (solution_len, prefix_len) = read_compact_size(&bytes[FIXED_FIELDS_SIZE..])?;
        let solution_start = FIXED_FIELDS_SIZE + prefix_len;
        let solution_end = solution_start
            .checked_add(solution_len)
            .ok_or(HeaderError::Truncated)?;
        if solution_end > bytes.len() {
            return Err(HeaderError::Truncated);
        }
        if solution_end != bytes.len() {
            return Err(HeaderError::TrailingBytes);
        }

        Ok(BlockHeader {
            version,
            prev_block,
            merkle_root,
            final_sapling_root,
            time,
            bits,
            nonce,
            solution: bytes[solution_start..solution_end].to_vec(),
        })
    }
}

/// Bitcoin/Zcash-style compact-size length prefix (§6): 1 byte if `<253`, else a 3-byte
/// `{0xFD, u16_le}`, else a 5-byte `{0xFE, u32_le}` header.
fn write_compact_size(out: &mut Vec<u8>, len: usize) {
    if len < 253 {
        out.push(len as u8);
    } else if len <= u16::MAX as usize {
        out.push(0xFD);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(0xFE);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
}

/// Reads a compact-size length prefix, returning `(value, bytes_consumed)`. Rejects
/// non-canonical encodings (a multi-byte form whose value would have fit in a shorter
/// one), matching `write_compact_size`'s own minimal-width choice.
fn read_compact_size(bytes: &[u8]) -> Result<(usize, usize), HeaderError> {
    match bytes.first() {
        None => Err(HeaderError::Truncated),
        Some(0xFD) => {
            if bytes.len() < 3 {
                return Err(HeaderError::Truncated);
            }
            let v = u16::from_le_bytes(bytes[1..3].try_into().unwrap());
            if v < 253 {
                return Err(HeaderError::BadCompactSize);
            }
            Ok((v as usize, 3))
        }
        Some(0xFE) => {
            if bytes.len() < 5 {
                return Err(HeaderError::Truncated);
            }
            let v = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
            if v <= u16::MAX as u32 {
                return Err(HeaderError::BadCompactSize);
            }
            Ok((v as usize, 5))
        }
        Some(0xFF) => Err(HeaderError::BadCompactSize),
        Some(&n) => Ok((n as usize, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            version: 4,
            prev_block: [1u8; 32],
            merkle_root: [2u8; 32],
            final_sapling_root: [3u8; 32],
            time: 123,
            bits: 0x1e7fffff,
            nonce: [4u8; 32],
            solution: alloc::vec![0u8; 72],
        }
    }

    #[test]
    fn genesis_header_has_null_prev_block() {
        let mut h = sample_header();
        assert!(!h.is_genesis());
        h.prev_block = [0u8; 32];
        assert!(h.is_genesis());
    }

    #[test]
    fn clear_non_canonical_preserves_version_time_solution() {
        let mut h = sample_header();
        let (version, time, solution) = (h.version, h.time, h.solution.clone());
        h.clear_non_canonical(3);
        assert_eq!(h.version, version);
        assert_eq!(h.time, time);
        assert_eq!(h.solution, solution);
        assert_eq!(h.merkle_root, [0u8; 32]);
        assert_eq!(h.bits, 0);
    }

    #[test]
    fn pre_header_hash_is_deterministic_and_chain_sensitive() {
        let mut h = sample_header();
        let ph = h.pre_header(3);
        let a = BlockHeader::pre_header_hash([9u8; 20], &ph);
        let b = BlockHeader::pre_header_hash([9u8; 20], &ph);
        let c = BlockHeader::pre_header_hash([8u8; 20], &ph);
        assert_eq!(a.pre_header_hash, b.pre_header_hash);
        assert_ne!(a.pre_header_hash, c.pre_header_hash);
    }

    #[test]
    fn check_non_canonical_for_chain_matches_recorded_sub_header() {
        let mut h = sample_header();
        h.solution = alloc::vec![0u8; 72 + 52];
        {
            let mut sol = Solution::new(&mut h.solution);
            let mut d = sol.descriptor();
            d.version = 3;
            d.num_sub_headers = 1;
            sol.set_descriptor(d);
        }
        let chain_id = [5u8; 20];
        let ph = h.pre_header(3);
        let recorded = BlockHeader::pre_header_hash(chain_id, &ph);
        Solution::new(&mut h.solution).set_sub_header(0, recorded);

        assert!(h.check_non_canonical_for_chain(chain_id, 3));
        assert!(!h.check_non_canonical_for_chain([6u8; 20], 3));
    }

    #[test]
    fn parse_round_trips_through_serialize_full() {
        let h = sample_header();
        let bytes = h.serialize_full();
        let parsed = BlockHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.version, h.version);
        assert_eq!(parsed.prev_block, h.prev_block);
        assert_eq!(parsed.merkle_root, h.merkle_root);
        assert_eq!(parsed.final_sapling_root, h.final_sapling_root);
        assert_eq!(parsed.time, h.time);
        assert_eq!(parsed.bits, h.bits);
        assert_eq!(parsed.nonce, h.nonce);
        assert_eq!(parsed.solution, h.solution);
    }

    #[test]
    fn parse_round_trips_a_solution_needing_the_three_byte_compact_size() {
        let mut h = sample_header();
        h.solution = alloc::vec![0xab; 400];
        let bytes = h.serialize_full();
        assert_eq!(bytes[140], 0xFD);
        let parsed = BlockHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.solution, h.solution);
    }

    #[test]
    fn parse_rejects_a_slice_shorter_than_the_fixed_fields() {
        let bytes = [0u8; 100];
        assert_eq!(BlockHeader::parse(&bytes).unwrap_err(), HeaderError::Truncated);
    }

    #[test]
    fn parse_rejects_trailing_bytes_beyond_the_declared_solution() {
        let h = sample_header();
        let mut bytes = h.serialize_full();
        bytes.push(0xff);
        assert_eq!(BlockHeader::parse(&bytes).unwrap_err(), HeaderError::TrailingBytes);
    }

    #[test]
    fn parse_rejects_a_truncated_solution() {
        let h = sample_header();
        let bytes = h.serialize_full();
        let short = &bytes[..bytes.len() - 1];
        assert_eq!(BlockHeader::parse(short).unwrap_err(), HeaderError::Truncated);
    }

    #[test]
    fn parse_rejects_a_non_canonical_compact_size() {
        let h = sample_header();
        let bytes = h.serialize_full();
        // solution is 72 bytes (fits in a 1-byte prefix); re-encode with the 3-byte form.
        let mut re_encoded = bytes[..140].to_vec();
        re_encoded.push(0xFD);
        re_encoded.extend_from_slice(&72u16.to_le_bytes());
        re_encoded.extend_from_slice(&bytes[141..]);
        assert_eq!(BlockHeader::parse(&re_encoded).unwrap_err(), HeaderError::BadCompactSize);
    }
}
