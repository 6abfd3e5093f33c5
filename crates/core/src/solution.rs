//! C4: the solution blob codec. The variable-length trailer stored after a block header's
//! nonce packs a fixed descriptor, zero or more merge-mining sub-headers, and a stream of
//! extra data, all addressed by the accessors below rather than a parsed struct — the
//! original keeps the whole thing as a raw byte vector and reads/writes fields in place,
//! and this module keeps that shape so resizing and field mutation stay cheap in-place
//! operations instead of a parse/rebuild round trip.
//!
//! Grounded on `examples/original_source/verushash/solutiondata.h`'s
//! `CPBaaSSolutionDescriptor` / `CConstVerusSolutionVector` / `CVerusSolutionVector`.

use alloc::vec::Vec;

use crate::params::{headers_overhead_size, HEADER_BASESIZE, OVERHEAD_SIZE, SUB_HEADER_SIZE};

/// One merge-mined chain's identity and pre-header commitment (§3): `chain_id` (20 bytes)
/// followed by `pre_header_hash` (32 bytes), packed with no padding.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SubHeader {
    pub chain_id: [u8; 20],
    pub pre_header_hash: [u8; 32],
}

impl SubHeader {
    pub const NULL: SubHeader = SubHeader { chain_id: [0; 20], pre_header_hash: [0; 32] };

    pub fn is_null(&self) -> bool {
        self.chain_id == [0; 20]
    }

    fn read(bytes: &[u8]) -> SubHeader {
        let mut chain_id = [0u8; 20];
        let mut pre_header_hash = [0u8; 32];
        chain_id.copy_from_slice(&bytes[0..20]);
        pre_header_hash.copy_from_slice(&bytes[20..52]);
        SubHeader { chain_id, pre_header_hash }
    }

    fn write(&self, bytes: &mut [u8]) {
        bytes[0..20].copy_from_slice(&self.chain_id);
        bytes[20..52].copy_from_slice(&self.pre_header_hash);
    }
}

/// The fixed 72-byte descriptor at the front of every solution blob (§3): `version` (u32
/// LE), `descr_bits` (u8, bit 0 is the PoW flag), `num_sub_headers` (u8), `extra_data_size`
/// (u16 LE), `hash_prev_mmr_root` (32 bytes), `hash_block_mmr_root` (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Descriptor {
    pub version: u32,
    pub descr_bits: u8,
    pub num_sub_headers: u8,
    pub extra_data_size: u16,
    pub hash_prev_mmr_root: [u8; 32],
    pub hash_block_mmr_root: [u8; 32],
}

/// Bit 0 of [`Descriptor::descr_bits`]: set for PoW solutions, clear otherwise.
pub const SOLUTION_POW: u8 = 0x1;

impl Descriptor {
    fn read(bytes: &[u8]) -> Descriptor {
        let version = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let descr_bits = bytes[4];
        let num_sub_headers = bytes[5];
        let extra_data_size = u16::from_le_bytes(bytes[6..8].try_into().unwrap());
        let mut hash_prev_mmr_root = [0u8; 32];
        let mut hash_block_mmr_root = [0u8; 32];
        hash_prev_mmr_root.copy_from_slice(&bytes[8..40]);
        hash_block_mmr_root.copy_from_slice(&bytes[40..72]);
        Descriptor {
            version,
            descr_bits,
            num_sub_headers,
            extra_data_size,
            hash_prev_mmr_root,
            hash_block_mmr_root,
        }
    }

    fn write(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4] = self.descr_bits;
        bytes[5] = self.num_sub_headers;
        bytes[6..8].copy_from_slice(&self.extra_data_size.to_le_bytes());
        bytes[8..40].copy_from_slice(&self.hash_prev_mmr_root);
        bytes[40..72].copy_from_slice(&self.hash_block_mmr_root);
    }
}

/// A solution blob, borrowed from the header that owns it. Every accessor mirrors a static
/// method on the original's `CConstVerusSolutionVector`/`CVerusSolutionVector`, operating
/// directly on the backing byte vector rather than materializing a parsed struct.
pub struct Solution<'a> {
    vch: &'a mut Vec<u8>,
}

impl<'a> Solution<'a> {
    pub fn new(vch: &'a mut Vec<u8>) -> Self {
        Solution { vch }
    }

    pub fn version(&self) -> u32 {
        if self.vch.len() < OVERHEAD_SIZE {
            return 0;
        }
        Descriptor::read(self.vch).version
    }

    pub fn set_version(&mut self, v: u32) {
        if self.vch.len() < OVERHEAD_SIZE {
            return;
        }
        let mut d = Descriptor::read(self.vch);
        d.version = v;
        d.write(self.vch);
    }

    pub fn descriptor(&self) -> Descriptor {
        if self.vch.len() < OVERHEAD_SIZE {
            return Descriptor::default();
        }
        Descriptor::read(self.vch)
    }

    pub fn set_descriptor(&mut self, d: Descriptor) {
        if self.vch.len() < OVERHEAD_SIZE {
            return;
        }
        d.write(self.vch);
    }

    /// Returns `0` if this isn't a merge-mining solution, `1` for a PoW sub-header, `-1`
    /// for PoS, matching the original's tri-state return.
    pub fn has_sub_header(&self, activate_pbaas_header: u32) -> i32 {
        if self.version() >= activate_pbaas_header {
            if self.descriptor().descr_bits & SOLUTION_POW != 0 { 1 } else { -1 }
        } else {
            0
        }
    }

    fn headers_overhead_size(&self) -> usize {
        headers_overhead_size(self.descriptor().num_sub_headers as usize)
    }

    /// Length of the trailing extra-data stream. `allow_sub_header_gate` widens the
    /// activation check to `activate_pbaas_header` (used when merge mining is live but
    /// full PBaaS extra-data addressing isn't yet), matching `ExtraDataLen`'s
    /// `allowPBaaSHeader` parameter.
    pub fn extra_data_len(&self, activate_pbaas: u32, activate_pbaas_header: u32, allow_sub_header_gate: bool) -> usize {
        let gate = self.version() >= activate_pbaas || (allow_sub_header_gate && self.version() >= activate_pbaas_header);
        if !gate {
            return 0;
        }
        let overhead = self.headers_overhead_size();
        let rem = (HEADER_BASESIZE + self.vch.len()) % 32;
        let len = self.vch.len() as i64 - (rem as i64 + overhead as i64);
        if len < 0 {
            0
        } else {
            len as usize
        }
    }

    /// Minimum solution size that fits `extra_data_len` bytes of extra data alongside the
    /// current sub-header count, rounded so the total stays aligned to 32 bytes with 15
    /// bytes of hashing margin, matching `GetRequiredSolutionSize`.
    pub fn required_solution_size(&self, extra_data_len: usize) -> usize {
        let overhead = self.headers_overhead_size();
        let total = extra_data_len + overhead + HEADER_BASESIZE;
        extra_data_len + overhead + (47 - (total % 32))
    }

    pub fn resize_extra_data(&mut self, new_size: usize) {
        let required = self.required_solution_size(new_size);
        self.vch.resize(required, 0);
    }

    fn sub_header_offset(&self, idx: usize) -> usize {
        OVERHEAD_SIZE + idx * SUB_HEADER_SIZE
    }

    /// Sub-headers actually present, bounded both by the descriptor's declared count and
    /// by how many whole 52-byte entries the backing buffer can actually hold — mirrors
    /// `CheckNonCanonicalData`'s clamp against `ExtraDataLen(vch, true)`.
    pub fn sub_headers(&self, activate_pbaas_header: u32) -> Vec<SubHeader> {
        let descr = self.descriptor();
        let declared = descr.num_sub_headers as usize;
        let available_bytes = self.extra_data_len(u32::MAX, activate_pbaas_header, true);
        let fits = available_bytes / SUB_HEADER_SIZE;
        let count = declared.min(if declared * SUB_HEADER_SIZE > available_bytes { fits } else { declared });
        (0..count)
            .map(|i| {
                let ofs = self.sub_header_offset(i);
                SubHeader::read(&self.vch[ofs..ofs + SUB_HEADER_SIZE])
            })
            .collect()
    }

    pub fn get_sub_header(&self, idx: usize) -> Option<SubHeader> {
        if idx >= self.descriptor().num_sub_headers as usize {
            return None;
        }
        let ofs = self.sub_header_offset(idx);
        if ofs + SUB_HEADER_SIZE > self.vch.len() {
            return None;
        }
        Some(SubHeader::read(&self.vch[ofs..ofs + SUB_HEADER_SIZE]))
    }

    /// Index of the sub-header with `chain_id`, or `None` if absent, matching the original's
    /// `GetPBaaSHeader(pbh, cID)` returning `-1` on a miss.
    pub fn find_sub_header(&self, chain_id: &[u8; 20], activate_pbaas_header: u32) -> Option<usize> {
        self.sub_headers(activate_pbaas_header)
            .iter()
            .position(|h| &h.chain_id == chain_id)
    }

    pub fn set_sub_header(&mut self, idx: usize, header: SubHeader) {
        let ofs = self.sub_header_offset(idx);
        if ofs + SUB_HEADER_SIZE > self.vch.len() {
            return;
        }
        header.write(&mut self.vch[ofs..ofs + SUB_HEADER_SIZE]);
    }

    /// Removes sub-header `idx` by moving the last sub-header into its slot (or zeroing it
    /// in place if it already was the last), then shrinking the declared count — matching
    /// `DeletePBaaSHeader`'s swap-remove.
    pub fn delete_sub_header(&mut self, idx: usize) {
        let mut descr = self.descriptor();
        let count = descr.num_sub_headers as usize;
        if idx >= count {
            return;
        }
        let replacement = if idx < count - 1 {
            self.get_sub_header(count - 1).unwrap_or(SubHeader::NULL)
        } else {
            SubHeader::NULL
        };
        self.set_sub_header(idx, replacement);
        descr.num_sub_headers -= 1;
        self.set_descriptor(descr);
    }

    /// Writes `header` at `idx` only if no other index already holds its `chain_id`,
    /// matching `SavePBaaSHeader`'s guard against duplicate chain ids.
    pub fn save_sub_header(&mut self, idx: usize, header: SubHeader, activate_pbaas_header: u32) -> bool {
        let count = self.descriptor().num_sub_headers as usize;
        if self.has_sub_header(activate_pbaas_header) == 0 || header.is_null() || idx >= count {
            return false;
        }
        match self.find_sub_header(&header.chain_id, activate_pbaas_header) {
            Some(existing) if existing != idx => false,
            _ => {
                self.set_sub_header(idx, header);
                true
            }
        }
    }

    /// Overwrites the existing sub-header sharing `header`'s `chain_id`, matching
    /// `UpdatePBaaSHeader`; returns `false` if no such sub-header exists yet.
    pub fn update_sub_header(&mut self, header: SubHeader, activate_pbaas_header: u32) -> bool {
        if header.is_null() {
            return false;
        }
        match self.find_sub_header(&header.chain_id, activate_pbaas_header) {
            Some(idx) => {
                self.set_sub_header(idx, header);
                true
            }
            None => false,
        }
    }

    pub fn extra_data(&self, activate_pbaas: u32, activate_pbaas_header: u32) -> &[u8] {
        let len = self.descriptor().extra_data_size as usize;
        if len == 0 {
            return &[];
        }
        let ofs = self.headers_overhead_size();
        if ofs + len > self.vch.len() {
            return &[];
        }
        let _ = (activate_pbaas, activate_pbaas_header);
        &self.vch[ofs..ofs + len]
    }

    pub fn set_extra_data(&mut self, data: &[u8], activate_pbaas: u32) -> bool {
        if self.version() < activate_pbaas || data.len() > self.extra_data_len(activate_pbaas, u32::MAX, false) {
            return false;
        }
        let mut descr = self.descriptor();
        descr.extra_data_size = data.len() as u16;
        self.set_descriptor(descr);
        let ofs = self.headers_overhead_size();
        self.vch[ofs..ofs + data.len()].copy_from_slice(data);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_solution(num_sub_headers: u8, extra_len: usize) -> Vec<u8> {
        let overhead = headers_overhead_size(num_sub_headers as usize);
        let mut vch = alloc::vec![0u8; overhead + extra_len];
        let mut d = Descriptor::default();
        d.num_sub_headers = num_sub_headers;
        d.write(&mut vch);
        vch
    }

    #[test]
    fn version_round_trips() {
        let mut vch = blank_solution(0, 0);
        let mut sol = Solution::new(&mut vch);
        sol.set_version(6);
        assert_eq!(sol.version(), 6);
    }

    #[test]
    fn delete_sub_header_swaps_last_into_hole() {
        let mut vch = blank_solution(3, 0);
        {
            let mut sol = Solution::new(&mut vch);
            sol.set_sub_header(0, SubHeader { chain_id: [1; 20], pre_header_hash: [0xaa; 32] });
            sol.set_sub_header(1, SubHeader { chain_id: [2; 20], pre_header_hash: [0xbb; 32] });
            sol.set_sub_header(2, SubHeader { chain_id: [3; 20], pre_header_hash: [0xcc; 32] });
            sol.delete_sub_header(0);
        }
        let sol = Solution::new(&mut vch);
        assert_eq!(sol.descriptor().num_sub_headers, 2);
        assert_eq!(sol.get_sub_header(0).unwrap().chain_id, [3; 20]);
    }

    #[test]
    fn delete_last_sub_header_nulls_it_without_swap() {
        let mut vch = blank_solution(2, 0);
        {
            let mut sol = Solution::new(&mut vch);
            sol.set_sub_header(0, SubHeader { chain_id: [1; 20], pre_header_hash: [0xaa; 32] });
            sol.set_sub_header(1, SubHeader { chain_id: [2; 20], pre_header_hash: [0xbb; 32] });
            sol.delete_sub_header(1);
        }
        let sol = Solution::new(&mut vch);
        assert_eq!(sol.descriptor().num_sub_headers, 1);
        assert_eq!(sol.get_sub_header(0).unwrap().chain_id, [1; 20]);
    }

    #[test]
    fn update_sub_header_requires_existing_chain_id() {
        let mut vch = blank_solution(1, 0);
        let mut sol = Solution::new(&mut vch);
        sol.set_sub_header(0, SubHeader { chain_id: [7; 20], pre_header_hash: [1; 32] });
        assert!(sol.update_sub_header(SubHeader { chain_id: [7; 20], pre_header_hash: [2; 32] }, 0));
        assert!(!sol.update_sub_header(SubHeader { chain_id: [9; 20], pre_header_hash: [3; 32] }, 0));
    }

    #[test]
    fn required_solution_size_is_32_byte_aligned_with_margin() {
        let mut vch = blank_solution(0, 0);
        let sol = Solution::new(&mut vch);
        let size = sol.required_solution_size(100);
        assert_eq!((size + HEADER_BASESIZE) % 32, 15);
    }
}
