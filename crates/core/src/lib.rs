//! # VerusHash core
//!
//! The VerusHash v2.x family of block proof-of-work functions: a Haraka-512
//! Merkle–Damgård chain over the serialized block header, finished off by
//! [`VerusCLHash`](crate::clhash) — a 32-round carry-less-multiply/AES mixing pass keyed
//! by a per-hash random-key table derived from the chain's own running state.
//!
//! ## Algorithm shape
//!
//! - **Genesis blocks** (`prev_block == 0`) and any header not on the `VERUS_V2` code
//!   path hash via plain SHA-256d.
//! - **VerusHash v2/2.1/2.2** headers are first canonicalized (non-canonical fields
//!   zeroed so merge-mined chains sharing one solution produce the same proof of work),
//!   then chained through Haraka-512 in 32-byte blocks, then finished with the CLHash
//!   variant selected by the solution's own version field.
//!
//! ## Example
//!
//! ```rust
//! use verushash_core::{compute_block_hash, BlockHeader};
//!
//! let header = BlockHeader {
//!     version: 4,
//!     prev_block: [0u8; 32],
//!     merkle_root: [0u8; 32],
//!     final_sapling_root: [0u8; 32],
//!     time: 0,
//!     bits: 0,
//!     nonce: [0u8; 32],
//!     solution: Vec::new(),
//! };
//! let hash = compute_block_hash(&header);
//! assert_eq!(hash.len(), 32);
//! ```
//!
//! ## `no_std` support
//!
//! This crate supports `no_std` environments with the `alloc` crate; the per-thread key
//! store (`keystore`) and the Haraka/BLAKE2b feature-gated backends require the `std`
//! feature, which is on by default:
//!
//! ```toml
//! [dependencies]
//! verushash-core = { version = "0.2", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod activation;
mod clhash;
mod error;
mod haraka;
mod header;
mod lane;
mod params;
mod solution;

#[cfg(feature = "std")]
mod keystore;

#[cfg(feature = "std")]
mod verushash;

pub use activation::ActivationHeights;
pub use error::HeaderError;
pub use haraka::sha256d;
pub use header::{BlockHeader, PreHeader};
pub use params::*;
pub use solution::{Descriptor, Solution, SubHeader, SOLUTION_POW};

#[cfg(feature = "std")]
pub use verushash::compute_block_hash;

/// Looks up a header's sub-header for `chain_id`, matching §6's `get_sub_header` external
/// interface. Returns `None` if the header carries no merge-mining trailer or doesn't
/// mention that chain.
pub fn get_sub_header(header: &mut BlockHeader, chain_id: &[u8; 20]) -> Option<SubHeader> {
    header.get_sub_header_by_chain(chain_id, params::ACTIVATE_PBAAS_HEADER as u32)
}

/// Checks whether `header`'s non-canonical fields are consistent with its own committed
/// pre-header hash (no `chain_id`, checks the local chain first then every recorded
/// sub-header) or, given a `chain_id`, just that one chain — matching §6's
/// `check_non_canonical` external interface.
pub fn check_non_canonical(header: &mut BlockHeader, chain_id: Option<[u8; 20]>) -> bool {
    match chain_id {
        Some(cid) => header.check_non_canonical_for_chain(cid, params::ACTIVATE_PBAAS_HEADER as u32),
        None => header.check_non_canonical(params::ACTIVATE_PBAAS_HEADER as u32),
    }
}
