//! C2: the per-thread aligned key store — the random-key table the CLHash engine mutates
//! and restores, lazily created once per thread and reused across hashes.
//!
//! Grounded on the teacher's own `UniversalHash` struct owning its scratchpads
//! (`uhash.rs`), scoped to `thread_local!` per SPEC_FULL.md §5's Rust-realization
//! paragraph rather than a caller-owned value, since the key table must be lazily
//! created, thread-scoped, and guaranteed to release on every exit path. Allocation
//! failure is fatal by spec (§5, §9); `Vec::with_capacity` already aborts through the
//! global allocator's `handle_alloc_error` on OOM, matching `new_handler_terminate()`'s
//! `[[noreturn]]` contract without any extra unwinding-prone bookkeeping.

use std::cell::RefCell;
use std::vec::Vec;

use crate::haraka::haraka256;
use crate::lane::Lane;

/// The master key table doubled with an untouched shadow copy (§3's "random key table" /
/// "move-scratch list" pairing): `table[0..key_elems)` is mutated in place by the CLHash
/// engine, `table[key_elems..2*key_elems)` never changes after construction and backs
/// both the engine's out-of-mask reads (accumulator seed, monkins-loop overrun) and
/// [`KeyStore::restore`]'s undo.
pub struct KeyStore {
    table: Vec<Lane>,
    key_elems: usize,
}

impl KeyStore {
    /// Expands `seed` into a fresh `key_size_bytes`-byte master key (doubled with its
    /// shadow), the way C6 drives a random-key table "from a fixed seed of the current
    /// state" via Haraka-256. The exact counter-mode expansion isn't given by the
    /// retrieved source (only its *use* is, not its schedule) — chained self-feeding
    /// Haraka-256 calls is the documented best-effort reconstruction (DESIGN.md).
    pub fn new(seed: &[u8; 32], key_size_bytes: usize) -> Self {
        let key_elems = key_size_bytes / 16;
        let master = expand_key(*seed, key_elems);
        let mut table = Vec::with_capacity(key_elems * 2);
        table.extend_from_slice(&master);
        table.extend_from_slice(&master);
        KeyStore { table, key_elems }
    }

    /// Re-expands this store's table in place for a new hash call, reusing the
    /// allocation when the size hasn't changed, reallocating otherwise.
    pub fn reseed(&mut self, seed: &[u8; 32], key_size_bytes: usize) {
        let key_elems = key_size_bytes / 16;
        if key_elems != self.key_elems {
            *self = KeyStore::new(seed, key_size_bytes);
            return;
        }
        let master = expand_key(*seed, key_elems);
        self.table[..key_elems].copy_from_slice(&master);
        self.table[key_elems..].copy_from_slice(&master);
    }

    pub fn key_mask_bytes(&self) -> u64 {
        ((self.key_elems - 1) * 16) as u64
    }

    /// The mutable master region the CLHash engine reads and writes through its
    /// `prand`/`prandex` indices, plus the shadow immediately after it for its
    /// out-of-mask reads (accumulator seed, monkins-loop lookahead).
    pub fn table_mut(&mut self) -> &mut [Lane] {
        &mut self.table
    }

    /// `fixupkey`: walk the move-scratch trail, copying each mutated slot's shadow
    /// counterpart (`idx + key_elems`) back over the master slot at `idx`.
    pub fn restore(&mut self, trail: &[usize]) {
        let ofs = self.key_elems;
        for &idx in trail {
            self.table[idx] = self.table[idx + ofs];
        }
    }
}

fn expand_key(seed: [u8; 32], key_elems: usize) -> Vec<Lane> {
    let mut out = Vec::with_capacity(key_elems);
    let mut state = seed;
    while out.len() < key_elems {
        state = haraka256(&state);
        out.push(Lane::from_bytes(state[0..16].try_into().unwrap()));
        if out.len() < key_elems {
            out.push(Lane::from_bytes(state[16..32].try_into().unwrap()));
        }
    }
    out
}

thread_local! {
    static KEY_STORE: RefCell<Option<KeyStore>> = const { RefCell::new(None) };
}

/// Runs `f` with this thread's key store, seeded/resized for `key_size_bytes`, lazily
/// creating it on first use and reusing the allocation on every call after.
pub fn with_key_store<R>(seed: &[u8; 32], key_size_bytes: usize, f: impl FnOnce(&mut KeyStore) -> R) -> R {
    KEY_STORE.with(|cell| {
        let mut slot = cell.borrow_mut();
        match slot.as_mut() {
            Some(store) => store.reseed(seed, key_size_bytes),
            None => *slot = Some(KeyStore::new(seed, key_size_bytes)),
        }
        f(slot.as_mut().unwrap())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_undoes_mutation() {
        let seed = [9u8; 32];
        let mut store = KeyStore::new(&seed, 16 * 64);
        let before = store.table_mut()[5];
        store.table_mut()[5] = Lane::from_lo_hi(0xdead, 0xbeef);
        assert_ne!(store.table_mut()[5], before);
        store.restore(&[5]);
        assert_eq!(store.table_mut()[5], before);
    }

    #[test]
    fn reseed_reuses_allocation_for_same_size() {
        let seed_a = [1u8; 32];
        let seed_b = [2u8; 32];
        let mut store = KeyStore::new(&seed_a, 16 * 64);
        let ptr_before = store.table.as_ptr();
        store.reseed(&seed_b, 16 * 64);
        assert_eq!(store.table.as_ptr(), ptr_before);
    }

    #[test]
    fn with_key_store_lazily_creates_and_reuses() {
        let seed = [3u8; 32];
        let mask1 = with_key_store(&seed, 16 * 64, |s| s.key_mask_bytes());
        let mask2 = with_key_store(&seed, 16 * 64, |s| s.key_mask_bytes());
        assert_eq!(mask1, mask2);
    }
}
