//! Activation-height table (§3, §5, §9): the one piece of process-wide, write-rare,
//! then-frozen configuration this crate takes from its caller rather than owning.
//!
//! Grounded on SPEC_FULL.md §10.4's realization note: a plain struct the caller
//! constructs and passes in, mirroring how the teacher keeps its own fixed tunables as
//! `pub const`s in `params.rs` and takes runtime parameters as constructor arguments
//! rather than reaching for a config-file crate.

use crate::error::HeaderError;
use crate::params::{MAX_HEIGHT, NUM_VERSIONS};

/// Monotonically-non-decreasing map from solution-version ordinal (0..[`NUM_VERSIONS`])
/// to the block height at which that version activates.
#[derive(Clone, Copy, Debug)]
pub struct ActivationHeights {
    heights: [i32; NUM_VERSIONS],
}

impl Default for ActivationHeights {
    /// Version 0 is always active from genesis; every other slot defaults to
    /// [`MAX_HEIGHT`] ("never"), matching the original's "the initial version is always
    /// active" asymmetry.
    fn default() -> Self {
        let mut heights = [MAX_HEIGHT; NUM_VERSIONS];
        heights[0] = 0;
        ActivationHeights { heights }
    }
}

impl ActivationHeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the activation height for `version`. The original rejects `version == 0`
    /// with `assert(version > 0 && version < NUM_VERSIONS)` (process abort on violation);
    /// this is realized as a `Result` rather than a panic, since a caller-supplied
    /// version ordinal isn't a true internal invariant — see DESIGN.md's Open Question
    /// ledger.
    pub fn set_activation_height(&mut self, version: usize, height: i32) -> Result<(), HeaderError> {
        if version == 0 || version >= NUM_VERSIONS {
            return Err(HeaderError::BadVersion(version));
        }
        self.heights[version] = height;
        Ok(())
    }

    /// The largest version index whose activation height is `<= height`. Non-monotone
    /// configuration is silently accepted — the original does not validate ordering.
    pub fn active_version(&self, height: i32) -> usize {
        self.heights
            .iter()
            .enumerate()
            .filter(|&(_, &h)| h <= height)
            .map(|(v, _)| v)
            .max()
            .unwrap_or(0)
    }
}
