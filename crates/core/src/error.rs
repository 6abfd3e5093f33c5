//! Typed library errors (§7, §10.3): surfaced only where the spec requires an observable
//! failure at the collaborator boundary (parsing caller-supplied bytes). Everywhere else
//! §7 mandates silent zero/false fallbacks, never a `Result`.
//!
//! Grounded on the teacher's own `thiserror`-derived CLI errors, pushed one layer deeper
//! here since this crate's "CLI" is a thin wrapper over a library that itself needs typed
//! errors at its one real boundary: header/solution byte-parsing.
//!
//! `thiserror` 1.x requires `std`, so its derive is only pulled in under the `std`
//! feature (same gate `tracing` gets); a `no_std` build gets a hand-written `Display`
//! instead, keeping the crate's advertised `no_std` + `alloc` support intact.

#[cfg(feature = "std")]
use thiserror::Error;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum HeaderError {
    #[cfg_attr(feature = "std", error("header byte slice is shorter than the fixed 143-byte base size"))]
    Truncated,

    #[cfg_attr(feature = "std", error("header byte slice has trailing bytes beyond the declared solution length"))]
    TrailingBytes,

    #[cfg_attr(feature = "std", error("compact-size length prefix is malformed"))]
    BadCompactSize,

    #[cfg_attr(feature = "std", error("activation version {0} is out of range or reserved"))]
    BadVersion(usize),
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HeaderError::Truncated => write!(f, "header byte slice is shorter than the fixed 143-byte base size"),
            HeaderError::TrailingBytes => {
                write!(f, "header byte slice has trailing bytes beyond the declared solution length")
            }
            HeaderError::BadCompactSize => write!(f, "compact-size length prefix is malformed"),
            HeaderError::BadVersion(v) => write!(f, "activation version {v} is out of range or reserved"),
        }
    }
}
