//! Native platform layer
//!
//! Everything that touches the Win32 API lives here: the find-handle
//! directory iterator, the security-descriptor plumbing, and the
//! access-mask naming table. The rest of the crate goes through the safe
//! types exported from this module and never sees a raw handle or SID
//! pointer.
//!
//! Non-Windows builds compile portable stand-ins with the same contracts so
//! the traversal engine and the test suite run everywhere; the Win32
//! implementation is the authoritative one.

pub mod find;
pub mod rights;
pub mod security;

pub use find::{DirIter, RawDirEntry};
pub use security::{SecurityInfo, SecurityPolicy, SecurityResolver, SidCache};
