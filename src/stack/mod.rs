//! Filter stack evaluation.
//!
//! This module holds the ordered stages of a document, evaluates them, and
//! memoizes results by configuration fingerprint.

pub mod cache;
pub mod fingerprint;
pub mod replay;
pub mod state;

pub use cache::{CacheEntry, CacheStats, StackCache};
pub use fingerprint::Fingerprint;
pub use replay::{replay, Replay};
pub use state::{FilterStack, StackStatus};
