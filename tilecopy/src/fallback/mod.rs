//! Cache-aside fetching with per-tile request coalescing.

mod lock;
mod source;

pub use lock::{Acquired, FetchOutcome, LockGuard, LockKey, LockStats, LockTable};
pub use source::{CacheFallbackSource, FallbackStats};
