//! Freshness-bounded caching of backend collections.
//!
//! This module gives views an instantly available value for a namespace while
//! a revalidation runs:
//! - Entries live in the durable [`crate::storage::Store`] under typed keys
//! - Each namespace has its own max age ([`CachePolicy`])
//! - Malformed or expired entries are deleted on read, never served
//! - Writes are best-effort and never fail the caller

mod clock;
mod layer;
mod traits;

#[cfg(test)]
pub use clock::ManualClock;
pub use layer::{CachePolicy, FreshnessCache};
pub use traits::Cacheable;
