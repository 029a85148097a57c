//! Save-to-storage policy.
//!
//! Dispatches captured values by shape and serializes every write per key so
//! aggregate read-modify-write cycles never lose an update.

pub mod key_locks;
pub mod policy;

pub use key_locks::KeyLocks;
pub use policy::MergePolicy;
