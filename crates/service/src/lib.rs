//! Storage synchronization layer for incremental form capture.
//! - `storage`: key-value area, change events and the result-returning gateway.
//! - `merge`: shape-dispatching save policy with per-key write serialization.
//! - `engine` / `listener`: capture engine runs and flag-driven restarts.
//! - `toggle`: popup view model over the same storage area.

pub mod errors;
pub mod retry;
pub mod observability;
pub mod storage;
pub mod merge;
pub mod engine;
pub mod listener;
pub mod toggle;
pub mod bootstrap;
