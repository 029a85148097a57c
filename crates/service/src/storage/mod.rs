//! Storage abstractions for the capture layer
//!
//! A storage area is one shared key -> JSON value namespace with change
//! notifications. The gateway adds timeouts, retries and logging on top.

pub mod area;
pub mod change;
pub mod local_area;
pub mod gateway;

pub use area::{AreaName, Items, StorageArea};
pub use change::{StorageChange, ValueChange};
pub use gateway::StorageGateway;
pub use local_area::LocalArea;
