//! Capture engine seam.
//!
//! The engine itself is external; this module defines what it is handed
//! (`EngineContext`), how it is built (`EngineFactory`) and who runs it
//! (`EngineSupervisor`).

pub mod context;
pub mod supervisor;

use async_trait::async_trait;

use crate::errors::EngineError;

pub use context::EngineContext;
pub use supervisor::EngineSupervisor;

/// One run of the capture engine. `start` may return once listeners are in
/// place or keep running; either way the supervisor may cancel it.
#[async_trait]
pub trait CaptureEngine: Send {
    async fn start(&mut self, ctx: EngineContext) -> Result<(), EngineError>;
}

/// Builds a fresh engine for every run.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn CaptureEngine>, EngineError>;
}
