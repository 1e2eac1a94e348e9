//! Handler processing graph
//!
//! Handlers form a per-channel chain where each handler may read the
//! output of one earlier handler. The orchestrator drives every
//! processing unit once per tick under a shared deadline and publishes
//! results through a double-buffered snapshot.

mod config;
mod handler;
mod orchestrator;
mod output;
mod pipeline;
mod snapshot;

pub use config::{EngineConfig, HandlerConfig, ProcessingConfig};
pub use handler::{Handler, HandlerImpl, ProcessContext};
pub use orchestrator::Orchestrator;
pub use output::{ChunkOverflow, DataSize, OutputBuffer};
pub use pipeline::Processing;
pub use snapshot::{DataSnapshot, HandlerSnapshot, SnapshotCell, SnapshotExtra, StripImage};
