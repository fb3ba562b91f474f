//! The ingestion pipeline
//!
//! [`ImportCoordinator`] probes the source, then either streams it in
//! byte-range windows or fetches it whole. Window lines are reassembled
//! across boundaries, validated, and persisted window by window. The run's
//! percent advances once per window.
//!
//! Phases:
//!
//! ```text
//! Init -> Probing -> StreamingChunked* | StreamingFull -> Finishing -> Done
//! ```

mod coordinator;
pub mod window;

pub use coordinator::ImportCoordinator;
pub use window::{Carry, ChunkPlan, ChunkWindow, PROGRESS_STEPS};
