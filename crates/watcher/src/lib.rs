//! Readiness monitoring core for quaywatch.
//!
//! # Modules
//!
//! - [`docker`]: container runtime abstraction (bollard-backed, mockable)
//! - [`pattern`]: compiled readiness pattern sets, first match wins
//! - [`publisher`]: concurrent status store with aggregate computation
//! - [`scan`]: byte-stream to line-scanner bridge with a relay task
//! - [`tailer`]: per-target monitor state machine
//! - [`watcher`]: orchestration and lifecycle of all monitors
//! - [`error`]: domain error type
//!
//! # Architecture
//!
//! ```text
//! DockerClient ──bytes──> relay ──pipe──> LineScanner ──lines──> Tailer
//!                                                                  │
//!                                        Publisher <──one terminal Status
//!                                            │
//!                                     HTTP status endpoint (daemon)
//! ```

pub mod docker;
pub mod error;
pub mod pattern;
pub mod publisher;
pub mod scan;
pub mod tailer;
pub mod watcher;

// --- primary re-exports ---

pub use docker::{BollardDockerClient, DockerClient, LogStream};
pub use error::WatchError;
pub use pattern::PatternSet;
pub use publisher::{Aggregate, Publisher, Status, StatusReport};
pub use scan::LineScanner;
pub use tailer::Tailer;
pub use watcher::{Watcher, WatcherBuilder};
