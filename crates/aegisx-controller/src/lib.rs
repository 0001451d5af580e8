//! Aegis-X Controller
//!
//! The policy controller: single mutation-serialising entry point over the
//! parser/validator/compiler/translator/applier pipeline, the external
//! record-store contract, and the cooperative reload watcher.

pub mod controller;
pub mod record_store;
pub mod watcher;

pub use controller::{ControllerConfig, PipelineError, PolicyController, SharedController};
pub use record_store::{Record, RecordStore, RecordStoreError};
pub use watcher::watch_and_reload;
