//! restorer-core: framework-agnostic core of the photo restorer.
//!
//! Holds the pieces every other crate agrees on: structured errors,
//! the key/value configuration, and the restoration job model
//! (ids, blob keys, metadata names, status reports).

pub mod config;
pub mod errors;
pub mod job;

pub use config::{RestoreConfig, RestoreConfigSnapshot, DEFAULT_RESTORE_PROMPT};
pub use errors::{ErrorKind, RestoreError, RestoreResult};
pub use job::{BlobVariant, JobId, JobStatus, StatusReport};
