//! restorer-axum: axum plumbing for the photo restorer.
//!
//! Router assembly with the standard layers, mapping of `RestoreError` to
//! JSON responses, and an in-memory multipart reader.

pub mod app;
mod error;
pub mod multipart;

pub use app::AxumApp;
pub use error::{method_not_allowed, RestoreAxumError};
pub use multipart::{read_multipart, FormFile, MultipartConfig, MultipartForm};

pub use axum;
