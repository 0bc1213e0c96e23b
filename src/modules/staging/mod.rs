//! Staging module for uploaded documents
//!
//! Provides request-scoped temporary files that are removed when the request
//! finishes, whichever way it finishes.

mod staged_artifact;

pub use staged_artifact::{StagingArea, StagingError};
