//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for results carrying an `ErrorEnvelope`.
pub trait ResultExt<T> {
    /// Attach a metadata entry to the error, preserving the success value.
    fn with_error_metadata(self, key: &str, value: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_error_metadata(self, key: &str, value: impl Into<String>) -> Result<T> {
        self.map_err(|error| error.with_metadata(key, value))
    }
}
