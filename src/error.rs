//! Error types for the atlas adapter.

use std::path::PathBuf;

/// Error type for adapter operations.
///
/// `Argument` covers caller contract violations (wrong shapes, mismatched
/// list lengths, unknown mode strings, invalid colors). These are never
/// retried. Per-item failures inside a batch are collected in a
/// [`BatchOutcome`] rather than returned.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Invalid argument passed by the caller.
    #[error("Invalid argument: {0}")]
    Argument(String),
    /// Region acronym or id not present in the structure tree.
    #[error("Unknown region: {0}")]
    UnknownRegion(String),
    /// The provider call failed.
    #[error("Provider error: {0}")]
    Provider(String),
    /// Input format that is recognised but not supported.
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// Malformed file content (OBJ, SWC, streamline JSON).
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// File (or logical source) being parsed.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdapterError {
    /// Create a provider error from any error type.
    pub fn from_provider<E: std::error::Error>(e: E) -> Self {
        Self::Provider(e.to_string())
    }

    /// Shorthand for an argument error.
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    /// Shorthand for a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for caller contract violations.
    pub fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }
}

/// Result alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Outcome of a batch where single items may fail.
///
/// Successes keep their input order. Failures carry the item key
/// (acronym, experiment id, file name) and the error.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Items that were produced.
    pub ok: Vec<T>,
    /// Items that failed, keyed by a human-readable identifier.
    pub failed: Vec<(String, AdapterError)>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            ok: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// Create an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition per-item results, logging each failure.
    pub fn partition<I, K>(results: I) -> Self
    where
        I: IntoIterator<Item = (K, AdapterResult<T>)>,
        K: Into<String>,
    {
        let mut outcome = Self::new();
        for (key, result) in results {
            outcome.record(key, result);
        }
        outcome
    }

    /// Record a single item result, logging it if it failed.
    pub fn record(&mut self, key: impl Into<String>, result: AdapterResult<T>) {
        match result {
            Ok(item) => self.ok.push(item),
            Err(e) => {
                let key = key.into();
                tracing::warn!(item = %key, error = %e, "batch item failed, continuing");
                self.failed.push((key, e));
            }
        }
    }

    /// Number of successful items.
    pub fn len(&self) -> usize {
        self.ok.len()
    }

    /// True if no item succeeded.
    pub fn is_empty(&self) -> bool {
        self.ok.is_empty()
    }

    /// True if every item succeeded.
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Discard the failures.
    pub fn into_ok(self) -> Vec<T> {
        self.ok
    }
}
