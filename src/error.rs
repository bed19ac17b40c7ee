//! Error types for bkz-compare
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// bkz-compare error types
#[derive(Error, Debug)]
pub enum Error {
    /// Variant identifier could not be resolved (fails before scheduling)
    #[error("Cannot find variant '{name}'\nSearched: {}", searched.join(", "))]
    VariantNotFound {
        /// Requested identifier
        name: String,
        /// Sources that were searched, in lookup order
        searched: Vec<String>,
    },

    /// A reduction run returned an error (deterministic, never retried)
    #[error("Run failed: {variant} (seed 0x{seed:08x}): {message}")]
    RunFailed {
        /// Variant name
        variant: String,
        /// Instance seed
        seed: u64,
        /// Underlying failure
        message: String,
    },

    /// A worker panicked while running a reduction
    #[error("Worker panicked: {variant} (seed 0x{seed:08x}): {message}\nThis indicates a bug in the variant.")]
    WorkerPanicked {
        /// Variant name
        variant: String,
        /// Instance seed
        seed: u64,
        /// Panic payload
        message: String,
    },

    /// Late metric injection addressed a node that does not exist
    #[error("Trace node not found: ({label}, {index:?})")]
    TraceNodeNotFound {
        /// Node label
        label: String,
        /// Node index
        index: Option<usize>,
    },

    /// Samples of one variant disagree on their root metric keys
    #[error("Metric schema mismatch for {variant}: expected [{}], found [{}]", expected.join(", "), found.join(", "))]
    SchemaMismatch {
        /// Variant name
        variant: String,
        /// Keys of the first sample
        expected: Vec<String>,
        /// Keys of the offending sample
        found: Vec<String>,
    },

    /// Invalid parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Completion channel closed before every result arrived
    #[error("Completion channel closed (all workers dropped their senders)")]
    ChannelClosed,

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a variant failure with the run it belongs to.
    #[must_use]
    pub fn run_failed(variant: impl Into<String>, seed: u64, message: impl Into<String>) -> Self {
        Self::RunFailed {
            variant: variant.into(),
            seed,
            message: message.into(),
        }
    }
}
