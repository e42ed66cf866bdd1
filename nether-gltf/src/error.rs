//! glTF decoding error types

use thiserror::Error;

/// Boxed error returned by external buffer loaders
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate
pub type GltfResult<T> = Result<T, GltfError>;

/// Errors raised while decoding an asset or evaluating its animation data
#[derive(Debug, Error)]
pub enum GltfError {
    /// Malformed container, framing, or element layout
    #[error("invalid {context}: {reason}")]
    Format {
        context: &'static str,
        reason: String,
    },

    /// A read would run past the end of the available bytes
    #[error("read of {len} bytes at offset {offset} exceeds {available} available bytes")]
    OutOfRange {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// Index into a document section does not exist
    #[error("{kind} #{index} not found")]
    Missing { kind: &'static str, index: usize },

    /// Named lookup found nothing
    #[error("no {kind} named \"{name}\"")]
    MissingNamed { kind: &'static str, name: String },

    /// Named lookup found more than one candidate
    #[error("{count} {kind}s named \"{name}\"")]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },

    /// Accessor resolution reached a buffer with no data attached
    #[error("buffer #{buffer} has no data loaded")]
    BufferNotLoaded { buffer: usize },

    /// Repeated key where uniqueness is required
    #[error("duplicate {kind}: {key}")]
    Duplicate { kind: &'static str, key: String },

    /// Recognized field carrying a value this decoder does not handle
    #[error("unsupported {kind}: {value}")]
    Unsupported { kind: &'static str, value: String },

    /// Parent walk exceeded the configured depth bound
    #[error("joint #{joint} ancestor chain exceeds {max_depth} (cyclic hierarchy?)")]
    Cycle { joint: usize, max_depth: usize },

    /// Internal invariant violation
    #[error("invariant violated: {0}")]
    Fatal(String),

    /// JSON chunk or document failed to parse
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedded data URI payload failed to decode
    #[error("failed to decode base64 buffer data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// External buffer loader failed
    #[error("failed to load buffer \"{uri}\": {source}")]
    Loader {
        uri: String,
        #[source]
        source: BoxError,
    },
}

impl GltfError {
    pub(crate) fn format(context: &'static str, reason: impl Into<String>) -> Self {
        GltfError::Format {
            context,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(kind: &'static str, value: impl ToString) -> Self {
        GltfError::Unsupported {
            kind,
            value: value.to_string(),
        }
    }
}
