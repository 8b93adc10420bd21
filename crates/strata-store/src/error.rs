//! Error types for the envelope codec and store backends

/// Stored text could not be turned back into an envelope
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Stored text is not valid JSON
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Envelope could not be rendered to text
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Serialization failed
    #[error("envelope serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Store backend errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("store I/O failed for key {key}: {source}")]
    Io {
        /// Key being accessed
        key: String,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// Write would exceed the store's capacity
    #[error("quota exceeded for key {key}: {requested} bytes requested, {limit} allowed")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Bytes the write needed
        requested: usize,
        /// Store capacity in bytes
        limit: usize,
    },

    /// Backend refused the operation
    #[error("store rejected {key}: {reason}")]
    Rejected {
        /// Key being accessed
        key: String,
        /// Backend-specific reason
        reason: String,
    },
}

impl StoreError {
    /// Create I/O error for a key
    #[inline]
    #[must_use]
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }

    /// Create rejection error for a key
    #[inline]
    #[must_use]
    pub fn rejected(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Key the failed operation targeted
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Io { key, .. } | Self::QuotaExceeded { key, .. } | Self::Rejected { key, .. } => {
                key
            }
        }
    }
}
