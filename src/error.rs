//! Error types for netconf-emu.

use thiserror::Error;

/// Main error type for all NETCONF engine operations.
#[derive(Debug, Error)]
pub enum NetconfError {
    /// I/O error on the transport streams or a configuration source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The XML tokenizer rejected the message.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON error (configuration loading, message export).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Framing error (missing message-id, unknown root element, truncated
    /// or oversized frame, etc.).
    #[error("Framing error: {0}")]
    Framing(String),

    /// A wire string that does not belong to a closed vocabulary.
    #[error("Unknown {kind} value: {value:?}")]
    UnknownValue {
        /// Vocabulary name, e.g. "capability".
        kind: &'static str,
        /// The offending wire string.
        value: String,
    },

    /// Stored messages were requested from a host configured not to store them.
    #[error("Message storing is disabled for this server")]
    StoreDisabled,

    /// The peer or the session went away.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl NetconfError {
    /// Shorthand for a [`NetconfError::Framing`] error.
    pub(crate) fn framing(msg: impl Into<String>) -> Self {
        NetconfError::Framing(msg.into())
    }
}

/// Result type alias using NetconfError.
pub type Result<T> = std::result::Result<T, NetconfError>;
