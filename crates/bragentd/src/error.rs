//! Error types for the border router bridge agent
//!
//! Codec and session operations return a typed error and perform no partial
//! mutation; callers decide between log-and-continue (inbound dispatcher,
//! per connection) and abort (SoC client, per call).

use thiserror::Error;

/// Errors that can occur in the bridge agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Endpoint address is not a well-formed IPv6 address
    #[error("invalid IPv6 address: {0}")]
    InvalidAddress(String),

    /// Frame is shorter than its declared payload length
    #[error("truncated frame: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    /// Decoded message code is outside the defined set
    #[error("unknown message code {0:#010x}")]
    UnknownCode(u32),

    /// Attempted to build a request with a code that has no encoding rule
    #[error("unsupported request code {0:#010x}")]
    UnsupportedCode(u32),

    /// Payload does not match the shape its code requires
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Socket or stream failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared payload length exceeds the frame buffer cap
    #[error("refusing {0}-byte payload buffer over frame limit")]
    Allocation(usize),

    /// Configuration loading or parsing failure
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
