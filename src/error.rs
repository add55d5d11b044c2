//! Error types for the lease server.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants.

/// Errors that can occur during lease server operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system or network I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid server configuration.
    ///
    /// Returned by [`Config::validate`](crate::Config::validate) and
    /// [`AddressPool::build`](crate::AddressPool::build) when the network
    /// identifier and subnet mask do not yield a usable address pool.
    /// This is the only fatal condition: the server must not start.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed protocol message received.
    ///
    /// Covers messages with missing field lines, unparseable addresses or
    /// timestamps, and non-UTF-8 datagrams. The server drops these without
    /// a response; the transport is unreliable and hostile input is expected.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Message whose type token is not part of the protocol.
    ///
    /// Dropped silently, same as malformed messages.
    #[error("Unrecognized message type: {0:?}")]
    UnrecognizedMessage(String),

    /// Socket creation or binding error at startup.
    #[error("Socket error: {0}")]
    Socket(String),

    /// The server answered a client-side exchange with DECLINE.
    ///
    /// Returned by the one-shot helpers in [`client`](crate::client).
    #[error("Server declined: {0}")]
    Declined(String),

    /// The server did not answer within the client-side reply window.
    #[error("No response from server")]
    NoResponse,
}

/// A specialized Result type for lease server operations.
pub type Result<T> = std::result::Result<T, Error>;
