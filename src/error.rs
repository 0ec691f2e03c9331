//! Error types for Drishti

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Drishti error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but violates a constraint
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Channel socket could not be connected or bound at startup
    #[error("Failed to open {channel} channel on {endpoint}: {source}")]
    Channel {
        /// Channel name (detections, scan, tracked-objects)
        channel: &'static str,
        /// Endpoint that was requested
        endpoint: String,
        /// Underlying socket error
        source: zmq::Error,
    },

    /// Socket option or transport error outside channel setup
    #[error("ZeroMQ error: {0}")]
    Zmq(#[from] zmq::Error),

    /// Inbound payload did not match the expected message shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Outbound message could not be serialized
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Thread could not be spawned
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread name
        name: &'static str,
        /// Underlying OS error
        source: std::io::Error,
    },
}
