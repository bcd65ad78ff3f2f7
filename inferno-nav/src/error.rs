//! Error types for InfernoNav

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// InfernoNav error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operator console closed the connection
    #[error("Client disconnected")]
    Disconnected,

    /// Malformed command arguments
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Grid coordinates outside the grid
    #[error("Cell ({x}, {y}) is outside the grid")]
    CellOutOfRange {
        /// Column
        x: i32,
        /// Row
        y: i32,
    },

    /// Continuous position outside the grid's physical extent
    #[error("Position ({x:.3}, {y:.3}) is outside the grid")]
    OutOfBounds {
        /// X in meters
        x: f32,
        /// Y in meters
        y: f32,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error ends the session (SessionFault).
    pub fn is_session_fault(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Disconnected)
    }

    /// Whether this error only invalidates a single command.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::Protocol(_) | Error::CellOutOfRange { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
