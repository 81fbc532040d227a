//! Error types for the dms-procman-core library.

use thiserror::Error;

/// Result type alias for process manager operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while managing external processes.
#[derive(Error, Debug)]
pub enum Error {
    /// A process was handed over without a name to log it by.
    #[error("Process name must not be empty")]
    EmptyName,

    /// The OS process id of a handle could not be determined.
    #[error("Could not resolve the process id of \"{name}\"")]
    PidUnavailable { name: String },

    /// The process had already exited when it was handed over.
    #[error("Process \"{name}\" is not alive")]
    ProcessNotAlive { name: String },

    /// The terminator worker thread could not be spawned.
    #[error("Failed to spawn the process terminator: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The terminator worker exited on its own after an internal fault.
    #[error("The process terminator died unexpectedly")]
    WorkerDied,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid process name pattern.
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PidUnavailable {
            name: "ffmpeg".to_string(),
        };
        assert!(err.to_string().contains("ffmpeg"));

        let err = Error::Config("bad value".to_string());
        assert!(err.to_string().contains("bad value"));

        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"));
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("no such program"));
    }
}
