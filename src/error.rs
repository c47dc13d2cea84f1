/// Error types for the devicematch library
use thiserror::Error;

/// Result type alias for devicematch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dataset loading, building and lookups
///
/// Matching itself never fails: weak or missing input degrades to a
/// `Nearest` or `Default` outcome instead of an error.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O errors while reading or writing a snapshot
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt or incompatible dataset snapshot
    #[error("Format error: {0}")]
    Format(String),

    /// A property name that the dataset does not define
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// A device id that is malformed or refers to missing profiles
    #[error("Invalid device id '{id}': {reason}")]
    InvalidDeviceId {
        /// The identifier as supplied by the caller
        id: String,
        /// What was wrong with it
        reason: String,
    },

    /// The builder rejected its input
    #[error("Build error: {0}")]
    Build(String),

    /// The JSON source description could not be parsed
    #[error("Source error: {0}")]
    Source(#[from] serde_json::Error),

    /// Reload requested on a provider that was not opened from a file
    #[error("No dataset file to reload from")]
    NoReloadSource,
}

impl Error {
    /// Shorthand for a [`Error::Format`] error
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Shorthand for a [`Error::Build`] error
    pub(crate) fn build(msg: impl Into<String>) -> Self {
        Error::Build(msg.into())
    }

    pub(crate) fn invalid_device_id(id: &str, reason: impl Into<String>) -> Self {
        Error::InvalidDeviceId {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by a damaged or incompatible snapshot
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::UnknownProperty("NoSuchProperty".to_string());
        assert_eq!(err.to_string(), "Unknown property: NoSuchProperty");

        let err = Error::invalid_device_id("12-5", "expected 4 segments, found 2");
        assert_eq!(
            err.to_string(),
            "Invalid device id '12-5': expected 4 segments, found 2"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_format());
        assert!(Error::format("bad magic").is_format());
    }
}
