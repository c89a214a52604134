use std::path::PathBuf;

/// Faults raised by a conversion service.
///
/// Ordinary misses (unknown key, unparseable input, no registered converter) are
/// never errors; they surface as `Ok(None)`. These variants are reserved for
/// conditions where the request itself is malformed or a converter misbehaved.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The requested type parameters disagree with the converter's element type
    #[error("type parameter mismatch converting to {target}: expected {expected}, found {found}")]
    TypeParameterMismatch {
        target: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A format hint could not be used as a pattern
    #[error("invalid format `{format}` for {target}: {reason}")]
    InvalidFormat {
        target: &'static str,
        format: String,
        reason: String,
    },

    /// A service handed back a value of a type other than the one requested
    #[error("conversion to {target} produced a value of type {produced}")]
    UnexpectedResult {
        target: &'static str,
        produced: &'static str,
    },

    /// A user-registered converter rejected its input outright
    #[error("conversion to {target} failed: {message}")]
    Custom {
        target: &'static str,
        message: String,
    },
}

impl ConversionError {
    pub fn custom(target: &'static str, message: impl Into<String>) -> Self {
        ConversionError::Custom {
            target,
            message: message.into(),
        }
    }
}

/// Errors that can occur while loading a [`PropertySource`](crate::PropertySource)
#[derive(Debug, thiserror::Error)]
pub enum PropertySourceError {
    #[error("failed to parse property source `{name}`: {source}")]
    Parse {
        name: String,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("failed to read property source {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
