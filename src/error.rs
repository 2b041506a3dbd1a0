use thiserror::Error;

/// Main player error type
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl PlayerError {
    /// Get user-friendly error message with suggested solutions
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Audio(err) => err.user_message(),
            PlayerError::Config(err) => err.user_message(),
            PlayerError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlayerError::Audio(err) => err.recovery_suggestions(),
            PlayerError::Config(err) => err.recovery_suggestions(),
            PlayerError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            PlayerError::Audio(err) => err.is_recoverable(),
            PlayerError::Config(err) => err.is_recoverable(),
            PlayerError::Parse(_) => false, // Parse errors require correct input
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlayerError::Audio(err) => err.severity(),
            PlayerError::Config(_) => ErrorSeverity::Warning,
            PlayerError::Parse(_) => ErrorSeverity::Info,
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Errors raised while opening, driving or releasing an audio resource
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio output unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Resource did not close cleanly: {0}")]
    AlreadyClosedWarning(String),
}

impl AudioError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        AudioError::IoFailure {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AudioError::UnsupportedFormat { format } => {
                format!("Audio format '{}' is not supported", format)
            }
            AudioError::ResourceUnavailable(msg) => {
                format!("No audio output line could be opened: {}", msg)
            }
            AudioError::IoFailure { path, source } => match source.kind() {
                std::io::ErrorKind::NotFound => format!("File not found: {}", path),
                std::io::ErrorKind::PermissionDenied => {
                    format!("Permission denied - cannot read {}", path)
                }
                std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                    format!("File appears to be truncated or corrupted: {}", path)
                }
                _ => format!("Cannot read {}: {}", path, source),
            },
            AudioError::AlreadyClosedWarning(msg) => {
                format!("Previous track was not released cleanly: {}", msg)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            AudioError::UnsupportedFormat { .. } => vec![
                format!(
                    "Supported formats: {}",
                    crate::audio::SourceFormat::supported_extensions().join(", ")
                ),
                "Convert the file to a supported format".to_string(),
                "Check if the file extension matches the actual format".to_string(),
            ],
            AudioError::ResourceUnavailable(_) => vec![
                "Check that an audio output device is connected".to_string(),
                "Close applications holding exclusive access to the device".to_string(),
                "Clear 'preferred_device' in the configuration to use the default device"
                    .to_string(),
            ],
            AudioError::IoFailure { .. } => vec![
                "Check that the file path is correct".to_string(),
                "Check file permissions".to_string(),
                "Try re-copying the file if it may be incomplete".to_string(),
            ],
            AudioError::AlreadyClosedWarning(_) => {
                vec!["No action needed - playback state has been reset".to_string()]
            }
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            AudioError::UnsupportedFormat { .. } => false, // Requires different file or conversion
            AudioError::ResourceUnavailable(_) => true,    // Device may come back
            AudioError::IoFailure { .. } => false,
            AudioError::AlreadyClosedWarning(_) => true,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AudioError::UnsupportedFormat { .. } => ErrorSeverity::Warning,
            AudioError::ResourceUnavailable(_) => ErrorSeverity::Critical,
            AudioError::IoFailure { .. } => ErrorSeverity::Error,
            AudioError::AlreadyClosedWarning(_) => ErrorSeverity::Warning,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Try creating the directory manually: ~/.config/solo-player/".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => {
                vec!["Configuration will use default values".to_string()]
            }
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        // Every configuration failure falls back to defaults
        true
    }
}
