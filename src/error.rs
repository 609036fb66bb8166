//! Error types for Strata
//!
//! All modules use `StrataResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Strata operations
pub type StrataResult<T> = Result<T, StrataError>;

/// All errors that can occur in Strata
#[derive(Error, Debug)]
pub enum StrataError {
    // Pipeline definition errors
    #[error("Pipeline file not found: {0}")]
    PipelineNotFound(PathBuf),

    #[error("Invalid pipeline at {path}: {reason}")]
    PipelineInvalid { path: PathBuf, reason: String },

    #[error("Invalid base image reference '{reference}': {reason}")]
    BaseImageInvalid { reference: String, reason: String },

    #[error("Invalid package name '{0}'")]
    PackageNameInvalid(String),

    #[error("Invalid entry point '{value}': {reason}")]
    EntryPointInvalid { value: String, reason: String },

    #[error("Invalid port variable '{value}': {reason}")]
    PortVariableInvalid { value: String, reason: String },

    // Build context errors
    #[error("Dependency manifest not found: {0}")]
    DependencyManifestMissing(PathBuf),

    #[error("Build context not found: {0}")]
    ContextNotFound(PathBuf),

    // Runtime errors
    #[error("Container build tool not found: {binary}. {hint}")]
    RuntimeNotFound { binary: String, hint: String },

    #[error("{binary} {found} is too old, need at least {required}")]
    RuntimeTooOld {
        binary: String,
        found: String,
        required: String,
    },

    #[error("Build failed at stage '{stage}': {reason}")]
    BuildFailed { stage: String, reason: String },

    #[error("Image pull failed: {image}: {reason}")]
    ImagePull { image: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Ledger errors
    #[error("Failed to read ledger {path}: {reason}")]
    LedgerRead { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl StrataError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Check if re-invoking the whole pipeline may succeed without any
    /// change to its inputs. Package and dependency installs can fail on
    /// transient network errors; definition errors never heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BuildFailed { .. } | Self::ImagePull { .. } | Self::CommandExecution { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PipelineNotFound(_) => Some("Run: strata init"),
            Self::DependencyManifestMissing(_) => {
                Some("Create the manifest or change [dependencies].manifest")
            }
            Self::BuildFailed { .. } | Self::ImagePull { .. } => {
                Some("Transient failures are safe to retry: re-run strata build")
            }
            _ => None,
        }
    }
}
