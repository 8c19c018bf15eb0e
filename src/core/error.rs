//! Error handling for the resolver
//!
//! The error system has two layers, mirroring the way a resolver run fails:
//! 1. **Run-level errors** ([`ResolverError`]) abort a command: the repository root
//!    is missing, the configuration is invalid, the run was cancelled, or the
//!    run finished with validation errors.
//! 2. **Entity-level problems** are [`Diagnostic`](super::Diagnostic) records tagged
//!    with an [`ErrorKind`]. They are accumulated across the whole run and never
//!    abort sibling subtrees.
//!
//! Use [`user_friendly_error`] to turn any error reaching the CLI boundary into an
//! [`ErrorContext`] with a suggestion, and [`exit_code_for`] to pick the process
//! exit code.
//!
//! # Examples
//!
//! ```rust,no_run
//! use constellation_resolver::core::{ResolverError, user_friendly_error, exit_code_for};
//!
//! let error = anyhow::Error::from(ResolverError::ValidationFailed { count: 3 });
//! assert_eq!(exit_code_for(&error), 2);
//!
//! let context = user_friendly_error(error);
//! context.display();
//! ```

use colored::Colorize;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Exit code for a run that completed but reported validation errors.
pub const EXIT_VALIDATION: i32 = 2;

/// Exit code for I/O, configuration and cancellation failures.
pub const EXIT_FAILURE: i32 = 1;

/// Category of an entity-level problem.
///
/// The serialized and displayed names are the taxonomy names users see in
/// reports (`StructureError`, `ReferenceError`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ErrorKind {
    /// Unreadable or unparsable file, or a required file is missing.
    #[serde(rename = "StructureError")]
    Structure,
    /// Unknown template, malformed token, or an inconsistent constellation reference.
    #[serde(rename = "ReferenceError")]
    Reference,
    /// Two entities share an identifier in the same scope.
    #[serde(rename = "DuplicateError")]
    Duplicate,
    /// An interpolation token names a variable absent from the merged scope.
    #[serde(rename = "UnresolvedVariableError")]
    UnresolvedVariable,
    /// The run was aborted by the caller.
    #[serde(rename = "CancelledError")]
    Cancelled,
}

impl ErrorKind {
    /// Taxonomy name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Structure => "StructureError",
            Self::Reference => "ReferenceError",
            Self::Duplicate => "DuplicateError",
            Self::UnresolvedVariable => "UnresolvedVariableError",
            Self::Cancelled => "CancelledError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run-level error for resolver operations
///
/// Each variant describes why a whole command could not produce its result.
/// Problems tied to a single constellation, cluster or application are not
/// represented here; they are collected as diagnostics and surface at the end
/// of the run as [`ResolverError::ValidationFailed`].
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The repository root does not exist or is not a directory
    #[error("Repository root not found: {path}")]
    RepositoryNotFound {
        /// Path that was given as the repository root
        path: String,
    },

    /// Configuration file could not be loaded or holds invalid values
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// The run was aborted by a caller signal or its deadline expired
    ///
    /// No resolved applications are produced for a cancelled run.
    #[error("Resolution cancelled: {reason}")]
    Cancelled {
        /// What triggered the cancellation
        reason: String,
    },

    /// The run completed but reported entity-level errors
    #[error("Validation failed with {count} error(s)")]
    ValidationFailed {
        /// Number of diagnostics reported
        count: usize,
    },

    /// A cluster named on the command line does not exist in the repository
    #[error("Cluster '{name}' not found in repository")]
    ClusterNotFound {
        /// Requested cluster identifier
        name: String,
    },

    /// A background worker panicked or was aborted
    #[error("Worker task failed: {reason}")]
    TaskFailed {
        /// Join error reported by the runtime
        reason: String,
    },

    /// Standard I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML (de)serialization error outside of repository documents
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error in the configuration file
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Any other error, already formatted
    #[error("{message}")]
    Other {
        /// Full error message including its cause chain
        message: String,
    },
}

impl ResolverError {
    /// Construct a cancellation error.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// The taxonomy kind for errors that have one.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Cancelled { .. } => Some(ErrorKind::Cancelled),
            Self::YamlError(_) => Some(ErrorKind::Structure),
            _ => None,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ValidationFailed { .. } => EXIT_VALIDATION,
            _ => EXIT_FAILURE,
        }
    }
}

/// Pick the process exit code for an error reaching `main`.
///
/// Validation failures map to [`EXIT_VALIDATION`]; everything else, including
/// errors that did not originate in this crate, maps to [`EXIT_FAILURE`].
#[must_use]
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error.downcast_ref::<ResolverError>().map_or(EXIT_FAILURE, ResolverError::exit_code)
}

/// Error wrapper carrying a user-facing suggestion and details
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying resolver error
    pub error: ResolverError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error without suggestion or details.
    #[must_use]
    pub const fn new(error: ResolverError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one applies.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<ResolverError>() {
        Ok(resolver_error) => return create_error_context(resolver_error),
        Err(other) => other,
    };

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(ResolverError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the resolver configuration file");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(ResolverError::Other {
        message,
    })
}

fn create_error_context(error: ResolverError) -> ErrorContext {
    match error {
        ResolverError::RepositoryNotFound { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Pass the directory that contains 'templates/' and 'environments/' with --root",
            ),

        ResolverError::ValidationFailed { .. } => ErrorContext::new(error)
            .with_details("Every problem found in the repository is listed above, one per line")
            .with_suggestion("Fix the listed files and run 'constellation validate' again"),

        ResolverError::Cancelled { .. } => ErrorContext::new(error)
            .with_details("No resolved applications were produced for this run")
            .with_suggestion("Increase --timeout if the repository is large"),

        ResolverError::ClusterNotFound { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Cluster identifiers are directory names under 'clusters/' or 'standalone-clusters/'",
            ),

        ResolverError::ConfigError { .. } | ResolverError::TomlError(_) => ErrorContext::new(error)
            .with_suggestion(
                "Check the file passed with --config or the CONSTELLATION_CONFIG environment variable",
            ),

        _ => ErrorContext::new(error),
    }
}
