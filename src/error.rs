//! Error types for depconflict operations.
//!
//! This module defines [`DepConflictError`], the error type returned by the
//! parsing and metadata layers, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Parsers and metadata readers return `DepConflictError`
//! - The conflict checker never returns an error: every failure becomes a
//!   [`DependencyConflict`](crate::conflict::DependencyConflict)
//! - Use `anyhow::Error` (via `DepConflictError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// A requirement string that does not follow the PEP 508 grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct RequirementParseError {
    /// The offending input.
    pub input: String,
    /// Byte offset where parsing stopped.
    pub position: usize,
    /// What the parser expected.
    pub message: String,
}

impl RequirementParseError {
    pub(crate) fn new(input: &str, position: usize, message: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            position,
            message: message.into(),
        }
    }
}

/// Core error type for depconflict operations.
#[derive(Debug, Error)]
pub enum DepConflictError {
    /// Version string is not valid PEP 440.
    #[error("Invalid version: '{version}'")]
    InvalidVersion { version: String },

    /// Version specifier is malformed or not allowed for its operator.
    #[error("Invalid specifier '{specifier}': {message}")]
    InvalidSpecifier { specifier: String, message: String },

    /// Requirement string is not valid PEP 508.
    #[error("Invalid requirement '{input}': {0}", input = .0.input)]
    InvalidRequirement(#[from] RequirementParseError),

    /// Environment marker is malformed.
    #[error("Invalid marker '{marker}': {message}")]
    InvalidMarker { marker: String, message: String },

    /// Distribution metadata could not be parsed.
    #[error("Failed to parse metadata at {path}: {message}")]
    MetadataParseError { path: PathBuf, message: String },

    /// No installed distribution with this name.
    #[error("Package not found: {name}")]
    PackageNotFound { name: String },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for depconflict operations.
pub type Result<T> = std::result::Result<T, DepConflictError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_version_displays_input() {
        let err = DepConflictError::InvalidVersion {
            version: "not.a.version!".into(),
        };
        assert!(err.to_string().contains("not.a.version!"));
    }

    #[test]
    fn invalid_specifier_displays_specifier_and_message() {
        let err = DepConflictError::InvalidSpecifier {
            specifier: "~=1".into(),
            message: "needs at least two release segments".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("~=1"));
        assert!(msg.contains("two release segments"));
    }

    #[test]
    fn requirement_parse_error_displays_position() {
        let err = RequirementParseError::new("requests>=", 10, "Expected version after operator");
        assert_eq!(
            err.to_string(),
            "Expected version after operator at position 10"
        );
        let source: &dyn std::error::Error = &err;
        assert!(source.source().is_none());
    }

    #[test]
    fn invalid_requirement_converts_from_parse_error() {
        let parse = RequirementParseError::new("===", 0, "Expected package name");
        let err: DepConflictError = parse.into();
        assert!(matches!(err, DepConflictError::InvalidRequirement(_)));
        let msg = err.to_string();
        assert!(msg.contains("'==='"));
        assert!(msg.contains("Expected package name"));
    }

    #[test]
    fn metadata_parse_error_displays_path_and_message() {
        let err = DepConflictError::MetadataParseError {
            path: PathBuf::from("/site-packages/foo-1.0.dist-info/METADATA"),
            message: "missing Name".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("foo-1.0.dist-info"));
        assert!(msg.contains("missing Name"));
    }

    #[test]
    fn package_not_found_displays_name() {
        let err = DepConflictError::PackageNotFound {
            name: "flask".into(),
        };
        assert!(err.to_string().contains("flask"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: DepConflictError = io_err.into();
        assert!(matches!(err, DepConflictError::Io(_)));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(DepConflictError::PackageNotFound {
                name: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
