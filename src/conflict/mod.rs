//! Dependency conflict detection.
//!
//! Instrumentation packages declare the library versions they support under
//! an `instruments` extra. Before activating one, callers ask whether those
//! requirements hold in the running environment; the answer is the first
//! [`DependencyConflict`] found, or `None`.
//!
//! # Modules
//!
//! - [`checker`] - The fail-fast requirement scan

pub mod checker;

pub use checker::{
    dependency_conflicts, dist_dependency_conflicts, ConflictChecker, INSTRUMENTS_EXTRA,
};

use serde::Serialize;
use std::fmt;

/// A requirement that is malformed, unresolved, or not met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyConflict {
    /// The requirement string exactly as it was checked.
    pub required: String,
    /// `"<name> <version>"` of the installed package, or `None` when the
    /// requirement could not be parsed or the package is not installed.
    pub found: Option<String>,
}

impl DependencyConflict {
    pub fn new(required: impl Into<String>, found: Option<String>) -> Self {
        Self {
            required: required.into(),
            found,
        }
    }

    /// Conflict for a requirement that never reached version comparison.
    pub fn unresolved(required: impl Into<String>) -> Self {
        Self::new(required, None)
    }

    pub fn is_unresolved(&self) -> bool {
        self.found.is_none()
    }
}

impl fmt::Display for DependencyConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DependencyConflict: requested: \"{}\" but found: \"{}\"",
            self.required,
            self.found.as_deref().unwrap_or("None")
        )
    }
}
