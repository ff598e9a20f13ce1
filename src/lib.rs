//! Depconflict - Dependency conflict checks for instrumentation packages.
//!
//! Instrumentation packages declare the library versions they can hook
//! under an `instruments` extra. This crate answers whether those
//! requirements hold in an installed Python environment, reporting the
//! first requirement that is malformed, missing, or not satisfied.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration loading
//! - [`conflict`] - The conflict scan and its result type
//! - [`error`] - Error types and result aliases
//! - [`metadata`] - Installed package lookup and core metadata parsing
//! - [`requirement`] - Requirement and environment marker parsing
//! - [`version`] - Versions, specifiers, and specifier sets
//!
//! # Example
//!
//! ```
//! use depconflict::metadata::InstalledPackages;
//! use depconflict::dependency_conflicts;
//!
//! let installed = InstalledPackages::new()
//!     .with_package("Flask", "2.1.0")
//!     .with_package("requests", "2.31.0");
//!
//! assert!(dependency_conflicts(&installed, ["requests>=2.0"]).is_none());
//!
//! let conflict = dependency_conflicts(&installed, ["flask>=1.0,<2.0"]).unwrap();
//! assert_eq!(
//!     conflict.to_string(),
//!     r#"DependencyConflict: requested: "flask>=1.0,<2.0" but found: "Flask 2.1.0""#
//! );
//! ```
//!
//! For site-packages scanning, see the integration tests.

pub mod config;
pub mod conflict;
pub mod error;
pub mod metadata;
pub mod requirement;
pub mod version;

pub use conflict::{
    dependency_conflicts, dist_dependency_conflicts, ConflictChecker, DependencyConflict,
};
pub use error::{DepConflictError, Result};
pub use metadata::{Distribution, InstalledPackage, PackageResolver};
pub use requirement::{canonicalize_name, Requirement};
