//! Installed-package metadata.
//!
//! The conflict checker needs two capabilities from the environment: looking
//! up an installed package by name ([`PackageResolver`]) and listing the
//! requirements a distribution declares ([`Distribution`]). This module
//! defines both and provides two implementations:
//!
//! - [`SitePackages`] - reads `*.dist-info` and `*.egg-info` entries from
//!   Python search paths
//! - [`InstalledPackages`] - an in-memory registry for embedding and tests
//!
//! # Modules
//!
//! - [`core_metadata`] - Core metadata (`METADATA` / `PKG-INFO`) parsing
//! - [`site_packages`] - Filesystem discovery of installed distributions
//! - [`memory`] - In-memory package registry

pub mod core_metadata;
pub mod memory;
pub mod site_packages;

pub use core_metadata::DistributionMetadata;
pub use memory::InstalledPackages;
pub use site_packages::SitePackages;

use std::fmt;

/// An installed package as reported by the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    /// Name as declared by the distribution itself.
    pub name: String,
    /// Version string as declared by the distribution itself.
    pub version: String,
}

impl InstalledPackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for InstalledPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Resolves package names against what is installed.
pub trait PackageResolver {
    /// Find the installed package named `name`, compared by canonical name.
    fn resolve(&self, name: &str) -> Option<InstalledPackage>;
}

impl<T: PackageResolver + ?Sized> PackageResolver for &T {
    fn resolve(&self, name: &str) -> Option<InstalledPackage> {
        (**self).resolve(name)
    }
}

/// The requirement lists of a single distribution.
pub trait Distribution {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Unconditional runtime requirements.
    fn requires(&self) -> Vec<String>;

    /// Requirements that only apply when `extra` is requested.
    fn requires_extra(&self, extra: &str) -> Vec<String>;
}
