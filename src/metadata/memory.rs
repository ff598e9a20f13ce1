//! In-memory package registry.

use super::{InstalledPackage, PackageResolver};
use crate::requirement::canonicalize_name;
use std::collections::HashMap;

/// A fixed set of installed packages keyed by canonical name.
///
/// # Example
///
/// ```
/// use depconflict::metadata::{InstalledPackages, PackageResolver};
///
/// let packages = InstalledPackages::new().with_package("Flask", "1.5.0");
/// let found = packages.resolve("flask").unwrap();
/// assert_eq!(found.name, "Flask");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InstalledPackages {
    packages: HashMap<String, InstalledPackage>,
}

impl InstalledPackages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_package(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.insert(name, version);
        self
    }

    /// Record a package, replacing any with the same canonical name.
    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        let package = InstalledPackage::new(name, version);
        self.packages
            .insert(canonicalize_name(&package.name), package);
    }

    pub fn remove(&mut self, name: &str) -> Option<InstalledPackage> {
        self.packages.remove(&canonicalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageResolver for InstalledPackages {
    fn resolve(&self, name: &str) -> Option<InstalledPackage> {
        self.packages.get(&canonicalize_name(name)).cloned()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for InstalledPackages {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut packages = InstalledPackages::new();
        for (name, version) in iter {
            packages.insert(name, version);
        }
        packages
    }
}
