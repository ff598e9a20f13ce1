//! Configuration schema for the checked environment.
//!
//! ```yaml
//! search_paths:
//!   - /opt/app/.venv/lib/python3.11/site-packages
//! markers:
//!   python_version: "3.11"
//!   sys_platform: linux
//! prereleases: false
//! ```

use crate::config::loader::{apply_search_path_override, SEARCH_PATH_ENV};
use crate::conflict::ConflictChecker;
use crate::metadata::{PackageResolver, SitePackages};
use crate::requirement::MarkerEnvironment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Describes the Python environment whose installed packages are checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Directories holding `*.dist-info` / `*.egg-info` entries, highest
    /// precedence first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,

    /// Interpreter facts used to evaluate requirement markers.
    pub markers: MarkerEnvironment,

    /// Pre-release policy override; unset keeps the specifier-driven default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prereleases: Option<bool>,
}

impl EnvironmentConfig {
    /// Defaults plus any search paths listed in `DEPCONFLICT_PATH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_search_path_override(&mut config, std::env::var_os(SEARCH_PATH_ENV));
        config
    }

    /// Resolver over the configured search paths.
    pub fn site_packages(&self) -> SitePackages {
        SitePackages::new(self.search_paths.iter().cloned())
            .with_environment(self.markers.clone())
    }

    /// Checker over `resolver` with the configured pre-release policy.
    pub fn checker<'a, R: PackageResolver + ?Sized>(
        &self,
        resolver: &'a R,
    ) -> ConflictChecker<'a, R> {
        ConflictChecker::new(resolver).with_prereleases(self.prereleases)
    }
}
