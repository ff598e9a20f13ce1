//! Filesystem discovery of installed distributions.
//!
//! Python installers leave one metadata entry per distribution in each
//! `site-packages` directory:
//!
//! - `name-version.dist-info/METADATA` for wheel installs
//! - `name-version.egg-info/PKG-INFO` plus `requires.txt` for setuptools installs
//! - a single `name-version.egg-info` file for very old installs
//!
//! Search paths are scanned in order and the first entry whose name matches
//! wins, the same precedence the interpreter's import system uses.

use super::core_metadata::requires_txt_to_requires_dist;
use super::{DistributionMetadata, InstalledPackage, PackageResolver};
use crate::error::{DepConflictError, Result};
use crate::requirement::{canonicalize_name, MarkerEnvironment};
use anyhow::Context;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const DIST_INFO: &str = ".dist-info";
const EGG_INFO: &str = ".egg-info";

/// Installed distributions found under a list of search paths.
#[derive(Debug, Clone, Default)]
pub struct SitePackages {
    search_paths: Vec<PathBuf>,
    environment: MarkerEnvironment,
}

impl SitePackages {
    pub fn new(search_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
            environment: MarkerEnvironment::default(),
        }
    }

    /// Marker environment attached to every loaded distribution.
    pub fn with_environment(mut self, environment: MarkerEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Load the distribution named `name`, if installed.
    pub fn distribution(&self, name: &str) -> Option<DistributionMetadata> {
        let wanted = canonicalize_name(name);
        self.entries()
            .filter(|entry| entry_name(entry).is_some_and(|n| n == wanted))
            .find_map(|entry| self.load_logged(&entry))
    }

    /// Like [`distribution`](Self::distribution) but reports absence as an error.
    pub fn require_distribution(&self, name: &str) -> Result<DistributionMetadata> {
        self.distribution(name)
            .ok_or_else(|| DepConflictError::PackageNotFound {
                name: name.to_string(),
            })
    }

    /// Every loadable distribution, shadowed duplicates removed.
    pub fn distributions(&self) -> Vec<DistributionMetadata> {
        let mut seen = HashSet::new();
        self.entries()
            .filter_map(|entry| self.load_logged(&entry))
            .filter(|dist| seen.insert(canonicalize_name(&dist.name)))
            .collect()
    }

    /// Metadata entries across all search paths, in precedence order.
    fn entries(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.search_paths.iter().flat_map(|dir| {
            let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
                Ok(read_dir) => read_dir
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|path| entry_name(path).is_some())
                    .collect(),
                Err(e) => {
                    tracing::debug!("Skipping search path {}: {}", dir.display(), e);
                    Vec::new()
                }
            };
            entries.sort();
            entries
        })
    }

    fn load_logged(&self, entry: &Path) -> Option<DistributionMetadata> {
        match load_entry(entry) {
            Ok(dist) => Some(dist.with_environment(self.environment.clone())),
            Err(e) => {
                tracing::debug!("Skipping {}: {}", entry.display(), e);
                None
            }
        }
    }
}

impl PackageResolver for SitePackages {
    fn resolve(&self, name: &str) -> Option<InstalledPackage> {
        self.distribution(name).map(|dist| dist.installed())
    }
}

/// Canonical project name encoded in a metadata entry's file name.
fn entry_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name
        .strip_suffix(DIST_INFO)
        .or_else(|| file_name.strip_suffix(EGG_INFO))?;
    let name = stem.split_once('-').map_or(stem, |(name, _)| name);
    if name.is_empty() {
        return None;
    }
    Some(canonicalize_name(name))
}

/// Read one `.dist-info` / `.egg-info` entry.
fn load_entry(entry: &Path) -> Result<DistributionMetadata> {
    if !entry.is_dir() {
        let content = fs::read_to_string(entry)
            .with_context(|| format!("Failed to read {}", entry.display()))?;
        return DistributionMetadata::parse(&content, entry);
    }

    let is_dist_info = entry
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(DIST_INFO));

    if is_dist_info {
        let path = entry.join("METADATA");
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return DistributionMetadata::parse(&content, &path);
    }

    let path = entry.join("PKG-INFO");
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut dist = DistributionMetadata::parse(&content, &path)?;

    // egg-info keeps requirements out of PKG-INFO
    if dist.requires_dist.is_empty() {
        if let Ok(requires) = fs::read_to_string(entry.join("requires.txt")) {
            dist.requires_dist = requires_txt_to_requires_dist(&requires);
        }
    }

    Ok(dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Distribution;
    use tempfile::TempDir;

    fn write_dist_info(dir: &Path, name: &str, version: &str, requires: &[&str]) {
        let info = dir.join(format!("{}-{}.dist-info", name.replace('-', "_"), version));
        fs::create_dir_all(&info).unwrap();
        let mut metadata = format!("Metadata-Version: 2.1\nName: {}\nVersion: {}\n", name, version);
        for req in requires {
            metadata.push_str(&format!("Requires-Dist: {}\n", req));
        }
        fs::write(info.join("METADATA"), metadata).unwrap();
    }

    #[test]
    fn entry_name_handles_naming_schemes() {
        assert_eq!(
            entry_name(Path::new("/sp/Flask_Cors-4.0.0.dist-info")).as_deref(),
            Some("flask-cors")
        );
        assert_eq!(
            entry_name(Path::new("/sp/wrapt-1.16.0-py3.11.egg-info")).as_deref(),
            Some("wrapt")
        );
        assert_eq!(
            entry_name(Path::new("/sp/legacy.egg-info")).as_deref(),
            Some("legacy")
        );
        assert_eq!(entry_name(Path::new("/sp/flask")), None);
        assert_eq!(entry_name(Path::new("/sp/flask.py")), None);
    }

    #[test]
    fn resolves_dist_info_by_canonical_name() {
        let temp = TempDir::new().unwrap();
        write_dist_info(temp.path(), "Flask-Cors", "4.0.0", &[]);

        let site = SitePackages::new([temp.path()]);
        let pkg = site.resolve("flask_cors").unwrap();
        assert_eq!(pkg.name, "Flask-Cors");
        assert_eq!(pkg.version, "4.0.0");
        assert!(site.resolve("flask").is_none());
    }

    #[test]
    fn first_search_path_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_dist_info(first.path(), "requests", "2.31.0", &[]);
        write_dist_info(second.path(), "requests", "2.0.0", &[]);

        let site = SitePackages::new([first.path(), second.path()]);
        assert_eq!(site.resolve("requests").unwrap().version, "2.31.0");
        assert_eq!(site.distributions().len(), 1);
    }

    #[test]
    fn reads_egg_info_directory_with_requires_txt() {
        let temp = TempDir::new().unwrap();
        let egg = temp.path().join("legacy_pkg-0.9-py3.11.egg-info");
        fs::create_dir_all(&egg).unwrap();
        fs::write(
            egg.join("PKG-INFO"),
            "Metadata-Version: 1.1\nName: legacy-pkg\nVersion: 0.9\n",
        )
        .unwrap();
        fs::write(egg.join("requires.txt"), "six\n\n[instruments]\nrequests>=2\n").unwrap();

        let site = SitePackages::new([temp.path()]);
        let dist = site.distribution("Legacy.Pkg").unwrap();
        assert_eq!(dist.version, "0.9");
        assert_eq!(
            dist.requires_dist,
            ["six", "requests>=2; extra == \"instruments\""]
        );
    }

    #[test]
    fn reads_single_file_egg_info() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("oldpkg-1.0.egg-info"),
            "Metadata-Version: 1.0\nName: oldpkg\nVersion: 1.0\n",
        )
        .unwrap();

        let site = SitePackages::new([temp.path()]);
        assert_eq!(site.resolve("oldpkg").unwrap().version, "1.0");
    }

    #[test]
    fn broken_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("broken-1.0.dist-info")).unwrap();
        write_dist_info(temp.path(), "healthy", "1.0", &[]);

        let site = SitePackages::new([temp.path()]);
        assert!(site.resolve("broken").is_none());
        assert_eq!(site.distributions().len(), 1);
    }

    #[test]
    fn missing_search_path_is_ignored() {
        let site = SitePackages::new(["/definitely/not/a/real/site-packages"]);
        assert!(site.resolve("anything").is_none());
        assert!(site.distributions().is_empty());
    }

    #[test]
    fn require_distribution_reports_missing() {
        let temp = TempDir::new().unwrap();
        let site = SitePackages::new([temp.path()]);
        let err = site.require_distribution("flask").unwrap_err();
        assert!(matches!(err, DepConflictError::PackageNotFound { .. }));
    }

    #[test]
    fn attaches_marker_environment() {
        let temp = TempDir::new().unwrap();
        write_dist_info(
            temp.path(),
            "demo",
            "1.0",
            &["backport; python_version < \"3.8\"", "core"],
        );
        let env = MarkerEnvironment {
            python_version: Some("3.12".to_string()),
            ..Default::default()
        };

        let site = SitePackages::new([temp.path()]).with_environment(env);
        assert_eq!(site.distribution("demo").unwrap().requires(), ["core"]);
    }
}
