//! Fail-fast requirement scan.
//!
//! The [`ConflictChecker`] walks requirement strings in order and stops at
//! the first one that is malformed, names a package that is not installed,
//! or is not satisfied by the installed version. Nothing after that point is
//! parsed or resolved.

use super::DependencyConflict;
use crate::metadata::{Distribution, PackageResolver};
use crate::requirement::Requirement;
use crate::version::Version;
use std::collections::HashSet;

/// Extra under which instrumentation packages declare the libraries they instrument.
pub const INSTRUMENTS_EXTRA: &str = "instruments";

/// Checks requirement strings against a [`PackageResolver`].
///
/// # Example
///
/// ```
/// use depconflict::conflict::ConflictChecker;
/// use depconflict::metadata::InstalledPackages;
///
/// let installed = InstalledPackages::new().with_package("flask", "2.1.0");
/// let checker = ConflictChecker::new(&installed);
///
/// assert!(checker.check(["flask>=2.0"]).is_none());
///
/// let conflict = checker.check(["flask>=1.0,<2.0"]).unwrap();
/// assert_eq!(conflict.found.as_deref(), Some("flask 2.1.0"));
/// ```
pub struct ConflictChecker<'a, R: PackageResolver + ?Sized> {
    resolver: &'a R,
    prereleases: Option<bool>,
}

impl<'a, R: PackageResolver + ?Sized> ConflictChecker<'a, R> {
    /// Create a checker that accepts pre-releases only when a specifier names one.
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            prereleases: None,
        }
    }

    /// Override the pre-release policy; `None` restores the default.
    pub fn with_prereleases(mut self, prereleases: Option<bool>) -> Self {
        self.prereleases = prereleases;
        self
    }

    /// Check requirement strings in order, returning the first conflict.
    pub fn check<I, S>(&self, deps: I) -> Option<DependencyConflict>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        deps.into_iter().find_map(|dep| self.check_one(dep.as_ref()))
    }

    /// Check the `instruments` requirements of `dist` that its main
    /// requirements do not already cover.
    pub fn check_distribution<D: Distribution + ?Sized>(
        &self,
        dist: &D,
    ) -> Option<DependencyConflict> {
        let deps = instrumentation_requirements(dist);
        tracing::debug!(
            "Checking {} instrumentation requirement(s) of {} {}",
            deps.len(),
            dist.name(),
            dist.version()
        );
        self.check(deps)
    }

    fn check_one(&self, dep: &str) -> Option<DependencyConflict> {
        let req = match dep.parse::<Requirement>() {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(
                    "error parsing dependency, reporting as a conflict: \"{}\" - {}",
                    dep,
                    e
                );
                return Some(DependencyConflict::unresolved(dep));
            }
        };

        let Some(installed) = self.resolver.resolve(&req.name) else {
            tracing::debug!("{} is not installed", req.name);
            return Some(DependencyConflict::unresolved(dep));
        };

        let satisfied = match installed.version.parse::<Version>() {
            Ok(version) => req.specifier.contains_with(&version, self.prereleases),
            Err(e) => {
                tracing::debug!("Installed {} has unusable version: {}", installed.name, e);
                false
            }
        };

        if satisfied {
            None
        } else {
            Some(DependencyConflict::new(dep, Some(installed.to_string())))
        }
    }
}

/// Marker-free `instruments` requirements of `dist` not present among its
/// main requirements.
///
/// Strings that do not parse are passed through untouched so the scan
/// reports them.
pub fn instrumentation_requirements<D: Distribution + ?Sized>(dist: &D) -> Vec<String> {
    let main: HashSet<String> = dist.requires().iter().map(|raw| canonical(raw)).collect();

    dist.requires_extra(INSTRUMENTS_EXTRA)
        .into_iter()
        .map(|raw| match raw.parse::<Requirement>() {
            Ok(req) => req.without_marker().to_string(),
            Err(_) => raw,
        })
        .filter(|dep| !main.contains(dep.trim()))
        .collect()
}

fn canonical(raw: &str) -> String {
    raw.parse::<Requirement>()
        .map(|req| req.to_string())
        .unwrap_or_else(|_| raw.trim().to_string())
}

/// Check `deps` in order against `resolver`, returning the first conflict.
pub fn dependency_conflicts<R, I, S>(resolver: &R, deps: I) -> Option<DependencyConflict>
where
    R: PackageResolver + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ConflictChecker::new(resolver).check(deps)
}

/// Check the `instruments` requirements of `dist` against `resolver`.
pub fn dist_dependency_conflicts<R, D>(resolver: &R, dist: &D) -> Option<DependencyConflict>
where
    R: PackageResolver + ?Sized,
    D: Distribution + ?Sized,
{
    ConflictChecker::new(resolver).check_distribution(dist)
}
