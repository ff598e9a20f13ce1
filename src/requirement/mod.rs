//! PEP 508 dependency requirements.
//!
//! A [`Requirement`] is the structured form of strings such as
//! `requests[security]>=2.0,<3.0; python_version >= "3.8"`. Parsing is strict:
//! anything outside the grammar is reported as a
//! [`RequirementParseError`](crate::error::RequirementParseError) with the
//! byte offset where the parser gave up.
//!
//! # Example
//!
//! ```
//! use depconflict::requirement::Requirement;
//!
//! let req: Requirement = r#"requests ~= 1.0; extra == "instruments""#.parse().unwrap();
//! assert_eq!(req.name, "requests");
//! assert_eq!(req.without_marker().to_string(), "requests~=1.0");
//! ```

pub mod marker;
mod parser;

pub use marker::{
    MarkerEnvironment, MarkerExpression, MarkerOperator, MarkerTree, MarkerValue, MarkerVariable,
};

use crate::error::DepConflictError;
use crate::version::SpecifierSet;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static NAME_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

/// Normalize a project name for comparison: lowercase with every run of
/// `-`, `_` and `.` collapsed to a single `-`.
pub fn canonicalize_name(name: &str) -> String {
    NAME_SEPARATORS.replace_all(name, "-").to_lowercase()
}

/// A parsed dependency requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    /// Project name as written.
    pub name: String,
    /// Requested extras.
    pub extras: BTreeSet<String>,
    /// Acceptable versions; empty means any.
    pub specifier: SpecifierSet,
    /// Direct reference (`name @ url`).
    pub url: Option<String>,
    /// Environment marker after `;`.
    pub marker: Option<MarkerTree>,
}

impl Requirement {
    /// Copy of this requirement with the environment marker dropped.
    pub fn without_marker(&self) -> Requirement {
        Requirement {
            marker: None,
            ..self.clone()
        }
    }

    pub fn canonical_name(&self) -> String {
        canonicalize_name(&self.name)
    }

    /// Whether the marker holds in `env` with the given extra active.
    ///
    /// A requirement without a marker always applies.
    pub fn applies_to(&self, env: &MarkerEnvironment, extra: Option<&str>) -> bool {
        self.marker
            .as_ref()
            .is_none_or(|marker| marker.evaluate(env, extra))
    }
}

impl FromStr for Requirement {
    type Err = DepConflictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parser::parse_requirement(s)?)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;

        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }

        if !self.specifier.is_empty() {
            write!(f, "{}", self.specifier)?;
        }

        if let Some(url) = &self.url {
            write!(f, "@ {}", url)?;
            if self.marker.is_some() {
                f.write_str(" ")?;
            }
        }

        if let Some(marker) = &self.marker {
            write!(f, "; {}", marker)?;
        }

        Ok(())
    }
}
