//! PEP 440 versions and version specifiers.
//!
//! [`Version`] parses and orders release strings the way Python packaging
//! tools do, so that `1.0 == 1.0.0`, `1.0.dev0 < 1.0a1 < 1.0 < 1.0.post1`,
//! and local labels (`1.0+ubuntu1`) sort after their public version.
//!
//! # Example
//!
//! ```
//! use depconflict::version::{SpecifierSet, Version};
//!
//! let installed: Version = "1.5.0".parse().unwrap();
//! let range: SpecifierSet = ">=1.0,<2.0".parse().unwrap();
//! assert!(range.contains(&installed));
//! ```

mod specifier;

pub use specifier::{Operator, Specifier, SpecifierSet};

use crate::error::{DepConflictError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*
        v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?P<pre>
            [-_.]?
            (?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)
            [-_.]?
            (?P<pre_n>[0-9]+)?
        )?
        (?P<post>
            (?:-(?P<post_n1>[0-9]+))
            |
            (?:
                [-_.]?
                (?P<post_l>post|rev|r)
                [-_.]?
                (?P<post_n2>[0-9]+)?
            )
        )?
        (?P<dev>
            [-_.]?
            (?P<dev_l>dev)
            [-_.]?
            (?P<dev_n>[0-9]+)?
        )?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$",
    )
    .unwrap()
});

/// Pre-release phase, normalized from its accepted spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreKind {
    /// `a`, `alpha`
    Alpha,
    /// `b`, `beta`
    Beta,
    /// `rc`, `c`, `pre`, `preview`
    Rc,
}

impl PreKind {
    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => PreKind::Alpha,
            "b" | "beta" => PreKind::Beta,
            _ => PreKind::Rc,
        }
    }
}

impl fmt::Display for PreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PreKind::Alpha => "a",
            PreKind::Beta => "b",
            PreKind::Rc => "rc",
        };
        f.write_str(label)
    }
}

/// One dot-separated piece of a local version label.
///
/// Numeric segments sort above alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocalSegment {
    Text(String),
    Number(u64),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSegment::Text(s) => f.write_str(s),
            LocalSegment::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A parsed PEP 440 version.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<Vec<LocalSegment>>,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum PreKey {
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum DevKey {
    Dev(u64),
    Final,
}

type SortKey<'a> = (
    u64,
    &'a [u64],
    PreKey,
    Option<u64>,
    DevKey,
    Option<&'a [LocalSegment]>,
);

impl Version {
    /// Create a final release from its numeric components.
    pub fn from_release(release: impl Into<Vec<u64>>) -> Self {
        Self {
            epoch: 0,
            release: release.into(),
            pre: None,
            post: None,
            dev: None,
            local: None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre(&self) -> Option<(PreKind, u64)> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    pub fn local(&self) -> Option<&[LocalSegment]> {
        self.local.as_deref()
    }

    /// Alpha, beta, release candidate and dev releases are all pre-releases.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn is_devrelease(&self) -> bool {
        self.dev.is_some()
    }

    /// The version without its local label.
    pub fn public(&self) -> Version {
        Version {
            local: None,
            ..self.clone()
        }
    }

    /// Epoch and release segment only.
    pub fn base_version(&self) -> Version {
        Version {
            epoch: self.epoch,
            ..Version::from_release(self.release.clone())
        }
    }

    fn sort_key(&self) -> SortKey<'_> {
        let mut end = self.release.len();
        while end > 0 && self.release[end - 1] == 0 {
            end -= 1;
        }

        let pre = match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (None, _, _) => PreKey::Final,
            (Some((kind, n)), _, _) => PreKey::Pre(kind, n),
        };

        let dev = match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Final,
        };

        (
            self.epoch,
            &self.release[..end],
            pre,
            self.post,
            dev,
            self.local.as_deref(),
        )
    }
}

fn parse_number(text: &str, input: &str) -> Result<u64> {
    text.parse().map_err(|_| DepConflictError::InvalidVersion {
        version: input.to_string(),
    })
}

impl FromStr for Version {
    type Err = DepConflictError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(s)
            .ok_or_else(|| DepConflictError::InvalidVersion {
                version: s.to_string(),
            })?;

        let epoch = match caps.name("epoch") {
            Some(m) => parse_number(m.as_str(), s)?,
            None => 0,
        };

        let release = caps["release"]
            .split('.')
            .map(|part| parse_number(part, s))
            .collect::<Result<Vec<_>>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let n = match caps.name("pre_n") {
                    Some(m) => parse_number(m.as_str(), s)?,
                    None => 0,
                };
                Some((PreKind::from_label(label.as_str()), n))
            }
            None => None,
        };

        let post = if caps.name("post").is_some() {
            match caps.name("post_n1").or_else(|| caps.name("post_n2")) {
                Some(m) => Some(parse_number(m.as_str(), s)?),
                None => Some(0),
            }
        } else {
            None
        };

        let dev = if caps.name("dev").is_some() {
            match caps.name("dev_n") {
                Some(m) => Some(parse_number(m.as_str(), s)?),
                None => Some(0),
            }
        } else {
            None
        };

        let local = caps.name("local").map(|m| {
            m.as_str()
                .split(['-', '_', '.'])
                .map(|seg| match seg.parse::<u64>() {
                    Ok(n) if seg.bytes().all(|b| b.is_ascii_digit()) => LocalSegment::Number(n),
                    _ => LocalSegment::Text(seg.to_ascii_lowercase()),
                })
                .collect()
        });

        Ok(Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }

        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        f.write_str(&release.join("."))?;

        if let Some((kind, n)) = self.pre {
            write!(f, "{}{}", kind, n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        if let Some(local) = &self.local {
            let segments: Vec<String> = local.iter().map(|s| s.to_string()).collect();
            write!(f, "+{}", segments.join("."))?;
        }
        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn parses_plain_release() {
        let version = v("1.2.3");
        assert_eq!(version.release(), &[1, 2, 3]);
        assert_eq!(version.epoch(), 0);
        assert!(!version.is_prerelease());
        assert!(version.local().is_none());
    }

    #[test]
    fn parses_full_grammar() {
        let version = v("2!1.0rc2.post3.dev4+ubuntu.1");
        assert_eq!(version.epoch(), 2);
        assert_eq!(version.pre(), Some((PreKind::Rc, 2)));
        assert_eq!(version.post(), Some(3));
        assert_eq!(version.dev(), Some(4));
        assert_eq!(
            version.local(),
            Some(
                &[
                    LocalSegment::Text("ubuntu".to_string()),
                    LocalSegment::Number(1)
                ][..]
            )
        );
    }

    #[test]
    fn normalizes_alternate_spellings() {
        assert_eq!(v("1.0alpha1").to_string(), "1.0a1");
        assert_eq!(v("1.0-beta.2").to_string(), "1.0b2");
        assert_eq!(v("1.0c3").to_string(), "1.0rc3");
        assert_eq!(v("1.0preview").to_string(), "1.0rc0");
        assert_eq!(v("1.0-1").to_string(), "1.0.post1");
        assert_eq!(v("1.0.rev").to_string(), "1.0.post0");
        assert_eq!(v("1.0-dev").to_string(), "1.0.dev0");
        assert_eq!(v("V1.0").to_string(), "1.0");
        assert_eq!(v("  1.0  ").to_string(), "1.0");
        assert_eq!(v("1.0+Ubuntu-1").to_string(), "1.0+ubuntu.1");
    }

    #[test]
    fn rejects_invalid_versions() {
        for bad in ["", "abc", "1.0.", "1..0", "1.0+", "1.0 2", "french toast"] {
            assert!(bad.parse::<Version>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn trailing_zeros_are_insignificant() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert_ne!(v("1.0.1"), v("1.0"));
    }

    #[test]
    fn orders_release_phases() {
        let ordered = [
            "1.0.dev0",
            "1.0a1.dev1",
            "1.0a1",
            "1.0a2",
            "1.0b1",
            "1.0rc1",
            "1.0",
            "1.0+local",
            "1.0.post1.dev1",
            "1.0.post1",
            "1.1.dev1",
            "1.1",
            "1!0.1",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn local_numeric_segments_sort_above_text() {
        assert!(v("1.0+abc") < v("1.0+1"));
        assert!(v("1.0+1") < v("1.0+2"));
        assert!(v("1.0+1") < v("1.0+1.0"));
    }

    #[test]
    fn public_and_base_version_drop_suffixes() {
        let version = v("1!2.3rc1.post2+local");
        assert_eq!(version.public().to_string(), "1!2.3rc1.post2");
        assert_eq!(version.base_version().to_string(), "1!2.3");
    }

    #[test]
    fn release_flags() {
        assert!(v("1.0.dev1").is_devrelease());
        assert!(v("1.0.dev1").is_prerelease());
        assert!(v("1.0b1").is_prerelease());
        assert!(!v("1.0.post1").is_prerelease());
        assert!(v("1.0.post1").is_postrelease());
    }

    #[test]
    fn equal_versions_hash_equally() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(v("2.0"));
        assert!(set.contains(&v("2.0.0")));
    }
}
