//! Version specifiers (`>=1.0`, `~=2.2`, `==1.4.*`) and comma-joined sets.

use super::Version;
use crate::error::{DepConflictError, Result};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a version specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `~=`
    Compatible,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `===`
    Arbitrary,
}

/// Longest spellings first so `===` wins over `==` and `<=` over `<`.
const OPERATORS: &[(&str, Operator)] = &[
    ("===", Operator::Arbitrary),
    ("~=", Operator::Compatible),
    ("==", Operator::Equal),
    ("!=", Operator::NotEqual),
    ("<=", Operator::LessEqual),
    (">=", Operator::GreaterEqual),
    ("<", Operator::Less),
    (">", Operator::Greater),
];

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Compatible => "~=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Arbitrary => "===",
        }
    }

    /// Match an operator at the start of `s`, returning it and its length.
    pub fn parse_prefix(s: &str) -> Option<(Operator, usize)> {
        OPERATORS
            .iter()
            .find(|(text, _)| s.starts_with(text))
            .map(|(text, op)| (*op, text.len()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single operator + version clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
    operator: Operator,
    text: String,
    version: Option<Version>,
    wildcard: bool,
}

fn invalid(specifier: &str, message: &str) -> DepConflictError {
    DepConflictError::InvalidSpecifier {
        specifier: specifier.to_string(),
        message: message.to_string(),
    }
}

impl Specifier {
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The version as written, including any `.*` suffix.
    pub fn version_text(&self) -> &str {
        &self.text
    }

    /// Parsed version; `None` only for `===` clauses that are not PEP 440.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether this clause explicitly opts into pre-releases.
    pub fn prereleases(&self) -> bool {
        if self.operator == Operator::NotEqual {
            return false;
        }
        self.version
            .as_ref()
            .is_some_and(|version| version.is_prerelease())
    }

    /// Test `version` against this clause.
    ///
    /// `prereleases` overrides the clause's own pre-release policy.
    pub fn contains(&self, version: &Version, prereleases: Option<bool>) -> bool {
        let prereleases = prereleases.unwrap_or_else(|| self.prereleases());
        if version.is_prerelease() && !prereleases {
            return false;
        }
        self.matches(version)
    }

    fn matches(&self, prospective: &Version) -> bool {
        if self.operator == Operator::Arbitrary {
            return prospective.to_string().eq_ignore_ascii_case(&self.text);
        }

        let Some(spec) = &self.version else {
            return false;
        };

        match self.operator {
            Operator::Compatible => {
                let prefix = &spec.release()[..spec.release().len() - 1];
                prospective.public() >= *spec && prefix_matches(prospective, spec.epoch(), prefix)
            }
            Operator::Equal => self.equal(prospective, spec),
            Operator::NotEqual => !self.equal(prospective, spec),
            Operator::LessEqual => prospective.public() <= *spec,
            Operator::GreaterEqual => prospective.public() >= *spec,
            Operator::Less => {
                if prospective >= spec {
                    return false;
                }
                // <1.0 must not admit 1.0rc1
                spec.is_prerelease()
                    || !prospective.is_prerelease()
                    || prospective.base_version() != spec.base_version()
            }
            Operator::Greater => {
                if prospective <= spec {
                    return false;
                }
                let same_base = prospective.base_version() == spec.base_version();
                if !spec.is_postrelease() && prospective.is_postrelease() && same_base {
                    return false;
                }
                prospective.local().is_none() || !same_base
            }
            Operator::Arbitrary => false,
        }
    }

    fn equal(&self, prospective: &Version, spec: &Version) -> bool {
        if self.wildcard {
            prefix_matches(prospective, spec.epoch(), spec.release())
        } else if spec.local().is_none() {
            prospective.public() == *spec
        } else {
            prospective == spec
        }
    }
}

/// Release-prefix match with the prospective release zero-padded.
fn prefix_matches(prospective: &Version, epoch: u64, prefix: &[u64]) -> bool {
    prospective.epoch() == epoch
        && prefix
            .iter()
            .enumerate()
            .all(|(i, n)| prospective.release().get(i).copied().unwrap_or(0) == *n)
}

impl FromStr for Specifier {
    type Err = DepConflictError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (operator, len) = Operator::parse_prefix(trimmed)
            .ok_or_else(|| invalid(s, "expected one of ~= == != <= >= < > ==="))?;
        let text = trimmed[len..].trim();

        if text.is_empty() {
            return Err(invalid(s, "missing version"));
        }
        if text.contains(char::is_whitespace) {
            return Err(invalid(s, "version must not contain whitespace"));
        }

        if operator == Operator::Arbitrary {
            return Ok(Specifier {
                operator,
                text: text.to_string(),
                version: text.parse().ok(),
                wildcard: false,
            });
        }

        let wildcard = text.ends_with(".*");
        let version_part = if wildcard {
            &text[..text.len() - 2]
        } else {
            text
        };
        let version: Version = version_part
            .parse()
            .map_err(|_| invalid(s, "invalid version"))?;

        if wildcard {
            if !matches!(operator, Operator::Equal | Operator::NotEqual) {
                return Err(invalid(s, "wildcards are only allowed with == and !="));
            }
            if version.pre().is_some()
                || version.post().is_some()
                || version.dev().is_some()
                || version.local().is_some()
            {
                return Err(invalid(
                    s,
                    "wildcards may only follow the release segment",
                ));
            }
        }

        if version.local().is_some() && !matches!(operator, Operator::Equal | Operator::NotEqual)
        {
            return Err(invalid(s, "local versions are only allowed with == and !="));
        }

        if operator == Operator::Compatible && version.release().len() < 2 {
            return Err(invalid(s, "~= needs at least two release segments"));
        }

        Ok(Specifier {
            operator,
            text: text.to_string(),
            version: Some(version),
            wildcard,
        })
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.text)
    }
}

/// A conjunction of specifiers, e.g. `>=1.0,<2.0`.
///
/// Clauses are kept sorted by their rendering with duplicates removed, so
/// two sets that accept the same clauses render identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SpecifierSet {
    specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.specifiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.specifiers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Specifier> {
        self.specifiers.iter()
    }

    /// `None` for an empty set, otherwise whether any clause names a pre-release.
    pub fn prereleases(&self) -> Option<bool> {
        if self.specifiers.is_empty() {
            None
        } else {
            Some(self.specifiers.iter().any(Specifier::prereleases))
        }
    }

    /// Test `version` with the set's own pre-release policy.
    pub fn contains(&self, version: &Version) -> bool {
        self.contains_with(version, None)
    }

    /// Test `version`, optionally overriding the pre-release policy.
    ///
    /// Without an override, an empty set rejects pre-releases.
    pub fn contains_with(&self, version: &Version, prereleases: Option<bool>) -> bool {
        let prereleases = prereleases.or_else(|| self.prereleases()).unwrap_or(false);
        if version.is_prerelease() && !prereleases {
            return false;
        }
        self.specifiers
            .iter()
            .all(|spec| spec.contains(version, Some(prereleases)))
    }
}

impl FromIterator<Specifier> for SpecifierSet {
    fn from_iter<I: IntoIterator<Item = Specifier>>(iter: I) -> Self {
        let mut specifiers: Vec<Specifier> = iter.into_iter().collect();
        specifiers.sort_by_key(|spec| spec.to_string());
        specifiers.dedup_by(|a, b| a.to_string() == b.to_string());
        Self { specifiers }
    }
}

impl FromStr for SpecifierSet {
    type Err = DepConflictError;

    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Specifier::from_str)
            .collect()
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn spec(s: &str) -> Specifier {
        s.parse().unwrap()
    }

    fn set(s: &str) -> SpecifierSet {
        s.parse().unwrap()
    }

    #[test]
    fn parses_operators_longest_first() {
        assert_eq!(spec("===1.0").operator(), Operator::Arbitrary);
        assert_eq!(spec("==1.0").operator(), Operator::Equal);
        assert_eq!(spec("<=1.0").operator(), Operator::LessEqual);
        assert_eq!(spec("<1.0").operator(), Operator::Less);
        assert_eq!(spec("~= 1.0").to_string(), "~=1.0");
    }

    #[test]
    fn rejects_misplaced_wildcards_and_locals() {
        for bad in [
            ">=1.*",
            "~=1.0.*",
            "==1.0rc1.*",
            ">=1.0+local",
            "~=1",
            "=>1.0",
            ">=",
            "1.0",
        ] {
            assert!(bad.parse::<Specifier>().is_err(), "{bad:?} should be rejected");
        }
        assert!("==1.0+local".parse::<Specifier>().is_ok());
        assert!("!=1.*".parse::<Specifier>().is_ok());
    }

    #[test]
    fn keeps_written_version_text() {
        let s = spec("== 1.4.*");
        assert!(s.is_wildcard());
        assert_eq!(s.version_text(), "1.4.*");
        assert_eq!(s.version(), Some(&v("1.4")));

        let s = spec("===1.0-Custom");
        assert!(!s.is_wildcard());
        assert_eq!(s.version_text(), "1.0-Custom");
    }

    #[test]
    fn compatible_release() {
        let s = spec("~=2.2");
        assert!(s.contains(&v("2.2"), None));
        assert!(s.contains(&v("2.9.1"), None));
        assert!(!s.contains(&v("3.0"), None));
        assert!(!s.contains(&v("2.1"), None));

        let s = spec("~=1.4.5");
        assert!(s.contains(&v("1.4.9"), None));
        assert!(!s.contains(&v("1.5.0"), None));
    }

    #[test]
    fn equality_ignores_local_unless_specified() {
        assert!(spec("==1.0").contains(&v("1.0+ubuntu1"), None));
        assert!(spec("==1.0+ubuntu1").contains(&v("1.0+ubuntu1"), None));
        assert!(!spec("==1.0+ubuntu1").contains(&v("1.0+ubuntu2"), None));
        assert!(spec("==1.0").contains(&v("1.0.0"), None));
    }

    #[test]
    fn wildcard_prefix_matching_pads_release() {
        let s = spec("==1.0.*");
        assert!(s.contains(&v("1.0"), None));
        assert!(s.contains(&v("1"), None));
        assert!(s.contains(&v("1.0.7"), None));
        assert!(!s.contains(&v("1.1"), None));
        assert!(spec("!=1.0.*").contains(&v("1.1"), None));
        assert!(!spec("!=1.0.*").contains(&v("1.0.3"), None));
    }

    #[test]
    fn exclusive_ordering_skips_same_base_pre_and_post() {
        assert!(!spec("<1.0").contains(&v("1.0rc1"), Some(true)));
        assert!(spec("<1.0").contains(&v("0.9rc1"), Some(true)));
        assert!(spec("<1.0rc2").contains(&v("1.0rc1"), None));
        assert!(!spec(">1.0").contains(&v("1.0.post1"), None));
        assert!(!spec(">1.0").contains(&v("1.0+local"), None));
        assert!(spec(">1.0").contains(&v("1.0.1"), None));
        assert!(spec(">1.0.post1").contains(&v("1.0.post2"), None));
    }

    #[test]
    fn inclusive_ordering_uses_public_version() {
        assert!(spec("<=1.0").contains(&v("1.0+local"), None));
        assert!(spec(">=1.0").contains(&v("1.0+local"), None));
    }

    #[test]
    fn arbitrary_equality_is_string_based() {
        assert!(spec("===1.0").contains(&v("1.0"), None));
        assert!(!spec("===1.0").contains(&v("1.0.0"), None));
        assert!(spec("===foobar").version().is_none());
    }

    #[test]
    fn prereleases_rejected_unless_named() {
        assert!(!spec(">=1.0").contains(&v("2.0b1"), None));
        assert!(spec(">=1.0b1").contains(&v("2.0b1"), None));
        assert!(spec(">=1.0").contains(&v("2.0b1"), Some(true)));
        assert!(!spec("!=1.0b1").prereleases());
    }

    #[test]
    fn set_sorts_and_dedups() {
        let s = set(">=1.0, <2.0,>=1.0");
        assert_eq!(s.len(), 2);
        assert_eq!(s.to_string(), "<2.0,>=1.0");
        assert_eq!(set(">= 1.0,"), set(">=1.0"));
    }

    #[test]
    fn set_contains_all_clauses() {
        let s = set(">=1.0,<2.0");
        assert!(s.contains(&v("1.5.0")));
        assert!(!s.contains(&v("2.1.0")));
        assert!(!s.contains(&v("0.9")));
    }

    #[test]
    fn set_prerelease_policy() {
        let s = set(">=1.0,<2.0");
        assert!(!s.contains(&v("1.5rc1")));
        assert!(s.contains_with(&v("1.5rc1"), Some(true)));
        assert!(set(">=1.0rc1,<2.0").contains(&v("1.5rc1")));
    }

    #[test]
    fn empty_set_accepts_finals_only() {
        let s = SpecifierSet::new();
        assert!(s.is_empty());
        assert_eq!(s.prereleases(), None);
        assert!(s.contains(&v("0.0.1")));
        assert!(!s.contains(&v("1.0.dev1")));
        assert!(s.contains_with(&v("1.0.dev1"), Some(true)));
    }
}
