//! Core metadata parsing.
//!
//! `METADATA` (wheel installs) and `PKG-INFO` (egg installs) share an
//! email-header format: `Key: value` lines, indented continuation lines, and a
//! free-form body after the first blank line. Egg installs keep their
//! dependencies in a separate `requires.txt`, which
//! [`requires_txt_to_requires_dist`] converts into `Requires-Dist` form.

use super::{Distribution, InstalledPackage};
use crate::error::{DepConflictError, Result};
use crate::requirement::{canonicalize_name, MarkerEnvironment, Requirement};
use std::path::Path;

/// The fields of a distribution's core metadata that dependency checks use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionMetadata {
    pub metadata_version: Option<String>,
    pub name: String,
    pub version: String,
    pub summary: Option<String>,
    /// Raw `Requires-Dist` values, markers included.
    pub requires_dist: Vec<String>,
    pub provides_extra: Vec<String>,
    /// Environment used when evaluating `Requires-Dist` markers.
    pub environment: MarkerEnvironment,
}

impl DistributionMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Add a `Requires-Dist` line.
    pub fn with_requires_dist(mut self, requirement: impl Into<String>) -> Self {
        self.requires_dist.push(requirement.into());
        self
    }

    pub fn with_environment(mut self, environment: MarkerEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Parse `METADATA` / `PKG-INFO` content.
    ///
    /// # Errors
    ///
    /// Returns `MetadataParseError` if `Name` or `Version` is missing.
    pub fn parse(content: &str, source_path: &Path) -> Result<Self> {
        let mut metadata = DistributionMetadata::default();
        let mut name = None;
        let mut version = None;

        for (key, value) in parse_headers(content) {
            match key.to_ascii_lowercase().as_str() {
                "metadata-version" => metadata.metadata_version = Some(value),
                "name" => name = Some(value),
                "version" => version = Some(value),
                "summary" => metadata.summary = Some(value),
                "requires-dist" => metadata.requires_dist.push(value),
                "provides-extra" => metadata.provides_extra.push(value),
                _ => {}
            }
        }

        metadata.name = name.ok_or_else(|| DepConflictError::MetadataParseError {
            path: source_path.to_path_buf(),
            message: "missing Name field".to_string(),
        })?;
        metadata.version = version.ok_or_else(|| DepConflictError::MetadataParseError {
            path: source_path.to_path_buf(),
            message: "missing Version field".to_string(),
        })?;

        Ok(metadata)
    }

    pub fn installed(&self) -> InstalledPackage {
        InstalledPackage::new(&self.name, &self.version)
    }

    fn parsed_requirements(&self) -> impl Iterator<Item = (&str, Requirement)> {
        self.requires_dist
            .iter()
            .filter_map(move |raw| match raw.parse::<Requirement>() {
                Ok(req) => Some((raw.as_str(), req)),
                Err(e) => {
                    tracing::warn!(
                        "Skipping unparseable Requires-Dist of {}: \"{}\" - {}",
                        self.name,
                        raw,
                        e
                    );
                    None
                }
            })
    }
}

impl Distribution for DistributionMetadata {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn requires(&self) -> Vec<String> {
        self.parsed_requirements()
            .filter(|(_, req)| req.applies_to(&self.environment, None))
            .map(|(raw, _)| raw.to_string())
            .collect()
    }

    /// Lines that do not parse but name `extra` in their marker are kept
    /// as written so the conflict scan reports them.
    fn requires_extra(&self, extra: &str) -> Vec<String> {
        self.requires_dist
            .iter()
            .filter(|raw| match raw.parse::<Requirement>() {
                Ok(req) => {
                    req.applies_to(&self.environment, Some(extra))
                        && !req.applies_to(&self.environment, None)
                }
                Err(e) => {
                    let gated = marker_mentions_extra(raw, extra);
                    if !gated {
                        tracing::warn!(
                            "Skipping unparseable Requires-Dist of {}: \"{}\" - {}",
                            self.name,
                            raw,
                            e
                        );
                    }
                    gated
                }
            })
            .cloned()
            .collect()
    }
}

/// Whether the marker part of an unparsed line compares `extra` to `name`.
fn marker_mentions_extra(raw: &str, name: &str) -> bool {
    raw.split_once(';').is_some_and(|(_, marker)| {
        marker.contains("extra") && canonicalize_name(marker).contains(&canonicalize_name(name))
    })
}

/// Split email-style headers into `(key, value)` pairs, in order.
///
/// Stops at the first blank line. Continuation lines are joined to the
/// previous value with a newline.
pub fn parse_headers(content: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) => headers.push((key.trim().to_string(), value.trim().to_string())),
            None => {
                tracing::debug!("Ignoring malformed metadata header line: {}", line);
            }
        }
    }

    headers
}

/// Convert egg-info `requires.txt` sections into `Requires-Dist` strings.
///
/// `[extra]`, `[:marker]` and `[extra:marker]` section headers become
/// environment markers on every requirement in the section.
pub fn requires_txt_to_requires_dist(content: &str) -> Vec<String> {
    let mut section: Option<String> = None;
    let mut requirements = Vec::new();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = Some(name.trim().to_string());
            continue;
        }

        let marker = section_marker(section.as_deref());
        let space = if line.contains('@') && !marker.is_empty() {
            " "
        } else {
            ""
        };
        requirements.push(format!("{}{}{}", line, space, marker));
    }

    requirements
}

fn section_marker(section: Option<&str>) -> String {
    let section = section.unwrap_or_default();
    let (extra, markers) = match section.split_once(':') {
        Some((extra, markers)) => (extra.trim(), markers.trim()),
        None => (section, ""),
    };

    let mut conditions = Vec::new();
    if !markers.is_empty() {
        if extra.is_empty() {
            conditions.push(markers.to_string());
        } else {
            conditions.push(format!("({})", markers));
        }
    }
    if !extra.is_empty() {
        conditions.push(format!("extra == \"{}\"", extra));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("; {}", conditions.join(" and "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = "\
Metadata-Version: 2.1
Name: opentelemetry-instrumentation-flask
Version: 0.41b0
Summary: Flask instrumentation for OpenTelemetry
Requires-Dist: opentelemetry-api ~= 1.12
Requires-Dist: packaging >= 21.0
Requires-Dist: importlib-metadata >= 4.0; python_version < \"3.10\"
Provides-Extra: instruments
Requires-Dist: flask >= 1.0, < 3.0; extra == \"instruments\"
Requires-Dist: markupsafe == 2.1.2; extra == \"instruments\"
Provides-Extra: test
Requires-Dist: pytest; extra == \"test\"

Long description with: a colon
Requires-Dist: not-a-header
";

    fn parsed() -> DistributionMetadata {
        DistributionMetadata::parse(METADATA, Path::new("METADATA")).unwrap()
    }

    #[test]
    fn parses_header_fields() {
        let meta = parsed();
        assert_eq!(meta.metadata_version.as_deref(), Some("2.1"));
        assert_eq!(meta.name, "opentelemetry-instrumentation-flask");
        assert_eq!(meta.version, "0.41b0");
        assert_eq!(meta.requires_dist.len(), 6);
        assert_eq!(meta.provides_extra, ["instruments", "test"]);
    }

    #[test]
    fn body_is_not_parsed_as_headers() {
        assert!(!parsed()
            .requires_dist
            .iter()
            .any(|r| r.contains("not-a-header")));
    }

    #[test]
    fn missing_name_is_an_error() {
        let err =
            DistributionMetadata::parse("Version: 1.0\n", Path::new("/x/METADATA")).unwrap_err();
        assert!(matches!(err, DepConflictError::MetadataParseError { .. }));
        assert!(err.to_string().contains("missing Name"));
    }

    #[test]
    fn requires_returns_unconditional_requirements() {
        let main = parsed().requires();
        assert_eq!(
            main,
            [
                "opentelemetry-api ~= 1.12",
                "packaging >= 21.0",
                "importlib-metadata >= 4.0; python_version < \"3.10\"",
            ]
        );
    }

    #[test]
    fn requires_respects_environment() {
        let env = MarkerEnvironment {
            python_version: Some("3.11".to_string()),
            ..Default::default()
        };
        let main = parsed().with_environment(env).requires();
        assert_eq!(main.len(), 2);
    }

    #[test]
    fn requires_extra_returns_only_gated_requirements() {
        let instruments = parsed().requires_extra("instruments");
        assert_eq!(
            instruments,
            [
                "flask >= 1.0, < 3.0; extra == \"instruments\"",
                "markupsafe == 2.1.2; extra == \"instruments\"",
            ]
        );
        assert_eq!(parsed().requires_extra("test"), ["pytest; extra == \"test\""]);
        assert!(parsed().requires_extra("missing").is_empty());
    }

    #[test]
    fn unparseable_requirements_are_skipped() {
        let meta = DistributionMetadata::new("demo", "1.0")
            .with_requires_dist("good>=1.0")
            .with_requires_dist("bad>=>1.0");
        assert_eq!(meta.requires(), ["good>=1.0"]);
    }

    #[test]
    fn malformed_extra_lines_are_kept_for_reporting() {
        let meta = DistributionMetadata::new("demo", "1.0")
            .with_requires_dist("bad>=>1.0")
            .with_requires_dist(r#"requests>=>2; extra == "instruments""#)
            .with_requires_dist(r#"pytest>=>7; extra == "test""#);

        assert!(meta.requires().is_empty());
        assert_eq!(
            meta.requires_extra("instruments"),
            [r#"requests>=>2; extra == "instruments""#]
        );
        assert_eq!(meta.requires_extra("test"), [r#"pytest>=>7; extra == "test""#]);
    }

    #[test]
    fn headers_join_continuation_lines() {
        let headers = parse_headers("Summary: first\n  second\nName: x\n");
        assert_eq!(headers[0], ("Summary".to_string(), "first\nsecond".to_string()));
        assert_eq!(headers[1], ("Name".to_string(), "x".to_string()));
    }

    #[test]
    fn converts_requires_txt_sections() {
        let converted = requires_txt_to_requires_dist(
            "\
wrapt>=1.0

# comment
[instruments]
requests~=2.0

[:python_version < \"3.8\"]
typing-extensions

[test:sys_platform == \"win32\"]
pywin32
pkg @ https://example.com/pkg.whl
",
        );
        assert_eq!(
            converted,
            [
                "wrapt>=1.0",
                "requests~=2.0; extra == \"instruments\"",
                "typing-extensions; python_version < \"3.8\"",
                "pywin32; (sys_platform == \"win32\") and extra == \"test\"",
                "pkg @ https://example.com/pkg.whl ; (sys_platform == \"win32\") and extra == \"test\"",
            ]
        );
    }

    #[test]
    fn converted_requires_txt_round_trips_through_parser() {
        let meta = DistributionMetadata {
            requires_dist: requires_txt_to_requires_dist("base\n[instruments]\nredis>=2.6\n"),
            ..DistributionMetadata::new("demo", "1.0")
        };
        assert_eq!(meta.requires(), ["base"]);
        assert_eq!(meta.requires_extra("instruments"), ["redis>=2.6; extra == \"instruments\""]);
    }
}
