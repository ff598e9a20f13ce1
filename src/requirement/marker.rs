//! Environment markers: the `; python_version >= "3.8"` tail of a requirement.

use super::canonicalize_name;
use crate::error::DepConflictError;
use crate::version::{Operator, Specifier, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Variables a marker may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerVariable {
    PythonVersion,
    PythonFullVersion,
    OsName,
    SysPlatform,
    PlatformRelease,
    PlatformSystem,
    PlatformVersion,
    PlatformMachine,
    PlatformPythonImplementation,
    ImplementationName,
    ImplementationVersion,
    Extra,
}

impl MarkerVariable {
    /// Look up a variable by name, accepting the legacy dotted spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let variable = match name {
            "python_version" => MarkerVariable::PythonVersion,
            "python_full_version" => MarkerVariable::PythonFullVersion,
            "os_name" | "os.name" => MarkerVariable::OsName,
            "sys_platform" | "sys.platform" => MarkerVariable::SysPlatform,
            "platform_release" => MarkerVariable::PlatformRelease,
            "platform_system" => MarkerVariable::PlatformSystem,
            "platform_version" | "platform.version" => MarkerVariable::PlatformVersion,
            "platform_machine" | "platform.machine" => MarkerVariable::PlatformMachine,
            "platform_python_implementation"
            | "platform.python_implementation"
            | "python_implementation" => MarkerVariable::PlatformPythonImplementation,
            "implementation_name" => MarkerVariable::ImplementationName,
            "implementation_version" => MarkerVariable::ImplementationVersion,
            "extra" => MarkerVariable::Extra,
            _ => return None,
        };
        Some(variable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerVariable::PythonVersion => "python_version",
            MarkerVariable::PythonFullVersion => "python_full_version",
            MarkerVariable::OsName => "os_name",
            MarkerVariable::SysPlatform => "sys_platform",
            MarkerVariable::PlatformRelease => "platform_release",
            MarkerVariable::PlatformSystem => "platform_system",
            MarkerVariable::PlatformVersion => "platform_version",
            MarkerVariable::PlatformMachine => "platform_machine",
            MarkerVariable::PlatformPythonImplementation => "platform_python_implementation",
            MarkerVariable::ImplementationName => "implementation_name",
            MarkerVariable::ImplementationVersion => "implementation_version",
            MarkerVariable::Extra => "extra",
        }
    }
}

/// Values markers are evaluated against.
///
/// Fields left unset are unknown; a comparison involving an unknown value is
/// considered to hold, so requirements are never dropped for lack of
/// information about the target interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerEnvironment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_full_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sys_platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_machine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_python_implementation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_version: Option<String>,
}

impl MarkerEnvironment {
    /// Value of an environment variable; `extra` is never stored here.
    pub fn get(&self, variable: MarkerVariable) -> Option<&str> {
        let value = match variable {
            MarkerVariable::PythonVersion => &self.python_version,
            MarkerVariable::PythonFullVersion => &self.python_full_version,
            MarkerVariable::OsName => &self.os_name,
            MarkerVariable::SysPlatform => &self.sys_platform,
            MarkerVariable::PlatformRelease => &self.platform_release,
            MarkerVariable::PlatformSystem => &self.platform_system,
            MarkerVariable::PlatformVersion => &self.platform_version,
            MarkerVariable::PlatformMachine => &self.platform_machine,
            MarkerVariable::PlatformPythonImplementation => &self.platform_python_implementation,
            MarkerVariable::ImplementationName => &self.implementation_name,
            MarkerVariable::ImplementationVersion => &self.implementation_version,
            MarkerVariable::Extra => return None,
        };
        value.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValue {
    Variable(MarkerVariable),
    Literal(String),
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerValue::Variable(v) => f.write_str(v.as_str()),
            MarkerValue::Literal(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOperator {
    Version(Operator),
    In,
    NotIn,
}

impl fmt::Display for MarkerOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerOperator::Version(op) => f.write_str(op.as_str()),
            MarkerOperator::In => f.write_str("in"),
            MarkerOperator::NotIn => f.write_str("not in"),
        }
    }
}

/// A single `lhs op rhs` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerExpression {
    pub lhs: MarkerValue,
    pub op: MarkerOperator,
    pub rhs: MarkerValue,
}

impl MarkerExpression {
    fn evaluate(&self, env: &MarkerEnvironment, extra: Option<&str>) -> bool {
        let resolve = |value: &MarkerValue| -> Option<String> {
            match value {
                MarkerValue::Literal(s) => Some(s.clone()),
                MarkerValue::Variable(MarkerVariable::Extra) => {
                    Some(extra.unwrap_or_default().to_string())
                }
                MarkerValue::Variable(v) => env.get(*v).map(str::to_string),
            }
        };

        let (Some(mut lhs), Some(mut rhs)) = (resolve(&self.lhs), resolve(&self.rhs)) else {
            return true;
        };

        let is_extra =
            |value: &MarkerValue| matches!(value, MarkerValue::Variable(MarkerVariable::Extra));
        if is_extra(&self.lhs) || is_extra(&self.rhs) {
            lhs = canonicalize_name(&lhs);
            rhs = canonicalize_name(&rhs);
        }

        compare(&lhs, self.op, &rhs)
    }
}

/// Version semantics when `op rhs` is a valid specifier and `lhs` a valid
/// version, plain string comparison otherwise.
fn compare(lhs: &str, op: MarkerOperator, rhs: &str) -> bool {
    let op = match op {
        MarkerOperator::In => return rhs.contains(lhs),
        MarkerOperator::NotIn => return !rhs.contains(lhs),
        MarkerOperator::Version(op) => op,
    };

    let spec = format!("{}{}", op, rhs).parse::<Specifier>();
    if let (Ok(spec), Ok(version)) = (spec, lhs.parse::<Version>()) {
        return spec.contains(&version, Some(true));
    }

    match op {
        Operator::Equal | Operator::Arbitrary => lhs == rhs,
        Operator::NotEqual => lhs != rhs,
        Operator::Less => lhs < rhs,
        Operator::LessEqual => lhs <= rhs,
        Operator::Greater => lhs > rhs,
        Operator::GreaterEqual => lhs >= rhs,
        Operator::Compatible => false,
    }
}

/// Parsed marker expression tree; `and` binds tighter than `or`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerTree {
    Expression(MarkerExpression),
    And(Vec<MarkerTree>),
    Or(Vec<MarkerTree>),
}

impl MarkerTree {
    /// Evaluate against `env`; an absent `extra` compares as the empty string.
    pub fn evaluate(&self, env: &MarkerEnvironment, extra: Option<&str>) -> bool {
        match self {
            MarkerTree::Expression(expr) => expr.evaluate(env, extra),
            MarkerTree::And(terms) => terms.iter().all(|t| t.evaluate(env, extra)),
            MarkerTree::Or(terms) => terms.iter().any(|t| t.evaluate(env, extra)),
        }
    }

    /// Whether any comparison mentions the `extra` variable.
    pub fn references_extra(&self) -> bool {
        match self {
            MarkerTree::Expression(expr) => [&expr.lhs, &expr.rhs]
                .iter()
                .any(|v| matches!(v, MarkerValue::Variable(MarkerVariable::Extra))),
            MarkerTree::And(terms) | MarkerTree::Or(terms) => {
                terms.iter().any(MarkerTree::references_extra)
            }
        }
    }
}

impl FromStr for MarkerTree {
    type Err = DepConflictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::parse_marker(s).map_err(|e| DepConflictError::InvalidMarker {
            marker: s.to_string(),
            message: e.to_string(),
        })
    }
}

impl fmt::Display for MarkerTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerTree::Expression(expr) => write!(f, "{} {} {}", expr.lhs, expr.op, expr.rhs),
            MarkerTree::And(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" and ")?;
                    }
                    if matches!(term, MarkerTree::Or(_)) {
                        write!(f, "({})", term)?;
                    } else {
                        write!(f, "{}", term)?;
                    }
                }
                Ok(())
            }
            MarkerTree::Or(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
        }
    }
}
