//! Typed flag values.

use crate::types::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a permission-style flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateValue {
    Allow,
    Deny,
}

impl StateValue {
    /// Combines two opinions; DENY wins over ALLOW, anything wins over nothing.
    pub fn combine(a: Option<StateValue>, b: Option<StateValue>) -> Option<StateValue> {
        match (a, b) {
            (Some(StateValue::Deny), _) | (_, Some(StateValue::Deny)) => Some(StateValue::Deny),
            (Some(StateValue::Allow), _) | (_, Some(StateValue::Allow)) => Some(StateValue::Allow),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StateValue::Allow => "allow",
            StateValue::Deny => "deny",
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagKind {
    State,
    Boolean,
    String,
    Integer,
    Double,
    Vector,
    /// One of a fixed list of lowercase names.
    Enum(&'static [&'static str]),
    /// Unordered collection of elements of the inner kind.
    Set(Box<FlagKind>),
}

impl FlagKind {
    pub fn name(&self) -> String {
        match self {
            FlagKind::State => "state".into(),
            FlagKind::Boolean => "boolean".into(),
            FlagKind::String => "string".into(),
            FlagKind::Integer => "integer".into(),
            FlagKind::Double => "double".into(),
            FlagKind::Vector => "vector".into(),
            FlagKind::Enum(_) => "enum".into(),
            FlagKind::Set(inner) => format!("set<{}>", inner.name()),
        }
    }
}

/// A value stored on a region for some flag.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    State(StateValue),
    Boolean(bool),
    String(String),
    Integer(i64),
    Double(f64),
    Vector(Vec3),
    Enum(String),
    Set(Vec<FlagValue>),
}

impl FlagValue {
    pub fn as_state(&self) -> Option<StateValue> {
        match self {
            FlagValue::State(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) | FlagValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FlagValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FlagValue::Double(d) => Some(*d),
            FlagValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vec3> {
        match self {
            FlagValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this value is well-formed for `kind`.
    pub fn matches(&self, kind: &FlagKind) -> bool {
        match (self, kind) {
            (FlagValue::State(_), FlagKind::State)
            | (FlagValue::Boolean(_), FlagKind::Boolean)
            | (FlagValue::String(_), FlagKind::String)
            | (FlagValue::Integer(_), FlagKind::Integer)
            | (FlagValue::Double(_), FlagKind::Double)
            | (FlagValue::Vector(_), FlagKind::Vector) => true,
            (FlagValue::Enum(v), FlagKind::Enum(variants)) => variants.contains(&v.as_str()),
            (FlagValue::Set(items), FlagKind::Set(inner)) => items.iter().all(|i| i.matches(inner)),
            _ => false,
        }
    }
}

impl From<StateValue> for FlagValue {
    fn from(s: StateValue) -> Self {
        FlagValue::State(s)
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        FlagValue::String(s.to_string())
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        FlagValue::Boolean(b)
    }
}

impl From<i64> for FlagValue {
    fn from(i: i64) -> Self {
        FlagValue::Integer(i)
    }
}

impl From<f64> for FlagValue {
    fn from(d: f64) -> Self {
        FlagValue::Double(d)
    }
}

impl From<Vec3> for FlagValue {
    fn from(v: Vec3) -> Self {
        FlagValue::Vector(v)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::State(s) => write!(f, "{s}"),
            FlagValue::Boolean(b) => write!(f, "{b}"),
            FlagValue::String(s) | FlagValue::Enum(s) => f.write_str(s),
            FlagValue::Integer(i) => write!(f, "{i}"),
            FlagValue::Double(d) => write!(f, "{d}"),
            FlagValue::Vector(v) => write!(f, "{},{},{}", v.x, v.y, v.z),
            FlagValue::Set(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}
