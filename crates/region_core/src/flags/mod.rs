//! # Flags
//!
//! A flag is a named, typed setting that regions may carry. Each flag also
//! owns a role-group sub-setting deciding which actors a region's value
//! applies to.
//!
//! - [`Flag`] - the definition: name, [`FlagKind`], static default, default group
//! - [`FlagValue`] - a typed value stored on a region
//! - [`RegionGroup`] - actor scoping for a value
//! - [`FlagRegistry`] - name lookup and persistence codec for known flags
//! - [`defaults`] - the built-in flag catalogue

pub mod defaults;
mod group;
mod registry;
mod value;

pub use group::{Association, RegionGroup};
pub use registry::FlagRegistry;
pub use value::{FlagKind, FlagValue, StateValue};

use crate::error::RegionError;
use crate::types::Vec3;
use serde_json::Value;

/// Definition of a flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    name: String,
    kind: FlagKind,
    default: Option<FlagValue>,
    default_group: RegionGroup,
    uses_membership_as_default: bool,
}

impl Flag {
    /// Creates a flag of the given kind with no default and the
    /// [`RegionGroup::NonMembers`] default group.
    pub fn new(name: &str, kind: FlagKind) -> Self {
        Self {
            name: name.to_lowercase(),
            kind,
            default: None,
            default_group: RegionGroup::NonMembers,
            uses_membership_as_default: false,
        }
    }

    pub fn state(name: &str) -> Self {
        Self::new(name, FlagKind::State)
    }

    pub fn with_default(mut self, value: impl Into<FlagValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_default_group(mut self, group: RegionGroup) -> Self {
        self.default_group = group;
        self
    }

    /// When no region has an opinion, decide by region membership instead
    /// of falling through to lower regions.
    pub fn with_membership_default(mut self) -> Self {
        self.uses_membership_as_default = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FlagKind {
        &self.kind
    }

    pub fn default_value(&self) -> Option<&FlagValue> {
        self.default.as_ref()
    }

    pub fn default_group(&self) -> RegionGroup {
        self.default_group
    }

    pub fn uses_membership_as_default(&self) -> bool {
        self.uses_membership_as_default
    }

    /// Checks that a value has this flag's type.
    pub fn validate(&self, value: &FlagValue) -> Result<(), RegionError> {
        if value.matches(&self.kind) {
            Ok(())
        } else {
            Err(RegionError::invalid_value(
                &self.name,
                format!("expected {}, got {value:?}", self.kind.name()),
            ))
        }
    }

    /// Parses user input. `Ok(None)` means the input clears the flag.
    pub fn parse_input(&self, input: &str) -> Result<Option<FlagValue>, RegionError> {
        let input = input.trim();
        if self.kind == FlagKind::State && input.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        parse_kind(&self.name, &self.kind, input).map(Some)
    }

    /// Encodes a value for storage.
    pub fn marshal(&self, value: &FlagValue) -> Value {
        marshal_value(value)
    }

    /// Decodes a stored value.
    pub fn unmarshal(&self, raw: &Value) -> Result<FlagValue, RegionError> {
        unmarshal_kind(&self.name, &self.kind, raw)
    }
}

fn parse_kind(name: &str, kind: &FlagKind, input: &str) -> Result<FlagValue, RegionError> {
    match kind {
        FlagKind::State => match input.to_lowercase().as_str() {
            "allow" => Ok(FlagValue::State(StateValue::Allow)),
            "deny" => Ok(FlagValue::State(StateValue::Deny)),
            other => Err(RegionError::invalid_value(name, format!("expected allow, deny or none, got '{other}'"))),
        },
        FlagKind::Boolean => match input.to_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(FlagValue::Boolean(true)),
            "false" | "no" | "off" => Ok(FlagValue::Boolean(false)),
            other => Err(RegionError::invalid_value(name, format!("not a boolean: '{other}'"))),
        },
        FlagKind::String => Ok(FlagValue::String(input.to_string())),
        FlagKind::Integer => input
            .parse::<i64>()
            .map(FlagValue::Integer)
            .map_err(|e| RegionError::invalid_value(name, e.to_string())),
        FlagKind::Double => input
            .parse::<f64>()
            .map(FlagValue::Double)
            .map_err(|e| RegionError::invalid_value(name, e.to_string())),
        FlagKind::Vector => {
            let parts: Vec<&str> = input.split(',').map(str::trim).collect();
            let [x, y, z] = parts.as_slice() else {
                return Err(RegionError::invalid_value(name, "expected x,y,z"));
            };
            let coord = |s: &str| {
                s.parse::<f64>()
                    .map_err(|e| RegionError::invalid_value(name, e.to_string()))
            };
            Ok(FlagValue::Vector(Vec3::new(coord(*x)?, coord(*y)?, coord(*z)?)))
        }
        FlagKind::Enum(variants) => {
            let lowered = input.to_lowercase();
            if variants.contains(&lowered.as_str()) {
                Ok(FlagValue::Enum(lowered))
            } else {
                Err(RegionError::invalid_value(
                    name,
                    format!("'{input}' is not one of {}", variants.join(", ")),
                ))
            }
        }
        FlagKind::Set(inner) => {
            let mut items: Vec<FlagValue> = Vec::new();
            for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let item = parse_kind(name, inner, part)?;
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            Ok(FlagValue::Set(items))
        }
    }
}

impl FlagValue {
    /// Encodes the value in its stored form, without needing the flag.
    pub fn to_json(&self) -> Value {
        marshal_value(self)
    }
}

fn marshal_value(value: &FlagValue) -> Value {
    match value {
        FlagValue::State(s) => Value::from(s.as_str()),
        FlagValue::Boolean(b) => Value::from(*b),
        FlagValue::String(s) | FlagValue::Enum(s) => Value::from(s.as_str()),
        FlagValue::Integer(i) => Value::from(*i),
        FlagValue::Double(d) => Value::from(*d),
        FlagValue::Vector(v) => serde_json::json!({ "x": v.x, "y": v.y, "z": v.z }),
        FlagValue::Set(items) => Value::Array(items.iter().map(marshal_value).collect()),
    }
}

fn unmarshal_kind(name: &str, kind: &FlagKind, raw: &Value) -> Result<FlagValue, RegionError> {
    let mismatch = || RegionError::invalid_value(name, format!("expected {}, got {raw}", kind.name()));
    match kind {
        FlagKind::State | FlagKind::Enum(_) => {
            let s = raw.as_str().ok_or_else(mismatch)?;
            parse_kind(name, kind, s)
        }
        FlagKind::Boolean => match raw {
            Value::Bool(b) => Ok(FlagValue::Boolean(*b)),
            Value::String(s) => parse_kind(name, kind, s),
            _ => Err(mismatch()),
        },
        FlagKind::String => raw
            .as_str()
            .map(|s| FlagValue::String(s.to_string()))
            .ok_or_else(mismatch),
        FlagKind::Integer => raw.as_i64().map(FlagValue::Integer).ok_or_else(mismatch),
        FlagKind::Double => raw.as_f64().map(FlagValue::Double).ok_or_else(mismatch),
        FlagKind::Vector => {
            let coord = |axis: &str| raw.get(axis).and_then(Value::as_f64).ok_or_else(mismatch);
            Ok(FlagValue::Vector(Vec3::new(coord("x")?, coord("y")?, coord("z")?)))
        }
        FlagKind::Set(inner) => {
            let items = raw.as_array().ok_or_else(mismatch)?;
            let mut out: Vec<FlagValue> = Vec::with_capacity(items.len());
            for item in items {
                let item = unmarshal_kind(name, inner, item)?;
                if !out.contains(&item) {
                    out.push(item);
                }
            }
            Ok(FlagValue::Set(out))
        }
    }
}
