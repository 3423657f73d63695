//! Media-state property schema.
//!
//! Every controllable attribute of the remote element is declared once in
//! [`MEDIA_PROPS`] as readonly, writable, or an action. The handler
//! registry derives its verb set from this table and the controller facade
//! derives its call names from the same table, so the classification is
//! never duplicated per property.
//!
//! Values crossing the boundary use the stable encoding of [`PropValue`]:
//! numbers and strings pass through as JSON scalars, played/buffered
//! ranges as `[[start, end], …]`, never an engine-implicit serialization.

use serde_json::{json, Value};
use thiserror::Error;

/// Classification of a controllable attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    /// Exposes only `get<Name>`.
    Readonly,
    /// Exposes `get<Name>` and `set<Name>`.
    Writable,
    /// Exposes a bare verb invoking a method.
    Action,
}

/// Declared wire type of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    Text,
    /// Time ranges, encoded `[[start, end], …]`.
    Ranges,
    /// No value (action returns, unset results).
    Null,
}

impl ValueKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Text => "text",
            Self::Ranges => "ranges",
            Self::Null => "null",
        }
    }
}

/// One entry of the property table.
#[derive(Debug, Clone, Copy)]
pub struct PropDesc {
    /// Wire name, camelCase as the remote element exposes it.
    pub name: &'static str,
    pub kind: PropKind,
    pub value: ValueKind,
}

impl PropDesc {
    const fn readonly(name: &'static str, value: ValueKind) -> Self {
        Self {
            name,
            kind: PropKind::Readonly,
            value,
        }
    }

    const fn writable(name: &'static str, value: ValueKind) -> Self {
        Self {
            name,
            kind: PropKind::Writable,
            value,
        }
    }

    const fn action(name: &'static str) -> Self {
        Self {
            name,
            kind: PropKind::Action,
            value: ValueKind::Null,
        }
    }

    /// `get<Name>` verb for state properties.
    #[must_use]
    pub fn getter_verb(&self) -> String {
        getter_verb(self.name)
    }

    /// `set<Name>` verb for writable properties.
    #[must_use]
    pub fn setter_verb(&self) -> String {
        setter_verb(self.name)
    }
}

/// `get<Name>` verb for a property name.
#[must_use]
pub fn getter_verb(name: &str) -> String {
    format!("get{}", capitalize(name))
}

/// `set<Name>` verb for a property name.
#[must_use]
pub fn setter_verb(name: &str) -> String {
    format!("set{}", capitalize(name))
}

/// The schema: single source of truth for the RPC verb surface.
pub const MEDIA_PROPS: &[PropDesc] = &[
    PropDesc::readonly("paused", ValueKind::Bool),
    PropDesc::readonly("duration", ValueKind::Number),
    PropDesc::readonly("seeking", ValueKind::Bool),
    PropDesc::readonly("ended", ValueKind::Bool),
    PropDesc::readonly("currentSrc", ValueKind::Text),
    PropDesc::readonly("buffered", ValueKind::Ranges),
    PropDesc::readonly("played", ValueKind::Ranges),
    PropDesc::writable("currentTime", ValueKind::Number),
    PropDesc::writable("playbackRate", ValueKind::Number),
    PropDesc::writable("volume", ValueKind::Number),
    PropDesc::writable("muted", ValueKind::Bool),
    PropDesc::writable("loop", ValueKind::Bool),
    PropDesc::writable("autoplay", ValueKind::Bool),
    PropDesc::action("play"),
    PropDesc::action("pause"),
];

/// State properties (readonly + writable): everything with a getter.
pub fn state_props() -> impl Iterator<Item = &'static PropDesc> {
    MEDIA_PROPS.iter().filter(|p| p.kind != PropKind::Action)
}

/// Writable properties: everything with a setter.
pub fn writable_props() -> impl Iterator<Item = &'static PropDesc> {
    MEDIA_PROPS.iter().filter(|p| p.kind == PropKind::Writable)
}

/// Invocable actions.
pub fn action_props() -> impl Iterator<Item = &'static PropDesc> {
    MEDIA_PROPS.iter().filter(|p| p.kind == PropKind::Action)
}

/// Look up a descriptor by wire name.
#[must_use]
pub fn prop(name: &str) -> Option<&'static PropDesc> {
    MEDIA_PROPS.iter().find(|p| p.name == name)
}

/// Uppercase the first ASCII letter (`currentTime` → `CurrentTime`).
#[must_use]
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// A value under the schema's declared encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Ranges(Vec<(f64, f64)>),
    Null,
}

/// Incoming value failed validation against the declared type.
#[derive(Debug, Error)]
#[error("expected {expected} value, got {got}")]
pub struct ValueTypeError {
    pub expected: &'static str,
    pub got: String,
}

impl PropValue {
    /// Encode for the wire. Non-finite numbers are a getter defect; they
    /// degrade to `null` rather than poisoning the JSON body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => {
                debug_assert!(n.is_finite(), "non-finite property value");
                serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number)
            }
            Self::Text(s) => Value::String(s.clone()),
            Self::Ranges(ranges) => {
                Value::Array(ranges.iter().map(|(s, e)| json!([s, e])).collect())
            }
            Self::Null => Value::Null,
        }
    }

    /// Decode and validate an incoming value against a declared kind.
    pub fn from_json(kind: ValueKind, value: &Value) -> Result<Self, ValueTypeError> {
        let mismatch = |value: &Value| ValueTypeError {
            expected: kind.as_str(),
            got: value.to_string(),
        };
        match kind {
            ValueKind::Bool => value.as_bool().map(Self::Bool).ok_or_else(|| mismatch(value)),
            ValueKind::Number => value.as_f64().map(Self::Number).ok_or_else(|| mismatch(value)),
            ValueKind::Text => value
                .as_str()
                .map(|s| Self::Text(s.to_owned()))
                .ok_or_else(|| mismatch(value)),
            ValueKind::Ranges => {
                let ranges = value
                    .as_array()
                    .and_then(|pairs| {
                        pairs
                            .iter()
                            .map(|pair| {
                                let pair = pair.as_array()?;
                                match pair.as_slice() {
                                    [s, e] => Some((s.as_f64()?, e.as_f64()?)),
                                    _ => None,
                                }
                            })
                            .collect::<Option<Vec<_>>>()
                    })
                    .ok_or_else(|| mismatch(value))?;
                Ok(Self::Ranges(ranges))
            }
            ValueKind::Null => value
                .is_null()
                .then_some(Self::Null)
                .ok_or_else(|| mismatch(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_no_duplicate_names() {
        let mut names: Vec<_> = MEDIA_PROPS.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MEDIA_PROPS.len());
    }

    #[test]
    fn verb_derivation_capitalizes() {
        let current_time = prop("currentTime").unwrap();
        assert_eq!(current_time.getter_verb(), "getCurrentTime");
        assert_eq!(current_time.setter_verb(), "setCurrentTime");
        assert_eq!(prop("paused").unwrap().getter_verb(), "getPaused");
    }

    #[test]
    fn kind_partitions_cover_the_table() {
        let total = state_props().count() + action_props().count();
        assert_eq!(total, MEDIA_PROPS.len());
        assert!(writable_props().all(|p| p.kind == PropKind::Writable));
        assert!(action_props().any(|p| p.name == "play"));
        assert!(action_props().any(|p| p.name == "pause"));
    }

    #[test]
    fn scalar_values_pass_through() {
        assert_eq!(PropValue::Number(42.5).to_json(), json!(42.5));
        assert_eq!(PropValue::Bool(true).to_json(), json!(true));
        assert_eq!(PropValue::Text("src".into()).to_json(), json!("src"));
    }

    #[test]
    fn ranges_use_explicit_pair_encoding() {
        let encoded = PropValue::Ranges(vec![(0.0, 4.5), (10.0, 12.0)]).to_json();
        assert_eq!(encoded, json!([[0.0, 4.5], [10.0, 12.0]]));
        let decoded = PropValue::from_json(ValueKind::Ranges, &encoded).unwrap();
        assert_eq!(decoded, PropValue::Ranges(vec![(0.0, 4.5), (10.0, 12.0)]));
    }

    #[test]
    fn validation_rejects_type_mismatch() {
        let err = PropValue::from_json(ValueKind::Number, &json!("fast")).unwrap_err();
        assert_eq!(err.expected, "number");
        assert!(PropValue::from_json(ValueKind::Bool, &json!(1)).is_err());
        assert!(PropValue::from_json(ValueKind::Ranges, &json!([[1.0]])).is_err());
    }
}
