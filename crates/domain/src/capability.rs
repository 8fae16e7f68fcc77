use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix marking a client member as internal.  This is a naming
/// convention only; it is not an access-control boundary.
pub const INTERNAL_PREFIX: char = '_';

/// One member of a messaging client's public surface, as advertised by
/// the client once it is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: CapabilityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered positional parameters.  `None` when the client declares no
    /// schema; arguments are then forwarded unchecked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<ParamSpec>>,
}

impl CapabilityDescriptor {
    /// Shorthand for a callable capability with the given parameters.
    pub fn method(name: impl Into<String>, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            kind: CapabilityKind::Method,
            description: None,
            params: Some(params),
        }
    }

    /// A callable capability with no declared schema.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CapabilityKind::Method,
            description: None,
            params: None,
        }
    }

    /// Whether the name carries the internal-marker prefix.
    pub fn is_internal(&self) -> bool {
        self.name.starts_with(INTERNAL_PREFIX)
    }

    /// Only callable, non-internal members are exposed over HTTP.
    pub fn is_exposed(&self) -> bool {
        self.kind == CapabilityKind::Method && !self.is_internal()
    }
}

/// Whether a member can be invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    #[default]
    Method,
    Property,
}

/// Declared parameter of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: ParamType,
    #[serde(default = "d_true")]
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
        }
    }
}

/// JSON shape accepted for a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

impl ParamType {
    /// Check whether `value` has this shape.  `null` never matches a
    /// concrete type; optional parameters handle `null` separately.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn d_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn underscore_names_are_internal() {
        let cap = CapabilityDescriptor::method("_internalHelper", vec![]);
        assert!(cap.is_internal());
        assert!(!cap.is_exposed());
    }

    #[test]
    fn properties_are_not_exposed() {
        let cap = CapabilityDescriptor {
            name: "info".into(),
            kind: CapabilityKind::Property,
            description: None,
            params: None,
        };
        assert!(!cap.is_exposed());
    }

    #[test]
    fn descriptor_defaults_when_fields_missing() {
        let cap: CapabilityDescriptor =
            serde_json::from_value(json!({ "name": "getChats" })).unwrap();
        assert_eq!(cap.kind, CapabilityKind::Method);
        assert_eq!(cap.params, None);
        assert!(cap.is_exposed());
    }

    #[test]
    fn empty_params_list_is_a_declared_schema() {
        let cap: CapabilityDescriptor =
            serde_json::from_value(json!({ "name": "getChats", "params": [] })).unwrap();
        assert_eq!(cap.params, Some(vec![]));
        assert_eq!(cap, CapabilityDescriptor::method("getChats", vec![]));
    }

    #[test]
    fn param_spec_defaults_to_required_any() {
        let p: ParamSpec = serde_json::from_value(json!({ "name": "chatId" })).unwrap();
        assert!(p.required);
        assert_eq!(p.ty, ParamType::Any);
    }

    #[test]
    fn integer_rejects_fractional_numbers() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
        assert!(ParamType::Number.matches(&json!(3.5)));
    }

    #[test]
    fn null_only_matches_any() {
        assert!(ParamType::Any.matches(&Value::Null));
        assert!(!ParamType::String.matches(&Value::Null));
        assert!(!ParamType::Object.matches(&Value::Null));
    }
}
