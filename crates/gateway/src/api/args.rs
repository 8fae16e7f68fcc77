//! Request body → positional argument list.
//!
//! | Body              | Arguments                                   |
//! |-------------------|---------------------------------------------|
//! | empty             | none                                        |
//! | JSON array        | elements, in order                          |
//! | JSON object       | values matched to declared params by name   |
//! | anything else     | rejected before the capability is involved  |
//!
//! Bound arguments are then checked against the declared parameters.  A
//! capability without a declared schema gets its positional arguments
//! forwarded as-is and cannot be called with an object body.

use mb_client::InvocationError;
use mb_domain::capability::{CapabilityDescriptor, ParamSpec};
use serde_json::{Map, Value};

/// A body the transport cannot turn into arguments at all.
#[derive(Debug, thiserror::Error)]
pub enum BodyRejection {
    #[error("malformed JSON body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("request body must be a JSON array or object, got {0}")]
    Scalar(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestArgs {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

pub fn parse_body(body: &[u8]) -> Result<RequestArgs, BodyRejection> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RequestArgs::Positional(Vec::new()));
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Array(items) => Ok(RequestArgs::Positional(items)),
        Value::Object(map) => Ok(RequestArgs::Named(map)),
        other => Err(BodyRejection::Scalar(json_type(&other))),
    }
}

/// Turn request arguments into the positional list for `cap`, validating
/// arity and types.
pub fn bind(args: RequestArgs, cap: &CapabilityDescriptor) -> Result<Vec<Value>, InvocationError> {
    let Some(params) = cap.params.as_deref() else {
        return match args {
            RequestArgs::Positional(values) => Ok(values),
            RequestArgs::Named(_) => Err(InvocationError::Validation(format!(
                "{} declares no parameter names, pass arguments as a JSON array",
                cap.name
            ))),
        };
    };
    let values = match args {
        RequestArgs::Positional(values) => {
            if values.len() > params.len() {
                return Err(InvocationError::Validation(format!(
                    "{} accepts at most {} argument(s), got {}",
                    cap.name,
                    params.len(),
                    values.len()
                )));
            }
            values
        }
        RequestArgs::Named(map) => bind_named(map, cap, params)?,
    };

    for (i, param) in params.iter().enumerate() {
        match values.get(i) {
            None if param.required => return Err(missing(cap, param)),
            Some(Value::Null) if param.required => check_type(cap, param, &Value::Null)?,
            Some(v) if !v.is_null() => check_type(cap, param, v)?,
            _ => {}
        }
    }
    Ok(values)
}

fn missing(cap: &CapabilityDescriptor, param: &ParamSpec) -> InvocationError {
    InvocationError::Validation(format!(
        "{}: missing required argument `{}`",
        cap.name, param.name
    ))
}

fn bind_named(
    mut map: Map<String, Value>,
    cap: &CapabilityDescriptor,
    params: &[ParamSpec],
) -> Result<Vec<Value>, InvocationError> {
    let mut slots = Vec::with_capacity(params.len());
    for param in params {
        let slot = map.remove(&param.name);
        if slot.is_none() && param.required {
            return Err(missing(cap, param));
        }
        slots.push(slot);
    }

    if !map.is_empty() {
        let mut unknown: Vec<&str> = map.keys().map(String::as_str).collect();
        unknown.sort_unstable();
        return Err(InvocationError::Validation(format!(
            "{}: unknown argument(s): {}",
            cap.name,
            unknown.join(", ")
        )));
    }

    while matches!(slots.last(), Some(None)) {
        slots.pop();
    }
    Ok(slots.into_iter().map(|s| s.unwrap_or(Value::Null)).collect())
}

fn check_type(cap: &CapabilityDescriptor, param: &ParamSpec, value: &Value) -> Result<(), InvocationError> {
    if param.ty.matches(value) {
        return Ok(());
    }
    Err(InvocationError::Validation(format!(
        "{}: argument `{}` must be {}, got {}",
        cap.name,
        param.name,
        param.ty,
        json_type(value)
    )))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_domain::capability::ParamType;
    use serde_json::json;

    fn send() -> CapabilityDescriptor {
        CapabilityDescriptor::method(
            "send",
            vec![
                ParamSpec::required("chatId", ParamType::String),
                ParamSpec::required("content", ParamType::Any),
                ParamSpec::optional("options", ParamType::Object),
            ],
        )
    }

    fn positional(v: Value) -> RequestArgs {
        parse_body(v.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn empty_body_is_no_arguments() {
        assert_eq!(parse_body(b"").unwrap(), RequestArgs::Positional(vec![]));
        assert_eq!(parse_body(b"  \n").unwrap(), RequestArgs::Positional(vec![]));
    }

    #[test]
    fn scalar_and_malformed_bodies_are_rejected() {
        assert!(matches!(parse_body(b"42"), Err(BodyRejection::Scalar("number"))));
        assert!(matches!(parse_body(b"null"), Err(BodyRejection::Scalar("null"))));
        assert!(matches!(parse_body(b"[1,"), Err(BodyRejection::Malformed(_))));
    }

    #[test]
    fn positional_arguments_pass_through() {
        let args = bind(positional(json!(["chatId123", "hello"])), &send()).unwrap();
        assert_eq!(args, vec![json!("chatId123"), json!("hello")]);
    }

    #[test]
    fn too_many_arguments() {
        let err = bind(positional(json!(["a", "b", {}, 4])), &send()).unwrap_err();
        assert!(err.message().contains("at most 3"));
    }

    #[test]
    fn missing_required_argument() {
        let err = bind(positional(json!(["a"])), &send()).unwrap_err();
        assert!(err.message().contains("`content`"));
    }

    #[test]
    fn null_satisfies_required_any() {
        let args = bind(positional(json!(["a", null])), &send()).unwrap();
        assert_eq!(args[1], Value::Null);
    }

    #[test]
    fn wrong_type_is_reported() {
        let err = bind(positional(json!([12, "x"])), &send()).unwrap_err();
        assert_eq!(err.message(), "send: argument `chatId` must be string, got number");
        assert_eq!(err.kind().as_str(), "validation");
    }

    #[test]
    fn named_arguments_follow_declared_order() {
        let args = bind(
            positional(json!({ "content": "hi", "chatId": "c1" })),
            &send(),
        )
        .unwrap();
        assert_eq!(args, vec![json!("c1"), json!("hi")]);
    }

    #[test]
    fn named_arguments_fill_gaps_with_null() {
        let cap = CapabilityDescriptor::method(
            "search",
            vec![
                ParamSpec::optional("query", ParamType::String),
                ParamSpec::optional("limit", ParamType::Integer),
            ],
        );
        let args = bind(positional(json!({ "limit": 5 })), &cap).unwrap();
        assert_eq!(args, vec![Value::Null, json!(5)]);
    }

    #[test]
    fn unknown_named_arguments() {
        let err = bind(
            positional(json!({ "chatId": "c", "content": 1, "zz": 1, "aa": 2 })),
            &send(),
        )
        .unwrap_err();
        assert_eq!(err.message(), "send: unknown argument(s): aa, zz");
    }

    #[test]
    fn no_params_means_no_arguments() {
        let cap = CapabilityDescriptor::method("getChats", vec![]);
        assert!(bind(positional(json!([])), &cap).unwrap().is_empty());
        assert!(bind(positional(json!(["x"])), &cap).is_err());
    }

    #[test]
    fn undeclared_schema_forwards_positional_arguments() {
        let cap = CapabilityDescriptor::untyped("send");
        let args = bind(positional(json!(["chatId123", "hello", 3])), &cap).unwrap();
        assert_eq!(args, vec![json!("chatId123"), json!("hello"), json!(3)]);
        assert!(bind(positional(json!([])), &cap).unwrap().is_empty());
    }

    #[test]
    fn undeclared_schema_rejects_named_arguments() {
        let cap = CapabilityDescriptor::untyped("send");
        let err = bind(positional(json!({ "chatId": "c1" })), &cap).unwrap_err();
        assert_eq!(err.kind().as_str(), "validation");
        assert!(err.message().starts_with("send declares no parameter names"));
    }
}
