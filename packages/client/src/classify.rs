//! Response classifier: turns a raw reply body into an envelope or a failure.

use eidagent_protocol::{tags, Envelope};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result, Severity};

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Parsed JSON, no checks applied (`skip_error_handling`).
    Raw(Value),
    /// A reply that passed every check.
    Envelope(Envelope),
}

/// Parse and check a reply body.
///
/// With `skip_error_handling` the body only has to be JSON; it is returned
/// as-is. Otherwise it must be an object with a string `msg`, the `msg` must
/// not be a failure tag, and no `error` field may be present.
pub fn classify(raw_body: &str, skip_error_handling: bool) -> Result<Classified> {
    let value = parse(raw_body)?;
    if skip_error_handling {
        return Ok(Classified::Raw(value));
    }
    check(value).map(Classified::Envelope)
}

/// [`classify`] without the escape hatch.
pub fn classify_envelope(raw_body: &str) -> Result<Envelope> {
    check(parse(raw_body)?)
}

fn parse(raw_body: &str) -> Result<Value> {
    serde_json::from_str(raw_body).map_err(|e| {
        Error::external(Severity::Error, format!("not valid JSON response: {e}"))
    })
}

fn check(value: Value) -> Result<Envelope> {
    let Value::Object(mut fields) = value else {
        return Err(Error::external(
            Severity::Error,
            "not valid JSON response: expected an object",
        ));
    };

    let msg = match fields.remove("msg") {
        Some(Value::String(msg)) => msg,
        _ => return Err(Error::external(Severity::Error, "missing msg key")),
    };
    let error = match fields.remove("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };

    if tags::is_failure(&msg) {
        let detail = error.unwrap_or_default();
        warn!(msg = %msg, error = %detail, "agent reported failure");
        return Err(Error::external(Severity::Error, format!("{msg}: {detail}")));
    }
    if let Some(detail) = error {
        warn!(msg = %msg, error = %detail, "agent reported undocumented error");
        return Err(Error::external(
            Severity::Error,
            format!("undocumented error: {detail}"),
        ));
    }

    Ok(Envelope {
        msg,
        error: None,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn valid_envelope() {
        let env = classify_envelope(r#"{"msg":"API_LEVEL","current":2}"#).unwrap();
        assert_eq!(env.msg, "API_LEVEL");
        assert_eq!(env.get("current"), Some(&json!(2)));
    }

    #[test]
    fn not_json() {
        let err = classify_envelope("<html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ERROR_EXTERNAL);
        assert!(err.message().contains("not valid JSON"));
    }

    #[test]
    fn not_an_object() {
        let err = classify_envelope("[1,2]").unwrap_err();
        assert!(err.message().contains("not valid JSON"));
    }

    #[test]
    fn missing_msg() {
        let err = classify_envelope(r#"{"current":1}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ERROR_EXTERNAL);
        assert!(err.message().contains("missing msg key"));
    }

    #[test]
    fn failure_tag_carries_detail() {
        let err = classify_envelope(r#"{"msg":"BAD_STATE","error":"x"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ERROR_EXTERNAL);
        assert!(err.message().contains("BAD_STATE: x"));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn every_failure_tag_fails() {
        for tag in tags::FAILURE {
            let body = json!({ "msg": tag, "error": "detail" }).to_string();
            let err = classify_envelope(&body).unwrap_err();
            assert_eq!(err.message(), format!("{tag}: detail"));
        }
    }

    #[test]
    fn undocumented_error() {
        let err = classify_envelope(r#"{"msg":"READER","error":"oops"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ERROR_EXTERNAL);
        assert!(err.message().contains("undocumented error: oops"));
    }

    #[test]
    fn null_error_is_absent() {
        let env = classify_envelope(r#"{"msg":"CANCEL","error":null}"#).unwrap();
        assert_eq!(env.msg, "CANCEL");
    }

    #[test]
    fn skip_error_handling_returns_raw() {
        let got = classify(r#"{"msg":"BAD_STATE","error":"x"}"#, true).unwrap();
        assert_eq!(
            got,
            Classified::Raw(json!({ "msg": "BAD_STATE", "error": "x" }))
        );
        let got = classify(r#"{"no_msg":true}"#, true).unwrap();
        assert_eq!(got, Classified::Raw(json!({ "no_msg": true })));
    }
}
