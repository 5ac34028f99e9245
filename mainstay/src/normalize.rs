//! Terminal error normalization.
//!
//! The last stop in the pipeline: projects whatever survived the auth,
//! cache, and retry stages into the closed [`ErrorKind`] taxonomy. The
//! mapping is pure and total - every transport failure and every non-2xx
//! status maps to exactly one kind - and nothing here retries; by the time
//! this runs, all recovery budgets are exhausted or inapplicable.

use bytes::Bytes;
use mainstay_core::{ErrorKind, ErrorRecord, Response, TransportError};
use serde_json::Value;

/// Projects a surviving exchange result into the caller-facing form.
///
/// 2xx responses pass through untouched; everything else becomes an
/// [`ErrorRecord`] with a human-readable message - extracted from the
/// response body when possible, otherwise the kind's generic message.
/// Transport failures never leak their internal strings.
pub fn normalize(result: Result<Response, TransportError>) -> Result<Response, ErrorRecord> {
    match result {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(record_from_response(&response)),
        Err(error) => Err(ErrorRecord::new(ErrorKind::from_transport(&error))),
    }
}

fn record_from_response(response: &Response) -> ErrorRecord {
    let kind = ErrorKind::from_status(response.status);
    let mut record = ErrorRecord::new(kind).with_status(response.status);
    if let Some((message, detail)) = extract_message(&response.body) {
        record = record.with_message(message).with_detail(detail);
    }
    record
}

/// Attempts to pull a human-readable message out of a JSON error body.
///
/// Recognized shapes: top-level `message`, `error`, or `detail` string
/// fields, or the first element of an `errors` array (either a string or
/// an object with a `message` field). Returns the message together with
/// the parsed body as the structured detail payload.
fn extract_message(body: &Bytes) -> Option<(String, Value)> {
    let parsed: Value = serde_json::from_slice(body).ok()?;
    let message = message_from_value(&parsed)?;
    Some((message, parsed))
}

fn message_from_value(value: &Value) -> Option<String> {
    let object = value.as_object()?;

    for field in ["message", "error", "detail"] {
        if let Some(text) = object.get(field).and_then(Value::as_str)
            && !text.is_empty()
        {
            return Some(text.to_string());
        }
    }

    let first = object.get("errors")?.as_array()?.first()?;
    match first {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(_) => message_from_value(first),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};

    fn response(status: u16, body: &str) -> Response {
        Response::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            Bytes::copy_from_slice(body.as_bytes()),
        )
    }

    #[test]
    fn success_passes_through() {
        let result = normalize(Ok(response(200, "ok")));
        assert!(result.is_ok());
    }

    #[test]
    fn message_field_is_extracted() {
        let record = normalize(Ok(response(404, r#"{"message": "user not found"}"#))).unwrap_err();
        assert_eq!(record.kind, ErrorKind::NotFound);
        assert_eq!(record.message, "user not found");
        assert_eq!(record.status, Some(StatusCode::NOT_FOUND));
        assert!(record.detail.is_some());
    }

    #[test]
    fn error_and_detail_fields_are_extracted() {
        let record = normalize(Ok(response(409, r#"{"error": "version conflict"}"#))).unwrap_err();
        assert_eq!(record.message, "version conflict");

        let record = normalize(Ok(response(400, r#"{"detail": "missing field"}"#))).unwrap_err();
        assert_eq!(record.message, "missing field");
    }

    #[test]
    fn first_element_of_errors_array_is_extracted() {
        let record =
            normalize(Ok(response(422, r#"{"errors": ["name is required"]}"#))).unwrap_err();
        assert_eq!(record.kind, ErrorKind::ValidationFailed);
        assert_eq!(record.message, "name is required");

        let record = normalize(Ok(response(
            422,
            r#"{"errors": [{"message": "email is invalid"}]}"#,
        )))
        .unwrap_err();
        assert_eq!(record.message, "email is invalid");
    }

    #[test]
    fn unparseable_body_falls_back_to_generic_message() {
        let record = normalize(Ok(response(503, "<html>oops</html>"))).unwrap_err();
        assert_eq!(record.kind, ErrorKind::ServiceUnavailable);
        assert_eq!(
            record.message,
            ErrorKind::ServiceUnavailable.generic_message()
        );
        assert!(record.detail.is_none());
    }

    #[test]
    fn transport_failures_use_generic_messages() {
        let record = normalize(Err(TransportError::Unreachable(
            "socket: ECONNREFUSED 10.0.0.7".into(),
        )))
        .unwrap_err();
        assert_eq!(record.kind, ErrorKind::ServerUnreachable);
        // Internal transport strings never reach the caller.
        assert!(!record.message.contains("ECONNREFUSED"));
        assert_eq!(record.status, None);
    }

    #[test]
    fn cancellation_maps_to_request_cancelled() {
        let record = normalize(Err(TransportError::Cancelled)).unwrap_err();
        assert_eq!(record.kind, ErrorKind::RequestCancelled);
    }
}
