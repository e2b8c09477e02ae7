use serde_json::json;

use crate::form::FormError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Validation failures carry the field map so the UI can mark fields and
/// jump back to the top of the form.
pub fn form_err(id: &str, e: &FormError) -> serde_json::Value {
    let details = match e {
        FormError::Invalid(errors) => Some(json!({ "errors": errors, "scrollToTop": true })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
