use serde_json::json;

use crate::store::StoreError;

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

/// Maps store failures onto wire error codes by kind, keeping "no such
/// record" distinct from "caller gave us garbage" distinct from
/// "infrastructure broken".
pub fn store_err(id: &str, e: &StoreError) -> serde_json::Value {
    let code = match e {
        StoreError::NotFound { .. } => "not_found",
        StoreError::Malformed { .. } => "bad_params",
        StoreError::Backend(_) => "store_failed",
    };
    err(id, code, e.to_string(), None)
}
