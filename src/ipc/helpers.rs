use serde_json::Value;

use super::error::err;
use super::types::{AppState, Request};
use crate::store::Store;

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    let raw = req
        .params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default();
    if raw.is_empty() {
        Err(err(
            &req.id,
            "bad_params",
            format!("missing {}", key),
            None,
        ))
    } else {
        Ok(raw.to_string())
    }
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn store_ref<'a>(state: &'a AppState, req: &Request) -> Result<&'a Store, Value> {
    state
        .store
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}
