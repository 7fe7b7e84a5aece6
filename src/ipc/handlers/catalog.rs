use serde_json::{json, Value};

use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{required_str, store_ref};
use crate::ipc::types::{AppState, Request};

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.students() {
        Ok(roster) => {
            let students: Vec<Value> = roster
                .into_iter()
                .map(|(name, email)| json!({ "name": name, "email": email }))
                .collect();
            ok(&req.id, json!({ "students": students }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_categories(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.categories() {
        Ok(doc) => ok(&req.id, doc),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_bins(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.bins() {
        Ok(doc) => ok(&req.id, doc),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_admins_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let Some(raw) = req.params.get("emails").and_then(Value::as_array) else {
        return err(&req.id, "bad_params", "missing emails array", None);
    };
    let mut emails = Vec::with_capacity(raw.len());
    for v in raw {
        let Some(email) = v.as_str().map(str::trim).filter(|e| !e.is_empty()) else {
            return err(
                &req.id,
                "bad_params",
                "emails must contain only non-empty strings",
                None,
            );
        };
        emails.push(email.to_string());
    }

    match store.set_admins(&emails) {
        Ok(()) => ok(&req.id, json!({ "count": emails.len() })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_admins_check(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.is_admin(&email) {
        Ok(is_admin) => ok(&req.id, json!({ "isAdmin": is_admin })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "categories.get" => Some(handle_categories(state, req)),
        "bins.get" => Some(handle_bins(state, req)),
        "admins.set" => Some(handle_admins_set(state, req)),
        "admins.check" => Some(handle_admins_check(state, req)),
        _ => None,
    }
}
