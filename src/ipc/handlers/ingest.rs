use serde_json::json;
use std::path::PathBuf;

use crate::ingest;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_str, store_ref};
use crate::ipc::types::{AppState, Request};

fn handle_scores(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match ingest::ingest_scores(store, &path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "runId": summary.run_id,
                "students": summary.students,
                "assignments": summary.assignments,
            }),
        ),
        Err(e) => err(&req.id, "ingest_failed", format!("{e:#}"), None),
    }
}

fn handle_bins(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match ingest::ingest_bins(store, &path) {
        Ok(summary) => ok(
            &req.id,
            json!({ "runId": summary.run_id, "bins": summary.bins }),
        ),
        Err(e) => err(&req.id, "ingest_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ingest.scores" => Some(handle_scores(state, req)),
        "ingest.bins" => Some(handle_bins(state, req)),
        _ => None,
    }
}
