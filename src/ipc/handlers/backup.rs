use serde_json::json;
use std::path::PathBuf;

use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::store;

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "dbSha256": summary.db_sha256,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:#}"), None),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    // The open store handle points at the file being replaced; drop it
    // before swapping the database underneath.
    state.store = None;
    let imported = backup::import_workspace_bundle(&in_path, &workspace);
    let reopened = store::open(&workspace);

    match (imported, reopened) {
        (Ok(summary), Ok(store)) => {
            state.store = Some(store);
            ok(
                &req.id,
                json!({
                    "bundleFormat": summary.bundle_format_detected,
                    "dbSha256": summary.db_sha256,
                }),
            )
        }
        (Err(e), Ok(store)) => {
            state.store = Some(store);
            err(&req.id, "import_failed", format!("{e:#}"), None)
        }
        (_, Err(e)) => err(&req.id, "store_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_export(state, req)),
        "backup.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
