use serde_json::{json, Value};
use std::cmp::Ordering;

use crate::engine::{numeric_score, projection, stats};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{optional_str, required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::store::{Store, StoreError};

const DEFAULT_TOP_COUNT: usize = 5;

/// One read per student, assembled in roster order. A student with no cell
/// for the assignment simply contributes nothing.
fn collect_assignment_scores(
    store: &Store,
    section: &str,
    assignment: &str,
) -> Result<Vec<f64>, StoreError> {
    let mut scores = Vec::new();
    for (_, email) in store.students()? {
        let record = store.student_scores(&email)?;
        let cell = record
            .get(section)
            .and_then(Value::as_object)
            .and_then(|s| s.get(assignment));
        if let Some(v) = cell.and_then(numeric_score) {
            scores.push(v);
        }
    }
    Ok(scores)
}

fn handle_assessment_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let section = match required_str(req, "section") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let assignment = match required_str(req, "assignment") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match collect_assignment_scores(store, &section, &assignment) {
        Ok(scores) => ok(&req.id, json!(stats::summarize(&scores))),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_distribution(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let section = match required_str(req, "section") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let assignment = match required_str(req, "assignment") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mode = optional_str(req, "mode").unwrap_or_default();

    let scores = match collect_assignment_scores(store, &section, &assignment) {
        Ok(s) => s,
        Err(e) => return store_err(&req.id, &e),
    };

    match mode.as_str() {
        "" | "unit" => ok(&req.id, json!(stats::unit_distribution(&scores))),
        "tenths" => ok(&req.id, json!(stats::tenths_histogram(&scores))),
        other => err(
            &req.id,
            "bad_params",
            format!("unknown distribution mode: {}", other),
            None,
        ),
    }
}

fn handle_student_scores(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let roster = match store.students() {
        Ok(r) => r,
        Err(e) => return store_err(&req.id, &e),
    };

    let mut students = Vec::with_capacity(roster.len());
    for (name, email) in roster {
        let scores = match store.student_scores(&email) {
            Ok(s) => s,
            Err(e) => return store_err(&req.id, &e),
        };
        students.push(json!({ "name": name, "email": email, "scores": scores }));
    }
    ok(&req.id, json!({ "students": students }))
}

fn handle_leaderboard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let k = req
        .params
        .get("k")
        .and_then(Value::as_u64)
        .map(|k| k as usize)
        .unwrap_or(DEFAULT_TOP_COUNT);
    let section = optional_str(req, "section");
    let assignment = optional_str(req, "assignment");

    let roster = match store.students() {
        Ok(r) => r,
        Err(e) => return store_err(&req.id, &e),
    };

    let mut entries: Vec<(String, String, f64)> = Vec::new();
    for (name, email) in roster {
        let record = match store.student_scores(&email) {
            Ok(s) => s,
            Err(e) => return store_err(&req.id, &e),
        };
        match (&section, &assignment) {
            (Some(section), Some(assignment)) => {
                let cell = record
                    .get(section)
                    .and_then(Value::as_object)
                    .and_then(|s| s.get(assignment));
                if let Some(score) = cell.and_then(numeric_score) {
                    entries.push((name, email, score));
                }
            }
            (None, None) => {
                entries.push((name, email, projection::total_points(&record)));
            }
            _ => {
                return err(
                    &req.id,
                    "bad_params",
                    "section and assignment must be given together",
                    None,
                )
            }
        }
    }

    entries.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
    entries.truncate(k);

    let key = if section.is_some() { "score" } else { "total" };
    let entries: Vec<Value> = entries
        .into_iter()
        .map(|(name, email, score)| json!({ "name": name, "email": email, (key): score }))
        .collect();
    ok(&req.id, json!({ "entries": entries }))
}

fn handle_students_by_score(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let section = match required_str(req, "section") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let assignment = match required_str(req, "assignment") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(target) = req.params.get("score").and_then(numeric_score) else {
        return err(&req.id, "bad_params", "missing numeric score", None);
    };

    let roster = match store.students() {
        Ok(r) => r,
        Err(e) => return store_err(&req.id, &e),
    };

    let mut students = Vec::new();
    for (name, email) in roster {
        let record = match store.student_scores(&email) {
            Ok(s) => s,
            Err(e) => return store_err(&req.id, &e),
        };
        let cell = record
            .get(&section)
            .and_then(Value::as_object)
            .and_then(|s| s.get(&assignment));
        if let Some(score) = cell.and_then(numeric_score) {
            if score == target {
                students.push(json!({ "name": name, "email": email, "score": score }));
            }
        }
    }
    ok(&req.id, json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admin.assessmentStats" => Some(handle_assessment_stats(state, req)),
        "admin.distribution" => Some(handle_distribution(state, req)),
        "admin.studentScores" => Some(handle_student_scores(state, req)),
        "admin.leaderboard" => Some(handle_leaderboard(state, req)),
        "admin.studentsByScore" => Some(handle_students_by_score(state, req)),
        _ => None,
    }
}
