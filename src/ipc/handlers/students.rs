use serde_json::{json, Map, Value};

use crate::engine::mastery::{mastery_mapping, MasteryConfig};
use crate::engine::topics::{topic_points, TopicIndex};
use crate::engine::{grades, projection};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::outline::{self, Outline};
use crate::store::{Store, StoreError};

/// Resolves the record the request is actually about: staff accounts are
/// not enrolled, so they read as the maxima record instead of 404ing.
fn subject_scores(
    store: &Store,
    email: &str,
    maxima: &Map<String, Value>,
) -> Result<Map<String, Value>, StoreError> {
    if store.is_admin(email)? {
        Ok(maxima.clone())
    } else {
        store.student_scores(email)
    }
}

/// Outline-derived classifier inputs: topic membership and level count.
/// The static outline wins when installed; otherwise the default level
/// schema applies and topics are their own assignment names.
fn classifier_inputs(
    state: &AppState,
    req: &Request,
) -> Result<(TopicIndex, MasteryConfig), Value> {
    let loaded = match state.workspace.as_deref() {
        Some(ws) => outline::load(ws)
            .map_err(|e| err(&req.id, "bad_outline", format!("{e:#}"), None))?,
        None => None,
    };
    let (index, levels) = match loaded {
        Some(o) => (o.topic_index(), o.student_levels),
        None => (TopicIndex::default(), outline::default_levels()),
    };
    let config = outline::level_count(&levels)
        .and_then(MasteryConfig::new)
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_outline",
                "level schema defines no interior mastery levels",
                None,
            )
        })?;
    Ok((index, config))
}

fn handle_grades(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let maxima = match store.max_scores() {
        Ok(m) => m,
        Err(e) => return store_err(&req.id, &e),
    };
    let scores = match subject_scores(store, &email, &maxima) {
        Ok(s) => s,
        Err(e) => return store_err(&req.id, &e),
    };

    ok(
        &req.id,
        Value::Object(grades::merge_with_max(&scores, &maxima)),
    )
}

fn handle_mastery_mapping(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (index, config) = match classifier_inputs(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let maxima = match store.max_scores() {
        Ok(m) => m,
        Err(e) => return store_err(&req.id, &e),
    };
    let scores = match store.student_scores(&email) {
        Ok(s) => s,
        Err(e) => return store_err(&req.id, &e),
    };

    let user_points = topic_points(&scores, &index);
    let max_points = topic_points(&maxima, &index);
    ok(
        &req.id,
        Value::Object(mastery_mapping(&user_points, &max_points, config)),
    )
}

fn handle_concept_structure(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course = state
        .workspace
        .as_deref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "Course".to_string());
    let loaded = match state.workspace.as_deref() {
        Some(ws) => match outline::load(ws) {
            Ok(o) => o,
            Err(e) => return err(&req.id, "bad_outline", format!("{e:#}"), None),
        },
        None => None,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    // No scores yet reads as all-zero mastery, not as an error; only real
    // infrastructure problems propagate.
    let maxima = match store.max_scores() {
        Ok(m) => m,
        Err(StoreError::NotFound { .. }) => Map::new(),
        Err(e) => return store_err(&req.id, &e),
    };
    let scores = match store.student_scores(&email) {
        Ok(s) => s,
        Err(StoreError::NotFound { .. }) => Map::new(),
        Err(e) => return store_err(&req.id, &e),
    };

    let outline: Outline = loaded.unwrap_or_else(|| outline::from_max_record(&course, &maxima));
    let config = match outline
        .num_levels()
        .and_then(MasteryConfig::new)
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_outline",
                "level schema defines no interior mastery levels",
                None,
            )
        }) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let index = outline.topic_index();
    let mastery = mastery_mapping(
        &topic_points(&scores, &index),
        &topic_points(&maxima, &index),
        config,
    );
    let nodes = outline.annotated(&mastery);

    ok(
        &req.id,
        json!({
            "name": outline.name,
            "start date": outline.start_date,
            "nodes": nodes,
        }),
    )
}

fn handle_projections(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let course_max = match store.total_possible_score() {
        Ok(v) => v,
        Err(e) => return store_err(&req.id, &e),
    };
    let maxima = match store.max_scores() {
        Ok(m) => m,
        Err(e) => return store_err(&req.id, &e),
    };

    let is_admin = match store.is_admin(&email) {
        Ok(v) => v,
        Err(e) => return store_err(&req.id, &e),
    };
    let (subject, current) = if is_admin {
        let current = projection::max_points_so_far(&maxima, &maxima);
        (maxima.clone(), current)
    } else {
        let scores = match store.student_scores(&email) {
            Ok(s) => s,
            Err(e) => return store_err(&req.id, &e),
        };
        let current = projection::total_points(&scores);
        (scores, current)
    };

    let max_so_far = projection::max_points_so_far(&subject, &maxima);
    ok(
        &req.id,
        json!(projection::project(current, max_so_far, course_max)),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "student.grades" => Some(handle_grades(state, req)),
        "student.masteryMapping" => Some(handle_mastery_mapping(state, req)),
        "student.conceptStructure" => Some(handle_concept_structure(state, req)),
        "student.projections" => Some(handle_projections(state, req)),
        _ => None,
    }
}
