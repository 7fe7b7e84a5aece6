use serde_json::{json, Map, Value};

use super::ScoreRecord;

/// Merges a student's record with the maxima record for the grades view:
/// `{section: {assignment: {student, max}}}`. Assignments the maxima record
/// does not cover get a null max rather than disappearing.
pub fn merge_with_max(student: &ScoreRecord, maxima: &ScoreRecord) -> Map<String, Value> {
    let mut merged = Map::new();
    for (section, assignments) in student {
        let Some(assignments) = assignments.as_object() else {
            continue;
        };
        let section_max = maxima.get(section).and_then(Value::as_object);
        let mut out = Map::new();
        for (assignment, cell) in assignments {
            let max_cell = section_max
                .and_then(|m| m.get(assignment))
                .cloned()
                .unwrap_or(Value::Null);
            out.insert(
                assignment.clone(),
                json!({ "student": cell.clone(), "max": max_cell }),
            );
        }
        merged.insert(section.clone(), Value::Object(out));
    }
    merged
}
