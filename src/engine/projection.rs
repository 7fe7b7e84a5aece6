use serde::Serialize;
use serde_json::Value;

use super::{score_or_zero, ScoreRecord};

/// Course-end projections for one student.
///
/// `zeros` assumes no further points, `perfect` assumes full marks on
/// everything remaining, `pace` extrapolates the current rate linearly.
/// `pace` is `None` when nothing has been achievable yet; serializing it as
/// null is the defined "no data" answer, never a division fault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub zeros: i64,
    pub pace: Option<i64>,
    pub perfect: i64,
}

pub fn project(current: f64, max_so_far: f64, course_max: f64) -> Projection {
    let pace = if max_so_far > 0.0 {
        Some((current / max_so_far * course_max).round() as i64)
    } else {
        None
    };
    Projection {
        zeros: current.round() as i64,
        pace,
        perfect: (current + (course_max - max_so_far)).round() as i64,
    }
}

/// Total points accumulated across every assignment in a record.
pub fn total_points(record: &ScoreRecord) -> f64 {
    record
        .values()
        .filter_map(Value::as_object)
        .flat_map(|assignments| assignments.values())
        .map(score_or_zero)
        .sum()
}

/// Maximum points achievable over exactly the assignments present in the
/// subject's record. Assignments the maxima record does not know about
/// contribute nothing.
pub fn max_points_so_far(subject: &ScoreRecord, maxima: &ScoreRecord) -> f64 {
    let mut total = 0.0;
    for (section, assignments) in subject {
        let Some(assignments) = assignments.as_object() else {
            continue;
        };
        let section_max = maxima.get(section).and_then(Value::as_object);
        for assignment in assignments.keys() {
            let max_cell = section_max.and_then(|m| m.get(assignment));
            total += max_cell.map(score_or_zero).unwrap_or(0.0);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_record(v: serde_json::Value) -> ScoreRecord {
        v.as_object().cloned().expect("record object")
    }

    #[test]
    fn projects_zeros_pace_and_perfect() {
        let p = project(50.0, 100.0, 500.0);
        assert_eq!(p.zeros, 50);
        assert_eq!(p.pace, Some(250));
        assert_eq!(p.perfect, 450);
    }

    #[test]
    fn no_achievable_points_yet_yields_null_pace() {
        let p = project(0.0, 0.0, 500.0);
        assert_eq!(p.zeros, 0);
        assert_eq!(p.pace, None);
        assert_eq!(p.perfect, 500);
    }

    #[test]
    fn projections_round_to_whole_points() {
        let p = project(33.4, 60.0, 100.0);
        assert_eq!(p.zeros, 33);
        assert_eq!(p.pace, Some(56));
        assert_eq!(p.perfect, 73);
    }

    #[test]
    fn total_points_skips_blank_cells() {
        let rec = as_record(json!({
            "Labs": { "Lab 1": 4, "Lab 2": "", "Lab 3": "6" },
            "Quest": { "Quest 1": null }
        }));
        assert_eq!(total_points(&rec), 10.0);
    }

    #[test]
    fn max_so_far_follows_the_subject_record() {
        let subject = as_record(json!({
            "Labs": { "Lab 1": 4, "Lab 2": "" }
        }));
        let maxima = as_record(json!({
            "Labs": { "Lab 1": 10, "Lab 2": 10, "Lab 9": 50 },
            "Quest": { "Quest 1": 100 }
        }));
        // Lab 9 and Quest 1 are not in the subject record; they are not
        // achievable "so far".
        assert_eq!(max_points_so_far(&subject, &maxima), 20.0);
    }

    #[test]
    fn max_so_far_with_maxima_as_subject_covers_everything() {
        let maxima = as_record(json!({
            "Labs": { "Lab 1": 10, "Lab 2": 10 },
            "Quest": { "Quest 1": 100 }
        }));
        assert_eq!(max_points_so_far(&maxima, &maxima), 120.0);
    }
}
