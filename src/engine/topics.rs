use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{score_or_zero, ScoreRecord};

/// Topic membership metadata taken from the progress-report outline.
/// Assignments the outline says nothing about are their own topic, which is
/// the common case: the gradebook columns are named after concepts.
#[derive(Debug, Clone, Default)]
pub struct TopicIndex {
    by_assignment: HashMap<String, String>,
}

impl TopicIndex {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            by_assignment: pairs.into_iter().collect(),
        }
    }

    pub fn topic_for<'a>(&'a self, assignment: &'a str) -> &'a str {
        self.by_assignment
            .get(assignment)
            .map(String::as_str)
            .unwrap_or(assignment)
    }
}

/// Folds every (section, assignment, cell) triple of a record into per-topic
/// point totals. Accumulation is commutative; the output map keeps the
/// first-seen order of topics so responses read like the record they came
/// from. The input record is never mutated.
pub fn topic_points(record: &ScoreRecord, topics: &TopicIndex) -> Map<String, Value> {
    let mut table = Map::new();
    for assignments in record.values() {
        let Some(assignments) = assignments.as_object() else {
            continue;
        };
        for (assignment, cell) in assignments {
            let topic = topics.topic_for(assignment);
            let points = score_or_zero(cell);
            let total = table.get(topic).and_then(Value::as_f64).unwrap_or(0.0);
            table.insert(topic.to_string(), Value::from(total + points));
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> ScoreRecord {
        json!({
            "Labs": { "Lab 1": 4, "Lab 2": "", "Lab 3": "6" },
            "Quest": { "Quest 1": 20 },
            "Midterm": { "Lab 1": 2 }
        })
        .as_object()
        .cloned()
        .expect("record object")
    }

    #[test]
    fn sums_per_topic_with_blanks_as_zero() {
        let totals = topic_points(&record(), &TopicIndex::default());
        assert_eq!(totals.get("Lab 1").and_then(Value::as_f64), Some(6.0));
        assert_eq!(totals.get("Lab 2").and_then(Value::as_f64), Some(0.0));
        assert_eq!(totals.get("Lab 3").and_then(Value::as_f64), Some(6.0));
        assert_eq!(totals.get("Quest 1").and_then(Value::as_f64), Some(20.0));
    }

    #[test]
    fn outline_can_redirect_assignments_into_one_topic() {
        let index = TopicIndex::from_pairs([
            ("Lab 1".to_string(), "Iteration".to_string()),
            ("Lab 3".to_string(), "Iteration".to_string()),
        ]);
        let totals = topic_points(&record(), &index);
        assert_eq!(totals.get("Iteration").and_then(Value::as_f64), Some(12.0));
        assert!(totals.get("Lab 1").is_none());
        assert_eq!(totals.get("Quest 1").and_then(Value::as_f64), Some(20.0));
    }

    #[test]
    fn aggregation_is_idempotent_and_does_not_mutate_input() {
        let rec = record();
        let snapshot = rec.clone();
        let first = topic_points(&rec, &TopicIndex::default());
        let second = topic_points(&rec, &TopicIndex::default());
        assert_eq!(first, second);
        assert_eq!(rec, snapshot);
    }

    #[test]
    fn output_order_mirrors_record_iteration_order() {
        let totals = topic_points(&record(), &TopicIndex::default());
        let keys: Vec<&str> = totals.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Lab 1", "Lab 2", "Lab 3", "Quest 1"]);
    }
}
