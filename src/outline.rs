use std::path::Path;

use anyhow::Context;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::topics::TopicIndex;

pub const OUTLINE_FILE: &str = "outline.json";

/// Bookended level schema: the first and last entries are the "no evidence"
/// and "beyond mastery" endpoints, so the interior count is len - 2.
pub const DEFAULT_STUDENT_LEVELS: [&str; 7] = [
    "No Evidence",
    "Beginning",
    "Developing",
    "Approaching",
    "Proficient",
    "Mastered",
    "Exceeds Mastery",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineNode {
    pub id: i64,
    pub name: String,
    pub parent: String,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// Progress-report outline: the concept tree students see, plus the level
/// schema the classifier is configured from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outline {
    pub name: String,
    #[serde(rename = "start date")]
    pub start_date: String,
    #[serde(rename = "student levels", default)]
    pub student_levels: Vec<String>,
    pub nodes: OutlineNode,
}

/// Interior level count for a bookended schema. None when the schema cannot
/// define a classifier (fewer than three levels).
pub fn level_count(levels: &[String]) -> Option<u32> {
    let n = levels.len().checked_sub(2)?;
    if n == 0 {
        None
    } else {
        Some(n as u32)
    }
}

pub fn default_levels() -> Vec<String> {
    DEFAULT_STUDENT_LEVELS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Reads the static outline from the workspace, if one was installed.
pub fn load(workspace: &Path) -> anyhow::Result<Option<Outline>> {
    let path = workspace.join(OUTLINE_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read outline {}", path.to_string_lossy()))?;
    let outline: Outline = serde_json::from_str(&text)
        .with_context(|| format!("outline {} is invalid JSON", path.to_string_lossy()))?;
    Ok(Some(outline))
}

/// Builds an outline dynamically from the maxima record when no static one
/// exists: one child per section, one leaf per assignment.
pub fn from_max_record(course: &str, maxima: &Map<String, Value>) -> Outline {
    let mut children = Vec::new();
    for (section_idx, (section, assignments)) in maxima.iter().enumerate() {
        let section_id = section_idx as i64 + 2;
        let mut leaves = Vec::new();
        if let Some(assignments) = assignments.as_object() {
            for (assignment_idx, assignment) in assignments.keys().enumerate() {
                let mut data = Map::new();
                data.insert("week".to_string(), Value::from(0));
                leaves.push(OutlineNode {
                    id: section_id * 100 + assignment_idx as i64 + 1,
                    name: assignment.clone(),
                    parent: section.clone(),
                    children: Vec::new(),
                    data: Some(data),
                });
            }
        }
        children.push(OutlineNode {
            id: section_id,
            name: section.clone(),
            parent: course.to_string(),
            children: leaves,
            data: None,
        });
    }

    let today = chrono::Local::now();
    Outline {
        name: course.to_string(),
        start_date: format!("{}/{}/{}", today.month(), today.day(), today.year()),
        student_levels: default_levels(),
        nodes: OutlineNode {
            id: 1,
            name: course.to_string(),
            parent: "null".to_string(),
            children,
            data: None,
        },
    }
}

impl Outline {
    pub fn num_levels(&self) -> Option<u32> {
        level_count(&self.student_levels)
    }

    /// Topic membership for the aggregator: every leaf is its own topic.
    /// Assignments the outline does not know about stay their own topic via
    /// the index's identity fallback.
    pub fn topic_index(&self) -> TopicIndex {
        let mut pairs = Vec::new();
        collect_leaf_topics(&self.nodes, &mut pairs);
        TopicIndex::from_pairs(pairs)
    }

    /// A copy of the tree with mastery entries merged into the `data` of
    /// every node whose name has a mastery mapping.
    pub fn annotated(&self, mastery: &Map<String, Value>) -> OutlineNode {
        annotate_node(&self.nodes, mastery)
    }
}

fn collect_leaf_topics(node: &OutlineNode, pairs: &mut Vec<(String, String)>) {
    if node.children.is_empty() {
        pairs.push((node.name.clone(), node.name.clone()));
        return;
    }
    for child in &node.children {
        collect_leaf_topics(child, pairs);
    }
}

fn annotate_node(node: &OutlineNode, mastery: &Map<String, Value>) -> OutlineNode {
    let mut out = node.clone();
    if let Some(entry) = mastery.get(&node.name).and_then(Value::as_object) {
        let data = out.data.get_or_insert_with(Map::new);
        for (k, v) in entry {
            data.insert(k.clone(), v.clone());
        }
    }
    out.children = node
        .children
        .iter()
        .map(|child| annotate_node(child, mastery))
        .collect();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn maxima() -> Map<String, Value> {
        json!({
            "Labs": { "Lab 1": 10, "Lab 2": 10 },
            "Quest": { "Quest 1": 100 }
        })
        .as_object()
        .cloned()
        .expect("maxima object")
    }

    #[test]
    fn level_count_requires_interior_levels() {
        let levels: Vec<String> = vec!["lo".into(), "hi".into()];
        assert_eq!(level_count(&levels), None);
        assert_eq!(level_count(&default_levels()), Some(5));
        assert_eq!(level_count(&[]), None);
    }

    #[test]
    fn dynamic_outline_mirrors_the_maxima_record() {
        let outline = from_max_record("CS10", &maxima());
        assert_eq!(outline.nodes.id, 1);
        assert_eq!(outline.nodes.children.len(), 2);

        let labs = &outline.nodes.children[0];
        assert_eq!(labs.name, "Labs");
        assert_eq!(labs.parent, "CS10");
        assert_eq!(labs.id, 2);
        assert_eq!(labs.children.len(), 2);
        assert_eq!(labs.children[0].name, "Lab 1");
        assert_eq!(labs.children[0].id, 201);
        assert_eq!(labs.children[1].id, 202);

        let quest = &outline.nodes.children[1];
        assert_eq!(quest.id, 3);
        assert_eq!(quest.children[0].id, 301);
        assert_eq!(outline.num_levels(), Some(5));
    }

    #[test]
    fn annotation_merges_mastery_into_matching_nodes() {
        let outline = from_max_record("CS10", &maxima());
        let mastery = json!({
            "Lab 1": { "student_mastery": 4, "class_mastery": 0 },
            "Quest 1": { "student_mastery": 6, "class_mastery": 0 }
        })
        .as_object()
        .cloned()
        .expect("mastery object");

        let annotated = outline.annotated(&mastery);
        let lab1 = &annotated.children[0].children[0];
        let data = lab1.data.as_ref().expect("annotated data");
        assert_eq!(data.get("student_mastery"), Some(&Value::from(4)));
        assert_eq!(data.get("week"), Some(&Value::from(0)));

        // Unmatched nodes keep their data untouched.
        let lab2 = &annotated.children[0].children[1];
        assert!(lab2
            .data
            .as_ref()
            .expect("leaf data")
            .get("student_mastery")
            .is_none());
    }

    #[test]
    fn topic_index_covers_every_leaf() {
        let outline = from_max_record("CS10", &maxima());
        let index = outline.topic_index();
        assert_eq!(index.topic_for("Lab 1"), "Lab 1");
        assert_eq!(index.topic_for("Unlisted"), "Unlisted");
    }
}
