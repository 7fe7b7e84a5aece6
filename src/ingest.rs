use std::path::Path;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::store::{Store, BINS_KEY, CATEGORIES_KEY, MAX_POINTS_KEY};

/// Row whose Email column carries the per-assignment section names instead
/// of a student identity.
const CATEGORY_ROW: &str = "CATEGORY";

const EMAIL_COLUMN: &str = "Email";
const NAME_COLUMN: &str = "Legal Name";

#[derive(Debug, Clone)]
pub struct ScoresIngest {
    pub run_id: String,
    pub students: usize,
    pub assignments: usize,
}

#[derive(Debug, Clone)]
pub struct BinsIngest {
    pub run_id: String,
    pub bins: usize,
}

/// A score cell as exported: numbers stay numbers, everything else is kept
/// verbatim so a blank stays distinguishable from a zero.
fn parse_cell(raw: &str) -> Value {
    let t = raw.trim();
    if let Ok(n) = t.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(n) = t.parse::<f64>() {
        return Value::from(n);
    }
    Value::from(raw)
}

/// Ingests the gradebook export: a header row of assignment names, a
/// CATEGORY row mapping each assignment to its section, a MAX POINTS row,
/// and one row per student. Writes one document per student, the MAX POINTS
/// sentinel, and the Categories document.
pub fn ingest_scores(store: &Store, path: &Path) -> anyhow::Result<ScoresIngest> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open scores sheet {}", path.to_string_lossy()))?;

    let headers = reader.headers().context("scores sheet has no header row")?;
    if headers.get(0) != Some(EMAIL_COLUMN) || headers.get(1) != Some(NAME_COLUMN) {
        bail!(
            "scores sheet must start with {:?},{:?} columns",
            EMAIL_COLUMN,
            NAME_COLUMN
        );
    }
    let assignments: Vec<String> = headers.iter().skip(2).map(|h| h.to_string()).collect();
    if assignments.is_empty() {
        bail!("scores sheet has no assignment columns");
    }

    let mut categories: Option<Vec<String>> = None;
    let mut student_rows: Vec<(String, String, Vec<Value>)> = Vec::new();

    for record in reader.records() {
        let record = record.context("failed to read scores row")?;
        let email = record.get(0).unwrap_or_default().trim().to_string();
        if email.is_empty() {
            continue;
        }
        let cells: Vec<Value> = (0..assignments.len())
            .map(|i| parse_cell(record.get(i + 2).unwrap_or_default()))
            .collect();

        if email == CATEGORY_ROW {
            categories = Some(
                cells
                    .iter()
                    .map(|c| match c {
                        Value::String(s) => s.trim().to_string(),
                        other => other.to_string(),
                    })
                    .collect(),
            );
            continue;
        }

        let name = record.get(1).unwrap_or_default().trim().to_string();
        student_rows.push((email, name, cells));
    }

    let categories =
        categories.ok_or_else(|| anyhow!("scores sheet is missing the CATEGORY row"))?;
    let max_row = student_rows
        .iter()
        .find(|(email, _, _)| email == MAX_POINTS_KEY)
        .ok_or_else(|| anyhow!("scores sheet is missing the MAX POINTS row"))?
        .clone();

    let mut students = 0usize;
    for (email, name, cells) in &student_rows {
        let doc = json!({
            "Legal Name": name,
            "Assignments": sections_from_row(&categories, &assignments, cells),
        });
        store
            .put_document(email, &doc)
            .with_context(|| format!("failed to store record for {}", email))?;
        if email != MAX_POINTS_KEY {
            students += 1;
        }
    }

    // Categories document: section -> { assignment -> max points }.
    let catalog = sections_from_row(&categories, &assignments, &max_row.2);
    store
        .put_document(CATEGORIES_KEY, &Value::Object(catalog))
        .context("failed to store Categories document")?;

    let run_id = store
        .record_ingest_run("scores", students, assignments.len())
        .context("failed to record ingest run")?;
    info!(%run_id, students, assignments = assignments.len(), "scores ingest complete");

    Ok(ScoresIngest {
        run_id,
        students,
        assignments: assignments.len(),
    })
}

fn sections_from_row(
    categories: &[String],
    assignments: &[String],
    cells: &[Value],
) -> Map<String, Value> {
    let mut sections: Map<String, Value> = Map::new();
    for ((category, assignment), cell) in categories.iter().zip(assignments).zip(cells) {
        let section = sections
            .entry(category.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(section) = section.as_object_mut() {
            section.insert(assignment.clone(), cell.clone());
        }
    }
    sections
}

#[derive(Debug, Deserialize)]
struct BinRow {
    letter: String,
    points: f64,
}

/// Ingests the grade-bin sheet (`letter,points` rows). Bins are stored
/// ascending by threshold; the last one doubles as the course-total answer.
pub fn ingest_bins(store: &Store, path: &Path) -> anyhow::Result<BinsIngest> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open bins sheet {}", path.to_string_lossy()))?;

    let mut rows: Vec<BinRow> = Vec::new();
    for result in reader.deserialize::<BinRow>() {
        let row = result.context("failed to read bins row")?;
        if row.letter.trim().is_empty() {
            continue;
        }
        rows.push(row);
    }
    if rows.is_empty() {
        bail!("bins sheet has no usable rows");
    }
    rows.sort_by(|a, b| a.points.total_cmp(&b.points));

    let bins: Vec<Value> = rows
        .iter()
        .map(|r| json!({ "letter": r.letter.trim(), "points": r.points }))
        .collect();
    let total = rows.last().map(|r| r.points).unwrap_or(0.0);
    let doc = json!({ "bins": bins, "totalCoursePoints": total });
    store
        .put_document(BINS_KEY, &doc)
        .context("failed to store bins document")?;

    let run_id = store
        .record_ingest_run("bins", 0, rows.len())
        .context("failed to record ingest run")?;
    info!(%run_id, bins = rows.len(), "bins ingest complete");

    Ok(BinsIngest {
        run_id,
        bins: rows.len(),
    })
}
