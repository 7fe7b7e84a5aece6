pub mod grades;
pub mod mastery;
pub mod projection;
pub mod stats;
pub mod topics;

use serde_json::{Map, Value};

/// A score record as stored: section name -> { assignment name -> cell }.
/// One record per student email, plus the "MAX POINTS" sentinel record
/// holding per-assignment maxima.
pub type ScoreRecord = Map<String, Value>;

/// Reads a score cell as a number. Null, blank and non-numeric cells are
/// not scores; numeric strings (as exported from the spreadsheet) are.
pub fn numeric_score(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                t.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Numeric value of a cell for accumulation: anything that is not a valid
/// score counts as zero, so a stray blank can never poison a sum.
pub fn score_or_zero(cell: &Value) -> f64 {
    numeric_score(cell).unwrap_or(0.0)
}
