use std::fmt;
use std::path::Path;

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key of the sentinel record holding per-assignment maxima.
pub const MAX_POINTS_KEY: &str = "MAX POINTS";
pub const CATEGORIES_KEY: &str = "Categories";
pub const BINS_KEY: &str = "bins";

pub const DB_FILE: &str = "gradeview.sqlite3";

const ADMINS_SETTING: &str = "admins";

/// Store failures, kept as distinct kinds so callers can tell "no such
/// record" from "record exists but is garbage" from "the store itself is
/// broken". Matched by kind, never by message text.
#[derive(Debug)]
pub enum StoreError {
    NotFound { key: String },
    Malformed { key: String, detail: String },
    Backend(rusqlite::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { key } => write!(f, "no entry for key {:?}", key),
            StoreError::Malformed { key, detail } => {
                write!(f, "malformed entry for key {:?}: {}", key, detail)
            }
            StoreError::Backend(e) => write!(f, "store backend failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e)
    }
}

fn malformed(key: &str, detail: impl Into<String>) -> StoreError {
    StoreError::Malformed {
        key: key.to_string(),
        detail: detail.into(),
    }
}

/// The score store: one JSON document per key in a single keyspace, exactly
/// the upstream key-value layout (student records by email, plus the
/// `MAX POINTS`, `Categories` and `bins` documents).
pub struct Store {
    conn: Connection,
}

pub fn open(workspace: &Path) -> anyhow::Result<Store> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open store {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            key TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ingest_runs(
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            started_at TEXT NOT NULL,
            students INTEGER NOT NULL,
            assignments INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(Store { conn })
}

impl Store {
    pub fn put_document(&self, key: &str, body: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(body).map_err(|e| malformed(key, e.to_string()))?;
        self.conn.execute(
            "INSERT INTO documents(key, body, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            (key, text, chrono::Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    pub fn get_document(&self, key: &str) -> Result<Value, StoreError> {
        if key.trim().is_empty() {
            return Err(malformed(key, "blank key"));
        }
        let body: Option<String> = self
            .conn
            .query_row("SELECT body FROM documents WHERE key = ?", [key], |r| {
                r.get(0)
            })
            .optional()?;
        let Some(body) = body else {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        };
        serde_json::from_str(&body).map_err(|e| malformed(key, e.to_string()))
    }

    /// The `Assignments` sections of a student document. The caller decides
    /// whether NotFound means "not enrolled" or "infrastructure broken";
    /// here they stay distinct.
    pub fn student_scores(&self, email: &str) -> Result<Map<String, Value>, StoreError> {
        let doc = self.get_document(email)?;
        doc.get("Assignments")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| malformed(email, "missing Assignments object"))
    }

    pub fn max_scores(&self) -> Result<Map<String, Value>, StoreError> {
        self.student_scores(MAX_POINTS_KEY)
    }

    /// Every enrolled student, as (legal name, email), in stable key order.
    /// Student keys are the ones that look like emails, which keeps the
    /// sentinel and catalog documents out of the roster.
    pub fn students(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, body FROM documents WHERE key LIKE '%@%' ORDER BY key")?;
        let rows = stmt.query_map([], |r| {
            let key: String = r.get(0)?;
            let body: String = r.get(1)?;
            Ok((key, body))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (key, body) = row?;
            let doc: Value =
                serde_json::from_str(&body).map_err(|e| malformed(&key, e.to_string()))?;
            let name = doc
                .get("Legal Name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            out.push((name, key));
        }
        Ok(out)
    }

    pub fn categories(&self) -> Result<Value, StoreError> {
        self.get_document(CATEGORIES_KEY)
    }

    pub fn bins(&self) -> Result<Value, StoreError> {
        self.get_document(BINS_KEY)
    }

    /// Maximum achievable total for the whole course: the top grade-bin
    /// threshold, as the upstream store defined it.
    pub fn total_possible_score(&self) -> Result<f64, StoreError> {
        let doc = self.bins()?;
        doc.get("bins")
            .and_then(Value::as_array)
            .and_then(|bins| bins.last())
            .and_then(|bin| bin.get("points"))
            .and_then(Value::as_f64)
            .ok_or_else(|| malformed(BINS_KEY, "missing or empty bins array"))
    }

    pub fn set_admins(&self, emails: &[String]) -> Result<(), StoreError> {
        let value = serde_json::to_string(emails)
            .map_err(|e| malformed(ADMINS_SETTING, e.to_string()))?;
        self.conn.execute(
            "INSERT INTO settings(key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (ADMINS_SETTING, value),
        )?;
        Ok(())
    }

    pub fn is_admin(&self, email: &str) -> Result<bool, StoreError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                [ADMINS_SETTING],
                |r| r.get(0),
            )
            .optional()?;
        let Some(value) = value else {
            return Ok(false);
        };
        let emails: Vec<String> = serde_json::from_str(&value)
            .map_err(|e| malformed(ADMINS_SETTING, e.to_string()))?;
        Ok(emails.iter().any(|e| e.eq_ignore_ascii_case(email)))
    }

    /// Audit row for one ingest run; returns the run id.
    pub fn record_ingest_run(
        &self,
        kind: &str,
        students: usize,
        assignments: usize,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO ingest_runs(id, kind, started_at, students, assignments)
             VALUES (?, ?, ?, ?, ?)",
            (
                &id,
                kind,
                chrono::Utc::now().to_rfc3339(),
                students as i64,
                assignments as i64,
            ),
        )?;
        Ok(id)
    }
}
