use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradeviewd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradeviewd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

const SCORES_CSV: &str = "\
Email,Legal Name,Iteration,Recursion,Abstraction,Data
CATEGORY,,Concepts,Concepts,Concepts,Concepts
MAX POINTS,MAX POINTS,100,100,100,0
ada@school.edu,Ada Lovelace,40,100,0,5
";

fn seeded_session(workspace: &PathBuf) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let sheet = workspace.join("scores.csv");
    std::fs::write(&sheet, SCORES_CSV).expect("write scores sheet");

    let (child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "setup-1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "setup-2",
        "ingest.scores",
        json!({ "path": sheet.to_string_lossy() }),
    );
    (child, stdin, reader)
}

#[test]
fn mastery_mapping_with_default_level_schema() {
    let workspace = temp_dir("gradeview-mastery-default");
    let (mut child, mut stdin, mut reader) = seeded_session(&workspace);

    let mapping = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "student.masteryMapping",
        json!({ "email": "ada@school.edu" }),
    );

    // Five interior levels: 40/100 scales to exactly 2.0, which enters
    // level 3 rather than completing level 2.
    assert_eq!(mapping["Iteration"]["student_mastery"], 3);
    // Meeting the max is num_levels + 1.
    assert_eq!(mapping["Recursion"]["student_mastery"], 6);
    // No points is level 0.
    assert_eq!(mapping["Abstraction"]["student_mastery"], 0);
    // Points toward a topic with nothing achievable guard to level 0.
    assert_eq!(mapping["Data"]["student_mastery"], 0);
    for topic in ["Iteration", "Recursion", "Abstraction", "Data"] {
        assert_eq!(mapping[topic]["class_mastery"], 0);
    }

    let missing = request(
        &mut stdin,
        &mut reader,
        "2",
        "student.masteryMapping",
        json!({ "email": "nobody@school.edu" }),
    );
    assert_eq!(missing.get("ok"), Some(&json!(false)));
    assert_eq!(
        missing["error"]["code"].as_str(),
        Some("not_found"),
        "unknown students are a no-data condition, not infrastructure"
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn mastery_mapping_follows_installed_outline_schema() {
    let workspace = temp_dir("gradeview-mastery-outline");
    // Two interior levels instead of the default five.
    let outline = json!({
        "name": "CS10",
        "start date": "1/21/2026",
        "student levels": ["None", "Developing", "Mastered", "Beyond"],
        "nodes": {
            "id": 1,
            "name": "CS10",
            "parent": "null",
            "children": [
                {
                    "id": 2,
                    "name": "Concepts",
                    "parent": "CS10",
                    "children": [
                        { "id": 201, "name": "Iteration", "parent": "Concepts", "children": [] },
                        { "id": 202, "name": "Recursion", "parent": "Concepts", "children": [] }
                    ]
                }
            ]
        }
    });
    std::fs::write(
        workspace.join("outline.json"),
        serde_json::to_string_pretty(&outline).expect("serialize outline"),
    )
    .expect("write outline");

    let (mut child, mut stdin, mut reader) = seeded_session(&workspace);

    let mapping = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "student.masteryMapping",
        json!({ "email": "ada@school.edu" }),
    );
    // 40/100 * 2 = 0.8 rounds up into level 1.
    assert_eq!(mapping["Iteration"]["student_mastery"], 1);
    assert_eq!(mapping["Recursion"]["student_mastery"], 3);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn concept_structure_annotates_the_outline_tree() {
    let workspace = temp_dir("gradeview-concept-structure");
    let (mut child, mut stdin, mut reader) = seeded_session(&workspace);

    let structure = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "student.conceptStructure",
        json!({ "email": "ada@school.edu" }),
    );

    assert!(structure.get("name").and_then(|v| v.as_str()).is_some());
    assert!(structure.get("start date").and_then(|v| v.as_str()).is_some());

    let nodes = structure.get("nodes").expect("outline nodes");
    assert_eq!(nodes["id"], 1);
    let sections = nodes["children"].as_array().expect("section nodes");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["name"], "Concepts");

    let leaves = sections[0]["children"].as_array().expect("leaf nodes");
    assert_eq!(leaves.len(), 4);
    assert_eq!(leaves[0]["name"], "Iteration");
    assert_eq!(leaves[0]["data"]["student_mastery"], 3);
    assert_eq!(leaves[0]["data"]["week"], 0);
    assert_eq!(leaves[1]["data"]["student_mastery"], 6);
    assert_eq!(leaves[2]["data"]["student_mastery"], 0);

    // A student with no record yet reads as an unannotated (all-zero) tree,
    // not as an error.
    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "student.conceptStructure",
        json!({ "email": "new@school.edu" }),
    );
    let leaves = empty["nodes"]["children"][0]["children"]
        .as_array()
        .expect("leaf nodes");
    assert!(leaves[0]["data"].get("student_mastery").is_none());

    drop(stdin);
    let _ = child.wait();
}
