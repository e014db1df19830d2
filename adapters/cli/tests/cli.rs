use std::{
    fs,
    path::PathBuf,
    process::{Command, Output},
};

use serde_json::Value;

const CORRIDOR: &str = r#"
[grid]
size = 3
start = { row = 1, col = 0, direction = "right" }
end = { row = 1, col = 2, direction = "left" }

[[pipes]]
row = 1
col = 1
type = "straight"
rotation = 90
"#;

/// `{"start":{"row":0,"col":0,"direction":"right"},"end":{"row":0,"col":1,"direction":"left"},"pipes":[]}`
const TWO_CELL_PAYLOAD: &str = "eyJzdGFydCI6eyJyb3ciOjAsImNvbCI6MCwiZGlyZWN0aW9uIjoicmlnaHQifSwiZW5kIjp7InJvdyI6MCwiY29sIjoxLCJkaXJlY3Rpb24iOiJsZWZ0In0sInBpcGVzIjpbXX0";

fn pipeflow(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pipeflow"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to invoke the pipeflow binary")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "pipeflow failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("stdout is utf-8")
}

fn layout_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "pipeflow-{}-{name}.toml",
        std::process::id()
    ));
    fs::write(&path, contents).expect("temp layout is writable");
    path
}

#[test]
fn levels_lists_the_builtin_catalog() {
    let output = stdout(&pipeflow(&["levels", "--format", "json"]));
    let levels: Value = serde_json::from_str(&output).expect("levels print as json");
    let levels = levels.as_array().expect("levels print as an array");

    assert_eq!(levels.len(), 10);
    assert_eq!(levels[0]["size"], 10);
    assert_eq!(levels[9]["size"], 16);
    assert_eq!(levels[0]["flow_ms"], serde_json::json!([5000, 3000, 1000]));
}

#[test]
fn queue_is_reproducible_for_a_seed() {
    let first = stdout(&pipeflow(&["queue", "--seed", "3", "--count", "5"]));
    let second = stdout(&pipeflow(&["queue", "--seed", "3", "--count", "5"]));

    assert_eq!(first, second);
    assert_eq!(first.lines().count(), 5);
}

#[test]
fn run_solves_a_layout_file() {
    let path = layout_file("solve", CORRIDOR);
    let output = stdout(&pipeflow(&[
        "run",
        "--layout",
        path.to_str().expect("temp path is utf-8"),
        "--difficulty",
        "hard",
        "--format",
        "json",
    ]));
    let _ = fs::remove_file(&path);

    let report: Value = serde_json::from_str(&output).expect("report prints as json");
    assert_eq!(report["outcome"], "success");
    assert_eq!(report["difficulty"], "hard");
    assert_eq!(report["score"], 2 * 10 + 269);
    assert_eq!(
        report["path"],
        serde_json::json!([{ "row": 1, "col": 1 }, { "row": 1, "col": 2 }])
    );
}

#[test]
fn share_string_replays_the_same_outcome() {
    let path = layout_file("share", CORRIDOR);
    let encoded = stdout(&pipeflow(&[
        "encode",
        "--layout",
        path.to_str().expect("temp path is utf-8"),
    ]));
    let _ = fs::remove_file(&path);
    let encoded = encoded.trim();
    assert!(encoded.starts_with("pipe:v1:3:"), "unexpected share string {encoded}");

    let output = stdout(&pipeflow(&[
        "run",
        "--layout-string",
        encoded,
        "--difficulty",
        "hard",
        "--fast",
        "--format",
        "json",
    ]));
    let report: Value = serde_json::from_str(&output).expect("report prints as json");
    assert_eq!(report["outcome"], "success");
    assert_eq!(report["score"], 2 * 10 + 270);

    let decoded = stdout(&pipeflow(&["decode", "--layout-string", encoded]));
    assert!(decoded.contains("size = 3"), "unexpected toml {decoded}");
}

#[test]
fn empty_level_fails_without_points() {
    let output = stdout(&pipeflow(&["run", "--level", "1"]));

    assert!(output.contains("fail"), "unexpected report {output}");
    assert!(output.contains("score: 0"), "unexpected report {output}");
}

#[test]
fn invalid_layouts_exit_with_an_error() {
    let path = layout_file("invalid", "level = 99\n");
    let output = pipeflow(&[
        "run",
        "--layout",
        path.to_str().expect("temp path is utf-8"),
    ]);
    let _ = fs::remove_file(&path);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown level 99"));

    let output = pipeflow(&["run", "--layout-string", "maze:v1:3:e30"]);
    assert!(!output.status.success());
}

#[test]
fn oversized_grids_are_refused_before_allocation() {
    let encoded = format!("pipe:v1:100000:{TWO_CELL_PAYLOAD}");
    let output = pipeflow(&["run", "--layout-string", &encoded]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("exceeds the maximum of 64"));

    let path = layout_file("oversized", &CORRIDOR.replace("size = 3", "size = 100000"));
    let output = pipeflow(&[
        "run",
        "--layout",
        path.to_str().expect("temp path is utf-8"),
    ]);
    let _ = fs::remove_file(&path);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("exceeds the maximum of 64"));
}
