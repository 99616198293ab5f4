use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn blocks(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blocks"))
        .args(args)
        .arg("--no-color")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch blocks binary")
}

fn cases() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("cases")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const REPEAT: &str = r#"{"version":1,"roots":[{"x":0,"y":0,"block":{"type":"repeat",
"slots":{"input1":{"literal":"2"}},"children":[{"type":"print","slots":{"input1":{"literal":"hey"}}}]}}]}"#;

fn write_snapshot(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("workspace.json");
    std::fs::write(&path, json).unwrap();
    path
}

#[test]
fn case_files_pass() {
    let output = blocks(&["test", cases().to_str().unwrap()]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn run_prints_output_and_display() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_snapshot(dir.path(), REPEAT);
    let output = blocks(&["run", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "hey\nhey\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("for (let i0 = 0; i0 < 2; i0++) {"));
}

#[test]
fn run_tree_shows_outline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_snapshot(dir.path(), REPEAT);
    let output = blocks(&["run", "--tree", path.to_str().unwrap()]);
    assert_eq!(stdout(&output), "(0, 0) Repeat [2] times\n  Print [hey]\n");
}

#[test]
fn compile_prints_either_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_snapshot(dir.path(), REPEAT);
    let display = stdout(&blocks(&["compile", path.to_str().unwrap()]));
    assert!(!display.contains("__loop_guard"));
    let executable = stdout(&blocks(&["compile", "--executable", path.to_str().unwrap()]));
    assert!(executable.starts_with("let __loop_guard = 0;\n"));
}

#[test]
fn share_token_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_snapshot(dir.path(), REPEAT);
    let token = stdout(&blocks(&["share", path.to_str().unwrap()]));
    let decoded = blocks(&["share", "--decode", token.trim()]);
    assert!(decoded.status.success());
    let json = stdout(&decoded);
    assert!(json.contains("\"repeat\""));
    assert!(json.contains("\"hey\""));
}

#[test]
fn palette_lists_blocks() {
    let output = stdout(&blocks(&["palette"]));
    let types: Vec<&str> = output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(
        types,
        vec!["print", "alert", "value", "confirm", "prompt", "repeat", "forever", "add_sprite"]
    );
}

#[test]
fn broken_snapshot_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_snapshot(dir.path(), "{\"version\":1,");
    let output = blocks(&["run", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot load"));
}

#[test]
fn config_file_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "seed = 11\n[canvas]\nenabled = false\n").unwrap();
    let path = write_snapshot(
        dir.path(),
        r#"{"version":1,"roots":[{"x":0,"y":0,"block":{"type":"add_sprite","slots":{"imageinput1":{"literal":"cat.png"}}}}],"assets":{"cat.png":"AAAA"}}"#,
    );
    let output = blocks(&["--config", config.to_str().unwrap(), "run", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Canvas not found! Cannot draw sprite."));

    let missing = dir.path().join("missing.toml");
    let output = blocks(&["--config", missing.to_str().unwrap(), "palette"]);
    assert_eq!(output.status.code(), Some(2));
}
