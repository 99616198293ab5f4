//! Runner for `.test.blocks` case files.
//!
//! A case file is TOML frontmatter between `---` lines, followed by a saved
//! workspace as JSON:
//!
//! ```text
//! ---
//! description = "print shows its default text"
//! expect_output = "Hello World!"
//! ---
//! { "version": 1, "roots": [ ... ] }
//! ```
//!
//! The body is restored into a fresh workspace and run against a
//! `BufferHost`; the frontmatter lists what the run must produce.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use blocks::{RunReport, Workspace};
use interpreter::{BufferHost, DiagnosticError};

/// Test files are recognised by this suffix.
pub const TEST_SUFFIX: &str = ".test.blocks";

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based line of the
    /// generated program.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Printed lines, newline joined (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// The program's display text (trimmed comparison).
    #[serde(default)]
    pub expect_display: Option<String>,

    /// Lines passed to `alert`, in order.
    #[serde(default)]
    pub expect_alerts: Option<Vec<String>>,

    /// The run's error must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// The snapshot must fail to restore with an error containing this.
    #[serde(default)]
    pub expect_restore_error: Option<String>,

    /// If present (even empty), warning count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,

    #[serde(default)]
    pub expect_guard_tripped: Option<bool>,

    /// Number of sprites on the canvas after the run.
    #[serde(default)]
    pub expect_sprites: Option<usize>,

    #[serde(default)]
    pub confirm_answers: Vec<bool>,

    #[serde(default)]
    pub prompt_answers: Vec<String>,

    /// Run without a canvas.
    #[serde(default)]
    pub no_canvas: bool,

    #[serde(default)]
    pub seed: Option<u64>,
}

/// Split a test file into its TOML frontmatter and snapshot body.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, body))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn fail(path: &Path, description: Option<String>, reason: String) -> TestResult {
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    }
}

pub fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(path, None, format!("cannot read file: {}", e)),
    };

    let (config, body) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(path, None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let mut workspace = Workspace::new();
    let restored = workspace.load_json(body);

    if let Some(expected) = &config.expect_restore_error {
        let outcome = match restored {
            Err(err) if err.to_string().contains(expected.as_str()) => TestOutcome::Pass,
            Err(err) => TestOutcome::Fail(format!(
                "expected restore error containing \"{}\", got: {}",
                expected, err
            )),
            Ok(()) => TestOutcome::Fail(format!(
                "expected restore error containing \"{}\", but the snapshot loaded",
                expected
            )),
        };
        return TestResult {
            path: path.to_path_buf(),
            description,
            outcome,
        };
    }
    if let Err(err) = restored {
        return fail(path, description, format!("snapshot did not load: {}", err));
    }

    let canvas = if config.no_canvas {
        None
    } else {
        Some((480.0, 360.0))
    };
    let mut host = BufferHost::new()
        .with_canvas(canvas)
        .with_confirm_answers(config.confirm_answers.iter().copied())
        .with_prompt_answers(config.prompt_answers.iter().cloned());
    let report = workspace.run(&mut host, Some(config.seed.unwrap_or(0)));

    match check_report(&config, &report, &host) {
        Some(reason) => fail(path, description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Compare a finished run with the test's expectations. Returns the first
/// mismatch.
fn check_report(config: &TestConfig, report: &RunReport, host: &BufferHost) -> Option<String> {
    match (&config.expect_error, &report.error) {
        (Some(expected), Some(err)) if !err.to_string().contains(expected.as_str()) => {
            return Some(format!(
                "expected error containing \"{}\", got: {}",
                expected, err
            ));
        }
        (Some(expected), None) => {
            return Some(format!(
                "expected error containing \"{}\", but the run succeeded",
                expected
            ));
        }
        (None, Some(err)) => return Some(format!("unexpected runtime error: {}", err)),
        _ => {}
    }

    if let Some(expected) = &config.expect_output {
        let actual = host.output_text();
        if actual.trim() != expected.trim() {
            return Some(mismatch("output", expected, &actual));
        }
    }

    if let Some(expected) = &config.expect_display {
        if report.program.display.trim() != expected.trim() {
            return Some(mismatch("display", expected, &report.program.display));
        }
    }

    if let Some(expected) = &config.expect_alerts {
        if &host.alerts != expected {
            return Some(format!(
                "alerts mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, host.alerts
            ));
        }
    }

    if let Some(expected) = config.expect_guard_tripped {
        if report.guard_tripped != expected {
            return Some(format!(
                "expected guard_tripped = {}, got {} after {} loop iterations",
                expected, report.guard_tripped, report.loop_iterations
            ));
        }
    }

    if let Some(expected) = config.expect_sprites {
        if host.draws.len() != expected {
            return Some(format!(
                "expected {} sprite(s) on the canvas, got {}",
                expected,
                host.draws.len()
            ));
        }
    }

    if let Some(expected) = &config.expect_warnings {
        return check_warnings(&report.program.executable, &report.warnings, expected);
    }

    None
}

fn mismatch(what: &str, expected: &str, actual: &str) -> String {
    format!(
        "{} mismatch\n  expected: {}\n  actual:   {}",
        what,
        expected.trim(),
        actual.trim()
    )
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(
    source: &str,
    diagnostics: &[DiagnosticError],
    expected: &[ExpectedWarning],
) -> Option<String> {
    let actual_warnings: Vec<&DiagnosticError> =
        diagnostics.iter().filter(|d| d.is_warning).collect();

    if actual_warnings.len() != expected.len() {
        let actual_msgs: Vec<String> = actual_warnings
            .iter()
            .map(|w| format!("  - {}", w))
            .collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual_warnings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual_warnings.iter().zip(expected.iter()).enumerate() {
        let msg = actual.to_string();

        if !msg.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }

        if let Some(expected_line) = expected.line {
            let Some(span) = &actual.span else {
                return Some(format!(
                    "warning[{}]: expected on line {}, but warning has no span",
                    i, expected_line
                ));
            };
            let actual_line = byte_offset_to_line(source, span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "warning[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// Discover test files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(TEST_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

fn label_for(result: &TestResult) -> String {
    result.description.clone().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_end_matches(TEST_SUFFIX).to_string())
            .unwrap_or_else(|| "?".to_string())
    })
}

/// Run every test file under `path` (or a single file). A non-empty
/// `categories` restricts the run to those subfolders.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
            return 1;
        }
        if categories.is_empty() {
            all_categories
        } else {
            filter_categories(all_categories, categories)
        }
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", paint(header, "1", no_color));
        }

        for file in files {
            let result = run_single_test(file);
            let label = label_for(&result);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", "32", no_color),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

fn filter_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let prefix = format!("{}/", req);
        let mut found = false;
        for (cat, files) in &all_categories {
            if cat == req || cat.starts_with(&prefix) {
                filtered.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all_categories
                    .keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const REPEAT: &str = r#"---
description = "repeat prints three times"
expect_output = "hi\nhi\nhi"
expect_guard_tripped = false
---
{"version":1,"roots":[{"x":0,"y":0,"block":{"type":"repeat","slots":{"input1":{"literal":"3"}},
 "children":[{"type":"print","slots":{"input1":{"literal":"hi"}}}]}}]}
"#;

    #[test]
    fn frontmatter_splits_from_body() {
        let (config, body) = parse_test_file(REPEAT).unwrap();
        assert_eq!(config.description.as_deref(), Some("repeat prints three times"));
        assert!(body.starts_with("{\"version\":1"));
    }

    #[test]
    fn missing_frontmatter_is_reported() {
        assert!(parse_test_file("{}").is_err());
        assert!(parse_test_file("---\ndescription = \"x\"\n{}").is_err());
    }

    #[test]
    fn passing_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test(dir.path(), "repeat.test.blocks", REPEAT);
        assert!(matches!(run_single_test(&path).outcome, TestOutcome::Pass));
    }

    #[test]
    fn output_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let content = REPEAT.replace(r#"hi\nhi\nhi""#, r#"hi""#);
        let path = write_test(dir.path(), "wrong.test.blocks", &content);
        let TestOutcome::Fail(reason) = run_single_test(&path).outcome else {
            panic!("expected failure");
        };
        assert!(reason.starts_with("output mismatch"), "{}", reason);
    }

    #[test]
    fn restore_errors_can_be_expected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test(
            dir.path(),
            "root_reporter.test.blocks",
            "---\nexpect_restore_error = \"can only be placed in an input slot\"\n---\n\
             {\"version\":1,\"roots\":[{\"x\":0,\"y\":0,\"block\":{\"type\":\"value\"}}]}\n",
        );
        assert!(matches!(run_single_test(&path).outcome, TestOutcome::Pass));
    }

    #[test]
    fn warnings_are_matched_by_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test(
            dir.path(),
            "costume.test.blocks",
            "---\nexpect_output = \"after\"\n\n[[expect_warnings]]\ncontains = \"Costume not found: ghost.png\"\nline = 2\n---\n\
             {\"version\":1,\"roots\":[\
             {\"x\":0,\"y\":0,\"block\":{\"type\":\"add_sprite\",\"slots\":{\"imageinput1\":{\"literal\":\"ghost.png\"}}}},\
             {\"x\":0,\"y\":40,\"block\":{\"type\":\"print\",\"slots\":{\"input1\":{\"literal\":\"after\"}}}}]}\n",
        );
        let result = run_single_test(&path);
        if let TestOutcome::Fail(reason) = &result.outcome {
            panic!("{}", reason);
        }
    }

    #[test]
    fn directories_report_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("loops")).unwrap();
        write_test(&dir.path().join("loops"), "repeat.test.blocks", REPEAT);
        assert_eq!(run_tests(dir.path(), true, &[]), 0);
        assert_eq!(run_tests(dir.path(), true, &["loops".to_string()]), 0);
        assert_eq!(run_tests(dir.path(), true, &["missing".to_string()]), 1);

        write_test(dir.path(), "snapshot.json", "not a test either");
        assert_eq!(run_tests(dir.path(), true, &[]), 0);

        write_test(dir.path(), "broken.test.blocks", "not a test");
        assert_eq!(run_tests(dir.path(), true, &[]), 1);
    }
}
