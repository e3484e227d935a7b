use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use tagscript::parser::{ParseWarning, Parser};
use tagscript_engine::{Interpreter, Limits, SeedFile};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Invocation context. Defaults to the CLI's tester seed.
    #[serde(default)]
    pub seed: Option<SeedFile>,

    /// Replaces the seed's `args`.
    #[serde(default)]
    pub args: Option<String>,

    /// Fixes the random generator for this test.
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Evaluation time as RFC 3339. Defaults to the wall clock.
    #[serde(default)]
    pub now: Option<String>,

    /// Expected body (trimmed comparison). An absent body compares as "".
    #[serde(default)]
    pub expect_body: Option<String>,

    /// Expected action keys, in any order.
    #[serde(default)]
    pub expect_actions: Option<Vec<String>>,

    #[serde(default)]
    pub expect_truncated: Option<bool>,

    /// Expected parse warnings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

/// Split a `.test.md` file into its TOML config and tag source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

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
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
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

impl TestResult {
    fn new(path: &Path, description: Option<String>, outcome: TestOutcome) -> Self {
        TestResult {
            path: path.to_path_buf(),
            description,
            outcome,
        }
    }
}

fn run_single_test(path: &Path, limits: &Limits) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            let reason = format!("cannot read file: {}", e);
            return TestResult::new(path, None, TestOutcome::Fail(reason));
        }
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            let reason = format!("frontmatter error: {}", e);
            return TestResult::new(path, None, TestOutcome::Fail(reason));
        }
    };
    let description = config.description.clone();

    match check_test(&config, source, limits) {
        None => TestResult::new(path, description, TestOutcome::Pass),
        Some(reason) => TestResult::new(path, description, TestOutcome::Fail(reason)),
    }
}

/// Evaluate one test's source and compare. Returns `Some(reason)` on mismatch.
fn check_test(config: &TestConfig, source: &str, limits: &Limits) -> Option<String> {
    let mut limits = limits.clone();
    if config.rng_seed.is_some() {
        limits.rng_seed = config.rng_seed;
    }
    let interpreter = Interpreter::new(limits);

    let template = Parser::new(source.to_string(), 0)
        .with_max_depth(interpreter.limits().max_depth)
        .parse();

    let mut seed = config
        .seed
        .clone()
        .unwrap_or_else(crate::default_seed_file)
        .into_seed();
    if let Some(args) = &config.args {
        seed.insert("args", args.as_str());
    }

    let response = match &config.now {
        Some(now) => match DateTime::parse_from_rfc3339(now) {
            Ok(now) => interpreter.process_at(&template, &seed, now.with_timezone(&Utc)),
            Err(e) => return Some(format!("invalid `now` timestamp '{}': {}", now, e)),
        },
        None => interpreter.process_template(&template, &seed),
    };

    if let Some(expected) = &config.expect_body {
        let actual = response.body.as_deref().unwrap_or("").trim();
        let expected = expected.trim();
        if actual != expected {
            return Some(format!(
                "body mismatch\n  expected: {}\n  actual:   {}",
                expected, actual
            ));
        }
    }

    if let Some(expected) = &config.expect_actions {
        let mut expected: Vec<&str> = expected.iter().map(String::as_str).collect();
        let mut actual = response.actions.keys();
        expected.sort_unstable();
        actual.sort_unstable();
        if actual != expected {
            return Some(format!(
                "actions mismatch\n  expected: [{}]\n  actual:   [{}]",
                expected.join(", "),
                actual.join(", ")
            ));
        }
    }

    if let Some(expected) = config.expect_truncated {
        if response.truncated != expected {
            return Some(format!(
                "expected truncated = {}, got {}",
                expected, response.truncated
            ));
        }
    }

    if let Some(expected) = &config.expect_warnings {
        return check_warnings(source, &template.warnings, expected);
    }

    None
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
    warnings: &[ParseWarning],
    expected: &[ExpectedWarning],
) -> Option<String> {
    if warnings.len() != expected.len() {
        let actual_msgs: Vec<String> = warnings
            .iter()
            .map(|w| format!("  - {}", w.message))
            .collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            warnings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in warnings.iter().zip(expected.iter()).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual.message
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, actual.span.start);
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

/// Discover `.test.md` files grouped by category (subfolder relative to root).
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
            if name.ends_with(".test.md") {
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

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn ok_label(no_color: bool) -> &'static str {
    if no_color { "ok" } else { "\x1b[32mok\x1b[0m" }
}

fn failed_label(no_color: bool) -> &'static str {
    if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn test_label<'a>(result: &'a TestResult) -> &'a str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("?")
    })
}

/// Run all `.test.md` files under `path` (or a single file) against `limits`.
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, limits: &Limits, no_color: bool, categories: &[String]) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        // Single file mode ignores categories.
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
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
            eprintln!("{}", bold(header, no_color));
        }

        for file in files {
            let result = run_single_test(file, limits);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), test_label(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), test_label(&result));
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
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", ok_label(no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            failed_label(no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn filter_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    let available: Vec<String> = all_categories
        .keys()
        .map(|k| if k.is_empty() { "(root)".to_string() } else { k.clone() })
        .collect();

    let mut filtered = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let matching: Vec<_> = all_categories
            .iter()
            .filter(|(cat, _)| cat.as_str() == req || cat.starts_with(&prefix))
            .collect();
        if matching.is_empty() {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
        for (cat, files) in matching {
            filtered.insert(cat.clone(), files.clone());
        }
    }
    filtered
}
