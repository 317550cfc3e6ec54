//! Integration tests for markup-lint

use markup_lint::{
    config::{Config, ConfigError},
    diagnostic::Severity,
    engine::Engine,
    output::{JsonFormatter, OutputFormatter, TextFormatter},
    rules::{element_newline, require_closing_tags},
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

const INLINE_CONFIG: &str = r#"
rules:
  element-newline:
    options:
      inline: ["$inline"]
"#;

fn engine_from_yaml(yaml: &str) -> Engine {
    Engine::new(Config::from_yaml_str(yaml).unwrap()).unwrap()
}

fn closing_only(self_closing: &str, allow_custom: bool) -> Engine {
    engine_from_yaml(&format!(
        r#"
rules:
  element-newline:
    enabled: false
  require-closing-tags:
    options:
      selfClosing: {}
      allowSelfClosingCustom: {}
"#,
        self_closing, allow_custom
    ))
}

fn fix(engine: &Engine, source: &str) -> String {
    engine.fix_source(source, Path::new("test.html")).output
}

fn message_ids(engine: &Engine, source: &str) -> Vec<String> {
    engine
        .lint_source(source, Path::new("test.html"))
        .diagnostics
        .into_iter()
        .map(|d| d.message_id)
        .collect()
}

#[test]
fn test_valid_fixture_is_clean() {
    let engine = engine_from_yaml(INLINE_CONFIG);
    let result = engine.lint_file(&fixtures_path().join("valid.html"));

    assert!(result.is_clean(), "{:#?}", result.diagnostics);
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn test_invalid_fixture() {
    let engine = engine_from_yaml(INLINE_CONFIG);
    let result = engine.lint_file(&fixtures_path().join("invalid.html"));

    let find = |id: &str| result.diagnostics.iter().find(|d| d.message_id == id);

    let missing = find(require_closing_tags::MISSING).unwrap();
    assert_eq!(missing.message, "Missing closing tag for <foo>.");
    assert_eq!(missing.location.line, 3);
    assert!(!missing.has_fix());

    let unexpected = find(require_closing_tags::UNEXPECTED).unwrap();
    assert_eq!(unexpected.location.line, 2);
    assert!(unexpected.has_fix());

    let after = find(element_newline::EXPECT_NEW_LINE_AFTER).unwrap();
    assert_eq!(after.message, "There should be a linebreak after <p>.");
    assert!(find(element_newline::EXPECT_NEW_LINE_AFTER_OPEN).is_some());
    assert!(find(element_newline::EXPECT_NEW_LINE_BEFORE_CLOSE).is_some());

    assert!(result.has_errors());
    assert_eq!(result.exit_code(), 2);
}

#[test]
fn test_disable_comments_fixture() {
    let engine = engine_from_yaml(INLINE_CONFIG);
    let result = engine.lint_file(&fixtures_path().join("with-disable.html"));
    assert!(result.is_clean(), "{:#?}", result.diagnostics);
}

#[test]
fn test_void_elements_fixed_both_ways() {
    let always = closing_only("always", false);
    let never = closing_only("never", false);

    for name in ["img", "br", "input", "hr", "meta", "link", "wbr"] {
        assert_eq!(fix(&always, &format!("<{}>", name)), format!("<{} />", name));
        assert_eq!(fix(&never, &format!("<{} />", name)), format!("<{}>", name));
    }
}

#[test]
fn test_closed_div_never_reported() {
    for engine in [
        closing_only("always", false),
        closing_only("always", true),
        closing_only("never", false),
        closing_only("never", true),
    ] {
        assert!(message_ids(&engine, "<div></div>").is_empty());
    }
}

#[test]
fn test_self_closing_custom_element_accepted() {
    for self_closing in ["always", "never"] {
        let engine = closing_only(self_closing, true);
        assert!(message_ids(&engine, "<my-el/>").is_empty());
        assert_eq!(fix(&engine, "<my-el/>"), "<my-el/>");
    }
}

#[test]
fn test_unclosed_tag_reported_without_fix() {
    let engine = closing_only("never", false);
    assert_eq!(message_ids(&engine, "<foo>"), vec!["MISSING"]);
    assert_eq!(fix(&engine, "<foo>"), "<foo>");

    // options alone leave the rule at its default severity
    let result = engine.lint_source("<foo>", Path::new("test.html"));
    assert_eq!(result.diagnostics[0].severity, Severity::Error);
    assert_eq!(result.exit_code(), 2);
}

#[test]
fn test_block_after_inline_gets_line_break() {
    let engine = engine_from_yaml(INLINE_CONFIG);
    let source = "<p><b>x</b><div>y</div></p>";
    let result = engine.lint_source(source, Path::new("test.html"));

    let before = result
        .diagnostics
        .iter()
        .find(|d| d.message_id == element_newline::EXPECT_NEW_LINE_BEFORE)
        .unwrap();
    assert_eq!(before.message, "There should be a linebreak before <div>.");
    assert_eq!(before.severity, Severity::Warning);

    assert_eq!(fix(&engine, source), "<p>\n<b>x</b>\n<div>y</div>\n</p>");
}

#[test]
fn test_fix_reaches_fixed_point() {
    let engine = engine_from_yaml(INLINE_CONFIG);
    let source = "<ul><li>one</li><li>two <img src=\"x\"></li></ul>";
    let outcome = engine.fix_source(source, Path::new("test.html"));

    assert!(outcome.remaining.is_empty(), "{:#?}", outcome.remaining);
    assert!(engine
        .lint_source(&outcome.output, Path::new("test.html"))
        .is_clean());
}

#[test]
fn test_fix_beside_multiline_text_inserts_one_break() {
    let engine = engine_from_yaml(INLINE_CONFIG);

    for (source, expected) in [
        ("<b>a</b>one\ntwo", "<b>a</b>\none\ntwo"),
        ("one\ntwo<b>a</b>", "one\ntwo\n<b>a</b>"),
    ] {
        let outcome = engine.fix_source(source, Path::new("test.html"));
        assert!(outcome.remaining.is_empty(), "{:#?}", outcome.remaining);
        assert_eq!(outcome.output, expected);
        assert_eq!(outcome.fixes_applied, 1);
        assert!(outcome.passes < 10);
    }
}

#[test]
fn test_fix_files_writes_to_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("invalid.html");
    fs::copy(fixtures_path().join("invalid.html"), &path).unwrap();

    let engine = engine_from_yaml(INLINE_CONFIG);
    let (fixes, result) = engine.fix_files(&[path.clone()], true);

    assert_eq!(fixes.len(), 1);
    assert!(fixes[0].outcome.changed());
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "<div>\n<p>one</p>\n<p>two</p>\n</div>\n<img src=\"a.png\">\n<section>\n<foo>\n</section>\n"
    );
    // only the unfixable missing closing tag remains
    assert_eq!(result.error_count, 1);
    assert_eq!(result.diagnostics[0].message_id, require_closing_tags::MISSING);
}

#[test]
fn test_fix_without_write_leaves_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("page.html");
    fs::write(&path, "<img />").unwrap();

    let engine = Engine::new(Config::default()).unwrap();
    let (fixes, _) = engine.fix_files(&[path.clone()], false);

    assert_eq!(fixes[0].outcome.output, "<img>");
    assert_eq!(fs::read_to_string(&path).unwrap(), "<img />");
}

#[test]
fn test_lint_files_in_parallel() {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..8 {
        let path = dir.path().join(format!("page{}.html", i));
        fs::write(&path, "<section>\n  <foo>\n</section>\n").unwrap();
        files.push(path);
    }
    files.push(dir.path().join("missing.html"));

    let mut config = Config::default();
    config.engine.jobs = 2;
    let result = Engine::new(config).unwrap().lint_files(&files);

    assert_eq!(result.files_processed, 9);
    assert_eq!(result.error_count, 9);
    assert_eq!(result.files_with_errors, 9);
}

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".markuplintrc.yaml");
    fs::write(
        &path,
        r#"
rules:
  require-closing-tags:
    severity: info
    options:
      selfClosing: always
  element-newline:
    enabled: false
"#,
    )
    .unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    let engine = Engine::new(config).unwrap();
    assert_eq!(engine.rules().len(), 1);

    let result = engine.lint_source("<br>", Path::new("a.html"));
    assert_eq!(result.info_count, 1);
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn test_invalid_config_fails_before_linting() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lint.json");
    fs::write(
        &path,
        r#"{ "rules": { "require-closing-tags": { "options": { "customPatterns": ["(unclosed"] } } } }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert!(matches!(
        Engine::new(config),
        Err(ConfigError::InvalidPattern { .. })
    ));

    fs::write(&path, r#"{ "rules": { "no-such-rule": {} } }"#).unwrap();
    assert!(matches!(Config::load(&path), Err(ConfigError::Json(_))));
}

#[test]
fn test_formatters() {
    let engine = Engine::new(Config::default()).unwrap();
    let result = engine.lint_source("<p>\n  <foo>\n</p>\n", Path::new("page.html"));

    let text = TextFormatter::new().without_color().format(&result);
    assert!(text.contains(
        "page.html:2:3: error[require-closing-tags]: Missing closing tag for <foo>."
    ));
    assert!(text.contains("   2 |   <foo>"));

    let json = JsonFormatter::new().format(&result);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["diagnostics"][0]["message_id"], "MISSING");
    assert_eq!(value["diagnostics"][0]["data"]["tag"], "<foo>");
    assert_eq!(value["summary"]["error_count"], 1);
}
