//! Loading scripts from files, globs and YAML configuration.

use crate::common::{event, processor, registry};
use serde_json::json;
use sf_error::{ScriptError, SfError};
use sf_script::{ScriptConfig, ScriptProcessor};
use sf_traits::Processor;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, source: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, source).unwrap();
    path.display().to_string()
}

#[test]
fn test_single_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "enrich.rhai",
        r#"fn process(evt) { evt.Put("source", "file"); }"#,
    );

    let p = processor(ScriptConfig::with_file(&path));
    assert_eq!(p.sources(), &[path]);

    let out = p.run(event(json!({}))).unwrap().unwrap();
    assert_eq!(out.get_value("source"), Some(json!("file")));
}

#[test]
fn test_glob_merges_files_in_order() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a_helpers.rhai",
        r#"fn normalize(value) { to_lowercase(trimmed(value)) }"#,
    );
    write(
        dir.path(),
        "b_main.rhai",
        r#"fn process(evt) { evt.Put("user", normalize(evt.Get("user"))); }"#,
    );
    write(dir.path(), "ignored.txt", "not a script");

    let pattern = dir.path().join("*.rhai").display().to_string();
    let p = processor(ScriptConfig::with_file(pattern));

    assert_eq!(p.sources().len(), 2);
    assert!(p.sources()[0].ends_with("a_helpers.rhai"));
    assert!(p.sources()[1].ends_with("b_main.rhai"));

    let out = p.run(event(json!({"user": "  Alice "}))).unwrap().unwrap();
    assert_eq!(out.get_value("user"), Some(json!("alice")));
}

#[test]
fn test_files_list_dedupes_overlapping_patterns() {
    let dir = TempDir::new().unwrap();
    let main = write(dir.path(), "main.rhai", "fn process(evt) {}");
    let pattern = dir.path().join("*.rhai").display().to_string();

    let p = processor(ScriptConfig::with_files([main, pattern]));
    assert_eq!(p.sources().len(), 1);
}

#[test]
fn test_pattern_without_matches() {
    let dir = TempDir::new().unwrap();
    let pattern = dir.path().join("*.rhai").display().to_string();

    let err = ScriptProcessor::new(&ScriptConfig::with_file(&pattern), registry()).unwrap_err();
    assert!(matches!(err, SfError::Script(ScriptError::NoSources(p)) if p == pattern));
}

#[test]
fn test_syntax_error_names_file() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "broken.rhai", "fn process(evt) { let = ; }");

    let err = ScriptProcessor::new(&ScriptConfig::with_file(&path), registry()).unwrap_err();
    assert!(err.is_syntax_error());
    assert!(err.to_string().contains("broken.rhai"));
}

#[test]
fn test_failing_self_test_rejects_processor() {
    let err = ScriptProcessor::new(
        &ScriptConfig::with_source(
            r#"
            fn process(evt) { evt.Put("x", 1); }
            fn test() { throw "self-test failed"; }
            "#,
        ),
        registry(),
    )
    .unwrap_err();

    assert!(matches!(err, SfError::Script(ScriptError::SelfTest(_))));
    assert!(err.to_string().contains("self-test failed"));
}

#[test]
fn test_params_without_register() {
    let err = ScriptProcessor::new(
        &ScriptConfig::with_source("fn process(evt) {}").params(json!({"a": 1})),
        registry(),
    )
    .unwrap_err();

    assert!(matches!(err, SfError::Script(ScriptError::RegisterNotFound)));
}

#[test]
fn test_yaml_config() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "geo.rhai",
        r#"
        fn register(params) { this.field = params.field; }
        fn process(evt) {
            if is_private_ip(evt.Get(this.field)) { evt.Tag("internal"); }
        }
        "#,
    );
    let yaml = format!(
        r#"
tag: geo
file: "{path}"
timeout: 250ms
tag_on_exception: _geo_failure
params:
  field: client.ip
"#
    );

    let config = ScriptConfig::from_yaml(&yaml).unwrap();
    assert_eq!(config.timeout, Duration::from_millis(250));

    let p = processor(config);
    assert_eq!(p.tag(), Some("geo"));
    assert!(p.to_string().starts_with("script=[type=rhai, id=geo, sources="));

    let out = p.run(event(json!({"client": {"ip": "192.168.0.4"}}))).unwrap().unwrap();
    assert_eq!(out.get_value("tags"), Some(json!(["internal"])));
}
