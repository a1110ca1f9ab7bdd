//! Single-processor behavior through the `Processor` trait.

use crate::common::{event, processor, registry};
use serde_json::json;
use sf_error::{ScriptError, SfError};
use sf_script::{ScriptConfig, ScriptProcessor};
use sf_traits::Processor;
use sf_types::{Event, ERROR_MESSAGE_KEY, TAGS_KEY};
use std::time::{Duration, Instant};

#[test]
fn test_missing_entry_point_fails_construction() {
    let err = ScriptProcessor::new(
        &ScriptConfig::with_source("fn handle(evt) { evt.Put(\"x\", 1); }"),
        registry(),
    )
    .unwrap_err();

    assert!(matches!(err, SfError::Script(ScriptError::EntryPointNotFound)));
    assert!(err.to_string().contains("process function not found"));
}

#[test]
fn test_put_on_empty_event() {
    let p = processor(ScriptConfig::with_source(
        r#"fn process(evt) { evt.Put("hello", "world"); }"#,
    ));

    let out = p.run(Event::new()).unwrap().unwrap();
    assert_eq!(out.get_value("hello"), Some(json!("world")));
}

#[test]
fn test_throw_tags_and_annotates_event() {
    let p = processor(
        ScriptConfig::with_source(r#"fn process(evt) { throw "boom"; }"#)
            .tag_on_exception("_js_exception"),
    );

    let err = p.run(event(json!({"message": "in"}))).unwrap_err();
    assert!(err.error.is_script_exception());

    let out = err.event.unwrap();
    assert_eq!(out.get_value(TAGS_KEY), Some(json!(["_js_exception"])));
    assert_eq!(out.get_value("message"), Some(json!("in")));
    let message = out.get_value(ERROR_MESSAGE_KEY).unwrap();
    assert!(message.as_str().unwrap().contains("boom"));
}

#[test]
fn test_timeout_then_recovery() {
    let p = processor(
        ScriptConfig::with_source(
            r#"
            fn process(evt) {
                loop {
                    if evt.Get("stop") == true { break; }
                }
                evt.Put("finished", true);
            }
            "#,
        )
        .timeout(Duration::from_millis(500)),
    );

    let start = Instant::now();
    let err = p.run(Event::new()).unwrap_err();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(450), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "returned too late: {elapsed:?}");
    assert!(matches!(err.error, SfError::Script(ScriptError::Timeout { .. })));
    assert!(err.error.to_string().contains("timeout"));

    let out = p.run(event(json!({"stop": true}))).unwrap().unwrap();
    assert_eq!(out.get_value("finished"), Some(json!(true)));
    assert!(!out.has_value(TAGS_KEY));
}

#[test]
fn test_dotted_put_then_get() {
    let p = processor(ScriptConfig::with_source(
        r#"
        fn process(evt) {
            evt.Put("a.b.c", 1);
            evt.Put("read_back", evt.Get("a.b.c"));
        }
        "#,
    ));

    let out = p.run(Event::new()).unwrap().unwrap();
    assert_eq!(out.get_value("a"), Some(json!({"b": {"c": 1}})));
    assert_eq!(out.get_value("read_back"), Some(json!(1)));
}

#[test]
fn test_put_through_scalar_throws() {
    let p = processor(ScriptConfig::with_source(
        r#"fn process(evt) { evt.Put("a.b", 1); }"#,
    ));

    let err = p.run(event(json!({"a": "scalar"}))).unwrap_err();
    assert!(err.error.is_script_exception());
    assert_eq!(err.event.unwrap().get_value("a"), Some(json!("scalar")));
}

#[test]
fn test_rename_onto_existing_field_is_soft_failure() {
    let p = processor(ScriptConfig::with_source(
        r#"
        fn process(evt) {
            evt.Put("renamed", evt.Rename("source", "destination"));
        }
        "#,
    ));

    let out = p
        .run(event(json!({"source": {"x": [1, 2]}, "destination": "keep"})))
        .unwrap()
        .unwrap();

    assert_eq!(out.get_value("renamed"), Some(json!(false)));
    assert_eq!(out.get_value("source"), Some(json!({"x": [1, 2]})));
    assert_eq!(out.get_value("destination"), Some(json!("keep")));
}

#[test]
fn test_tag_twice_is_deduplicated() {
    let p = processor(ScriptConfig::with_source(
        r#"fn process(evt) { evt.Tag("x"); evt.Tag("x"); }"#,
    ));

    let out = p.run(Event::new()).unwrap().unwrap();
    assert_eq!(out.get_value(TAGS_KEY), Some(json!(["x"])));
}

#[test]
fn test_native_panic_is_contained() {
    let p = processor(ScriptConfig::with_source(
        r#"
        fn register(params) { this.explode = new_processor("explode"); }
        fn process(evt) {
            evt.Put("before", true);
            this.explode.Run(evt);
        }
        "#,
    )
    .params(json!({})));

    let err = p.run(event(json!({"id": 7}))).unwrap_err();
    assert!(matches!(err.error, SfError::Script(ScriptError::Panic { .. })));
    assert!(err.error.to_string().contains("exploded"));

    let out = err.event.unwrap();
    assert_eq!(out.get_value("id"), Some(json!(7)));
    assert_eq!(out.get_value("before"), Some(json!(true)));
    assert_eq!(p.idle_sessions(), 0);

    // The processor is still usable afterwards.
    let err = p.run(event(json!({"id": 8}))).unwrap_err();
    assert!(matches!(err.error, SfError::Script(ScriptError::Panic { .. })));
}

#[test]
fn test_panic_after_cancel_returns_no_event() {
    let p = processor(ScriptConfig::with_source(
        r#"
        fn register(params) { this.explode = new_processor("explode"); }
        fn process(evt) {
            evt.Cancel();
            this.explode.Run(evt);
        }
        "#,
    )
    .params(json!({})));

    let err = p.run(event(json!({"id": 9}))).unwrap_err();
    assert!(matches!(err.error, SfError::Script(ScriptError::Panic { .. })));
    assert!(err.event.is_none());
}

#[test]
fn test_unrepresentable_timeout_does_not_panic() {
    let p = processor(
        ScriptConfig::with_source(r#"fn process(evt) { evt.Put("ok", true); }"#)
            .timeout(Duration::MAX),
    );

    let out = p.run(Event::new()).unwrap().unwrap();
    assert_eq!(out.get_value("ok"), Some(json!(true)));
}

#[test]
fn test_large_fields_are_readable() {
    let p = processor(ScriptConfig::with_source(
        r#"
        fn process(evt) {
            let m = evt.Get("message");
            evt.Put("len", m.len());
            evt.Put("count", evt.Get("items").len());
        }
        "#,
    ));

    let message = "a".repeat(1_500_000);
    let items: Vec<i64> = (0..150_000).collect();
    let out = p
        .run(event(json!({"message": message, "items": items})))
        .unwrap()
        .unwrap();

    assert_eq!(out.get_value("len"), Some(json!(1_500_000)));
    assert_eq!(out.get_value("count"), Some(json!(150_000)));
}

#[test]
fn test_builtin_helpers() {
    let p = processor(ScriptConfig::with_source(
        r#"
        fn process(evt) {
            let ip = evt.Get("client");
            evt.Put("private", is_private_ip(ip));
            evt.Put("file", basename(evt.Get("path")));
            evt.Put("level", to_uppercase(evt.Get("level")));
            evt.Put("id_len", uuid().len());
        }
        "#,
    ));

    let out = p
        .run(event(json!({"client": "10.1.2.3", "path": "/var/log/app.log", "level": "warn"})))
        .unwrap()
        .unwrap();

    assert_eq!(out.get_value("private"), Some(json!(true)));
    assert_eq!(out.get_value("file"), Some(json!("app.log")));
    assert_eq!(out.get_value("level"), Some(json!("WARN")));
    assert_eq!(out.get_value("id_len"), Some(json!(36)));
}

#[test]
fn test_metadata_and_timestamp_survive() {
    let p = processor(ScriptConfig::with_source(
        r#"fn process(evt) { evt.Put("seen", true); }"#,
    ));

    let input = event(json!({
        "@timestamp": "2024-05-01T12:00:00Z",
        "@metadata": {"index": "logs"},
        "message": "hi"
    }));
    let timestamp = input.timestamp;

    let out = p.run(input).unwrap().unwrap();
    assert_eq!(out.timestamp, timestamp);
    assert_eq!(out.meta.get("index"), Some(&json!("logs")));
    assert_eq!(out.get_value("seen"), Some(json!(true)));
}
