//! Chains mixing script functions and native processors.

use crate::common::{event, processor};
use serde_json::json;
use sf_script::ScriptConfig;
use sf_traits::Processor;
use sf_types::TAGS_KEY;

#[test]
fn test_cancel_stops_later_links() {
    let p = processor(
        ScriptConfig::with_source(
            r#"
            fn first(evt) { evt.Cancel(); }
            fn second(evt) { evt.Put("second_ran", true); }

            fn register(params) {
                this.chain = chain().Add(Fn("first")).Add(Fn("second")).Build();
            }

            fn process(evt) { this.chain.Run(evt); }
            "#,
        )
        .params(json!({})),
    );

    assert!(p.run(event(json!({"message": "x"}))).unwrap().is_none());
}

#[test]
fn test_native_and_script_links() {
    let p = processor(
        ScriptConfig::with_source(
            r#"
            fn stamp(evt) { evt.Put("stage", "script"); }

            fn register(params) {
                this.chain = chain()
                    .Add("add_fields", #{ fields: #{ env: params.env }, target: "labels" })
                    .Add(Fn("stamp"))
                    .Add("add_tags", #{ tags: ["enriched"] })
                    .Add(new_processor("drop_fields", #{ fields: ["secret"] }))
                    .Build();
            }

            fn process(evt) { this.chain.Run(evt); }
            "#,
        )
        .params(json!({"env": "prod"})),
    );

    let out = p
        .run(event(json!({"message": "hi", "secret": "hunter2"})))
        .unwrap()
        .unwrap();

    assert_eq!(out.get_value("labels.env"), Some(json!("prod")));
    assert_eq!(out.get_value("stage"), Some(json!("script")));
    assert_eq!(out.get_value(TAGS_KEY), Some(json!(["enriched"])));
    assert!(!out.has_value("secret"));
}

#[test]
fn test_native_drop_cancels_event() {
    let p = processor(
        ScriptConfig::with_source(
            r#"
            fn register(params) {
                this.chain = chain().Add("drop_event").Add("add_tags", #{ tags: ["late"] }).Build();
            }

            fn process(evt) {
                this.chain.Run(evt);
                if !evt.IsCancelled() { evt.Put("survived", true); }
            }
            "#,
        )
        .params(json!({})),
    );

    assert!(p.run(event(json!({}))).unwrap().is_none());
}

#[test]
fn test_native_error_becomes_script_exception() {
    let p = processor(
        ScriptConfig::with_source(
            r#"
            fn register(params) { this.chain = chain().Add("reject").Build(); }
            fn process(evt) {
                evt.Put("touched", true);
                this.chain.Run(evt);
            }
            "#,
        )
        .params(json!({})),
    );

    let err = p.run(event(json!({"id": 1}))).unwrap_err();
    assert!(err.error.is_script_exception());
    assert!(err.error.to_string().contains("rejected"));

    let out = err.event.unwrap();
    assert_eq!(out.get_value("touched"), Some(json!(true)));
    assert_eq!(out.get_value(TAGS_KEY), Some(json!(["_script_exception"])));
}

#[test]
fn test_unknown_processor_fails_register() {
    let err = sf_script::ScriptProcessor::new(
        &ScriptConfig::with_source(
            r#"
            fn register(params) { this.chain = chain().Add("no_such_processor").Build(); }
            fn process(evt) {}
            "#,
        )
        .params(json!({})),
        crate::common::registry(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("register"));
    assert!(err.to_string().contains("no_such_processor"));
}

#[test]
fn test_chain_built_inside_process() {
    let p = processor(ScriptConfig::with_source(
        r#"
        fn process(evt) {
            let c = chain().Add("add_tags", #{ tags: ["a", "b"] }).Add("add_tags", #{ tags: ["b"] }).Build();
            c.Run(evt);
            evt.Put("links", c.len());
        }
        "#,
    ));

    let out = p.run(event(json!({}))).unwrap().unwrap();
    assert_eq!(out.get_value(TAGS_KEY), Some(json!(["a", "b"])));
    assert_eq!(out.get_value("links"), Some(json!(2)));
}
