//! One processor shared by many threads.

use crate::common::{event, processor};
use serde_json::json;
use sf_script::ScriptConfig;
use sf_traits::Processor;
use sf_types::TAGS_KEY;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const THREADS: usize = 8;
const RUNS: usize = 50;

#[test]
fn test_shared_processor_keeps_invocations_apart() {
    let p = processor(
        ScriptConfig::with_source(
            r#"
            fn register(params) { this.prefix = params.prefix; }

            fn process(evt) {
                let id = evt.Get("id");
                if id % 7 == 0 { evt.Cancel(); return; }
                if id % 11 == 0 { throw `bad id ${id}`; }
                evt.Put("key", this.prefix + id);
                evt.Tag(`t${id}`);
            }
            "#,
        )
        .params(json!({"prefix": "k-"}))
        .timeout(Duration::from_secs(5)),
    );
    let dropped = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for thread in 0..THREADS {
            let p = &p;
            let dropped = &dropped;
            let failed = &failed;
            s.spawn(move || {
                for run in 0..RUNS {
                    let id = (thread * RUNS + run) as i64;
                    match p.run(event(json!({"id": id}))) {
                        Ok(Some(out)) => {
                            assert_eq!(out.get_value("key"), Some(json!(format!("k-{id}"))));
                            assert_eq!(out.get_value(TAGS_KEY), Some(json!([format!("t{id}")])));
                        }
                        Ok(None) => {
                            assert_eq!(id % 7, 0);
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            assert_eq!(id % 11, 0);
                            assert!(err.error.to_string().contains(&format!("bad id {id}")));
                            let out = err.event.unwrap();
                            assert_eq!(out.get_value("id"), Some(json!(id)));
                            assert!(!out.has_value("key"));
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    let total = (THREADS * RUNS) as i64;
    let expected_dropped = (0..total).filter(|id| id % 7 == 0).count();
    let expected_failed = (0..total).filter(|id| id % 7 != 0 && id % 11 == 0).count();
    assert_eq!(dropped.load(Ordering::Relaxed), expected_dropped);
    assert_eq!(failed.load(Ordering::Relaxed), expected_failed);
    assert!(p.idle_sessions() >= 1);
    assert!(p.idle_sessions() <= 4);
}

#[test]
fn test_timeouts_do_not_leak_between_threads() {
    let p = processor(
        ScriptConfig::with_source(
            r#"
            fn process(evt) {
                if evt.Get("spin") == true {
                    loop {}
                }
                evt.Put("ok", true);
            }
            "#,
        )
        .timeout(Duration::from_millis(100)),
    );

    std::thread::scope(|s| {
        for thread in 0..THREADS {
            let p = &p;
            s.spawn(move || {
                for run in 0..10 {
                    let spin = (thread + run) % 5 == 0;
                    let result = p.run(event(json!({"spin": spin})));
                    if spin {
                        let err = result.unwrap_err();
                        assert!(err.error.to_string().contains("timeout"));
                    } else {
                        let out = result.unwrap().unwrap();
                        assert_eq!(out.get_value("ok"), Some(json!(true)));
                    }
                }
            });
        }
    });
}

#[test]
fn test_unbounded_session_cache() {
    let p = processor(
        ScriptConfig::with_source("fn process(evt) { evt.Put(\"n\", 1); }").max_cached_sessions(0),
    );

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            let p = &p;
            s.spawn(move || {
                for _ in 0..RUNS {
                    p.run(event(json!({}))).unwrap().unwrap();
                }
            });
        }
    });

    assert!(p.idle_sessions() >= 1);
    assert!(p.idle_sessions() <= THREADS);
}
