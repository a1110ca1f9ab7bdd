//! Built-in Rhai functions available to every script.

use rhai::{Dynamic, Engine};
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, info};

/// Registers all built-in functions in the Rhai engine.
///
/// `print` and `debug` output is routed to the log, attributed to `processor`.
pub fn register_builtin_functions(engine: &mut Engine, processor: &str) {
    register_output(engine, processor);
    register_uuid_functions(engine);
    register_time_functions(engine);
    register_parsing_functions(engine);
    register_string_functions(engine);
    register_ip_functions(engine);
    register_path_functions(engine);
}

fn register_output(engine: &mut Engine, processor: &str) {
    let id = processor.to_string();
    engine.on_print(move |text| info!(processor = %id, "{text}"));

    let id = processor.to_string();
    engine.on_debug(move |text, source, pos| {
        debug!(processor = %id, source = source.unwrap_or(""), position = %pos, "{text}")
    });
}

fn register_uuid_functions(engine: &mut Engine) {
    engine.register_fn("uuid", || uuid::Uuid::new_v4().to_string());
}

fn register_time_functions(engine: &mut Engine) {
    // RFC 3339, same format as @timestamp
    engine.register_fn("timestamp", || chrono::Utc::now().to_rfc3339());
    engine.register_fn("unix_timestamp", || chrono::Utc::now().timestamp());
    engine.register_fn("unix_timestamp_ms", || chrono::Utc::now().timestamp_millis());
}

fn register_parsing_functions(engine: &mut Engine) {
    engine.register_fn("parse_int", |s: &str| -> Dynamic {
        s.trim().parse::<i64>().map(Dynamic::from).unwrap_or(Dynamic::UNIT)
    });

    engine.register_fn("parse_float", |s: &str| -> Dynamic {
        s.trim().parse::<f64>().map(Dynamic::from).unwrap_or(Dynamic::UNIT)
    });

    engine.register_fn("parse_bool", |s: &str| -> Dynamic {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Dynamic::from(true),
            "false" | "0" | "no" | "off" => Dynamic::from(false),
            _ => Dynamic::UNIT,
        }
    });
}

fn register_string_functions(engine: &mut Engine) {
    // Return new strings; Rhai's own to_lower/trim mutate in place.
    engine.register_fn("to_lowercase", |s: &str| s.to_lowercase());
    engine.register_fn("to_uppercase", |s: &str| s.to_uppercase());
    engine.register_fn("trimmed", |s: &str| s.trim().to_string());
    engine.register_fn("str_contains", |s: &str, pattern: &str| s.contains(pattern));

    engine.register_fn("substring", |s: &str, start: i64, len: i64| -> String {
        let start = start.max(0) as usize;
        let len = len.max(0) as usize;
        s.chars().skip(start).take(len).collect()
    });
}

fn register_ip_functions(engine: &mut Engine) {
    engine.register_fn("is_valid_ip", |ip: &str| ip.parse::<IpAddr>().is_ok());

    engine.register_fn("is_ipv4", |ip: &str| {
        matches!(ip.parse::<IpAddr>(), Ok(IpAddr::V4(_)))
    });

    engine.register_fn("is_ipv6", |ip: &str| {
        matches!(ip.parse::<IpAddr>(), Ok(IpAddr::V6(_)))
    });

    // RFC 1918, loopback, link-local, and IPv6 unique-local
    engine.register_fn("is_private_ip", |ip: &str| -> bool {
        match ip.parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
            Ok(IpAddr::V6(v6)) => {
                let first = v6.segments()[0];
                v6.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
            }
            Err(_) => false,
        }
    });

    engine.register_fn("normalize_ip", |ip: &str| -> Dynamic {
        ip.parse::<IpAddr>()
            .map(|addr| Dynamic::from(addr.to_string()))
            .unwrap_or(Dynamic::UNIT)
    });
}

fn register_path_functions(engine: &mut Engine) {
    engine.register_fn("basename", |path: &str| -> String {
        Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    engine.register_fn("dirname", |path: &str| -> String {
        match Path::new(path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
            Some(_) => ".".to_string(),
            None => path.to_string(),
        }
    });

    // Includes the leading dot, empty when there is no extension
    engine.register_fn("extname", |path: &str| -> String {
        Path::new(path)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    });
}
