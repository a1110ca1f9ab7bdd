//! sf-script CLI - Run script processors over NDJSON events.
//!
//! Reads one JSON event per line, runs it through the script and writes the
//! result as one JSON line. Dropped events produce no output.
//!
//! # Usage
//!
//! ```bash
//! # Inline script
//! cat events.ndjson | sf-script --source 'fn process(evt) { evt.Put("seen", true); }'
//!
//! # Script files (globs allowed), with parameters and a timeout
//! cat events.ndjson | sf-script \
//!   --file './scripts/*.rhai' \
//!   --params '{"field": "client.ip"}' \
//!   --timeout 500ms
//!
//! # YAML configuration
//! sf-script --config ./script.yaml --input events.ndjson --stats
//!
//! # Compile and run the script's test() hook without processing data
//! sf-script --file ./enrich.rhai --validate
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use sf_cli_common::{format_number, format_rate, init_logging, LogLevel};
use sf_metrics::ProcessorMetrics;
use sf_processors::register_builtin_processors;
use sf_script::{ScriptConfig, ScriptProcessor};
use sf_traits::{Processor, ProcessorRegistry};
use sf_types::duration::parse_duration;
use sf_types::Event;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(name = "sf-script")]
#[command(about = "Run Rhai script processors over NDJSON events")]
#[command(version)]
struct Cli {
    /// Inline Rhai script
    #[arg(short = 's', long, conflicts_with = "file")]
    source: Option<String>,

    /// Script file or glob pattern (can be repeated)
    #[arg(short = 'f', long)]
    file: Vec<String>,

    /// YAML processor configuration; other flags override it
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// JSON object passed to the script's register() function
    #[arg(short = 'p', long)]
    params: Option<String>,

    /// Per-event timeout, e.g. 500ms or 2s
    #[arg(short = 't', long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Processor tag used in logs and errors
    #[arg(long)]
    tag: Option<String>,

    /// Tag added to events the script fails on (empty to disable)
    #[arg(long)]
    tag_on_exception: Option<String>,

    /// Read events from a file instead of stdin
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Process only the first N events
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Do not write events the script failed on
    #[arg(long)]
    drop_failed: bool,

    /// Validate the script and exit
    #[arg(long)]
    validate: bool,

    /// Print statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Shortcut for --log-level debug
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Counters collected while processing.
#[derive(Debug, Default)]
struct RunStats {
    events_in: u64,
    events_out: u64,
    events_dropped: u64,
    events_failed: u64,
    lines_invalid: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { cli.log_level };
    init_logging(level)?;

    let config = build_config(&cli)?;

    let mut registry = ProcessorRegistry::new();
    register_builtin_processors(&mut registry).context("Failed to register processors")?;

    let processor = match ScriptProcessor::new(&config, Arc::new(registry)) {
        Ok(processor) => processor,
        Err(e) if cli.validate => {
            eprintln!("Script validation failed: {e}");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to create script processor"),
    };

    if cli.validate {
        eprintln!("Script OK: {processor}");
        return Ok(());
    }

    let metrics_id = processor.tag().unwrap_or("script").to_string();
    let processor = processor.with_metrics(ProcessorMetrics::from_global(metrics_id));

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin().lock())),
    };
    let stdout = std::io::stdout();
    let mut writer = BufWriter::new(stdout.lock());

    let started = Instant::now();
    let stats = run(&processor, reader, &mut writer, &cli)?;
    writer.flush()?;

    if cli.stats {
        print_stats(&stats, started.elapsed());
    }

    Ok(())
}

/// Merges the YAML config (if any) with command-line flags.
fn build_config(cli: &Cli) -> Result<ScriptConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            ScriptConfig::from_yaml(&text)?
        }
        None => ScriptConfig::default(),
    };

    if let Some(source) = &cli.source {
        config.source = Some(source.clone());
        config.file = None;
        config.files.clear();
    }

    match cli.file.as_slice() {
        [] => {}
        [single] => {
            config.source = None;
            config.file = Some(single.clone());
            config.files.clear();
        }
        many => {
            config.source = None;
            config.file = None;
            config.files = many.to_vec();
        }
    }

    if let Some(params) = &cli.params {
        let value: Value = serde_json::from_str(params).context("--params is not valid JSON")?;
        let Value::Object(map) = value else {
            bail!("--params must be a JSON object");
        };
        config.params = Some(map);
    }

    if let Some(timeout) = cli.timeout {
        config.timeout = timeout;
    }
    if let Some(tag) = &cli.tag {
        config.tag = Some(tag.clone());
    }
    if let Some(tag) = &cli.tag_on_exception {
        config.tag_on_exception = tag.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run(
    processor: &ScriptProcessor,
    reader: impl BufRead,
    writer: &mut impl Write,
    cli: &Cli,
) -> Result<RunStats> {
    let mut stats = RunStats::default();

    for (i, line) in reader.lines().enumerate() {
        if cli.limit.is_some_and(|limit| stats.events_in as usize >= limit) {
            break;
        }

        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }

        let event = match parse_event(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = i + 1, error = %e, "Skipping invalid event");
                stats.lines_invalid += 1;
                continue;
            }
        };
        stats.events_in += 1;

        match processor.run(event) {
            Ok(Some(event)) => {
                write_event(writer, &event, cli.pretty)?;
                stats.events_out += 1;
            }
            Ok(None) => {
                debug!(line = i + 1, "Event dropped by script");
                stats.events_dropped += 1;
            }
            Err(err) => {
                warn!(line = i + 1, error = %err.error, "Script failed");
                stats.events_failed += 1;
                if let Some(event) = err.event.filter(|_| !cli.drop_failed) {
                    write_event(writer, &event, cli.pretty)?;
                    stats.events_out += 1;
                }
            }
        }
    }

    Ok(stats)
}

fn parse_event(line: &str) -> Result<Event> {
    let value: Value = serde_json::from_str(line).context("Invalid JSON")?;
    Ok(Event::from_json(value)?)
}

fn write_event(writer: &mut impl Write, event: &Event, pretty: bool) -> Result<()> {
    let json = event.to_json();
    if pretty {
        writeln!(writer, "{}", serde_json::to_string_pretty(&json)?)?;
    } else {
        writeln!(writer, "{}", serde_json::to_string(&json)?)?;
    }
    Ok(())
}

fn print_stats(stats: &RunStats, elapsed: Duration) {
    eprintln!();
    eprintln!("Statistics:");
    eprintln!("  Events in:       {}", format_number(stats.events_in));
    eprintln!("  Events out:      {}", format_number(stats.events_out));
    eprintln!("  Events dropped:  {}", format_number(stats.events_dropped));
    eprintln!("  Events failed:   {}", format_number(stats.events_failed));
    eprintln!("  Invalid lines:   {}", format_number(stats.lines_invalid));
    eprintln!("  Duration:        {:.2}s", elapsed.as_secs_f64());
    eprintln!("  Throughput:      {}", format_rate(stats.events_in, elapsed));
}
