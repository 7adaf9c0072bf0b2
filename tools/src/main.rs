//! ingest-runner: headless upload runner for the branch ingest pipeline.
//!
//! Usage:
//!   ingest-runner --db branch.db deposit_shadow.csv ccod_0324.csv
//!   ingest-runner --as-of 2024-03-31 --config data/pipeline.json --rebuild *.csv
//!   ingest-runner --json product_mapping.csv loan_balance.csv

use anyhow::{Context, Result};
use branch_ingest_core::{
    clock::{Clock, FixedClock, SystemClock},
    config::PipelineConfig,
    engine::IngestEngine,
    store::{IngestStore, Table},
};
use chrono::NaiveDate;
use std::{env, fs, path::Path, process::ExitCode};

const DEFAULT_CONFIG: &str = "data/pipeline.json";

/// Flags that take a value; everything else not starting with `--` is a file.
const VALUE_FLAGS: [&str; 3] = ["--db", "--config", "--as-of"];

#[derive(serde::Serialize)]
struct UploadLine {
    file:         String,
    status:       &'static str,
    file_type:    Option<String>,
    record_count: usize,
    customers:    Option<usize>,
    error:        Option<String>,
}

#[derive(serde::Serialize)]
struct RunSummary {
    as_of:        NaiveDate,
    uploads:      Vec<UploadLine>,
    failures:     usize,
    table_counts: Vec<(String, i64)>,
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let config_path = flag_value(&args, "--config").unwrap_or(DEFAULT_CONFIG);
    let as_of = flag_value(&args, "--as-of")
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--as-of expects YYYY-MM-DD")?;
    let force_rebuild = args.iter().any(|a| a == "--rebuild");
    let json = args.iter().any(|a| a == "--json");
    let files = file_args(&args);

    let config = load_config(config_path)?;
    let clock: Box<dyn Clock> = match as_of {
        Some(date) => Box::new(FixedClock::new(date)),
        None => Box::new(SystemClock),
    };
    let today = clock.today();

    if !json {
        println!("Branch ingest: ingest-runner");
        println!("  db:      {db}");
        println!("  config:  {config_path}");
        println!("  as of:   {today}");
        println!("  files:   {}", files.len());
        println!();
    }

    let store = IngestStore::open(db)?;
    store.migrate()?;
    let mut engine = IngestEngine::new(store, config, clock);

    let mut uploads = Vec::with_capacity(files.len());
    for path in &files {
        let line = upload_file(&mut engine, path);
        if !json {
            print_upload(&line);
        }
        uploads.push(line);
    }

    let mut failures = uploads.iter().filter(|u| u.status == "error").count();
    if force_rebuild {
        match engine.rebuild_customers() {
            Ok(n) => {
                if !json {
                    println!("  rebuild  customer dimension -> {n} customers");
                }
            }
            Err(e) => {
                log::error!("forced rebuild failed: {e}");
                failures += 1;
            }
        }
    }

    let summary = RunSummary {
        as_of: today,
        uploads,
        failures,
        table_counts: table_counts(&engine.store)?,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn upload_file(engine: &mut IngestEngine, path: &str) -> UploadLine {
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();

    let result = fs::read_to_string(path)
        .with_context(|| format!("cannot read {path}"))
        .and_then(|text| engine.upload(&file_name, &text).map_err(anyhow::Error::from));

    match result {
        Ok(outcome) => UploadLine {
            file:         file_name,
            status:       "success",
            file_type:    Some(outcome.file_type.as_str().to_string()),
            record_count: outcome.record_count,
            customers:    outcome.customers_rebuilt,
            error:        None,
        },
        Err(e) => UploadLine {
            file:         file_name,
            status:       "error",
            file_type:    None,
            record_count: 0,
            customers:    None,
            error:        Some(format!("{e:#}")),
        },
    }
}

fn print_upload(line: &UploadLine) {
    match &line.error {
        None => println!(
            "  ok       {:<32} {:<22} {:>7} records{}",
            line.file,
            line.file_type.as_deref().unwrap_or(""),
            line.record_count,
            line.customers
                .map(|n| format!(", {n} customers"))
                .unwrap_or_default()
        ),
        Some(e) => println!("  FAILED   {:<32} {e}", line.file),
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== TABLE COUNTS ===");
    for (table, count) in &summary.table_counts {
        println!("  {table:<22} {count}");
    }
    println!();
    println!("  uploads:   {}", summary.uploads.len());
    println!("  failures:  {}", summary.failures);
}

fn table_counts(store: &IngestStore) -> Result<Vec<(String, i64)>> {
    Table::ALL
        .iter()
        .map(|t| Ok((t.name().to_string(), store.count(*t)?)))
        .collect()
}

/// Missing default config falls back to the built-in tables; a missing
/// explicitly named config is an error.
fn load_config(path: &str) -> Result<PipelineConfig> {
    if path == DEFAULT_CONFIG && !Path::new(path).exists() {
        log::info!("{path} not found, using built-in defaults");
        return Ok(PipelineConfig::default());
    }
    PipelineConfig::load(path)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn file_args(args: &[String]) -> Vec<String> {
    let mut files = Vec::new();
    let mut skip_next = false;
    for a in args {
        if skip_next {
            skip_next = false;
        } else if VALUE_FLAGS.contains(&a.as_str()) {
            skip_next = true;
        } else if !a.starts_with("--") {
            files.push(a.clone());
        }
    }
    files
}
