use anyhow::{Context, anyhow};
use bitemp::{Bitemp, Config};
use clap::Parser;
use console::Console;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

mod console;
mod render;

/// Interactive console over a bi-temporal measurement store
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file of measurement records to load at startup
    #[arg(short, long)]
    records: Option<PathBuf>,

    /// JSON LOINC table (code to long common name)
    #[arg(short, long)]
    loinc: Option<PathBuf>,

    /// Configuration file (JSON, or TOML with the `toml` feature)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial system perspective, in the configured datetime format
    #[arg(long)]
    now: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("bitemp=info"))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let mut builder = Bitemp::builder().config(config.clone());
    if let Some(raw) = &args.now {
        let now = config
            .formats
            .parse_datetime(raw)
            .ok_or_else(|| anyhow!("--now '{}' does not match {}", raw, config.formats.datetime))?;
        builder = builder.perspective(now);
    }
    if let Some(path) = args.records {
        builder = builder.records_path(path);
    }
    if let Some(path) = args.loinc {
        builder = builder.catalog_path(path);
    }

    let (db, report) = builder.build_with_report().context("failed to open database")?;
    log::info!(
        "Ready: {} records loaded, {} rejected, perspective {}",
        report.inserted,
        report.rejected.len(),
        config.formats.render_datetime(db.system_perspective())
    );

    Console::new(db, io::stdin().lock(), io::stdout()).run()
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;

    #[cfg(feature = "toml")]
    if path.extension().is_some_and(|ext| ext == "toml") {
        return Config::from_toml(&text)
            .with_context(|| format!("invalid config {}", path.display()));
    }

    Config::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
}
