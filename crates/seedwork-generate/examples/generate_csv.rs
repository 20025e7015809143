use std::env;
use std::path::PathBuf;

use seedwork_core::GenerationConfig;
use seedwork_generate::{CsvSink, CuratedContent, GenerationEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut seed: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().map(PathBuf::from),
            "--out" => out_dir = args.next().map(PathBuf::from),
            "--seed" => seed = args.next().map(|value| value.parse()).transpose()?,
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let mut config = match config_path {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => GenerationConfig::minimal(),
    };
    if seed.is_some() {
        config.seed = seed;
    }

    let out_dir = out_dir.unwrap_or_else(|| PathBuf::from("out/data"));
    let content = CuratedContent::builtin()?;
    let engine = GenerationEngine::new(config, &content)?;
    let mut sink = CsvSink::create(&out_dir)?;
    let outcome = engine.run(&mut sink)?;

    for table in &outcome.report.tables {
        println!("{:<18} {:>8} rows  {}", table.table, table.rows, table.sha256);
    }
    println!("data_dir={}", sink.target().display());
    Ok(())
}
