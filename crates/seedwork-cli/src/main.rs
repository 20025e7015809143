mod registry;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use seedwork_core::Error as CoreError;
use seedwork_eval::{EvalError, EvaluateOptions, EvaluationEngine};
use seedwork_generate::{CsvSink, CuratedContent, GenerationEngine, GenerationError};
use thiserror::Error;
use uuid::Uuid;

use registry::{RunContext, discard_data, init_run_logging, start_run, write_generation_report};
use settings::{
    ConfigOverrides, config_schema_json, default_config_toml, parse_reference_time,
    resolve_config,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("config render error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("batch rejected: {errors} validation error(s), see {}", .report.display())]
    Rejected { errors: u64, report: PathBuf },
}

#[derive(Parser, Debug)]
#[command(name = "seedwork", version, about = "Synthetic work-management data generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a batch into a new run directory and validate it.
    Generate(GenerateArgs),
    /// Re-validate an existing run directory.
    Validate(ValidateArgs),
    /// Print the default config as TOML, or its JSON schema.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// TOML config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Start from the small smoke-run preset instead of the defaults.
    #[arg(long, default_value_t = false, conflicts_with = "config")]
    minimal: bool,
    #[arg(long)]
    organizations: Option<u32>,
    #[arg(long)]
    users: Option<u32>,
    #[arg(long)]
    months: Option<u32>,
    #[arg(long)]
    tasks_per_user: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    /// Timestamp treated as "now", e.g. "2024-06-30 12:00:00".
    #[arg(long, value_parser = parse_reference_time)]
    reference_time: Option<chrono::NaiveDateTime>,
    /// Directory of `<category>.json` tables overriding the built-in content.
    #[arg(long, value_name = "DIR")]
    content_dir: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    out: PathBuf,
    /// Reject the batch (and remove its data) on any validation error.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Debug-level logging.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Run directory produced by `seedwork generate`.
    #[arg(long, value_name = "DIR")]
    run: PathBuf,
    /// Exit non-zero on any validation error.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Print the JSON schema instead of the default TOML.
    #[arg(long, default_value_t = false)]
    schema: bool,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Validate(args) => run_validate(args),
        Command::Config(args) => {
            let text = if args.schema {
                config_schema_json()?
            } else {
                default_config_toml()?
            };
            println!("{text}");
            Ok(())
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let overrides = ConfigOverrides {
        organizations: args.organizations,
        users: args.users,
        history_months: args.months,
        tasks_per_user: args.tasks_per_user,
        seed: args.seed,
        reference_time: args.reference_time,
    };
    let config = resolve_config(args.config.as_deref(), args.minimal, &overrides)?;

    let content = match &args.content_dir {
        Some(dir) => CuratedContent::with_overrides(dir)?,
        None => CuratedContent::builtin()?,
    };

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        strict: args.strict,
        runs_dir: args.out,
        content_dir: args.content_dir,
        config,
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path, args.verbose)?;
    tracing::info!(event = "run_started", run_id = %run_id, run_dir = %run_paths.root.display());

    let timer = Instant::now();
    let engine =
        GenerationEngine::new(run_ctx.config.clone(), &content)?.with_run_id(run_id.clone());
    let mut sink = CsvSink::create(&run_paths.data_dir)?;
    let (report, outcome) = engine.run_with_report(&mut sink);
    write_generation_report(&run_paths, &report)?;
    if let Err(err) = outcome {
        tracing::warn!(event = "run_finished", status = "failed", run_id = %run_id);
        return Err(err.into());
    }
    tracing::info!(
        event = "data_written",
        path = %run_paths.data_dir.display(),
        bytes = sink.bytes_written()
    );

    let evaluator = EvaluationEngine::new(EvaluateOptions::default());
    let result = evaluator.run(&run_paths.root)?;
    tracing::info!(
        event = "validation_finished",
        passed = result.summary.passed,
        errors = result.summary.error_count,
        warnings = result.summary.warning_count
    );

    if run_ctx.strict && !result.summary.passed {
        discard_data(&run_paths)?;
        tracing::warn!(event = "run_finished", status = "rejected", run_id = %run_id);
        return Err(CliError::Rejected {
            errors: result.summary.error_count,
            report: result.report_path,
        });
    }

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);

    for table in &report.tables {
        println!("{:<18} {:>8} rows", table.table, table.rows);
    }
    println!("run_dir={}", run_paths.root.display());
    println!("report_path={}", result.report_path.display());
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    let engine = EvaluationEngine::new(EvaluateOptions::default());
    let result = engine.run(&args.run)?;

    println!("passed={}", result.summary.passed);
    println!("errors={}", result.summary.error_count);
    println!("warnings={}", result.summary.warning_count);
    println!("report_path={}", result.report_path.display());

    if args.strict && !result.summary.passed {
        return Err(CliError::Rejected {
            errors: result.summary.error_count,
            report: result.report_path,
        });
    }
    Ok(())
}
