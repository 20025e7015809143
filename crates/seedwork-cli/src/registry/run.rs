use std::fs::{OpenOptions, create_dir_all, remove_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use seedwork_core::{FORMAT_VERSION, GenerationConfig};
use seedwork_generate::GenerationReport;

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub strict: bool,
    pub runs_dir: PathBuf,
    pub content_dir: Option<PathBuf>,
    /// Fully resolved config: seed and reference time are always set.
    pub config: GenerationConfig,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub format_version: String,
    pub strict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_dir: Option<PathBuf>,
    pub config: GenerationConfig,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub data_dir: PathBuf,
    pub generation_report_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx
        .runs_dir
        .join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        format_version: FORMAT_VERSION.to_string(),
        strict: ctx.strict,
        content_dir: ctx.content_dir.clone(),
        config: ctx.config.clone(),
        git: collect_git_info(),
    };

    write_json(&config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        data_dir: root.join("data"),
        generation_report_path: root.join("generation_report.json"),
        logs_path,
        root,
    })
}

pub fn write_generation_report(paths: &RunPaths, report: &GenerationReport) -> RegistryResult<()> {
    write_json(&paths.generation_report_path, report)
}

/// Remove published CSV output of a rejected run.
pub fn discard_data(paths: &RunPaths) -> RegistryResult<()> {
    if paths.data_dir.exists() {
        remove_dir_all(&paths.data_dir)?;
    }
    Ok(())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_directory_holds_config_and_log_file() {
        let runs_dir = std::env::temp_dir().join(format!("seedwork_cli_{}", uuid::Uuid::new_v4()));
        let ctx = RunContext {
            run_id: "abc".to_string(),
            started_at: Utc::now(),
            strict: false,
            runs_dir: runs_dir.clone(),
            content_dir: None,
            config: GenerationConfig {
                seed: Some(7),
                ..GenerationConfig::minimal()
            },
        };

        let paths = start_run(&ctx).expect("start run");
        assert!(paths.root.starts_with(&runs_dir));
        assert!(
            paths
                .root
                .file_name()
                .expect("run dir name")
                .to_string_lossy()
                .ends_with("__run_abc")
        );
        assert!(paths.logs_path.exists());

        let config: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(paths.root.join("config.json")).expect("read config"),
        )
        .expect("parse config");
        assert_eq!(config["run_id"], "abc");
        assert_eq!(config["config"]["seed"], 7);
        assert_eq!(config["format_version"], FORMAT_VERSION);
    }

    #[test]
    fn failed_generation_report_keeps_its_failure() {
        let runs_dir = std::env::temp_dir().join(format!("seedwork_cli_{}", uuid::Uuid::new_v4()));
        let ctx = RunContext {
            run_id: "failed".to_string(),
            started_at: Utc::now(),
            strict: false,
            runs_dir,
            content_dir: None,
            config: GenerationConfig::minimal(),
        };
        let paths = start_run(&ctx).expect("start run");

        let content = seedwork_generate::CuratedContent::builtin().expect("builtin content");
        let config = GenerationConfig {
            reference_time: Some(chrono::NaiveDateTime::MIN),
            ..GenerationConfig::minimal()
        };
        let engine = seedwork_generate::GenerationEngine::new(config, &content)
            .expect("valid config")
            .with_run_id("failed");
        let (report, outcome) = engine.run_with_report(&mut seedwork_generate::MemorySink::new());
        assert!(outcome.is_err());
        write_generation_report(&paths, &report).expect("write report");

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&paths.generation_report_path).expect("read report"),
        )
        .expect("parse report");
        assert_eq!(written["run_id"], "failed");
        let failure = written["failure"].as_str().expect("failure recorded");
        assert!(failure.contains("out of range"));
    }
}
