use std::path::Path;

use chrono::NaiveDateTime;

use seedwork_core::{GenerationConfig, TIMESTAMP_FORMAT};

use crate::CliError;

/// Command-line overrides applied on top of the file or preset config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub organizations: Option<u32>,
    pub users: Option<u32>,
    pub history_months: Option<u32>,
    pub tasks_per_user: Option<u32>,
    pub seed: Option<u64>,
    pub reference_time: Option<NaiveDateTime>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut GenerationConfig) {
        if let Some(value) = self.organizations {
            config.organizations = value;
        }
        if let Some(value) = self.users {
            config.users = value;
        }
        if let Some(value) = self.history_months {
            config.history_months = value;
        }
        if let Some(value) = self.tasks_per_user {
            config.tasks_per_user = value;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.reference_time.is_some() {
            config.reference_time = self.reference_time;
        }
    }
}

/// TOML file (or preset), then flags, then validation. Seed and reference
/// time are pinned so the recorded config reproduces the run.
pub fn resolve_config(
    path: Option<&Path>,
    minimal: bool,
    overrides: &ConfigOverrides,
) -> Result<GenerationConfig, CliError> {
    let mut config = match path {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None if minimal => GenerationConfig::minimal(),
        None => GenerationConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;

    config.seed = Some(config.seed.unwrap_or_else(rand::random));
    config.reference_time = Some(config.resolve_reference_time());
    Ok(config)
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or the ISO `T` form.
pub fn parse_reference_time(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| value.parse::<NaiveDateTime>())
        .map_err(|err| format!("invalid reference time '{value}': {err}"))
}

pub fn default_config_toml() -> Result<String, CliError> {
    Ok(toml::to_string_pretty(&GenerationConfig::default())?)
}

pub fn config_schema_json() -> Result<String, CliError> {
    let schema = schemars::schema_for!(GenerationConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}
