use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::completion::ModelParams;
use crate::loader::{Limits, LoadPolicy};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "bill_impact";
pub const ENV_PREFIX: &str = "IMPACT";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub extraction_model: String,
    pub fusion_model: String,

    pub chunk_size: usize,
    pub chunk_max_tokens: u32,
    pub fusion_max_tokens: u32,
    pub temperature: f32,

    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_attempts: u32,
    /// First retry delay; doubles on each further attempt.
    pub retry_backoff_ms: u64,
    pub concurrency: usize,
    /// Soft budget for the chunk phase: once spent, no new chunk request is
    /// issued and fusion runs on what was gathered. 0 disables it.
    pub analysis_budget_secs: u64,
    /// Hard wall-clock limit for a whole run. 0 disables it.
    pub run_timeout_secs: u64,

    pub out_dir: PathBuf,

    pub xml_max_chars: usize,
    pub xml_max_units: usize,
    pub text_max_chars: usize,
    pub text_max_units: usize,
}

impl Settings {
    /// Defaults, then the config file, then `IMPACT_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("api_base", "http://localhost:11434/v1")?
            .set_default("extraction_model", "llama3.1:8b")?
            .set_default("fusion_model", "llama3.1:70b")?
            .set_default("chunk_size", 400)?
            .set_default("chunk_max_tokens", 1500)?
            .set_default("fusion_max_tokens", 3000)?
            .set_default("temperature", 0.1)?
            .set_default("request_timeout_secs", 300)?
            .set_default("connect_timeout_secs", 60)?
            .set_default("max_attempts", 2)?
            .set_default("retry_backoff_ms", 2000)?
            .set_default("concurrency", 1)?
            .set_default("analysis_budget_secs", 0)?
            .set_default("run_timeout_secs", 0)?
            .set_default("out_dir", ".")?
            .set_default("xml_max_chars", 50_000)?
            .set_default("xml_max_units", 200)?
            .set_default("text_max_chars", 2_000_000)?
            .set_default("text_max_units", 20_000)?;

        let builder = match path {
            Some(p) => builder.add_source(File::from(p)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Message("chunk_size must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Message("concurrency must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Message("max_attempts must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Message(format!(
                "temperature must be within 0..=2, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    pub fn extraction_params(&self) -> ModelParams {
        ModelParams {
            model: self.extraction_model.clone(),
            max_tokens: self.chunk_max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn fusion_params(&self) -> ModelParams {
        ModelParams {
            model: self.fusion_model.clone(),
            max_tokens: self.fusion_max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn load_policy(&self) -> LoadPolicy {
        LoadPolicy {
            xml: Limits {
                max_chars: self.xml_max_chars,
                max_units: self.xml_max_units,
            },
            text: Limits {
                max_chars: self.text_max_chars,
                max_units: self.text_max_units,
            },
        }
    }

    pub fn analysis_budget(&self) -> Option<Duration> {
        (self.analysis_budget_secs > 0).then(|| Duration::from_secs(self.analysis_budget_secs))
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }
}
