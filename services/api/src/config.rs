//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use onboarding_core::{InputModality, ResponseMode};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

const DEFAULT_KNOWN_COMPANIES: &str = "heineken,musgrave,glanbia,ballymoyle";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// When absent, reports are written to `report_path` instead of Postgres.
    pub database_url: Option<String>,
    pub report_path: PathBuf,
    pub log_level: Level,
    pub slots_path: Option<PathBuf>,
    pub openai_api_key: String,
    pub ai_model: String,
    pub ai_temperature: f32,
    pub sst_model: String,
    pub tts_voice: String,
    pub response_mode: ResponseMode,
    pub input_mode: InputModality,
    pub known_companies: Vec<String>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        // --- Server and Storage Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3002");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var("DATABASE_URL");
        let report_path = PathBuf::from(var_or("REPORT_PATH", "./onboarding.json"));
        let slots_path = var("SLOTS_PATH").map(PathBuf::from);

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- OpenAI Settings ---
        let openai_api_key =
            var("OPENAI_API_KEY").ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let ai_model = var_or("AI_MODEL", "gpt-3.5-turbo");
        let ai_temperature = parse_temperature(&var_or("AI_TEMPERATURE", "0.7"))?;
        let sst_model = var_or("SST_MODEL", "whisper-1");
        let tts_voice = var_or("TTS_VOICE", "alloy");

        // --- Conversation Defaults ---
        let response_mode = var_or("RESPONSE_MODE", "ai")
            .parse::<ResponseMode>()
            .map_err(|e| ConfigError::InvalidValue("RESPONSE_MODE".to_string(), e.to_string()))?;
        let input_mode = var_or("INPUT_MODE", "audio")
            .parse::<InputModality>()
            .map_err(|e| ConfigError::InvalidValue("INPUT_MODE".to_string(), e.to_string()))?;

        let known_companies = parse_company_list(&var_or("KNOWN_COMPANIES", DEFAULT_KNOWN_COMPANIES));
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:5173");

        Ok(Self {
            bind_address,
            database_url,
            report_path,
            log_level,
            slots_path,
            openai_api_key,
            ai_model,
            ai_temperature,
            sst_model,
            tts_voice,
            response_mode,
            input_mode,
            known_companies,
            cors_origin,
        })
    }
}

fn parse_temperature(raw: &str) -> Result<f32, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue("AI_TEMPERATURE".to_string(), reason);
    let temperature = raw
        .trim()
        .parse::<f32>()
        .map_err(|e| invalid(e.to_string()))?;
    if !(0.0..=2.0).contains(&temperature) {
        return Err(invalid(format!("{} is outside 0.0 to 2.0", temperature)));
    }
    Ok(temperature)
}

/// Comma-separated, trimmed and lower-cased; blanks dropped.
fn parse_company_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}
