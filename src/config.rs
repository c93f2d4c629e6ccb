use crate::cli::Cli;
use crate::core::ranking::{RankingMode, MAX_POPULATION, PAGE_SIZE};
use crate::error::{BotError, BotResult};
use crate::storage::DEFAULT_PP_CHANGE_THRESHOLD;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

const TRACE_LEVELS: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const LOCAL_SETTINGS_YAML_FILE: &str = ".env.local.yaml";
// Opaque values: figment would read "0123" as the number 123.
const VERBATIM_KEYS: [&str; 2] = ["osu_oauth_client_id", "osu_oauth_client_secret"];

// All settings may be configured via environment variables. Example:
// OSU_OAUTH_CLIENT_ID="xxx" would set osu_oauth_client_id to the xxx value.
// A local yaml file is read first when present, and command line flags win over both.
#[derive(Deserialize, Debug)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    // Taken verbatim from the environment. Must be quoted in the yaml file.
    pub osu_oauth_client_id: String,
    pub osu_oauth_client_secret: String,
    #[serde(default = "default_osu_base_url")]
    pub osu_base_url: String,
    #[serde(default = "default_osu_api_timeout_sec")]
    pub osu_api_timeout_sec: u64,
    #[serde(default)]
    pub ranking_mode: RankingMode,
    #[serde(default = "default_pp_change_threshold")]
    pub pp_change_threshold: f64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_population_limit")]
    pub population_limit: u32,
    #[serde(default = "default_fetch_retry_delay_sec")]
    pub fetch_retry_delay_sec: u64,
    pub slack_token: String,
    pub slack_default_channel: String,
    // Channel to receive the watcher's status events
    pub slack_monitoring_channel: Option<String>,
}

impl Settings {
    pub fn new(cli: Cli) -> BotResult<Self> {
        let figment = match Path::new(LOCAL_SETTINGS_YAML_FILE).exists() {
            true => {
                println!(
                    "\n######################################\n\
                       ##   Found '.env.local.yaml' file,  ##\n\
                       ##   loading local configuration.   ##\n\
                       ######################################\n\
                    "
                );
                Figment::new().merge(Yaml::file(LOCAL_SETTINGS_YAML_FILE))
            }
            false => Figment::new(),
        };

        Settings::from_figment(figment.merge(environment()).merge(Serialized::defaults(cli)))
    }

    pub fn from_figment(figment: Figment) -> BotResult<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> BotResult<()> {
        if self.osu_oauth_client_id.trim().is_empty() {
            return Err(BotError::Config("OSU_OAUTH_CLIENT_ID is empty".to_string()));
        }
        if self.osu_oauth_client_secret.trim().is_empty() {
            return Err(BotError::Config("OSU_OAUTH_CLIENT_SECRET is empty".to_string()));
        }
        if !self.pp_change_threshold.is_finite() || self.pp_change_threshold <= 0.0 {
            return Err(BotError::Config(format!(
                "pp change threshold must be a positive number, got {}",
                self.pp_change_threshold
            )));
        }
        if self.fetch_retry_delay_sec == 0 {
            return Err(BotError::Config(
                "fetch retry delay must be at least 1 second".to_string(),
            ));
        }
        if self.page_size != PAGE_SIZE {
            return Err(BotError::Config(format!(
                "the osu! API serves {} players per page, got {}",
                PAGE_SIZE, self.page_size
            )));
        }
        if self.population_limit < self.page_size
            || self.population_limit > MAX_POPULATION
            || self.population_limit % self.page_size != 0
        {
            return Err(BotError::Config(format!(
                "population limit must be a multiple of {} between {} and {}, got {}",
                self.page_size, self.page_size, MAX_POPULATION, self.population_limit
            )));
        }
        Ok(())
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }

    pub fn total_pages(&self) -> u32 {
        self.population_limit / self.page_size
    }

    pub fn fetch_retry_delay(&self) -> Duration {
        Duration::from_secs(self.fetch_retry_delay_sec)
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

/// Environment variables, with the credentials kept as the exact text that was set.
pub fn environment() -> Figment {
    let verbatim: BTreeMap<String, String> = Env::raw()
        .only(&VERBATIM_KEYS)
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), value))
        .collect();

    Figment::from(Env::raw().ignore(&VERBATIM_KEYS)).merge(Serialized::defaults(verbatim))
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_osu_base_url() -> String {
    "https://osu.ppy.sh".to_string()
}

fn default_osu_api_timeout_sec() -> u64 {
    10
}

fn default_pp_change_threshold() -> f64 {
    DEFAULT_PP_CHANGE_THRESHOLD
}

fn default_page_size() -> u32 {
    PAGE_SIZE
}

fn default_population_limit() -> u32 {
    MAX_POPULATION
}

fn default_fetch_retry_delay_sec() -> u64 {
    10
}
