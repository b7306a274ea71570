//! Environment-sourced settings.
//!
//! All values are read once at start-up. Parsing goes through a lookup
//! function so tests can supply a map instead of the process environment.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use film_indexer_pipeline::backoff::BackoffConfig;
use film_indexer_pipeline::scheduler::SchedulerConfig;
use sqlx::postgres::PgConnectOptions;
use url::Url;

use crate::IndexingError;

const DEFAULT_POSTGRES_DB: &str = "movies_database";
const DEFAULT_POSTGRES_USER: &str = "app";
const DEFAULT_POSTGRES_HOST: &str = "db";
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_ELASTIC_HOST: &str = "elastic";
const DEFAULT_ELASTIC_PORT: u16 = 9200;
const DEFAULT_INDEX_NAME: &str = "movies";
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_SLEEP_TIME_SECS: f64 = 60.0;
const DEFAULT_BACKOFF_START_SECS: f64 = 0.1;
const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
const DEFAULT_BACKOFF_BORDER_SECS: f64 = 10.0;
const DEFAULT_STATE_FILE: &str = "state.json";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Connection parameters for the catalog database.
#[derive(Clone, PartialEq)]
pub struct PostgresSettings {
    pub database: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl PostgresSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Search engine location and target index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub url: Url,
    pub index_name: String,
}

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub batch_size: usize,
    pub interval: Duration,
    pub backoff: BackoffConfig,
    pub retry_failed_runs: bool,
}

impl SyncSettings {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: self.interval,
            retry_failed_runs: self.retry_failed_runs,
            backoff: self.backoff,
        }
    }
}

/// Everything the indexer reads from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub postgres: PostgresSettings,
    pub search: SearchSettings,
    pub sync: SyncSettings,
    pub state_file: PathBuf,
    pub log_format: LogFormat,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let postgres = PostgresSettings {
            database: vars.string("POSTGRES_DB", DEFAULT_POSTGRES_DB),
            user: vars.string("POSTGRES_USER", DEFAULT_POSTGRES_USER),
            password: vars
                .get("POSTGRES_PASSWORD")
                .ok_or_else(|| IndexingError::config("POSTGRES_PASSWORD is not set"))?,
            host: vars.string("POSTGRES_HOST", DEFAULT_POSTGRES_HOST),
            port: vars.parse("POSTGRES_PORT", DEFAULT_POSTGRES_PORT)?,
        };

        let url = match vars.get("ELASTIC_URL") {
            Some(raw) => raw,
            None => format!(
                "http://{}:{}",
                vars.string("ELASTIC_HOST", DEFAULT_ELASTIC_HOST),
                vars.parse("ELASTIC_PORT", DEFAULT_ELASTIC_PORT)?
            ),
        };
        let search = SearchSettings {
            url: Url::parse(&url)
                .map_err(|e| IndexingError::config(format!("Invalid search URL {}: {}", url, e)))?,
            index_name: vars.string("INDEX_NAME", DEFAULT_INDEX_NAME),
        };

        let batch_size: usize = vars.parse("BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(IndexingError::config("BATCH_SIZE must be greater than 0"));
        }

        let factor: f64 = vars.parse("BACKOFF_FACTOR", DEFAULT_BACKOFF_FACTOR)?;
        if !factor.is_finite() || factor < 1.0 {
            return Err(IndexingError::config("BACKOFF_FACTOR must be at least 1"));
        }

        let backoff = BackoffConfig {
            start: vars.seconds("BACKOFF_START", DEFAULT_BACKOFF_START_SECS)?,
            factor,
            cap: vars.seconds("BACKOFF_BORDER", DEFAULT_BACKOFF_BORDER_SECS)?,
        };
        if backoff.start > backoff.cap {
            return Err(IndexingError::config(
                "BACKOFF_START must not exceed BACKOFF_BORDER",
            ));
        }

        let sync = SyncSettings {
            batch_size,
            interval: vars.seconds("SLEEP_TIME", DEFAULT_SLEEP_TIME_SECS)?,
            backoff,
            retry_failed_runs: vars.flag("RETRY_FAILED_RUNS", true)?,
        };

        Ok(Self {
            postgres,
            search,
            sync,
            state_file: PathBuf::from(vars.string("STATE_FILE", DEFAULT_STATE_FILE)),
            log_format: vars.parse("LOG_FORMAT", LogFormat::default())?,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, IndexingError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| IndexingError::config(format!("Invalid {} '{}': {}", key, raw, e))),
            None => Ok(default),
        }
    }

    fn seconds(&self, key: &str, default: f64) -> Result<Duration, IndexingError> {
        let secs: f64 = self.parse(key, default)?;
        Duration::try_from_secs_f64(secs).map_err(|e| {
            IndexingError::config(format!("Invalid {} '{}': {}", key, secs, e))
        })
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, IndexingError> {
        match self.get(key).map(|raw| raw.to_ascii_lowercase()) {
            None => Ok(default),
            Some(raw) => match raw.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(IndexingError::config(format!(
                    "Invalid {} '{}': expected true or false",
                    key, raw
                ))),
            },
        }
    }
}
