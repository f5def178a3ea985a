use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::controller::SessionLimits;

pub const DEFAULT_BIND: &str = "0.0.0.0:8050";
pub const DEFAULT_MAX_TABLE_ROWS: usize = 1000;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub database_url: Option<String>,
    pub reviews_csv: Option<PathBuf>,
    pub topics_csv: Option<PathBuf>,
    pub bind: String,
    pub max_table_rows: usize,
    pub sessions: SessionLimits,
}

impl DashboardConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = SessionLimits::default();
        let idle_secs = parse_or(
            "SESSION_IDLE_SECS",
            non_empty("SESSION_IDLE_SECS"),
            defaults.idle_timeout.as_secs(),
        )?;
        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            reviews_csv: non_empty("REVIEWS_CSV").map(PathBuf::from),
            topics_csv: non_empty("TOPICS_CSV").map(PathBuf::from),
            bind: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            max_table_rows: parse_or(
                "MAX_TABLE_ROWS",
                non_empty("MAX_TABLE_ROWS"),
                DEFAULT_MAX_TABLE_ROWS,
            )?,
            sessions: SessionLimits {
                max_sessions: parse_or(
                    "MAX_SESSIONS",
                    non_empty("MAX_SESSIONS"),
                    defaults.max_sessions,
                )?,
                idle_timeout: Duration::from_secs(idle_secs),
            },
        })
    }

    /// Command-line flags take precedence over the environment.
    pub fn with_overrides(
        mut self,
        reviews_csv: Option<PathBuf>,
        topics_csv: Option<PathBuf>,
        bind: Option<String>,
    ) -> Self {
        if reviews_csv.is_some() {
            self.reviews_csv = reviews_csv;
        }
        if topics_csv.is_some() {
            self.topics_csv = topics_csv;
        }
        if let Some(bind) = bind {
            self.bind = bind;
        }
        self
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set when no reviews CSV is given")
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("invalid bind address {:?}", self.bind))
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key} value {raw:?}")),
        None => Ok(default),
    }
}
