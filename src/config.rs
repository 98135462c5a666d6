use std::{str::FromStr, time::Duration};

use anyhow::Context;

use crate::{sessions::DEFAULT_IDLE_TTL, sync::SyncSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Supabase,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Supabase => "supabase",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "" => Ok(StoreBackend::Sqlite),
            "supabase" => Ok(StoreBackend::Supabase),
            other => Err(ConfigError::Invalid {
                name: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is missing")]
    Missing(&'static str),
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug)]
pub struct Config {
    pub backend: StoreBackend,
    pub db_connection_string: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_access_token: Option<String>,
    pub bind_addr: String,
    pub sync: SyncSettings,
    /// Sessions without any activity for this long are dropped
    pub session_idle_ttl: Duration,
}

const DEFAULT_DB_CONNECTION_STRING: &str = "sqlite://db.sqlite?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).unwrap_or_default();
        let defaults = SyncSettings::default();

        let backend: StoreBackend = var("STORE_BACKEND").parse()?;
        let min_interval = match lookup("SYNC_MIN_INTERVAL_MS") {
            Some(ms) => Duration::from_millis(
                ms.trim()
                    .parse()
                    .with_context(|| format!("Invalid SYNC_MIN_INTERVAL_MS: {}", ms))?,
            ),
            None => defaults.min_interval,
        };
        let min_change = match lookup("SYNC_MIN_CHANGE") {
            Some(step) => step
                .trim()
                .parse()
                .with_context(|| format!("Invalid SYNC_MIN_CHANGE: {}", step))?,
            None => defaults.min_change,
        };

        let session_idle_ttl = match lookup("SESSION_IDLE_TTL_SECS") {
            Some(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .with_context(|| format!("Invalid SESSION_IDLE_TTL_SECS: {}", secs))?,
            ),
            None => DEFAULT_IDLE_TTL,
        };

        Ok(Config {
            backend,
            db_connection_string: lookup("DB_CONNECTION_STRING")
                .unwrap_or(DEFAULT_DB_CONNECTION_STRING.into()),
            supabase_url: var("SUPABASE_URL"),
            supabase_anon_key: var("SUPABASE_ANON_KEY"),
            supabase_access_token: lookup("SUPABASE_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            bind_addr: lookup("BIND_ADDR").unwrap_or(DEFAULT_BIND_ADDR.into()),
            sync: SyncSettings {
                min_change,
                min_interval,
            },
            session_idle_ttl,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == StoreBackend::Supabase {
            if self.supabase_url.is_empty() {
                return Err(ConfigError::Missing("SUPABASE_URL"));
            }
            if self.supabase_anon_key.is_empty() {
                return Err(ConfigError::Missing("SUPABASE_ANON_KEY"));
            }
        }
        // A zero step would let repeated positions through as writes
        if self.sync.min_change == 0 || self.sync.min_change > 100 {
            return Err(ConfigError::Invalid {
                name: "SYNC_MIN_CHANGE",
                value: self.sync.min_change.to_string(),
            });
        }
        if self.session_idle_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                name: "SESSION_IDLE_TTL_SECS",
                value: "0".into(),
            });
        }
        Ok(())
    }
}
