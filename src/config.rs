use anyhow::Context;
use serde::Deserialize;

/// Accepted range for `SESSION_TTL_DAYS`.
pub const SESSION_TTL_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_days: i64,
    pub sliding: bool,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub public_url: String,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("AUTH_STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            Ok("postgres") | Err(_) => StoreKind::Postgres,
            Ok(other) => anyhow::bail!("unknown AUTH_STORE {other:?}"),
        };
        let database_url = match store {
            StoreKind::Postgres => Some(std::env::var("DATABASE_URL").context("DATABASE_URL")?),
            StoreKind::Memory => std::env::var("DATABASE_URL").ok(),
        };
        let session = SessionConfig {
            ttl_days: env_parse("SESSION_TTL_DAYS").unwrap_or(90),
            sliding: env_parse("SESSION_SLIDING").unwrap_or(false),
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "session".into()),
            cookie_secure: env_parse("SESSION_COOKIE_SECURE").unwrap_or(true),
            purge_interval_secs: env_parse("SESSION_PURGE_INTERVAL_SECS").unwrap_or(60 * 60),
        };
        check_ttl_days(session.ttl_days)?;

        Ok(Self {
            store,
            database_url,
            public_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            session,
        })
    }
}

fn check_ttl_days(days: i64) -> anyhow::Result<()> {
    anyhow::ensure!(
        SESSION_TTL_DAYS_RANGE.contains(&days),
        "SESSION_TTL_DAYS must be within {}..={}, got {days}",
        SESSION_TTL_DAYS_RANGE.start(),
        SESSION_TTL_DAYS_RANGE.end()
    );
    Ok(())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
