//! Runtime configuration for the recruiter service.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Regional endpoint of the statistics service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realm {
    Eu,
    Na,
    Asia,
}

impl Realm {
    /// Base URL of the realm's API host.
    pub fn api_base(self) -> &'static str {
        match self {
            Realm::Eu => "https://api.worldofwarships.eu/",
            Realm::Na => "https://api.worldofwarships.com/",
            Realm::Asia => "https://api.worldofwarships.asia/",
        }
    }
}

impl FromStr for Realm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eu" => Ok(Realm::Eu),
            "na" => Ok(Realm::Na),
            "asia" => Ok(Realm::Asia),
            other => Err(Error::UnknownRealm(other.to_owned())),
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Realm::Eu => "eu",
            Realm::Na => "na",
            Realm::Asia => "asia",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Application id for the statistics service.
    pub api_key: String,
    pub realm: Realm,
    /// Lowers the default log level to `debug`.
    pub debug: bool,
    /// Bot credential used for outbound chat messages.
    pub discord_token: String,
    pub database_url: String,
    /// Optional pub/sub mirror for departure events.
    pub redis_url: Option<String>,
    pub server_addr: String,
    /// Cadence of the full scan over every listed clan.
    pub full_scan_every: Duration,
    /// Cadence of the incremental scan over tracked clans.
    pub monitored_scan_every: Duration,
    /// Capacity of the departure notification channel.
    pub event_buffer: usize,
    /// Below this many stored clans a full scan runs at startup.
    pub bootstrap_clan_threshold: i64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let full_scan_days: u64 = parsed_or("FULL_SCAN_DAYS", 7)?;
        let monitored_scan_hours: u64 = parsed_or("MONITORED_SCAN_HOURS", 2)?;

        Ok(Settings {
            api_key: required("WOWS_WOWSAPIKEY")?,
            realm: required("WOWS_REALM")?.parse()?,
            debug: env::var("WOWS_DEBUG").map(|v| v == "true").unwrap_or(false),
            discord_token: required("WOWS_DISCORD_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into()),
            full_scan_every: Duration::from_secs(full_scan_days.max(1) * 24 * 3600),
            monitored_scan_every: Duration::from_secs(monitored_scan_hours.max(1) * 3600),
            event_buffer: parsed_or::<usize>("EVENT_BUFFER", 10)?.max(1),
            bootstrap_clan_threshold: parsed_or("BOOTSTRAP_CLAN_THRESHOLD", 1000)?,
        })
    }
}

fn required(name: &'static str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingEnv(name))
}

fn parsed_or<T: FromStr>(name: &'static str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(v) => v.parse::<T>().map_err(|_| Error::InvalidEnv { name, value: v }),
        Err(_) => Ok(default),
    }
}
