use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::split_list;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClockConfig {
    pub tick_millis: u64,
}

impl ClockConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { tick_millis: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClubConfig {
    pub squads: Vec<String>,
}

impl Default for ClubConfig {
    fn default() -> Self {
        Self {
            squads: vec![
                "First Team".to_string(),
                "Reserves".to_string(),
                "U18".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedConfig {
    pub roster_csv: Option<PathBuf>,
    pub fixtures_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Postgres when set, in-memory store otherwise.
    pub database: Option<DatabaseConfig>,
    pub clock: ClockConfig,
    pub club: ClubConfig,
    pub seed: SeedConfig,
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("MATCH_CENTER_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parsed::<u16>("MATCH_CENTER_PORT") {
            config.server.port = port;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                config.database = Some(DatabaseConfig {
                    url,
                    max_connections: parsed::<u32>("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
                });
            }
        }
        if let Some(tick_millis) = parsed::<u64>("CLOCK_TICK_MILLIS") {
            config.clock.tick_millis = tick_millis;
        }
        if let Ok(squads) = env::var("CLUB_SQUADS") {
            let squads = split_list(&squads);
            if !squads.is_empty() {
                config.club.squads = squads;
            }
        }
        if let Ok(path) = env::var("ROSTER_CSV") {
            config.seed.roster_csv = Some(PathBuf::from(path));
        }
        if let Ok(path) = env::var("FIXTURES_JSON") {
            config.seed.fixtures_json = Some(PathBuf::from(path));
        }

        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
