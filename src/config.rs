//! Configuration loader: TOML file with defaults for every field.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::identity::MatchStrategy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub collection: CollectionConfig,
    pub identity: IdentityConfig,
    /// Team abbreviation -> source team identifier, used when standings
    /// cannot produce a record.
    pub team_ids: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub league_id: String,
    pub season_type: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub batch_size: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub failure_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub strategies: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            collection: CollectionConfig::default(),
            identity: IdentityConfig::default(),
            team_ids: default_team_ids(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://stats.nba.com/stats".into(),
            league_id: "00".into(),
            season_type: "Regular Season".into(),
            timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 150,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            referer: "https://stats.nba.com/".into(),
            origin: "https://stats.nba.com".into(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            min_delay_ms: 600,
            max_delay_ms: 1200,
            failure_delay_ms: 1000,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            strategies: vec!["exact".into(), "normalized".into(), "substring".into()],
        }
    }
}

impl IdentityConfig {
    pub fn parsed_strategies(&self) -> Result<Vec<MatchStrategy>, ConfigError> {
        self.strategies
            .iter()
            .map(|name| {
                name.parse::<MatchStrategy>()
                    .map_err(|e| ConfigError::Invalid(vec![e]))
            })
            .collect()
    }
}

fn default_team_ids() -> BTreeMap<String, String> {
    [
        ("ATL", "1610612737"),
        ("BOS", "1610612738"),
        ("BKN", "1610612751"),
        ("CHI", "1610612741"),
        ("CHO", "1610612766"),
        ("CLE", "1610612739"),
        ("DAL", "1610612742"),
        ("DEN", "1610612743"),
        ("DET", "1610612765"),
        ("GSW", "1610612744"),
        ("HOU", "1610612745"),
        ("IND", "1610612754"),
        ("LAC", "1610612746"),
        ("LAL", "1610612747"),
        ("MEM", "1610612763"),
        ("MIA", "1610612748"),
        ("MIL", "1610612749"),
        ("MIN", "1610612750"),
        ("NOP", "1610612740"),
        ("NYK", "1610612752"),
        ("OKC", "1610612760"),
        ("ORL", "1610612753"),
        ("PHI", "1610612755"),
        ("PHX", "1610612756"),
        ("POR", "1610612757"),
        ("SAC", "1610612758"),
        ("SAS", "1610612759"),
        ("TOR", "1610612761"),
        ("UTA", "1610612762"),
        ("WAS", "1610612764"),
    ]
    .into_iter()
    .map(|(abbr, id)| (abbr.to_string(), id.to_string()))
    .collect()
}

/// Load config from `path`, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => Config::default(),
    };
    Ok(config)
}

pub fn parse(raw: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(raw)
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut issues: Vec<String> = Vec::new();

    if config.source.base_url.trim().is_empty() {
        issues.push("source.base_url must not be empty".into());
    }
    if config.source.timeout_secs == 0 {
        issues.push("source.timeout_secs must be > 0".into());
    }
    if config.collection.batch_size == 0 {
        issues.push("collection.batch_size must be > 0".into());
    }
    if config.collection.min_delay_ms > config.collection.max_delay_ms {
        issues.push("collection.min_delay_ms must be <= collection.max_delay_ms".into());
    }
    if config.identity.strategies.is_empty() {
        issues.push("identity.strategies must name at least one strategy".into());
    }
    for name in &config.identity.strategies {
        if let Err(e) = name.parse::<MatchStrategy>() {
            issues.push(e);
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(issues))
    }
}
