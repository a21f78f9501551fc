//! Runner configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration. Command-line flags override the environment.

use autoholdem::{
    SchedulerConfig, TableConfig,
    constants::{DEFAULT_BIG_BLIND, DEFAULT_CHIPS, DEFAULT_SMALL_BLIND, MAX_PLAYERS},
    entities::Usd,
    table::TableSpeed,
};
use std::time::Duration;

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub players: Option<usize>,
    pub chips: Option<Usd>,
    pub seed: Option<u64>,
    pub hands: Option<u64>,
    pub speed: Option<TableSpeed>,
}

/// Complete runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Table rules; `max_players` is the number of AI seats
    pub table: TableConfig,
    /// Delays pacing autoplay
    pub scheduler: SchedulerConfig,
    /// Starting stack for every seat
    pub chips: Usd,
    /// Stop after this many hands; `None` plays until one player is left
    pub max_hands: Option<u64>,
    pub speed: TableSpeed,
}

impl RunnerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if `AH_SPEED` names an unknown speed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Load configuration from any key lookup, environment or otherwise
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let speed = match overrides.speed {
            Some(speed) => speed,
            None => match lookup("AH_SPEED") {
                Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                    var: "AH_SPEED".to_string(),
                    reason,
                })?,
                None => TableSpeed::Normal,
            },
        };

        let mut scheduler = SchedulerConfig::for_speed(speed);
        if let Some(secs) = lookup("AH_HUMAN_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            scheduler.human_timeout = Duration::from_secs(secs);
        }

        let chips = overrides
            .chips
            .unwrap_or_else(|| parse_or(&lookup, "AH_CHIPS", DEFAULT_CHIPS));

        let table = TableConfig {
            name: lookup("AH_TABLE_NAME").unwrap_or_else(|| "Auto Table".to_string()),
            max_players: overrides
                .players
                .unwrap_or_else(|| parse_or(&lookup, "AH_PLAYERS", MAX_PLAYERS)),
            small_blind: parse_or(&lookup, "AH_SMALL_BLIND", DEFAULT_SMALL_BLIND),
            big_blind: parse_or(&lookup, "AH_BIG_BLIND", DEFAULT_BIG_BLIND),
            seed: overrides
                .seed
                .or_else(|| lookup("AH_SEED").and_then(|v| v.parse().ok())),
        };

        let max_hands = overrides
            .hands
            .or_else(|| lookup("AH_MAX_HANDS").and_then(|v| v.parse().ok()));

        Ok(RunnerConfig {
            table,
            scheduler,
            chips,
            max_hands,
            speed,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.table
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "table".to_string(),
                reason,
            })?;

        self.scheduler
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "AH_HUMAN_TIMEOUT_SECS".to_string(),
                reason,
            })?;

        if self.chips == 0 {
            return Err(ConfigError::Invalid {
                var: "AH_CHIPS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.max_hands == Some(0) {
            return Err(ConfigError::Invalid {
                var: "AH_MAX_HANDS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse a variable with default fallback
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
