//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

use crate::game::{
    constants::{
        DEFAULT_BIG_BLIND, DEFAULT_HUMAN_ACTION_DELAY, DEFAULT_HUMAN_TIMEOUT,
        DEFAULT_NEXT_HAND_DELAY, DEFAULT_PHASE_DELAY, DEFAULT_SHOWDOWN_DELAY,
        DEFAULT_SMALL_BLIND, DEFAULT_THINK_DELAY, MAX_PLAYERS, MIN_PLAYERS,
    },
    entities::Usd,
};

/// Table speed variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSpeed {
    #[default]
    Normal,
    Turbo,
    Hyper,
}

impl TableSpeed {
    /// Divisor applied to the normal delays.
    fn delay_divisor(self) -> u32 {
        match self {
            TableSpeed::Normal => 1,
            TableSpeed::Turbo => 2,
            TableSpeed::Hyper => 10,
        }
    }
}

impl fmt::Display for TableSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSpeed::Normal => write!(f, "normal"),
            TableSpeed::Turbo => write!(f, "turbo"),
            TableSpeed::Hyper => write!(f, "hyper"),
        }
    }
}

impl FromStr for TableSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(TableSpeed::Normal),
            "turbo" => Ok(TableSpeed::Turbo),
            "hyper" => Ok(TableSpeed::Hyper),
            other => Err(format!("unknown table speed `{other}`")),
        }
    }
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Maximum number of seated players (default: 6)
    pub max_players: usize,

    /// Small blind amount
    pub small_blind: Usd,

    /// Big blind amount
    pub big_blind: Usd,

    /// Seed for shuffling and AI decisions; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            max_players: MAX_PLAYERS,
            small_blind: DEFAULT_SMALL_BLIND,
            big_blind: DEFAULT_BIG_BLIND,
            seed: None,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.small_blind == 0 {
            return Err("Small blind must be at least one chip".to_string());
        }

        if self.big_blind < self.small_blind {
            return Err("Big blind must be at least the small blind".to_string());
        }

        if self.max_players < MIN_PLAYERS || self.max_players > MAX_PLAYERS {
            return Err(format!(
                "Max players must be between {MIN_PLAYERS} and {MAX_PLAYERS}"
            ));
        }

        Ok(())
    }
}

/// Delays used by the table actor to pace autonomous play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Pause before an AI seat acts
    pub think_delay: Duration,

    /// Pause after a human acts before play continues
    pub human_action_delay: Duration,

    /// Time a human has to act before being folded
    pub human_timeout: Duration,

    /// Pause between a finished betting round and the next street
    pub phase_delay: Duration,

    /// Pause at showdown before the pot is paid
    pub showdown_delay: Duration,

    /// Pause between hands
    pub next_hand_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            think_delay: DEFAULT_THINK_DELAY,
            human_action_delay: DEFAULT_HUMAN_ACTION_DELAY,
            human_timeout: DEFAULT_HUMAN_TIMEOUT,
            phase_delay: DEFAULT_PHASE_DELAY,
            showdown_delay: DEFAULT_SHOWDOWN_DELAY,
            next_hand_delay: DEFAULT_NEXT_HAND_DELAY,
        }
    }
}

impl SchedulerConfig {
    /// Default delays scaled down for faster tables.
    pub fn for_speed(speed: TableSpeed) -> Self {
        let divisor = speed.delay_divisor();
        let defaults = Self::default();
        Self {
            think_delay: defaults.think_delay / divisor,
            human_action_delay: defaults.human_action_delay / divisor,
            human_timeout: defaults.human_timeout / divisor,
            phase_delay: defaults.phase_delay / divisor,
            showdown_delay: defaults.showdown_delay / divisor,
            next_hand_delay: defaults.next_hand_delay / divisor,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.human_timeout.is_zero() {
            return Err("Human timeout must be longer than zero".to_string());
        }

        if self.human_timeout <= self.human_action_delay {
            return Err("Human timeout must exceed the human action delay".to_string());
        }

        Ok(())
    }
}
