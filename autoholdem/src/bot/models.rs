//! AI player models.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Skill of an AI-controlled seat.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiLevel {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl AiLevel {
    pub const ALL: [AiLevel; 4] = [
        AiLevel::Easy,
        AiLevel::Medium,
        AiLevel::Hard,
        AiLevel::Expert,
    ];

    /// Probability of deciding rationally rather than at random.
    pub fn rationality(self) -> f64 {
        match self {
            Self::Easy => 0.3,
            Self::Medium => 0.6,
            Self::Hard => 0.85,
            Self::Expert => 0.95,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for AiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
            Self::Expert => write!(f, "expert"),
        }
    }
}

impl FromStr for AiLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "expert" => Ok(Self::Expert),
            other => Err(format!("unknown AI level `{other}`")),
        }
    }
}

const AI_NAMES: [&str; 10] = [
    "Ada", "Boole", "Church", "Dijkstra", "Euler", "Fermat", "Gauss", "Hopper", "Knuth", "Lovelace",
];

/// Display name for the `index`-th generated AI seat.
pub fn ai_player_name(index: usize) -> String {
    let base = AI_NAMES[index % AI_NAMES.len()];
    match index / AI_NAMES.len() {
        0 => format!("{base} (AI)"),
        round => format!("{base} {} (AI)", round + 1),
    }
}
