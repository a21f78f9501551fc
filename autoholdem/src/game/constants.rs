//! Table-wide constants.

use std::time::Duration;

use super::entities::Usd;

/// Seats at one table.
pub const MAX_PLAYERS: usize = 6;

/// Funded players needed to deal a hand.
pub const MIN_PLAYERS: usize = 2;

pub const DEFAULT_CHIPS: Usd = 1000;
pub const DEFAULT_SMALL_BLIND: Usd = 10;
pub const DEFAULT_BIG_BLIND: Usd = 20;

/// Hole cards dealt to each participating player.
pub const HOLE_CARDS: usize = 2;

/// Cards in a standard deck.
pub const DECK_SIZE: usize = 52;

pub const DEFAULT_THINK_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_HUMAN_ACTION_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_HUMAN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PHASE_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_SHOWDOWN_DELAY: Duration = Duration::from_millis(3000);
pub const DEFAULT_NEXT_HAND_DELAY: Duration = Duration::from_millis(5000);
