use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashSet, VecDeque},
    fmt,
    str::FromStr,
};
use thiserror::Error;

use super::constants::DECK_SIZE;
use crate::bot::models::AiLevel;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];

    /// Suit for an index in `0..4` (club, diamond, heart, spade).
    pub fn from_index(idx: u8) -> Option<Self> {
        Self::ALL.get(usize::from(idx)).copied()
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Card rank, 2 through 14 (ace high).
pub type Value = u8;

pub const MIN_VALUE: Value = 2;
pub const ACE: Value = 14;

/// A card is a tuple of a rank (2u8 ... ace=14u8) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    /// Builds a card from a suit index and a rank, rejecting anything
    /// outside `0..4` and `2..=14`.
    pub fn new(suit_idx: u8, rank: Value) -> Option<Self> {
        let suit = Suit::from_index(suit_idx)?;
        (MIN_VALUE..=ACE).contains(&rank).then_some(Self(rank, suit))
    }

    pub fn rank(&self) -> Value {
        self.0
    }

    pub fn suit(&self) -> Suit {
        self.1
    }

    fn is_valid(&self) -> bool {
        (MIN_VALUE..=ACE).contains(&self.0)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            13 => "K",
            12 => "Q",
            11 => "J",
            10 => "T",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

/// A deck dealt from the front. Burned cards are kept so a hand can
/// always account for all 52 cards.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: VecDeque<Card>,
    burned: Vec<Card>,
}

impl Deck {
    /// An unshuffled deck ordered by suit, then rank.
    pub fn new() -> Self {
        let cards = Suit::ALL
            .into_iter()
            .flat_map(|suit| (MIN_VALUE..=ACE).map(move |value| Card(value, suit)))
            .collect();
        Self {
            cards,
            burned: Vec::new(),
        }
    }

    /// A prearranged deck, dealt in the given order. Returns `None` unless
    /// `cards` is exactly the 52 distinct cards of a standard deck.
    pub fn from_cards(cards: Vec<Card>) -> Option<Self> {
        if cards.len() != DECK_SIZE || !cards.iter().all(Card::is_valid) {
            return None;
        }
        let unique: HashSet<&Card> = cards.iter().collect();
        if unique.len() != DECK_SIZE {
            return None;
        }
        Some(Self {
            cards: cards.into(),
            burned: Vec::new(),
        })
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.make_contiguous().shuffle(rng);
    }

    pub fn deal_card(&mut self) -> Option<Card> {
        self.cards.pop_front()
    }

    pub fn burn_card(&mut self) -> Option<Card> {
        let card = self.cards.pop_front()?;
        self.burned.push(card);
        Some(card)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn burned(&self) -> &[Card] {
        &self.burned
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for whole chips. All bets and player stacks are whole
/// numbers of chips.
pub type Usd = u32;

/// Stable identity of a seated player.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Type alias for seat positions at the table.
pub type SeatIndex = usize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Phase {
    Waiting,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    Finished,
}

impl Phase {
    /// Phases in which players bet.
    pub fn is_betting_round(self) -> bool {
        matches!(self, Self::PreFlop | Self::Flop | Self::Turn | Self::River)
    }

    /// A hand is live from the deal until the pot has been paid out.
    pub fn is_hand_in_progress(self) -> bool {
        self.is_betting_round() || self == Self::Showdown
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Action {
    AllIn,
    Call,
    Check,
    Fold,
    /// Raise the table's bet to the given total for this round.
    Raise(Usd),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AllIn => write!(f, "goes all-in"),
            Self::Call => write!(f, "calls"),
            Self::Check => write!(f, "checks"),
            Self::Fold => write!(f, "folds"),
            Self::Raise(amount) => write!(f, "raises to ${amount}"),
        }
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ActionParseError {
    #[error("unknown action `{0}`")]
    Unknown(String),
    #[error("raise needs an amount")]
    MissingAmount,
    #[error("invalid raise amount `{0}`")]
    InvalidAmount(String),
}

impl FromStr for Action {
    type Err = ActionParseError;

    /// Parses `fold`, `check`, `call`, `allin` and `raise <amount>`
    /// (also `raise:<amount>`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let mut parts = normalized.split([' ', ':']).filter(|p| !p.is_empty());
        let verb = parts.next().unwrap_or_default();
        match verb {
            "fold" | "f" => Ok(Self::Fold),
            "check" | "k" => Ok(Self::Check),
            "call" | "c" => Ok(Self::Call),
            "allin" | "all-in" | "all_in" => Ok(Self::AllIn),
            "raise" | "r" => {
                let amount = parts.next().ok_or(ActionParseError::MissingAmount)?;
                amount
                    .parse()
                    .map(Self::Raise)
                    .map_err(|_| ActionParseError::InvalidAmount(amount.to_string()))
            }
            other => Err(ActionParseError::Unknown(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub chips: Usd,
    pub hole_cards: Vec<Card>,
    /// Chips committed during the current betting round.
    pub current_bet: Usd,
    /// Chips committed during the current hand.
    pub hand_contribution: Usd,
    /// Present when the seat is AI-controlled.
    pub ai_level: Option<AiLevel>,
    pub in_hand: bool,
    pub folded: bool,
    /// Took a voluntary action since the last raise of this round.
    pub acted: bool,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub last_action: Option<Action>,
}

impl Player {
    pub fn new(id: PlayerId, name: &str, chips: Usd) -> Self {
        Self {
            id,
            name: name.to_string(),
            chips,
            hole_cards: Vec::new(),
            current_bet: 0,
            hand_contribution: 0,
            ai_level: None,
            in_hand: false,
            folded: false,
            acted: false,
            is_dealer: false,
            is_small_blind: false,
            is_big_blind: false,
            last_action: None,
        }
    }

    pub fn new_ai(id: PlayerId, name: &str, chips: Usd, level: AiLevel) -> Self {
        Self {
            ai_level: Some(level),
            ..Self::new(id, name, chips)
        }
    }

    pub fn is_ai(&self) -> bool {
        self.ai_level.is_some()
    }

    /// Everything this player brought into the hand is in the pot.
    pub fn is_all_in(&self) -> bool {
        self.in_hand && !self.folded && self.chips == 0 && self.hand_contribution > 0
    }

    /// Still competing for the pot.
    pub fn is_contending(&self) -> bool {
        self.in_hand && !self.folded
    }

    /// Can still be asked to act.
    pub fn is_eligible(&self) -> bool {
        self.is_contending() && !self.is_all_in()
    }

    /// Moves up to `amount` chips from the stack into this round's bet and
    /// returns what was actually moved.
    pub fn bet(&mut self, amount: Usd) -> Usd {
        let paid = amount.min(self.chips);
        self.chips -= paid;
        self.current_bet += paid;
        self.hand_contribution += paid;
        paid
    }

    pub fn fold(&mut self) {
        self.folded = true;
        self.last_action = Some(Action::Fold);
    }

    pub fn add_winnings(&mut self, amount: Usd) {
        self.chips += amount;
    }

    pub fn reset_for_new_hand(&mut self) {
        self.hole_cards.clear();
        self.current_bet = 0;
        self.hand_contribution = 0;
        self.in_hand = self.chips > 0;
        self.folded = false;
        self.acted = false;
        self.is_dealer = false;
        self.is_small_blind = false;
        self.is_big_blind = false;
        self.last_action = None;
    }

    pub fn reset_for_new_round(&mut self) {
        self.current_bet = 0;
        self.acted = false;
    }
}

/// One voluntary (or forced) action taken during a hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionRecord {
    pub player_id: PlayerId,
    pub phase: Phase,
    pub action: Action,
    /// Chips moved into the pot by this action.
    pub amount: Usd,
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.phase, self.player_id, self.action)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Payout {
    pub player_id: PlayerId,
    pub amount: Usd,
    /// Description of the winning hand when the pot went to showdown.
    pub hand: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandOutcome {
    pub hand_number: u64,
    pub pot: Usd,
    /// Whether hands were compared, as opposed to everyone else folding.
    pub showdown: bool,
    pub payouts: Vec<Payout>,
}

/// A player as seen by one viewer. Hole cards are empty unless visible.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub seat: SeatIndex,
    pub chips: Usd,
    pub current_bet: Usd,
    pub hole_cards: Vec<Card>,
    pub is_ai: bool,
    pub in_hand: bool,
    pub folded: bool,
    pub all_in: bool,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub last_action: Option<Action>,
}

/// Public table state as seen by one viewer.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub hand_number: u64,
    pub hand_started_at: Option<DateTime<Utc>>,
    pub phase: Phase,
    pub pot: Usd,
    pub current_bet_amount: Usd,
    pub community_cards: Vec<Card>,
    pub dealer_index: Option<SeatIndex>,
    pub current_turn: Option<SeatIndex>,
    pub current_player: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub actions: Vec<ActionRecord>,
    pub last_outcome: Option<HandOutcome>,
    pub game_over: bool,
}

impl TableSnapshot {
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Chips in stacks plus chips in the pot.
    pub fn total_chips(&self) -> Usd {
        self.players.iter().map(|p| p.chips).sum::<Usd>() + self.pot
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableStats {
    pub hand_number: u64,
    pub phase: Phase,
    pub seated: usize,
    pub funded: usize,
    pub ai_players: usize,
    pub human_players: usize,
    pub total_chips: Usd,
    pub pot: Usd,
}
