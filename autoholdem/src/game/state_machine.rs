//! Table engine: the betting-round state machine.
//!
//! The engine owns the players, the deck, the pot and the turn order of one
//! table. Every mutating operation validates first and only then changes
//! state, so a rejected call leaves the table untouched. After each
//! successful mutation the registered [`StateObserver`] receives the public
//! snapshot.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::constants::{HOLE_CARDS, MIN_PLAYERS};
use super::entities::{
    Action, ActionRecord, Card, Deck, HandOutcome, Payout, Phase, Player, PlayerId, PlayerView,
    SeatIndex, TableSnapshot, TableStats, Usd,
};
use super::functional::{self, HandResult};
use crate::{
    bot::{
        decision::{self, Decision, DecisionContext},
        models::{AiLevel, ai_player_name},
    },
    table::config::TableConfig,
};

/// Reasons a player action is refused.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum InvalidAction {
    #[error("not your turn")]
    OutOfTurn,
    #[error("no hand in progress")]
    NoHandInProgress,
    #[error("can't check with ${to_call} to call")]
    CannotCheck { to_call: Usd },
    #[error("raise to ${amount} must exceed the current bet of ${current}")]
    RaiseTooSmall { amount: Usd, current: Usd },
    #[error("need ${required} but only have ${available}")]
    InsufficientChips { required: Usd, available: Usd },
    #[error("player is not AI-controlled")]
    NotAiControlled,
    #[error("no chips left")]
    NoChips,
}

#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("invalid action: {0}")]
    InvalidAction(#[from] InvalidAction),
    #[error("can't change phase during {phase}")]
    IllegalPhaseTransition { phase: Phase },
    #[error("player does not exist")]
    PlayerNotFound,
    #[error("need {required}+ players with chips")]
    InsufficientPlayers { required: usize },
    #[error("player already exists")]
    PlayerAlreadyExists,
    #[error("table is full")]
    CapacityReached,
    #[error("buy-in must be more than zero chips")]
    InvalidBuyIn,
    #[error("invalid game state: {0}")]
    InternalStateError(String),
}

/// Receives the public snapshot after every successful mutation. Runs on
/// the engine's thread and must not block.
pub trait StateObserver: Send + Sync {
    fn on_state_changed(&self, snapshot: &TableSnapshot);
}

fn internal(message: &str) -> GameError {
    error!("Internal state error: {message}");
    GameError::InternalStateError(message.to_string())
}

/// Seats clockwise after `from`, wrapping around and ending at `from`.
fn seats_after(from: SeatIndex, len: usize) -> impl Iterator<Item = SeatIndex> {
    (1..=len).map(move |offset| (from + offset) % len)
}

pub struct TableEngine {
    table_id: Uuid,
    config: TableConfig,
    rng: StdRng,
    deck: Deck,
    players: Vec<Player>,
    community_cards: Vec<Card>,
    phase: Phase,
    pot: Usd,
    current_bet_amount: Usd,
    dealer_index: Option<SeatIndex>,
    current_turn: Option<SeatIndex>,
    hand_number: u64,
    hand_started_at: Option<DateTime<Utc>>,
    actions: Vec<ActionRecord>,
    last_outcome: Option<HandOutcome>,
    /// Players who left mid-hand; their seats go when the hand ends.
    pending_removals: Vec<PlayerId>,
    observer: Option<Arc<dyn StateObserver>>,
}

impl TableEngine {
    pub fn new(config: TableConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            table_id: Uuid::new_v4(),
            config,
            rng,
            deck: Deck::new(),
            players: Vec::new(),
            community_cards: Vec::new(),
            phase: Phase::Waiting,
            pot: 0,
            current_bet_amount: 0,
            dealer_index: None,
            current_turn: None,
            hand_number: 0,
            hand_started_at: None,
            actions: Vec::new(),
            last_outcome: None,
            pending_removals: Vec::new(),
            observer: None,
        }
    }

    /// Registers the one observer notified after each mutation.
    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn table_id(&self) -> Uuid {
        self.table_id
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pot(&self) -> Usd {
        self.pot
    }

    pub fn current_bet_amount(&self) -> Usd {
        self.current_bet_amount
    }

    pub fn community_cards(&self) -> &[Card] {
        &self.community_cards
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn dealer_index(&self) -> Option<SeatIndex> {
        self.dealer_index
    }

    pub fn current_turn(&self) -> Option<SeatIndex> {
        self.current_turn
    }

    /// The player whose turn it is, if anyone may act.
    pub fn current_player(&self) -> Option<&Player> {
        self.current_turn.and_then(|idx| self.players.get(idx))
    }

    pub fn hand_number(&self) -> u64 {
        self.hand_number
    }

    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    pub fn last_outcome(&self) -> Option<&HandOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn is_hand_in_progress(&self) -> bool {
        self.phase.is_hand_in_progress()
    }

    fn seat_of(&self, id: &PlayerId) -> Option<SeatIndex> {
        self.players.iter().position(|p| &p.id == id)
    }

    fn next_seat(&self, from: SeatIndex, pred: impl Fn(&Player) -> bool) -> Option<SeatIndex> {
        seats_after(from, self.players.len()).find(|&idx| pred(&self.players[idx]))
    }

    fn funded_players(&self) -> usize {
        self.players.iter().filter(|p| p.chips > 0).count()
    }

    fn contenders(&self) -> usize {
        self.players.iter().filter(|p| p.is_contending()).count()
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer.on_state_changed(&self.snapshot(None));
        }
    }

    // === Seating ===

    pub fn add_player(
        &mut self,
        id: impl Into<PlayerId>,
        name: &str,
        chips: Usd,
    ) -> Result<(), GameError> {
        self.seat(Player::new(id.into(), name, chips))
    }

    pub fn add_ai_player(
        &mut self,
        id: impl Into<PlayerId>,
        name: &str,
        chips: Usd,
        level: AiLevel,
    ) -> Result<(), GameError> {
        self.seat(Player::new_ai(id.into(), name, chips, level))
    }

    fn seat(&mut self, player: Player) -> Result<(), GameError> {
        if player.chips == 0 {
            return Err(GameError::InvalidBuyIn);
        }
        if self.players.len() >= self.config.max_players {
            return Err(GameError::CapacityReached);
        }
        if self.seat_of(&player.id).is_some() {
            return Err(GameError::PlayerAlreadyExists);
        }
        info!(
            "Table {}: {} ({}) sits down with ${}",
            self.table_id,
            player.name,
            player.id,
            player.chips
        );
        self.players.push(player);
        self.notify();
        Ok(())
    }

    /// Seats generated AI players until the table is full and returns how
    /// many were added.
    pub fn fill_with_ai_players(&mut self, chips: Usd) -> Result<usize, GameError> {
        if chips == 0 {
            return Err(GameError::InvalidBuyIn);
        }
        let mut added = 0;
        while self.players.len() < self.config.max_players {
            let id = format!("ai-{}", Uuid::new_v4().simple());
            let name = ai_player_name(self.players.len());
            let level = AiLevel::random(&mut self.rng);
            self.add_ai_player(id, &name, chips, level)?;
            added += 1;
        }
        Ok(added)
    }

    /// Removes a player. During a live hand the player is folded at once
    /// and the seat is freed when the hand ends.
    pub fn remove_player(&mut self, id: &PlayerId) -> Result<(), GameError> {
        let idx = self.seat_of(id).ok_or(GameError::PlayerNotFound)?;

        if self.is_hand_in_progress() && self.players[idx].in_hand {
            if !self.pending_removals.contains(id) {
                self.pending_removals.push(id.clone());
            }
            if !self.players[idx].folded {
                self.players[idx].fold();
                self.actions.push(ActionRecord {
                    player_id: id.clone(),
                    phase: self.phase,
                    action: Action::Fold,
                    amount: 0,
                });
                // The bet to match can't come from a player who has left.
                self.current_bet_amount = self
                    .players
                    .iter()
                    .filter(|p| p.is_contending())
                    .map(|p| p.current_bet)
                    .max()
                    .unwrap_or(0);
                if self.current_turn == Some(idx) {
                    self.advance_turn(idx);
                } else if self.is_betting_round_complete() {
                    self.current_turn = None;
                }
            }
            info!(
                "Table {}: {} leaves; seat freed after hand #{}",
                self.table_id, id, self.hand_number
            );
        } else {
            self.remove_seat(idx);
            info!("Table {}: {} leaves", self.table_id, id);
        }

        self.notify();
        Ok(())
    }

    fn remove_seat(&mut self, idx: SeatIndex) {
        self.players.remove(idx);
        self.current_turn = match self.current_turn {
            Some(turn) if idx < turn => Some(turn - 1),
            Some(turn) if idx == turn => None,
            other => other,
        };
        // Keep the button on the same seat; a removed dealer hands it to
        // the previous seat so the next rotation lands on the seat after.
        self.dealer_index = match self.dealer_index {
            _ if self.players.is_empty() => None,
            Some(dealer) if idx < dealer => Some(dealer - 1),
            Some(dealer) if idx == dealer => {
                Some((dealer + self.players.len() - 1) % self.players.len())
            }
            other => other,
        };
    }

    fn apply_pending_removals(&mut self) {
        for id in std::mem::take(&mut self.pending_removals) {
            if let Some(idx) = self.seat_of(&id) {
                self.remove_seat(idx);
                info!("Table {}: removed {} after the hand", self.table_id, id);
            }
        }
    }

    // === Hand lifecycle ===

    pub fn can_start(&self) -> bool {
        self.funded_players() >= MIN_PLAYERS
    }

    /// Deals a new hand from a freshly shuffled deck.
    pub fn start_hand(&mut self) -> Result<(), GameError> {
        let mut deck = Deck::new();
        deck.shuffle(&mut self.rng);
        self.start_hand_with_deck(deck)
    }

    /// Deals a new hand from a prearranged deck, front first.
    pub fn start_hand_with_deck(&mut self, deck: Deck) -> Result<(), GameError> {
        if self.is_hand_in_progress() {
            return Err(GameError::IllegalPhaseTransition { phase: self.phase });
        }
        if !self.can_start() {
            return Err(GameError::InsufficientPlayers {
                required: MIN_PLAYERS,
            });
        }

        for player in &mut self.players {
            player.reset_for_new_hand();
        }
        self.deck = deck;
        self.community_cards.clear();
        self.pot = 0;
        self.current_bet_amount = 0;
        self.actions.clear();
        self.last_outcome = None;
        self.hand_number += 1;
        self.hand_started_at = Some(Utc::now());

        let last_seat = self.players.len() - 1;
        let dealer = self
            .next_seat(self.dealer_index.unwrap_or(last_seat), |p| p.in_hand)
            .ok_or_else(|| internal("no seat for the dealer"))?;
        self.dealer_index = Some(dealer);

        let participants = self.players.iter().filter(|p| p.in_hand).count();
        let small_blind = if participants == 2 {
            dealer
        } else {
            self.next_seat(dealer, |p| p.in_hand)
                .ok_or_else(|| internal("no seat for the small blind"))?
        };
        let big_blind = self
            .next_seat(small_blind, |p| p.in_hand)
            .ok_or_else(|| internal("no seat for the big blind"))?;

        self.players[dealer].is_dealer = true;
        self.players[small_blind].is_small_blind = true;
        self.players[big_blind].is_big_blind = true;
        self.pot += self.players[small_blind].bet(self.config.small_blind);
        self.pot += self.players[big_blind].bet(self.config.big_blind);
        self.current_bet_amount = self.players[small_blind]
            .current_bet
            .max(self.players[big_blind].current_bet);

        for _ in 0..HOLE_CARDS {
            let mut seat = dealer;
            for _ in 0..participants {
                seat = self
                    .next_seat(seat, |p| p.in_hand)
                    .ok_or_else(|| internal("no seat to deal to"))?;
                let card = self.draw()?;
                self.players[seat].hole_cards.push(card);
            }
        }

        self.phase = Phase::PreFlop;
        self.current_turn = if self.is_betting_round_complete() {
            None
        } else {
            self.next_seat(big_blind, Player::is_eligible)
        };

        info!(
            "Table {}: hand #{} dealt to {} players (dealer {}, blinds ${}/${})",
            self.table_id,
            self.hand_number,
            participants,
            self.players[dealer].id,
            self.config.small_blind,
            self.config.big_blind
        );
        self.notify();
        Ok(())
    }

    fn draw(&mut self) -> Result<Card, GameError> {
        self.deck
            .deal_card()
            .ok_or_else(|| internal("deck ran out of cards"))
    }

    // === Betting ===

    /// Applies one player's action. Nothing changes unless the action is
    /// legal for that player right now.
    pub fn submit_action(&mut self, id: &PlayerId, action: Action) -> Result<(), GameError> {
        let idx = self.seat_of(id).ok_or(GameError::PlayerNotFound)?;
        if !self.phase.is_betting_round() {
            return Err(InvalidAction::NoHandInProgress.into());
        }
        if self.current_turn != Some(idx) {
            return Err(InvalidAction::OutOfTurn.into());
        }

        let player = &self.players[idx];
        let to_call = self.current_bet_amount.saturating_sub(player.current_bet);
        match action {
            Action::Check if to_call > 0 => {
                return Err(InvalidAction::CannotCheck { to_call }.into());
            }
            Action::Raise(amount) => {
                if amount <= self.current_bet_amount {
                    return Err(InvalidAction::RaiseTooSmall {
                        amount,
                        current: self.current_bet_amount,
                    }
                    .into());
                }
                let required = amount - player.current_bet;
                if required > player.chips {
                    return Err(InvalidAction::InsufficientChips {
                        required,
                        available: player.chips,
                    }
                    .into());
                }
            }
            Action::AllIn if player.chips == 0 => {
                return Err(InvalidAction::NoChips.into());
            }
            _ => {}
        }

        let player = &mut self.players[idx];
        let (effective, paid) = match action {
            Action::Fold => {
                player.fold();
                (Action::Fold, 0)
            }
            Action::Check | Action::Call if to_call == 0 => (Action::Check, 0),
            Action::Call => (Action::Call, player.bet(to_call)),
            Action::Raise(amount) => (action, player.bet(amount - player.current_bet)),
            Action::AllIn => (Action::AllIn, player.bet(player.chips)),
            Action::Check => {
                return Err(internal("check with chips to call passed validation"));
            }
        };
        player.acted = true;
        player.last_action = Some(effective);
        let new_bet = player.current_bet;

        self.pot += paid;
        if new_bet > self.current_bet_amount {
            self.current_bet_amount = new_bet;
            for (other, p) in self.players.iter_mut().enumerate() {
                if other != idx {
                    p.acted = false;
                }
            }
        }
        self.actions.push(ActionRecord {
            player_id: id.clone(),
            phase: self.phase,
            action: effective,
            amount: paid,
        });
        debug!(
            "Table {}: hand #{} {} {} (pot ${})",
            self.table_id, self.hand_number, id, effective, self.pot
        );

        self.advance_turn(idx);
        self.notify();
        Ok(())
    }

    /// Lets the AI policy act for the current player and returns its
    /// decision.
    pub fn execute_ai_action(&mut self, id: &PlayerId) -> Result<Decision, GameError> {
        let idx = self.seat_of(id).ok_or(GameError::PlayerNotFound)?;
        let level = self.players[idx]
            .ai_level
            .ok_or(InvalidAction::NotAiControlled)?;
        if !self.phase.is_betting_round() {
            return Err(InvalidAction::NoHandInProgress.into());
        }
        if self.current_turn != Some(idx) {
            return Err(InvalidAction::OutOfTurn.into());
        }

        let decision = {
            let player = &self.players[idx];
            let ctx = DecisionContext {
                hole_cards: &player.hole_cards,
                community_cards: &self.community_cards,
                current_bet_amount: self.current_bet_amount,
                player_current_bet: player.current_bet,
                chips: player.chips,
                pot: self.pot,
                active_players: self.players.iter().filter(|p| p.is_contending()).count(),
                phase: self.phase,
            };
            decision::decide(&ctx, level, &mut self.rng)
        };
        debug!(
            "Table {}: {} ({level}) {}: {}",
            self.table_id, id, decision.action, decision.rationale
        );

        self.submit_action(id, decision.action)?;
        Ok(decision)
    }

    /// Whether the current betting round needs no further action.
    pub fn is_betting_round_complete(&self) -> bool {
        if self.contenders() <= 1 {
            return true;
        }
        let eligible: Vec<&Player> = self.players.iter().filter(|p| p.is_eligible()).collect();
        match eligible.as_slice() {
            [] => true,
            [only] => only.current_bet >= self.current_bet_amount,
            _ => eligible
                .iter()
                .all(|p| p.acted && p.current_bet == self.current_bet_amount),
        }
    }

    fn advance_turn(&mut self, from: SeatIndex) {
        self.current_turn = if self.is_betting_round_complete() {
            None
        } else {
            self.next_seat(from, Player::is_eligible)
        };
    }

    // === Phases ===

    /// Moves to the next phase once the betting round is complete.
    pub fn advance_phase(&mut self) -> Result<(), GameError> {
        let ready = match self.phase {
            Phase::Showdown => true,
            phase if phase.is_betting_round() => self.is_betting_round_complete(),
            _ => false,
        };
        if !ready {
            return Err(GameError::IllegalPhaseTransition { phase: self.phase });
        }

        if self.contenders() <= 1 {
            self.finish_hand()?;
        } else {
            match self.phase {
                Phase::PreFlop => self.deal_street(Phase::Flop, 3)?,
                Phase::Flop => self.deal_street(Phase::Turn, 1)?,
                Phase::Turn => self.deal_street(Phase::River, 1)?,
                Phase::River => {
                    self.phase = Phase::Showdown;
                    self.current_turn = None;
                    info!(
                        "Table {}: hand #{} showdown between {} players",
                        self.table_id,
                        self.hand_number,
                        self.contenders()
                    );
                }
                _ => self.finish_hand()?,
            }
        }

        self.notify();
        Ok(())
    }

    fn deal_street(&mut self, next: Phase, count: usize) -> Result<(), GameError> {
        self.deck
            .burn_card()
            .ok_or_else(|| internal("deck ran out of cards"))?;
        for _ in 0..count {
            let card = self.draw()?;
            self.community_cards.push(card);
        }

        self.phase = next;
        self.current_bet_amount = 0;
        for player in &mut self.players {
            player.reset_for_new_round();
        }
        let dealer = self
            .dealer_index
            .ok_or_else(|| internal("hand in progress without a dealer"))?;
        self.advance_turn(dealer);

        info!(
            "Table {}: hand #{} {} [{}]",
            self.table_id,
            self.hand_number,
            next,
            self.community_cards
                .iter()
                .map(Card::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(())
    }

    fn finish_hand(&mut self) -> Result<(), GameError> {
        let outcome = self.determine_winner()?;
        for payout in &outcome.payouts {
            info!(
                "Table {}: hand #{} {} wins ${}{}",
                self.table_id,
                self.hand_number,
                payout.player_id,
                payout.amount,
                payout
                    .hand
                    .as_ref()
                    .map(|h| format!(" with {h}"))
                    .unwrap_or_default()
            );
        }
        self.last_outcome = Some(outcome);
        self.phase = Phase::Finished;
        self.current_turn = None;
        self.apply_pending_removals();

        if let Some(winner) = self.final_winner() {
            info!(
                "Table {}: game over, {} holds every chip",
                self.table_id, winner.id
            );
        }
        Ok(())
    }

    /// Pays the pot to the best hand (or the last player standing). Tied
    /// winners split it; the odd chips go to the tied winner closest to
    /// the dealer's left.
    fn determine_winner(&mut self) -> Result<HandOutcome, GameError> {
        let pot = self.pot;
        let contenders: Vec<SeatIndex> = (0..self.players.len())
            .filter(|&idx| self.players[idx].is_contending())
            .collect();

        let (showdown, payouts) = match contenders.as_slice() {
            [] => {
                warn!(
                    "Table {}: hand #{} ended with nobody left; ${} pot discarded",
                    self.table_id, self.hand_number, pot
                );
                (false, Vec::new())
            }
            [winner] => (false, vec![(*winner, pot, None)]),
            _ => {
                let results: Vec<HandResult> = contenders
                    .iter()
                    .map(|&idx| {
                        functional::evaluate(&self.players[idx].hole_cards, &self.community_cards)
                    })
                    .collect::<Result<_, _>>()
                    .map_err(|e| internal(&e.to_string()))?;
                let winners: Vec<SeatIndex> = functional::compare_many(&results)
                    .into_iter()
                    .map(|w| contenders[w])
                    .collect();
                let describe = |seat: SeatIndex| {
                    contenders
                        .iter()
                        .position(|&c| c == seat)
                        .map(|i| results[i].to_string())
                };

                let share = pot / winners.len() as Usd;
                let remainder = pot % winners.len() as Usd;
                let dealer = self.dealer_index.unwrap_or(0);
                let odd_chip_seat = seats_after(dealer, self.players.len())
                    .find(|seat| winners.contains(seat))
                    .ok_or_else(|| internal("winner not seated"))?;

                let payouts = winners
                    .iter()
                    .map(|&seat| {
                        let bonus = if seat == odd_chip_seat { remainder } else { 0 };
                        (seat, share + bonus, describe(seat))
                    })
                    .collect();
                (true, payouts)
            }
        };

        let mut outcome = HandOutcome {
            hand_number: self.hand_number,
            pot,
            showdown,
            payouts: Vec::with_capacity(payouts.len()),
        };
        for (seat, amount, hand) in payouts {
            let player = &mut self.players[seat];
            player.add_winnings(amount);
            outcome.payouts.push(Payout {
                player_id: player.id.clone(),
                amount,
                hand,
            });
        }
        self.pot = 0;
        Ok(outcome)
    }

    // === Match state ===

    /// At most one seated player has chips left.
    pub fn is_game_over(&self) -> bool {
        self.funded_players() <= 1
    }

    pub fn final_winner(&self) -> Option<&Player> {
        let mut funded = self.players.iter().filter(|p| p.chips > 0);
        match (funded.next(), funded.next()) {
            (Some(winner), None) => Some(winner),
            _ => None,
        }
    }

    // === Views ===

    fn showdown_revealed(&self) -> bool {
        match self.phase {
            Phase::Showdown => true,
            Phase::Finished => self.last_outcome.as_ref().is_some_and(|o| o.showdown),
            _ => false,
        }
    }

    /// Table state as seen by `viewer`; `None` is the public view.
    pub fn snapshot(&self, viewer: Option<&PlayerId>) -> TableSnapshot {
        let revealed = self.showdown_revealed();
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(seat, p)| {
                let visible = viewer == Some(&p.id) || (revealed && p.is_contending());
                PlayerView {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    seat,
                    chips: p.chips,
                    current_bet: p.current_bet,
                    hole_cards: if visible {
                        p.hole_cards.clone()
                    } else {
                        Vec::new()
                    },
                    is_ai: p.is_ai(),
                    in_hand: p.in_hand,
                    folded: p.folded,
                    all_in: p.is_all_in(),
                    is_dealer: p.is_dealer,
                    is_small_blind: p.is_small_blind,
                    is_big_blind: p.is_big_blind,
                    last_action: p.last_action,
                }
            })
            .collect();

        TableSnapshot {
            hand_number: self.hand_number,
            hand_started_at: self.hand_started_at,
            phase: self.phase,
            pot: self.pot,
            current_bet_amount: self.current_bet_amount,
            community_cards: self.community_cards.clone(),
            dealer_index: self.dealer_index,
            current_turn: self.current_turn,
            current_player: self.current_player().map(|p| p.id.clone()),
            players,
            actions: self.actions.clone(),
            last_outcome: self.last_outcome.clone(),
            game_over: self.is_game_over(),
        }
    }

    pub fn stats(&self) -> TableStats {
        let ai_players = self.players.iter().filter(|p| p.is_ai()).count();
        TableStats {
            hand_number: self.hand_number,
            phase: self.phase,
            seated: self.players.len(),
            funded: self.funded_players(),
            ai_players,
            human_players: self.players.len() - ai_players,
            total_chips: self.players.iter().map(|p| p.chips).sum::<Usd>() + self.pot,
            pot: self.pot,
        }
    }
}

impl Default for TableEngine {
    fn default() -> Self {
        Self::new(TableConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn engine_with(players: &[(&str, Usd)]) -> TableEngine {
        let mut engine = TableEngine::new(TableConfig {
            seed: Some(42),
            ..TableConfig::default()
        });
        for (id, chips) in players {
            engine.add_player(*id, id, *chips).unwrap();
        }
        engine
    }

    fn id(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    fn current(engine: &TableEngine) -> PlayerId {
        engine.current_player().unwrap().id.clone()
    }

    fn total_chips(engine: &TableEngine) -> Usd {
        engine.players().iter().map(|p| p.chips).sum::<Usd>() + engine.pot()
    }

    #[test]
    fn test_start_requires_two_funded_players() {
        let mut engine = engine_with(&[("a", 1000)]);
        assert_eq!(
            engine.start_hand(),
            Err(GameError::InsufficientPlayers { required: 2 })
        );
        assert_eq!(engine.phase(), Phase::Waiting);
    }

    #[test]
    fn test_start_hand_deals_and_posts_blinds() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();

        assert_eq!(engine.phase(), Phase::PreFlop);
        assert_eq!(engine.hand_number(), 1);
        assert_eq!(engine.dealer_index(), Some(0));
        assert_eq!(engine.pot(), 30);
        assert_eq!(engine.current_bet_amount(), 20);
        assert!(engine.players()[1].is_small_blind);
        assert!(engine.players()[2].is_big_blind);
        assert!(engine.players().iter().all(|p| p.hole_cards.len() == 2));
        assert_eq!(engine.deck().remaining(), 52 - 6);
        // Dealer acts first three-handed.
        assert_eq!(engine.current_turn(), Some(0));
    }

    #[test]
    fn test_cannot_start_during_hand() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000)]);
        engine.start_hand().unwrap();
        assert_eq!(
            engine.start_hand(),
            Err(GameError::IllegalPhaseTransition {
                phase: Phase::PreFlop
            })
        );
    }

    #[test]
    fn test_out_of_turn_rejected_without_mutation() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        let before = engine.snapshot(None);
        assert_eq!(
            engine.submit_action(&id("b"), Action::Fold),
            Err(GameError::InvalidAction(InvalidAction::OutOfTurn))
        );
        assert_eq!(engine.snapshot(None), before);
    }

    #[test]
    fn test_unknown_player_rejected() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000)]);
        engine.start_hand().unwrap();
        assert_eq!(
            engine.submit_action(&id("zed"), Action::Fold),
            Err(GameError::PlayerNotFound)
        );
    }

    #[test]
    fn test_check_facing_bet_rejected() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        assert_eq!(
            engine.submit_action(&id("a"), Action::Check),
            Err(GameError::InvalidAction(InvalidAction::CannotCheck {
                to_call: 20
            }))
        );
    }

    #[test]
    fn test_raise_validation() {
        let mut engine = engine_with(&[("a", 100), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        assert_eq!(
            engine.submit_action(&id("a"), Action::Raise(20)),
            Err(GameError::InvalidAction(InvalidAction::RaiseTooSmall {
                amount: 20,
                current: 20
            }))
        );
        assert_eq!(
            engine.submit_action(&id("a"), Action::Raise(150)),
            Err(GameError::InvalidAction(InvalidAction::InsufficientChips {
                required: 150,
                available: 100
            }))
        );
        engine.submit_action(&id("a"), Action::Raise(60)).unwrap();
        assert_eq!(engine.current_bet_amount(), 60);
        assert_eq!(engine.pot(), 90);
    }

    #[test]
    fn test_raise_reopens_action() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Call).unwrap();
        engine.submit_action(&id("b"), Action::Call).unwrap();
        // Big blind raises; the others must act again.
        engine.submit_action(&id("c"), Action::Raise(80)).unwrap();
        assert!(!engine.is_betting_round_complete());
        assert_eq!(current(&engine), id("a"));
        engine.submit_action(&id("a"), Action::Call).unwrap();
        engine.submit_action(&id("b"), Action::Call).unwrap();
        assert!(engine.is_betting_round_complete());
        assert_eq!(engine.current_turn(), None);
        assert_eq!(engine.pot(), 240);
    }

    #[test]
    fn test_big_blind_gets_option() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Call).unwrap();
        engine.submit_action(&id("b"), Action::Call).unwrap();
        assert!(!engine.is_betting_round_complete());
        assert_eq!(current(&engine), id("c"));
        engine.submit_action(&id("c"), Action::Check).unwrap();
        assert!(engine.is_betting_round_complete());
    }

    #[test]
    fn test_call_with_nothing_owed_is_a_check() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Call).unwrap();
        engine.submit_action(&id("b"), Action::Call).unwrap();
        engine.submit_action(&id("c"), Action::Call).unwrap();
        assert_eq!(engine.players()[2].last_action, Some(Action::Check));
        assert_eq!(engine.pot(), 60);
    }

    #[test]
    fn test_advance_phase_requires_complete_round() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        assert_eq!(
            engine.advance_phase(),
            Err(GameError::IllegalPhaseTransition {
                phase: Phase::Waiting
            })
        );
        engine.start_hand().unwrap();
        assert_eq!(
            engine.advance_phase(),
            Err(GameError::IllegalPhaseTransition {
                phase: Phase::PreFlop
            })
        );
    }

    #[test]
    fn test_flop_burns_and_deals_three() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Call).unwrap();
        engine.submit_action(&id("b"), Action::Call).unwrap();
        engine.submit_action(&id("c"), Action::Check).unwrap();
        engine.advance_phase().unwrap();

        assert_eq!(engine.phase(), Phase::Flop);
        assert_eq!(engine.community_cards().len(), 3);
        assert_eq!(engine.deck().burned().len(), 1);
        assert_eq!(engine.current_bet_amount(), 0);
        assert!(engine.players().iter().all(|p| p.current_bet == 0));
        // First to act after the flop is left of the dealer.
        assert_eq!(current(&engine), id("b"));
    }

    #[test]
    fn test_everyone_folds_to_one_player() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Fold).unwrap();
        engine.submit_action(&id("b"), Action::Fold).unwrap();
        assert!(engine.is_betting_round_complete());
        engine.advance_phase().unwrap();

        assert_eq!(engine.phase(), Phase::Finished);
        assert_eq!(engine.pot(), 0);
        assert_eq!(engine.player(&id("c")).unwrap().chips, 1010);
        let outcome = engine.last_outcome().unwrap();
        assert!(!outcome.showdown);
        assert_eq!(outcome.payouts[0].amount, 30);
    }

    #[test]
    fn test_dealer_rotates() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Fold).unwrap();
        engine.submit_action(&id("b"), Action::Fold).unwrap();
        engine.advance_phase().unwrap();
        engine.start_hand().unwrap();
        assert_eq!(engine.dealer_index(), Some(1));
        assert_eq!(engine.hand_number(), 2);
    }

    #[test]
    fn test_seating_errors() {
        let mut engine = engine_with(&[("a", 1000)]);
        assert_eq!(
            engine.add_player("a", "A", 500),
            Err(GameError::PlayerAlreadyExists)
        );
        assert_eq!(engine.add_player("z", "Z", 0), Err(GameError::InvalidBuyIn));
        for i in 0..5 {
            engine.add_player(format!("p{i}"), "P", 500).unwrap();
        }
        assert_eq!(
            engine.add_player("late", "Late", 500),
            Err(GameError::CapacityReached)
        );
    }

    #[test]
    fn test_fill_with_ai_players() {
        let mut engine = engine_with(&[("a", 1000)]);
        assert_eq!(engine.fill_with_ai_players(1000), Ok(5));
        assert_eq!(engine.players().len(), 6);
        assert_eq!(engine.stats().ai_players, 5);
        assert_eq!(engine.stats().human_players, 1);
        assert_eq!(engine.fill_with_ai_players(1000), Ok(0));
    }

    #[test]
    fn test_execute_ai_action_requires_ai() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000)]);
        engine.start_hand().unwrap();
        let first = current(&engine);
        assert_eq!(
            engine.execute_ai_action(&first),
            Err(GameError::InvalidAction(InvalidAction::NotAiControlled))
        );
    }

    #[test]
    fn test_execute_ai_action_applies_decision() {
        let mut engine = TableEngine::new(TableConfig {
            seed: Some(9),
            ..TableConfig::default()
        });
        engine.add_ai_player("x", "X", 1000, AiLevel::Expert).unwrap();
        engine.add_ai_player("y", "Y", 1000, AiLevel::Easy).unwrap();
        engine.start_hand().unwrap();
        let actor = current(&engine);
        let decision = engine.execute_ai_action(&actor).unwrap();
        assert!(!decision.rationale.is_empty());
        assert_eq!(engine.actions().len(), 1);
        assert_eq!(engine.actions()[0].player_id, actor);
        assert_eq!(total_chips(&engine), 2000);
    }

    #[test]
    fn test_hole_cards_hidden_from_others() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000)]);
        engine.start_hand().unwrap();
        let view = engine.snapshot(Some(&id("a")));
        assert_eq!(view.player(&id("a")).unwrap().hole_cards.len(), 2);
        assert!(view.player(&id("b")).unwrap().hole_cards.is_empty());
        let public = engine.snapshot(None);
        assert!(public.players.iter().all(|p| p.hole_cards.is_empty()));
    }

    #[test]
    fn test_remove_between_hands_keeps_dealer_seat() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Fold).unwrap();
        engine.submit_action(&id("b"), Action::Fold).unwrap();
        engine.advance_phase().unwrap();
        // Dealer is "a" at seat 0; removing it passes the button on to "b".
        engine.remove_player(&id("a")).unwrap();
        engine.start_hand().unwrap();
        assert_eq!(engine.players()[engine.dealer_index().unwrap()].id, id("b"));
    }

    #[test]
    fn test_heads_up_all_in_then_fold() {
        let mut engine = engine_with(&[("a", 30), ("b", 1000)]);
        engine.start_hand().unwrap();
        // Heads-up: "a" is dealer and small blind and acts first.
        assert_eq!(current(&engine), id("a"));
        assert!(engine.players()[0].is_small_blind);
        engine.submit_action(&id("a"), Action::AllIn).unwrap();
        assert_eq!(current(&engine), id("b"));
        engine.submit_action(&id("b"), Action::Fold).unwrap();
        engine.advance_phase().unwrap();
        assert_eq!(engine.player(&id("a")).unwrap().chips, 50);
        assert!(!engine.is_game_over());
        assert!(engine.final_winner().is_none());
    }

    #[test]
    fn test_game_over_and_final_winner() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000)]);
        assert!(!engine.is_game_over());
        engine.remove_player(&id("b")).unwrap();
        assert!(engine.is_game_over());
        assert_eq!(engine.final_winner().map(|p| p.id.clone()), Some(id("a")));
        assert!(!engine.can_start());
    }

    #[test]
    fn test_pot_is_paid_only_when_the_hand_finishes() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Fold).unwrap();
        engine.submit_action(&id("b"), Action::Fold).unwrap();

        // The round is over but nothing is paid until the phase advances.
        assert_eq!(engine.phase(), Phase::PreFlop);
        assert_eq!(engine.pot(), 30);
        assert_eq!(engine.player(&id("c")).unwrap().chips, 980);
        assert!(engine.last_outcome().is_none());

        engine.advance_phase().unwrap();
        assert_eq!(engine.phase(), Phase::Finished);
        assert_eq!(engine.player(&id("c")).unwrap().chips, 1010);

        // A finished hand can't be paid out twice.
        assert_eq!(
            engine.advance_phase(),
            Err(GameError::IllegalPhaseTransition {
                phase: Phase::Finished
            })
        );
        assert_eq!(engine.player(&id("c")).unwrap().chips, 1010);
        assert_eq!(engine.last_outcome().unwrap().payouts.len(), 1);
    }

    #[test]
    fn test_leaving_top_bettor_lowers_the_bet_to_match() {
        let mut engine = engine_with(&[("a", 1000), ("b", 1000), ("c", 1000)]);
        engine.start_hand().unwrap();
        engine.submit_action(&id("a"), Action::Raise(100)).unwrap();
        engine.submit_action(&id("b"), Action::Call).unwrap();
        engine.submit_action(&id("c"), Action::Raise(300)).unwrap();
        assert_eq!(current(&engine), id("a"));

        engine.remove_player(&id("c")).unwrap();
        assert_eq!(engine.current_bet_amount(), 100);
        assert_eq!(current(&engine), id("a"));
        assert!(!engine.is_betting_round_complete());

        // Nothing is owed any more, so both remaining players check.
        engine.submit_action(&id("a"), Action::Check).unwrap();
        engine.submit_action(&id("b"), Action::Check).unwrap();
        assert!(engine.is_betting_round_complete());
        assert_eq!(engine.pot(), 500);
        assert_eq!(total_chips(&engine), 3000);
    }

    struct Recorder(Mutex<Vec<TableSnapshot>>);

    impl StateObserver for Recorder {
        fn on_state_changed(&self, snapshot: &TableSnapshot) {
            self.0.lock().unwrap().push(snapshot.clone());
        }
    }

    #[test]
    fn test_observer_sees_each_mutation() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut engine = TableEngine::default().with_observer(recorder.clone());
        engine.add_player("a", "A", 1000).unwrap();
        engine.add_player("b", "B", 1000).unwrap();
        engine.start_hand().unwrap();
        let first = current(&engine);
        engine.submit_action(&first, Action::Fold).unwrap();
        // A rejected action does not notify.
        let _ = engine.submit_action(&first, Action::Fold);
        engine.advance_phase().unwrap();

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen.last().unwrap().phase, Phase::Finished);
        assert!(seen.iter().skip(1).all(|s| s.total_chips() == 2000));
    }
}
