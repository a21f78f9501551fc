//! AI decision policy.
//!
//! A decision is either rational (hand strength, pot odds and betting
//! phase) or random; the seat's [`AiLevel`] is the probability of the
//! rational branch. Given the same random source the policy is
//! deterministic.

use enum_dispatch::enum_dispatch;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::models::AiLevel;
use crate::game::{
    entities::{Action, Card, Phase, Usd},
    functional::{self, HandType},
};

// === Post-flop strength per made hand ===

const STRENGTH_HIGH_CARD: f64 = 0.1;
const STRENGTH_PAIR: f64 = 0.3;
const STRENGTH_TWO_PAIR: f64 = 0.5;
const STRENGTH_THREE_OF_A_KIND: f64 = 0.7;
const STRENGTH_STRAIGHT: f64 = 0.8;
const STRENGTH_FLUSH: f64 = 0.85;
const STRENGTH_FULL_HOUSE: f64 = 0.9;
const STRENGTH_FOUR_OF_A_KIND: f64 = 0.95;
const STRENGTH_STRAIGHT_FLUSH: f64 = 0.98;
const STRENGTH_ROYAL_FLUSH: f64 = 1.0;

/// Flat positional bonus; seats are not ranked by position.
const POSITION_FACTOR: f64 = 0.1;
const POT_ODDS_WEIGHT: f64 = 0.3;
const POSITION_WEIGHT: f64 = 0.2;

/// Hand strength above which a short stack shoves instead of folding.
const SHOVE_STRENGTH: f64 = 0.7;

const RAISE_SCORE: f64 = 0.8;
const CALL_SCORE: f64 = 0.6;
const MARGINAL_SCORE: f64 = 0.4;
/// Pot odds that justify calling with a marginal score.
const MARGINAL_POT_ODDS: f64 = 0.25;

const RANDOM_FOLD: f64 = 0.4;
const RANDOM_CALL: f64 = 0.8;

/// What the policy sees of the table when it is an AI seat's turn.
#[derive(Debug, Clone)]
pub struct DecisionContext<'a> {
    pub hole_cards: &'a [Card],
    pub community_cards: &'a [Card],
    /// Highest bet of the current round.
    pub current_bet_amount: Usd,
    /// This seat's bet in the current round.
    pub player_current_bet: Usd,
    pub chips: Usd,
    pub pot: Usd,
    /// Players still contending for the pot.
    pub active_players: usize,
    pub phase: Phase,
}

impl DecisionContext<'_> {
    pub fn to_call(&self) -> Usd {
        self.current_bet_amount
            .saturating_sub(self.player_current_bet)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub rationale: String,
}

impl Decision {
    fn new(action: Action, rationale: impl Into<String>) -> Self {
        Self {
            action,
            rationale: rationale.into(),
        }
    }

    /// Raises to `target`, bumped to at least one chip over the table's bet.
    /// A raise costing the whole stack becomes an all-in.
    fn raise_to(ctx: &DecisionContext, target: Usd, rationale: String) -> Self {
        let target = target.max(ctx.current_bet_amount + 1);
        let cost = target.saturating_sub(ctx.player_current_bet);
        if cost >= ctx.chips {
            Self::new(Action::AllIn, format!("{rationale}, stack committed"))
        } else {
            Self::new(Action::Raise(target), rationale)
        }
    }
}

#[enum_dispatch]
pub trait DecisionBranch {
    fn decide(&self, ctx: &DecisionContext, rng: &mut dyn RngCore) -> Decision;
}

/// Plays by hand strength, pot odds and phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct RationalBranch;

/// Folds, calls or raises by coin flip.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomBranch;

#[enum_dispatch(DecisionBranch)]
#[derive(Clone, Copy, Debug)]
pub enum Branch {
    RationalBranch,
    RandomBranch,
}

impl Branch {
    /// Picks the branch for one decision.
    pub fn choose(level: AiLevel, rng: &mut dyn RngCore) -> Self {
        if rng.random::<f64>() < level.rationality() {
            RationalBranch.into()
        } else {
            RandomBranch.into()
        }
    }
}

/// Decides an action for an AI seat.
pub fn decide(ctx: &DecisionContext, level: AiLevel, rng: &mut dyn RngCore) -> Decision {
    Branch::choose(level, rng).decide(ctx, rng)
}

impl DecisionBranch for RationalBranch {
    fn decide(&self, ctx: &DecisionContext, _rng: &mut dyn RngCore) -> Decision {
        let to_call = ctx.to_call();
        if to_call == 0 {
            return Decision::new(Action::Check, "free check");
        }

        let strength = hand_strength(ctx.hole_cards, ctx.community_cards);
        if to_call >= ctx.chips {
            return if strength > SHOVE_STRENGTH {
                Decision::new(Action::AllIn, "strong hand, all in")
            } else {
                Decision::new(Action::Fold, "can't afford the call")
            };
        }

        let odds = pot_odds(ctx.pot, to_call);
        let score = (strength + odds * POT_ODDS_WEIGHT + POSITION_FACTOR * POSITION_WEIGHT)
            * phase_multiplier(ctx.phase);

        if score > RAISE_SCORE {
            let raise_by = raise_amount(ctx.pot, ctx.chips, strength);
            Decision::raise_to(
                ctx,
                ctx.current_bet_amount + raise_by,
                format!("strong hand raise (score {score:.2})"),
            )
        } else if score > CALL_SCORE {
            Decision::new(Action::Call, format!("decent hand call (score {score:.2})"))
        } else if score > MARGINAL_SCORE {
            if odds > MARGINAL_POT_ODDS {
                Decision::new(Action::Call, "pot odds justify a call")
            } else {
                Decision::new(Action::Fold, "pot odds too thin")
            }
        } else {
            Decision::new(Action::Fold, format!("weak hand fold (score {score:.2})"))
        }
    }
}

impl DecisionBranch for RandomBranch {
    fn decide(&self, ctx: &DecisionContext, rng: &mut dyn RngCore) -> Decision {
        let to_call = ctx.to_call();
        if to_call == 0 {
            return Decision::new(Action::Check, "random check");
        }

        let roll = rng.random::<f64>();
        if roll < RANDOM_FOLD {
            Decision::new(Action::Fold, "random fold")
        } else if roll < RANDOM_CALL {
            if to_call <= ctx.chips {
                Decision::new(Action::Call, "random call")
            } else {
                Decision::new(Action::Fold, "can't afford the call")
            }
        } else if ctx.chips > to_call.saturating_mul(2) {
            let raise_by = rng.random_range(0..=ctx.chips / 4) + to_call;
            Decision::raise_to(
                ctx,
                ctx.current_bet_amount + raise_by,
                "random raise".to_string(),
            )
        } else {
            Decision::new(Action::Call, "random call")
        }
    }
}

/// Strength in `[0, 1]`: a hole-card heuristic before the flop, the made
/// hand afterwards.
pub fn hand_strength(hole: &[Card], community: &[Card]) -> f64 {
    let [first, second] = hole else {
        return 0.0;
    };

    let high = f64::from(first.rank().max(second.rank()));
    let mut strength = if first.rank() == second.rank() {
        0.5 + f64::from(first.rank() - 2) * 0.03
    } else if first.suit() == second.suit() {
        0.3 + high * 0.02
    } else if first.rank().abs_diff(second.rank()) <= 4 {
        0.2 + high * 0.015
    } else {
        high * 0.01
    };

    if !community.is_empty() {
        match functional::evaluate(hole, community) {
            Ok(result) => strength = made_hand_strength(result.hand_type),
            Err(e) => log::debug!("Falling back to hole-card strength: {e}"),
        }
    }

    strength.min(1.0)
}

fn made_hand_strength(hand_type: HandType) -> f64 {
    match hand_type {
        HandType::HighCard => STRENGTH_HIGH_CARD,
        HandType::Pair => STRENGTH_PAIR,
        HandType::TwoPair => STRENGTH_TWO_PAIR,
        HandType::ThreeOfAKind => STRENGTH_THREE_OF_A_KIND,
        HandType::Straight => STRENGTH_STRAIGHT,
        HandType::Flush => STRENGTH_FLUSH,
        HandType::FullHouse => STRENGTH_FULL_HOUSE,
        HandType::FourOfAKind => STRENGTH_FOUR_OF_A_KIND,
        HandType::StraightFlush => STRENGTH_STRAIGHT_FLUSH,
        HandType::RoyalFlush => STRENGTH_ROYAL_FLUSH,
    }
}

/// Pot odds as `pot / (pot + call)`; 1.0 when calling is free.
pub fn pot_odds(pot: Usd, to_call: Usd) -> f64 {
    if to_call == 0 {
        return 1.0;
    }
    f64::from(pot) / (f64::from(pot) + f64::from(to_call))
}

fn phase_multiplier(phase: Phase) -> f64 {
    match phase {
        Phase::PreFlop => 0.9,
        Phase::Turn => 1.1,
        Phase::River => 1.2,
        _ => 1.0,
    }
}

fn raise_amount(pot: Usd, chips: Usd, strength: f64) -> Usd {
    let factor = 0.5 + strength * 0.5;
    let base = (f64::from(pot) * factor * 0.5) as Usd;
    base.min(chips / 3).max(pot / 4)
}
