//! Hand evaluation over 5 to 7 cards.
//!
//! Every 5-card subset is scored by rank and suit grouping and the best one
//! is kept. Results compare by hand type first, then by the tiebreak ranks
//! in order.

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use thiserror::Error;

use super::entities::{ACE, Card, Value};

#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum EvalError {
    #[error("need at least 5 cards to evaluate, got {got}")]
    NotEnoughCards { got: usize },
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum HandType {
    HighCard,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl fmt::Display for HandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::Pair => "pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
            Self::RoyalFlush => "royal flush",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandResult {
    pub hand_type: HandType,
    /// Ranks that break ties between hands of the same type, most
    /// significant first.
    pub tiebreak: Vec<Value>,
    /// The five cards making the hand, grouped cards first.
    pub best_five: Vec<Card>,
}

impl HandResult {
    pub fn beats(&self, other: &HandResult) -> bool {
        compare(self, other) == Ordering::Greater
    }
}

impl fmt::Display for HandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.hand_type)?;
        for (i, card) in self.best_five.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{card}")?;
        }
        write!(f, ")")
    }
}

/// Best hand that can be made from the hole and community cards.
pub fn evaluate(hole: &[Card], community: &[Card]) -> Result<HandResult, EvalError> {
    let cards: Vec<Card> = hole.iter().chain(community).copied().collect();
    if cards.len() < 5 {
        return Err(EvalError::NotEnoughCards { got: cards.len() });
    }

    let mut best: Option<HandResult> = None;
    for combo in five_card_combinations(&cards) {
        let result = score_five(combo);
        if best.as_ref().is_none_or(|b| result.beats(b)) {
            best = Some(result);
        }
    }
    best.ok_or(EvalError::NotEnoughCards { got: cards.len() })
}

/// Orders two results by hand type, then tiebreak ranks.
pub fn compare(a: &HandResult, b: &HandResult) -> Ordering {
    a.hand_type
        .cmp(&b.hand_type)
        .then_with(|| a.tiebreak.cmp(&b.tiebreak))
}

/// Indices of every result tied for the best, in ascending order.
pub fn compare_many(results: &[HandResult]) -> Vec<usize> {
    let mut winners: Vec<usize> = Vec::new();
    for (idx, result) in results.iter().enumerate() {
        match winners.first().map(|&w| compare(result, &results[w])) {
            None | Some(Ordering::Equal) => winners.push(idx),
            Some(Ordering::Greater) => {
                winners.clear();
                winners.push(idx);
            }
            Some(Ordering::Less) => {}
        }
    }
    winners
}

fn five_card_combinations(cards: &[Card]) -> Vec<[Card; 5]> {
    let n = cards.len();
    let mut combos = Vec::new();
    if n < 5 {
        return combos;
    }
    let mut idx = [0, 1, 2, 3, 4];
    loop {
        combos.push(idx.map(|i| cards[i]));
        // Rightmost position that can still move right.
        let mut pos = 5;
        while pos > 0 && idx[pos - 1] == n - 5 + (pos - 1) {
            pos -= 1;
        }
        if pos == 0 {
            return combos;
        }
        idx[pos - 1] += 1;
        for j in pos..5 {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

fn score_five(mut cards: [Card; 5]) -> HandResult {
    let mut counts = [0u8; ACE as usize + 1];
    for card in &cards {
        counts[usize::from(card.0)] += 1;
    }

    // (count, rank), biggest groups first, then highest rank.
    let mut groups: Vec<(u8, Value)> = (0..=ACE)
        .rev()
        .filter(|&r| counts[usize::from(r)] > 0)
        .map(|r| (counts[usize::from(r)], r))
        .collect();
    groups.sort_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.1 == cards[0].1);
    let straight_high = straight_high(&groups);

    cards.sort_by(|a, b| {
        let ka = (counts[usize::from(a.0)], a.0);
        let kb = (counts[usize::from(b.0)], b.0);
        kb.cmp(&ka).then_with(|| b.1.cmp(&a.1))
    });

    if let Some(high) = straight_high {
        if high == 5 {
            // Wheel: the ace plays low.
            cards.rotate_left(1);
        }
        let hand_type = match (is_flush, high) {
            (true, ACE) => HandType::RoyalFlush,
            (true, _) => HandType::StraightFlush,
            (false, _) => HandType::Straight,
        };
        return HandResult {
            hand_type,
            tiebreak: vec![high],
            best_five: cards.to_vec(),
        };
    }

    let hand_type = match (groups[0].0, groups.get(1).map(|g| g.0)) {
        (4, _) => HandType::FourOfAKind,
        (3, Some(2)) => HandType::FullHouse,
        _ if is_flush => HandType::Flush,
        (3, _) => HandType::ThreeOfAKind,
        (2, Some(2)) => HandType::TwoPair,
        (2, _) => HandType::Pair,
        _ => HandType::HighCard,
    };
    HandResult {
        hand_type,
        tiebreak: groups.iter().map(|&(_, rank)| rank).collect(),
        best_five: cards.to_vec(),
    }
}

/// High card of a five-distinct-rank straight, with the wheel headed by 5.
fn straight_high(groups: &[(u8, Value)]) -> Option<Value> {
    if groups.len() != 5 {
        return None;
    }
    let high = groups[0].1;
    let low = groups[4].1;
    if high - low == 4 {
        Some(high)
    } else if high == ACE && groups[1].1 == 5 && low == 2 {
        Some(5)
    } else {
        None
    }
}
