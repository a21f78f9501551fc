//! Poker game engine: cards, hand evaluation and the table state machine.
//!
//! This module provides:
//! - Cards, deck, players and table views
//! - Hand evaluation over 5 to 7 cards
//! - The betting-round state machine driving one table

pub mod constants;
pub mod entities;
pub mod functional;
pub mod state_machine;

pub use state_machine::{GameError, InvalidAction, StateObserver, TableEngine};
