//! # autoholdem
//!
//! A Texas Hold'em table that plays itself.
//!
//! The crate manages one table's hand lifecycle, evaluates hands, decides
//! actions for AI seats, and drives continuous play under timers while
//! human seats act through an async handle.
//!
//! ## Architecture
//!
//! A hand moves through these phases:
//!
//! - **Waiting**: seats filling, no hand dealt yet
//! - **PreFlop**: blinds posted, hole cards dealt, first betting round
//! - **Flop/Turn/River**: a burn and 3/1/1 community cards, then betting
//! - **Showdown**: remaining hands are compared
//! - **Finished**: the pot has been paid; the next hand rotates the dealer
//!
//! ## Core Modules
//!
//! - [`game`]: entities, hand evaluation, and the table state machine
//! - [`bot`]: AI decision policy
//! - [`table`]: the actor that owns a table and schedules autonomous play
//!
//! ## Example
//!
//! ```
//! use autoholdem::{TableEngine, entities::Action};
//!
//! let mut engine = TableEngine::default();
//! engine.add_player("alice", "Alice", 1000).unwrap();
//! engine.add_player("bob", "Bob", 1000).unwrap();
//! engine.start_hand().unwrap();
//!
//! let first = engine.current_player().unwrap().id.clone();
//! engine.submit_action(&first, Action::Call).unwrap();
//! ```

/// AI players and their decision policy.
pub mod bot;

/// Core game logic, entities, and state machine.
pub mod game;

/// Table actor, handle, and configuration.
pub mod table;

pub use game::{
    GameError, InvalidAction, StateObserver, TableEngine,
    constants::{self, MAX_PLAYERS, MIN_PLAYERS},
    entities, functional,
};
pub use table::{SchedulerConfig, TableActor, TableConfig, TableError, TableHandle};
