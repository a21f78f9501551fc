//! Table module: the async actor that owns one table and paces play.
//!
//! This module implements:
//! - TableActor: async actor owning a single [`TableEngine`](crate::game::state_machine::TableEngine)
//! - TableHandle: cloneable, async front door to the actor
//! - Timer continuations (AI think time, human timeout, phase and hand pacing)
//! - Table and scheduler configuration
//!
//! ## Architecture
//!
//! Each table runs in its own Tokio task with an mpsc message inbox. Callers
//! and timers both post messages into that inbox, so the table is only ever
//! mutated by the actor, one message at a time.
//!
//! ## Example
//!
//! ```no_run
//! use autoholdem::game::state_machine::TableEngine;
//! use autoholdem::table::{SchedulerConfig, TableActor, TableConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = TableEngine::new(TableConfig::default());
//!     let (actor, handle) = TableActor::new(engine, SchedulerConfig::default());
//!     tokio::spawn(actor.run());
//!
//!     handle.fill_with_ai_players(1000).await.unwrap();
//!     assert!(handle.start_auto().await.unwrap());
//! }
//! ```

pub mod actor;
pub mod config;
pub mod messages;

pub use actor::{TableActor, TableHandle};
pub use config::{SchedulerConfig, TableConfig, TableSpeed};
pub use messages::{ChannelObserver, Continuation, TableError, TableMessage};
