//! AI players.
//!
//! - [`models::AiLevel`]: how often a seat plays rationally
//! - [`decision::decide`]: the decision policy, rational or random branch
//!
//! ## Levels
//!
//! | level  | rational decisions |
//! |--------|--------------------|
//! | Easy   | 30%                |
//! | Medium | 60%                |
//! | Hard   | 85%                |
//! | Expert | 95%                |

pub mod decision;
pub mod models;

pub use decision::{Decision, DecisionContext, decide};
pub use models::{AiLevel, ai_player_name};
