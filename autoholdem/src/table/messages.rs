//! Table actor message types.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::{
    bot::{decision::Decision, models::AiLevel},
    game::{
        entities::{Action, PlayerId, TableSnapshot, TableStats, Usd},
        state_machine::{GameError, StateObserver},
    },
};

/// Identifies one armed timer so stale continuations can be dropped.
pub type TaskId = u64;

/// Work a timer hands back to the actor when it fires.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Continuation {
    /// Let the current actor move, or wait on a human.
    DriveTurn,
    /// Fold a human who never acted.
    HumanTimeout(PlayerId),
    /// Deal the next street, show down or pay out.
    AdvancePhase,
    /// Deal the next hand.
    NextHand,
}

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Seat a human, or an AI when `level` is set
    AddPlayer {
        id: PlayerId,
        name: String,
        chips: Usd,
        level: Option<AiLevel>,
        response: oneshot::Sender<Result<(), GameError>>,
    },

    /// Seat generated AI players until the table is full
    FillWithAi {
        chips: Usd,
        response: oneshot::Sender<Result<usize, GameError>>,
    },

    /// Leave the table
    RemovePlayer {
        id: PlayerId,
        response: oneshot::Sender<Result<(), GameError>>,
    },

    /// Deal a hand manually
    StartHand {
        response: oneshot::Sender<Result<(), GameError>>,
    },

    /// Player action (fold, check, call, raise, all-in)
    TakeAction {
        id: PlayerId,
        action: Action,
        response: oneshot::Sender<Result<(), GameError>>,
    },

    /// Let the AI policy act for an AI seat
    ExecuteAiAction {
        id: PlayerId,
        response: oneshot::Sender<Result<Decision, GameError>>,
    },

    /// Get the table as seen by a player, or the public view
    GetSnapshot {
        viewer: Option<PlayerId>,
        response: oneshot::Sender<TableSnapshot>,
    },

    GetStats {
        response: oneshot::Sender<TableStats>,
    },

    /// Start autonomous play; answers whether it is running
    StartAuto { response: oneshot::Sender<bool> },

    StopAuto { response: oneshot::Sender<()> },

    IsAutoRunning { response: oneshot::Sender<bool> },

    CanStart { response: oneshot::Sender<bool> },

    /// Close table
    Close { response: oneshot::Sender<()> },

    /// Internal: an armed timer fired
    Continue {
        task: TaskId,
        continuation: Continuation,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("table is closed")]
    Closed,
}

/// Forwards snapshots into a bounded channel without blocking the table.
/// Snapshots are dropped while the channel is full.
#[derive(Clone, Debug)]
pub struct ChannelObserver {
    sender: mpsc::Sender<TableSnapshot>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::Sender<TableSnapshot>) -> Self {
        Self { sender }
    }

    /// An observer and the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TableSnapshot>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

impl StateObserver for ChannelObserver {
    fn on_state_changed(&self, snapshot: &TableSnapshot) {
        match self.sender.try_send(snapshot.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!(
                    "Snapshot channel full, dropping hand #{} update",
                    snapshot.hand_number
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Snapshot receiver gone, dropping update");
            }
        }
    }
}
