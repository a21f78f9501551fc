//! Table actor: owns one [`TableEngine`] and paces autonomous play.
//!
//! Every mutation of the table goes through the actor's inbox, one message
//! at a time. Timers never touch the engine. A timer task sleeps and then
//! posts a [`Continuation`] back into the inbox; the actor re-checks the
//! table when it arrives and drops continuations whose timer was cancelled
//! or replaced in the meantime.

use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use super::{
    config::SchedulerConfig,
    messages::{Continuation, TableError, TableMessage, TaskId},
};
use crate::{
    bot::{decision::Decision, models::AiLevel},
    game::{
        entities::{Action, Phase, PlayerId, TableSnapshot, TableStats, Usd},
        state_machine::{GameError, TableEngine},
    },
};

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
}

impl TableHandle {
    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> Result<T, TableError> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(message(response))
            .await
            .map_err(|_| TableError::Closed)?;
        receiver.await.map_err(|_| TableError::Closed)
    }

    pub async fn add_player(
        &self,
        id: impl Into<PlayerId>,
        name: impl Into<String>,
        chips: Usd,
    ) -> Result<(), TableError> {
        let (id, name) = (id.into(), name.into());
        Ok(self
            .request(|response| TableMessage::AddPlayer {
                id,
                name,
                chips,
                level: None,
                response,
            })
            .await??)
    }

    pub async fn add_ai_player(
        &self,
        id: impl Into<PlayerId>,
        name: impl Into<String>,
        chips: Usd,
        level: AiLevel,
    ) -> Result<(), TableError> {
        let (id, name) = (id.into(), name.into());
        Ok(self
            .request(|response| TableMessage::AddPlayer {
                id,
                name,
                chips,
                level: Some(level),
                response,
            })
            .await??)
    }

    /// Fills every empty seat with a generated AI player.
    pub async fn fill_with_ai_players(&self, chips: Usd) -> Result<usize, TableError> {
        Ok(self
            .request(|response| TableMessage::FillWithAi { chips, response })
            .await??)
    }

    pub async fn remove_player(&self, id: impl Into<PlayerId>) -> Result<(), TableError> {
        let id = id.into();
        Ok(self
            .request(|response| TableMessage::RemovePlayer { id, response })
            .await??)
    }

    pub async fn start_hand(&self) -> Result<(), TableError> {
        Ok(self
            .request(|response| TableMessage::StartHand { response })
            .await??)
    }

    pub async fn submit_action(
        &self,
        id: impl Into<PlayerId>,
        action: Action,
    ) -> Result<(), TableError> {
        let id = id.into();
        Ok(self
            .request(|response| TableMessage::TakeAction {
                id,
                action,
                response,
            })
            .await??)
    }

    pub async fn execute_ai_action(&self, id: impl Into<PlayerId>) -> Result<Decision, TableError> {
        let id = id.into();
        Ok(self
            .request(|response| TableMessage::ExecuteAiAction { id, response })
            .await??)
    }

    /// The table as `viewer` sees it; `None` is the public view.
    pub async fn snapshot(&self, viewer: Option<PlayerId>) -> Result<TableSnapshot, TableError> {
        self.request(|response| TableMessage::GetSnapshot { viewer, response })
            .await
    }

    pub async fn stats(&self) -> Result<TableStats, TableError> {
        self.request(|response| TableMessage::GetStats { response })
            .await
    }

    /// Starts autonomous play. Returns `false` when the table can't start.
    pub async fn start_auto(&self) -> Result<bool, TableError> {
        self.request(|response| TableMessage::StartAuto { response })
            .await
    }

    pub async fn stop_auto(&self) -> Result<(), TableError> {
        self.request(|response| TableMessage::StopAuto { response })
            .await
    }

    pub async fn is_auto_running(&self) -> Result<bool, TableError> {
        self.request(|response| TableMessage::IsAutoRunning { response })
            .await
    }

    pub async fn can_start(&self) -> Result<bool, TableError> {
        self.request(|response| TableMessage::CanStart { response })
            .await
    }

    pub async fn close(&self) -> Result<(), TableError> {
        self.request(|response| TableMessage::Close { response })
            .await
    }
}

/// An armed timer.
#[derive(Debug)]
struct Slot {
    task: TaskId,
    handle: JoinHandle<()>,
}

impl Slot {
    fn cancel(self) {
        self.handle.abort();
    }
}

/// Clears `slot` if it holds `task`; false means the continuation is stale.
fn claim(slot: &mut Option<Slot>, task: TaskId) -> bool {
    if slot.as_ref().is_some_and(|s| s.task == task) {
        *slot = None;
        true
    } else {
        false
    }
}

/// Table actor managing a single poker table
pub struct TableActor {
    config: SchedulerConfig,
    engine: TableEngine,
    inbox: mpsc::Receiver<TableMessage>,
    /// Lets timers post back without keeping the table open.
    loopback: mpsc::WeakSender<TableMessage>,
    auto_running: bool,
    is_closed: bool,
    next_task: TaskId,
    /// Pending `DriveTurn` or `NextHand`.
    driver: Option<Slot>,
    /// Pending human timeout.
    timeout: Option<Slot>,
    /// Pending `AdvancePhase`.
    phase_advance: Option<Slot>,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Arguments
    ///
    /// * `engine` - Table engine the actor takes ownership of
    /// * `config` - Delays used to pace autonomous play
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(engine: TableEngine, config: SchedulerConfig) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(100);
        let actor = Self {
            config,
            engine,
            inbox,
            loopback: sender.downgrade(),
            auto_running: false,
            is_closed: false,
            next_task: 0,
            driver: None,
            timeout: None,
            phase_advance: None,
        };
        (actor, TableHandle { sender })
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!(
            "Table {} '{}' starting",
            self.engine.table_id(),
            self.engine.config().name
        );

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message);
            if self.is_closed {
                break;
            }
        }

        self.cancel_all();
        log::info!(
            "Table {} '{}' closed",
            self.engine.table_id(),
            self.engine.config().name
        );
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::AddPlayer {
                id,
                name,
                chips,
                level,
                response,
            } => {
                let result = match level {
                    Some(level) => self.engine.add_ai_player(id, &name, chips, level),
                    None => self.engine.add_player(id, &name, chips),
                };
                let _ = response.send(result);
            }

            TableMessage::FillWithAi { chips, response } => {
                let _ = response.send(self.engine.fill_with_ai_players(chips));
            }

            TableMessage::RemovePlayer { id, response } => {
                let result = self.handle_leave(&id);
                let _ = response.send(result);
            }

            TableMessage::StartHand { response } => {
                let result = self.handle_start_hand();
                let _ = response.send(result);
            }

            TableMessage::TakeAction {
                id,
                action,
                response,
            } => {
                let result = self.handle_action(&id, action);
                let _ = response.send(result);
            }

            TableMessage::ExecuteAiAction { id, response } => {
                let result = self.engine.execute_ai_action(&id);
                if result.is_ok() {
                    self.after_action(self.config.think_delay);
                }
                let _ = response.send(result);
            }

            TableMessage::GetSnapshot { viewer, response } => {
                let _ = response.send(self.engine.snapshot(viewer.as_ref()));
            }

            TableMessage::GetStats { response } => {
                let _ = response.send(self.engine.stats());
            }

            TableMessage::StartAuto { response } => {
                let _ = response.send(self.start_auto());
            }

            TableMessage::StopAuto { response } => {
                self.stop_auto();
                let _ = response.send(());
            }

            TableMessage::IsAutoRunning { response } => {
                let _ = response.send(self.auto_running);
            }

            TableMessage::CanStart { response } => {
                let _ = response.send(self.engine.can_start());
            }

            TableMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }

            TableMessage::Continue { task, continuation } => {
                self.handle_continuation(task, continuation);
            }
        }
    }

    fn handle_continuation(&mut self, task: TaskId, continuation: Continuation) {
        let slot = match continuation {
            Continuation::DriveTurn | Continuation::NextHand => &mut self.driver,
            Continuation::HumanTimeout(_) => &mut self.timeout,
            Continuation::AdvancePhase => &mut self.phase_advance,
        };
        if !claim(slot, task) {
            log::debug!(
                "Table {}: dropping stale {:?}",
                self.engine.table_id(),
                continuation
            );
            return;
        }

        match continuation {
            Continuation::DriveTurn => self.drive_turn(),
            Continuation::HumanTimeout(id) => self.on_human_timeout(&id),
            Continuation::AdvancePhase => self.on_advance_phase(),
            Continuation::NextHand => self.next_hand(),
        }
    }

    // === Timers ===

    fn schedule(&mut self, delay: Duration, continuation: Continuation) -> Slot {
        self.next_task += 1;
        let task = self.next_task;
        let loopback = self.loopback.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = loopback.upgrade() {
                let _ = sender
                    .send(TableMessage::Continue { task, continuation })
                    .await;
            }
        });
        Slot { task, handle }
    }

    fn arm_driver(&mut self, delay: Duration, continuation: Continuation) {
        if let Some(old) = self.driver.take() {
            old.cancel();
        }
        self.driver = Some(self.schedule(delay, continuation));
    }

    fn arm_timeout(&mut self, id: PlayerId) {
        if let Some(old) = self.timeout.take() {
            old.cancel();
        }
        log::debug!(
            "Table {}: waiting up to {:?} for {}",
            self.engine.table_id(),
            self.config.human_timeout,
            id
        );
        self.timeout = Some(self.schedule(
            self.config.human_timeout,
            Continuation::HumanTimeout(id),
        ));
    }

    fn arm_phase_advance(&mut self, delay: Duration) {
        if let Some(old) = self.phase_advance.take() {
            old.cancel();
        }
        self.phase_advance = Some(self.schedule(delay, Continuation::AdvancePhase));
    }

    fn cancel_timeout(&mut self) {
        if let Some(old) = self.timeout.take() {
            old.cancel();
        }
    }

    fn cancel_all(&mut self) {
        for slot in [
            self.driver.take(),
            self.timeout.take(),
            self.phase_advance.take(),
        ]
        .into_iter()
        .flatten()
        {
            slot.cancel();
        }
    }

    // === Progression ===

    /// Follow-up after a successful action: advance the phase once the
    /// round is over, and keep autonomous play moving.
    fn after_action(&mut self, drive_delay: Duration) {
        self.schedule_phase_advance_if_due();
        if self.auto_running {
            self.arm_driver(drive_delay, Continuation::DriveTurn);
        }
    }

    fn schedule_phase_advance_if_due(&mut self) {
        let phase = self.engine.phase();
        if self.phase_advance.is_some() || !phase.is_hand_in_progress() {
            return;
        }
        if phase == Phase::Showdown {
            self.arm_phase_advance(self.config.showdown_delay);
        } else if self.engine.is_betting_round_complete() {
            self.arm_phase_advance(self.config.phase_delay);
        }
    }

    fn drive_turn(&mut self) {
        if !self.auto_running {
            return;
        }

        if self.engine.phase() == Phase::Finished {
            if self.engine.is_game_over() {
                self.finish_match();
            } else {
                self.arm_driver(self.config.next_hand_delay, Continuation::NextHand);
            }
            return;
        }

        let Some(player) = self.engine.current_player() else {
            // Between rounds; the phase advance drives again.
            return;
        };
        let id = player.id.clone();

        if player.is_ai() {
            match self.engine.execute_ai_action(&id) {
                Ok(decision) => {
                    log::debug!(
                        "Table {}: AI {} {} ({})",
                        self.engine.table_id(),
                        id,
                        decision.action,
                        decision.rationale
                    );
                    self.after_action(self.config.think_delay);
                }
                Err(e) => {
                    log::warn!(
                        "Table {}: AI action for {} failed: {}; retrying",
                        self.engine.table_id(),
                        id,
                        e
                    );
                    self.arm_driver(self.config.think_delay, Continuation::DriveTurn);
                }
            }
        } else {
            self.arm_timeout(id);
        }
    }

    fn on_human_timeout(&mut self, id: &PlayerId) {
        if !self.auto_running {
            return;
        }
        if self.engine.current_player().map(|p| &p.id) != Some(id) {
            log::debug!(
                "Table {}: timeout for {} no longer applies",
                self.engine.table_id(),
                id
            );
            return;
        }

        log::info!(
            "Table {}: {} timed out and folds",
            self.engine.table_id(),
            id
        );
        match self.engine.submit_action(id, Action::Fold) {
            Ok(()) => self.after_action(self.config.think_delay),
            Err(e) => log::warn!(
                "Table {}: forced fold for {} failed: {}",
                self.engine.table_id(),
                id,
                e
            ),
        }
    }

    fn on_advance_phase(&mut self) {
        if let Err(e) = self.engine.advance_phase() {
            log::warn!(
                "Table {}: phase advance skipped: {}",
                self.engine.table_id(),
                e
            );
            return;
        }

        // All-in run-outs keep advancing without any player action.
        self.schedule_phase_advance_if_due();
        if self.auto_running {
            self.arm_driver(self.config.think_delay, Continuation::DriveTurn);
        }
    }

    fn next_hand(&mut self) {
        if !self.auto_running {
            return;
        }
        if self.engine.is_game_over() {
            self.finish_match();
            return;
        }

        match self.engine.start_hand() {
            Ok(()) => {
                self.schedule_phase_advance_if_due();
                self.arm_driver(self.config.think_delay, Continuation::DriveTurn);
            }
            Err(e) => {
                log::warn!(
                    "Table {}: can't deal the next hand: {}; stopping autoplay",
                    self.engine.table_id(),
                    e
                );
                self.stop_auto();
            }
        }
    }

    fn finish_match(&mut self) {
        match self.engine.final_winner() {
            Some(winner) => log::info!(
                "Table {}: match over after {} hands, {} wins",
                self.engine.table_id(),
                self.engine.hand_number(),
                winner.name
            ),
            None => log::info!(
                "Table {}: match over after {} hands",
                self.engine.table_id(),
                self.engine.hand_number()
            ),
        }
        self.stop_auto();
    }

    // === Requests ===

    fn start_auto(&mut self) -> bool {
        if self.auto_running {
            return true;
        }
        if !self.engine.can_start() {
            log::warn!(
                "Table {}: autoplay needs 2+ players with chips",
                self.engine.table_id()
            );
            return false;
        }

        self.auto_running = true;
        log::info!("Table {}: autoplay started", self.engine.table_id());
        if self.engine.is_hand_in_progress() {
            self.schedule_phase_advance_if_due();
            self.arm_driver(self.config.think_delay, Continuation::DriveTurn);
        } else {
            self.next_hand();
        }
        self.auto_running
    }

    fn stop_auto(&mut self) {
        if !self.auto_running {
            return;
        }
        self.auto_running = false;
        self.cancel_all();
        log::info!("Table {}: autoplay stopped", self.engine.table_id());
    }

    fn handle_start_hand(&mut self) -> Result<(), GameError> {
        self.engine.start_hand()?;
        self.after_action(self.config.think_delay);
        Ok(())
    }

    fn handle_action(&mut self, id: &PlayerId, action: Action) -> Result<(), GameError> {
        self.engine.submit_action(id, action)?;
        self.cancel_timeout();
        self.after_action(self.config.human_action_delay);
        Ok(())
    }

    /// A leaving player only disturbs the clock when the turn moves; the
    /// player on the clock keeps their deadline otherwise.
    fn handle_leave(&mut self, id: &PlayerId) -> Result<(), GameError> {
        let before = self.current_player_id();
        self.engine.remove_player(id)?;
        self.schedule_phase_advance_if_due();
        if self.current_player_id() != before {
            self.cancel_timeout();
            if self.auto_running {
                self.arm_driver(self.config.think_delay, Continuation::DriveTurn);
            }
        }
        Ok(())
    }

    fn current_player_id(&self) -> Option<PlayerId> {
        self.engine.current_player().map(|p| p.id.clone())
    }
}
