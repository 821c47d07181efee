//! Tunnel session: the one-task-at-a-time walk over a ranked queue.
//!
//! ```text
//! AwaitingEnergy --declare--> Presenting(0) --complete (pool empty)--> Exhausted
//!                                  |  ^                                    |
//!                                  +--+ skip / complete                    |
//! any state --exit--> Exited  <--------------------------------------------+
//! ```
//!
//! The queue is ranked once per energy declaration. Skips only move the
//! cursor and completions only remove the current entry, so the user never
//! sees the queue reshuffle mid-pass.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::history::{Action, Interaction, record_interaction_at};
use crate::item::{EnergyLevel, Item};
use crate::sequencer::Sequencer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingEnergy,
    Presenting { index: usize },
    Exhausted,
    Exited,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Exhausted | SessionState::Exited)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no task is being presented (state: {0:?})")]
    NotPresenting(SessionState),

    #[error("session has already ended (state: {0:?})")]
    Ended(SessionState),
}

/// Outcome of a skip or completion.
///
/// The caller persists `history` and, for completions, marks the task done
/// right after (see `crate::store::commit_step`).
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub interaction: Interaction,
    pub history: Vec<Interaction>,
    pub state: SessionState,
}

impl Step {
    pub fn completed_task_id(&self) -> Option<&str> {
        match self.interaction.action {
            Action::Completed => Some(&self.interaction.task_id),
            Action::Skipped => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TunnelSession {
    sequencer: Sequencer,
    energy: Option<EnergyLevel>,
    queue: Vec<Item>,
    state: SessionState,
}

impl Default for TunnelSession {
    fn default() -> Self {
        Self::new(Sequencer::default())
    }
}

impl TunnelSession {
    pub fn new(sequencer: Sequencer) -> Self {
        Self {
            sequencer,
            energy: None,
            queue: Vec::new(),
            state: SessionState::AwaitingEnergy,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn energy(&self) -> Option<EnergyLevel> {
        self.energy
    }

    /// Session-local queue in presentation order.
    pub fn queue(&self) -> &[Item] {
        &self.queue
    }

    pub fn current(&self) -> Option<&Item> {
        match self.state {
            SessionState::Presenting { index } => self.queue.get(index),
            _ => None,
        }
    }

    /// 1-based position and queue length, e.g. for "3 / 7".
    pub fn position(&self) -> Option<(usize, usize)> {
        match self.state {
            SessionState::Presenting { index } => Some((index + 1, self.queue.len())),
            _ => None,
        }
    }

    /// Declare (or re-declare) energy and rank the given active pool.
    ///
    /// An empty pool moves straight to `Exhausted`.
    pub fn declare_energy(
        &mut self,
        energy: EnergyLevel,
        tasks: Vec<Item>,
        history: &[Interaction],
    ) -> Result<SessionState, SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::Ended(self.state));
        }

        self.energy = Some(energy);
        self.queue = self.sequencer.rank(tasks, energy, history);
        self.state = if self.queue.is_empty() {
            SessionState::Exhausted
        } else {
            SessionState::Presenting { index: 0 }
        };

        info!(
            energy = energy.as_str(),
            queued = self.queue.len(),
            state = ?self.state,
            "energy declared"
        );
        Ok(self.state)
    }

    /// Log a skip and move to the next task, wrapping to the front.
    pub fn skip(&mut self, history: &[Interaction], now: DateTime<Utc>) -> Result<Step, SessionError> {
        let index = self.presenting_index()?;
        let task = &self.queue[index];
        let interaction = Interaction::new(task, Action::Skipped, now);
        let history = record_interaction_at(history, task, Action::Skipped, now, self.sequencer.config().history_cap);

        let next = if index + 1 >= self.queue.len() { 0 } else { index + 1 };
        self.state = SessionState::Presenting { index: next };

        debug!(task_id = %task.id, next, "skipped");
        Ok(Step {
            interaction,
            history,
            state: self.state,
        })
    }

    /// Log a completion and drop the task from the session queue.
    ///
    /// The cursor stays put (clamped to the shorter queue) so the next task
    /// slides into view.
    pub fn complete(&mut self, history: &[Interaction], now: DateTime<Utc>) -> Result<Step, SessionError> {
        let index = self.presenting_index()?;
        let task = self.queue.remove(index);
        let interaction = Interaction::new(&task, Action::Completed, now);
        let history = record_interaction_at(history, &task, Action::Completed, now, self.sequencer.config().history_cap);

        self.state = if self.queue.is_empty() {
            SessionState::Exhausted
        } else {
            SessionState::Presenting {
                index: index.min(self.queue.len() - 1),
            }
        };

        debug!(task_id = %task.id, remaining = self.queue.len(), state = ?self.state, "completed");
        Ok(Step {
            interaction,
            history,
            state: self.state,
        })
    }

    /// Leave the session. Always succeeds.
    pub fn exit(&mut self) -> SessionState {
        self.state = SessionState::Exited;
        self.state
    }

    fn presenting_index(&self) -> Result<usize, SessionError> {
        match self.state {
            SessionState::Presenting { index } => Ok(index),
            other if other.is_terminal() => Err(SessionError::Ended(other)),
            other => Err(SessionError::NotPresenting(other)),
        }
    }
}
