//! Interaction log: append-only record of completions and skips.
//!
//! Canonical storage order is most-recent-first. The log is capped so the
//! user record never grows without bound; analysis only ever looks at a
//! smaller recent window (see `crate::sequencer`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::{EnergyLevel, Item};

/// Maximum number of interactions retained by `record_interaction`.
pub const HISTORY_CAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Completed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub task_id: String,
    pub action: Action,
    /// Energy level of the task at the time of the action.
    pub task_energy: EnergyLevel,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn new(task: &Item, action: Action, timestamp: DateTime<Utc>) -> Self {
        Self {
            task_id: task.id.clone(),
            action,
            task_energy: task.energy,
            timestamp,
        }
    }
}

/// Record an interaction stamped with the current time.
pub fn record_interaction(history: &[Interaction], task: &Item, action: Action) -> Vec<Interaction> {
    record_interaction_at(history, task, action, Utc::now(), HISTORY_CAP)
}

/// Prepend an interaction and truncate to `cap` entries.
///
/// No referential check against the item store: an unknown task id is
/// recorded as-is.
pub fn record_interaction_at(
    history: &[Interaction],
    task: &Item,
    action: Action,
    now: DateTime<Utc>,
    cap: usize,
) -> Vec<Interaction> {
    let mut out = Vec::with_capacity((history.len() + 1).min(cap));
    out.push(Interaction::new(task, action, now));
    out.extend(history.iter().cloned());
    out.truncate(cap);
    out
}
