//! ram-core: adaptive task sequencing for the RAM external brain
//!
//! Items come in through the classifier, the sequencer ranks open tasks
//! against the user's declared energy and skip history, and the tunnel
//! session walks the ranked queue one task at a time.

pub mod agenda;
pub mod classify;
pub mod history;
pub mod item;
pub mod reminders;
pub mod sequencer;
pub mod session;
pub mod store;
pub mod user;
pub mod views;

pub use agenda::{Agenda, local_today, parse_timezone};
pub use classify::{Classification, Classifier, IdeaCluster, LanguageModel, MentalLoop, ModelRequest};
pub use history::{Action, HISTORY_CAP, Interaction, record_interaction, record_interaction_at};
pub use item::{EnergyLevel, Item, ItemType, Urgency, active_tasks};
pub use reminders::{Cooldown, Nudge, REMINDERS, ReminderPolicy, due_nudge};
pub use sequencer::{
    ADAPTIVE_PENALTY, ANALYSIS_WINDOW, EnergyMatch, SKIP_RATE_THRESHOLD, ScoreBreakdown, ScoredTask,
    Sequencer, SequencerConfig, UrgencyWeights, high_energy_skip_rate, rank,
};
pub use session::{SessionError, SessionState, Step, TunnelSession};
pub use store::{HistoryStore, ItemStore, JsonStore, MemoryStore, commit_interaction, commit_step};
pub use user::{Language, Persona, UserState};
pub use views::{Dashboard, IdeaGarden};
