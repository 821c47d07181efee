//! Item model: everything dumped into RAM ends up as an `Item`.
//!
//! A "task" in the sequencing sense is just an item whose type is `Task`
//! and which has neither been completed nor discarded.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Task,
    Idea,
    Thought,
    Noise,
}

/// Three-tier estimate of cognitive cost (for a task) or capacity (for a user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    pub const ALL: [EnergyLevel; 3] = [EnergyLevel::Low, EnergyLevel::Medium, EnergyLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyLevel::Low => "LOW",
            EnergyLevel::Medium => "MEDIUM",
            EnergyLevel::High => "HIGH",
        }
    }
}

impl std::str::FromStr for EnergyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(EnergyLevel::Low),
            "medium" | "med" | "m" => Ok(EnergyLevel::Medium),
            "high" | "h" => Ok(EnergyLevel::High),
            other => Err(format!("unknown energy level '{other}' (expected low|medium|high)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "LOW",
            Urgency::Medium => "MEDIUM",
            Urgency::High => "HIGH",
        }
    }
}

/// A single brain-dump record.
///
/// Field names and timestamp encoding (epoch milliseconds) follow the
/// stored JSON arrays of the web client, so both can read the same file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub original_text: String,
    pub processed_text: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub energy: EnergyLevel,
    pub urgency: Urgency,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_discarded: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Temporal phrase as written, e.g. "next friday".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_cue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_date: Option<NaiveDate>,
}

impl Item {
    pub fn new(id: impl Into<String>, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            original_text: text.clone(),
            processed_text: text,
            item_type: ItemType::Task,
            energy: EnergyLevel::Medium,
            urgency: Urgency::Medium,
            created_at,
            completed_at: None,
            is_discarded: false,
            tags: Vec::new(),
            temporal_cue: None,
            estimated_date: None,
        }
    }

    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    pub fn with_energy(mut self, energy: EnergyLevel) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_estimated_date(mut self, date: NaiveDate) -> Self {
        self.estimated_date = Some(date);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Still on the user's mind: not completed, not discarded.
    pub fn is_open(&self) -> bool {
        !self.is_completed() && !self.is_discarded
    }

    /// Member of the active sequencing pool.
    pub fn is_active_task(&self) -> bool {
        self.item_type == ItemType::Task && self.is_open()
    }
}

/// Filter a slice of items down to the active sequencing pool.
pub fn active_tasks(items: &[Item]) -> Vec<Item> {
    items.iter().filter(|i| i.is_active_task()).cloned().collect()
}
