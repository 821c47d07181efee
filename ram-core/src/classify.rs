//! Classifier contract: raw brain dumps in, structured records out.
//!
//! The model itself is opaque behind `LanguageModel`. This module owns the
//! prompts, parses the JSON answers and substitutes a deterministic fallback
//! whenever the model fails or answers garbage. Nothing here returns an error.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::item::{EnergyLevel, Item, ItemType, Urgency};
use crate::user::{Language, Persona};

/// Max thought/idea candidates sent for loop analysis.
pub const LOOP_CANDIDATE_LIMIT: usize = 30;
pub const MIN_LOOP_CANDIDATES: usize = 3;
pub const MIN_IDEAS_TO_CLUSTER: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// Ask the backend for a JSON object response.
    pub json: bool,
}

/// A text-generation backend (remote API, local model, test double).
pub trait LanguageModel {
    fn generate(&self, request: &ModelRequest) -> Result<String>;
}

/// Structured view of one brain dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub processed_text: String,
    pub item_type: ItemType,
    pub energy: EnergyLevel,
    pub urgency: Urgency,
    pub tags: Vec<String>,
    pub temporal_cue: Option<String>,
    pub estimated_date: Option<NaiveDate>,
}

impl Classification {
    /// Used when the model is unreachable: keep the text, file it as a thought.
    pub fn fallback(text: &str) -> Self {
        Self {
            processed_text: text.to_string(),
            item_type: ItemType::Thought,
            energy: EnergyLevel::Medium,
            urgency: Urgency::Low,
            tags: vec!["uncategorized".to_string()],
            temporal_cue: None,
            estimated_date: None,
        }
    }

    /// Build the stored item. NOISE is discarded on arrival.
    pub fn into_item(self, id: impl Into<String>, original_text: &str, created_at: DateTime<Utc>) -> Item {
        Item {
            id: id.into(),
            original_text: original_text.to_string(),
            processed_text: self.processed_text,
            is_discarded: self.item_type == ItemType::Noise,
            item_type: self.item_type,
            energy: self.energy,
            urgency: self.urgency,
            created_at,
            completed_at: None,
            tags: self.tags,
            temporal_cue: self.temporal_cue,
            estimated_date: self.estimated_date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    processed_text: String,
    #[serde(rename = "type")]
    item_type: ItemType,
    energy: EnergyLevel,
    urgency: Urgency,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    temporal_cue: Option<String>,
    #[serde(default)]
    estimated_date: Option<String>,
}

impl From<RawClassification> for Classification {
    fn from(raw: RawClassification) -> Self {
        let temporal_cue = raw
            .temporal_cue
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s != "null");
        let estimated_date = raw
            .estimated_date
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());

        Self {
            processed_text: raw.processed_text,
            item_type: raw.item_type,
            energy: raw.energy,
            urgency: raw.urgency,
            tags: raw.tags,
            temporal_cue,
            estimated_date,
        }
    }
}

/// A recurring theme across several thoughts/ideas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentalLoop {
    pub id: String,
    pub theme: String,
    pub item_ids: Vec<String>,
    pub insight: String,
    pub frequency: usize,
    /// Human readable, e.g. "over 3 days".
    pub time_span: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaCluster {
    pub id: String,
    pub name: String,
    pub description: String,
    pub item_ids: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLoop {
    found: bool,
    #[serde(default)]
    theme: String,
    #[serde(default)]
    item_ids: Vec<String>,
    #[serde(default)]
    insight: String,
    #[serde(default)]
    time_span: String,
}

#[derive(Debug, Deserialize)]
struct RawClusters {
    clusters: Vec<RawCluster>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCluster {
    name: String,
    description: String,
    item_ids: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"));

/// Pull the JSON payload out of a model answer, tolerating markdown fences.
pub fn extract_json(text: &str) -> &str {
    match FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => text.trim(),
    }
}

/// Item ids go out as `ID_<id>` so the model does not mangle them.
pub fn strip_id_prefix(id: &str) -> String {
    id.trim().strip_prefix("ID_").unwrap_or(id.trim()).to_string()
}

/// Open thoughts and ideas that loop analysis looks at.
pub fn loop_candidates(items: &[Item]) -> Vec<&Item> {
    items
        .iter()
        .filter(|i| matches!(i.item_type, ItemType::Thought | ItemType::Idea) && i.is_open())
        .collect()
}

fn parse_answer<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(extract_json(text)).context("parse model JSON")
}

fn brain_dump_system(lang: Language) -> String {
    format!(
        r#"You are an empathetic, efficient executive function assistant for an ADHD brain.
Your job is to categorize raw "brain dumps" into structured data.
Be extremely non-judgmental.
{lang}

Categories:
- TASK: Something actionable that needs to be done.
- IDEA: A creative spark, project concept, or invention.
- THOUGHT: An emotion, a worry, a memory, or a reflection.
- NOISE: Gibberish, accidental typing, or something clearly not needing saving.

Assign Energy Level based on cognitive load:
- LOW: Quick, mindless (e.g., "water plants", "text mom").
- MEDIUM: Standard effort (e.g., "write email", "buy groceries").
- HIGH: Deep focus or emotional weight (e.g., "do taxes", "plan vacation").

Temporal Detection:
- Detect any temporal cues (e.g., "tomorrow", "next Friday", "in 2 days") in the input language.
- Calculate the estimated ISO Date (YYYY-MM-DD) based on the "Current Reference Date" provided in the prompt.
- If no time is mentioned, leave temporal fields null.

Answer with a single JSON object:
{{"processedText": string, "type": "TASK"|"IDEA"|"THOUGHT"|"NOISE", "energy": "LOW"|"MEDIUM"|"HIGH",
 "urgency": "LOW"|"MEDIUM"|"HIGH", "tags": [string], "temporalCue": string|null, "estimatedDate": "YYYY-MM-DD"|null}}"#,
        lang = lang.instruction()
    )
}

pub struct Classifier<M> {
    model: M,
}

impl<M: LanguageModel> Classifier<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn process_brain_dump(&self, text: &str, lang: Language, now: DateTime<Utc>) -> Classification {
        let request = ModelRequest {
            system: Some(brain_dump_system(lang)),
            prompt: format!(
                "Input: \"{text}\"\nCurrent Reference Date: {} (ISO: {})",
                now.format("%a %b %d %Y"),
                now.to_rfc3339()
            ),
            json: true,
        };

        match self
            .model
            .generate(&request)
            .and_then(|answer| parse_answer::<RawClassification>(&answer))
        {
            Ok(raw) => {
                let c = Classification::from(raw);
                debug!(item_type = ?c.item_type, energy = ?c.energy, "brain dump classified");
                c
            }
            Err(e) => {
                warn!(error = %e, "classification failed, filing as thought");
                Classification::fallback(text)
            }
        }
    }

    pub fn generate_persona(&self, answers: &[String], lang: Language) -> Persona {
        let request = ModelRequest {
            system: None,
            prompt: format!(
                r#"Based on these quiz answers about an ADHD brain, generate a fun, validating "Persona Archetype".
Answers: {}

{}
Examples: "The Hyperfocus Astronaut", "The Dopamine Hunter", "The Chaos Wizard", "The Idea Factory".
Keep descriptions short, funny, and empowering.
Answer with a JSON object: {{"type": string, "description": string, "powerTrait": string, "kryptonite": string}}"#,
                answers.join(", "),
                lang.instruction()
            ),
            json: true,
        };

        match self.model.generate(&request).and_then(|a| parse_answer::<Persona>(&a)) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "persona generation failed");
                Persona::fallback()
            }
        }
    }

    /// Short validating observation over recent thoughts.
    pub fn mental_replay_insight(&self, thoughts: &[String], lang: Language) -> String {
        if thoughts.is_empty() {
            return "No thoughts recorded yet.".to_string();
        }

        let request = ModelRequest {
            system: None,
            prompt: format!(
                "Here are the user's recent \"Thoughts\" and \"Ideas\".\nIdentify a pattern or a recurring theme.\nWrite a short, validating insight (max 2 sentences).\n{}\n\nThoughts:\n{}",
                lang.instruction(),
                thoughts.join("\n")
            ),
            json: false,
        };

        match self.model.generate(&request) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => "You have a lot of brilliant ideas brewing.".to_string(),
            Err(e) => {
                warn!(error = %e, "replay insight failed");
                "Your brain is processing a lot right now.".to_string()
            }
        }
    }

    /// Look for one significant recurring theme among open thoughts and ideas.
    pub fn analyze_mental_loops(&self, items: &[Item], lang: Language) -> Option<MentalLoop> {
        let candidates = loop_candidates(items);
        if candidates.len() < MIN_LOOP_CANDIDATES {
            return None;
        }

        let data = candidates
            .iter()
            .take(LOOP_CANDIDATE_LIMIT)
            .map(|c| format!("ID_{}: {}", c.id, c.processed_text))
            .collect::<Vec<_>>()
            .join("\n");

        let request = ModelRequest {
            system: None,
            prompt: format!(
                r#"Analyze these brain dump items for recurring semantic themes or thought loops.
Ignore trivial overlaps. Find the single most significant repeating thought pattern.

If a loop is found (at least 3 related items), answer
{{"found": true, "theme": string, "itemIds": [string], "insight": string, "timeSpan": string}}.
If no significant loop is found, answer {{"found": false}}.

{}

Data:
{data}"#,
                lang.instruction()
            ),
            json: true,
        };

        let raw = match self.model.generate(&request).and_then(|a| parse_answer::<RawLoop>(&a)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "loop analysis failed");
                return None;
            }
        };

        if !raw.found || raw.item_ids.len() < 2 {
            return None;
        }

        let item_ids: Vec<String> = raw.item_ids.iter().map(|id| strip_id_prefix(id)).collect();
        Some(MentalLoop {
            id: uuid::Uuid::new_v4().to_string(),
            theme: raw.theme,
            frequency: item_ids.len(),
            item_ids,
            insight: raw.insight,
            time_span: raw.time_span,
        })
    }

    /// Group ideas into named clusters; unclustered ideas are left out.
    pub fn cluster_ideas(&self, ideas: &[Item], lang: Language) -> Vec<IdeaCluster> {
        if ideas.len() < MIN_IDEAS_TO_CLUSTER {
            return Vec::new();
        }

        let data = ideas
            .iter()
            .map(|i| format!("ID_{}: {} [Tags: {}]", i.id, i.processed_text, i.tags.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");

        let request = ModelRequest {
            system: None,
            prompt: format!(
                r#"You are an Idea Gardener.
Group these ideas into semantic "Clusters" or "Groves".
Look for common themes, projects, or topics.
Each cluster must have at least 2 ideas.

Ideas that don't fit well can be ignored (they will be treated as wildflowers).
Answer with {{"clusters": [{{"name": string, "description": string, "itemIds": [string], "tags": [string]}}]}}.

{}

Data:
{data}"#,
                lang.instruction()
            ),
            json: true,
        };

        match self.model.generate(&request).and_then(|a| parse_answer::<RawClusters>(&a)) {
            Ok(raw) => raw
                .clusters
                .into_iter()
                .map(|c| IdeaCluster {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: c.name,
                    description: c.description,
                    item_ids: c.item_ids.iter().map(|id| strip_id_prefix(id)).collect(),
                    tags: c.tags,
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "idea clustering failed");
                Vec::new()
            }
        }
    }
}
