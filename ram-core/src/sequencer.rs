//! Sequencer: orders the active task pool for one-at-a-time presentation.
//!
//! Scoring (integer, higher first):
//! - urgency term: HIGH 30, MEDIUM 20, LOW 10
//! - energy-match term: lookup on (user energy, task energy)
//! - adaptive penalty: -25 on HIGH-energy tasks when the user did not
//!   declare HIGH energy and recently skipped more than half of the
//!   HIGH-energy tasks they were shown
//!
//! Ties are broken by creation time, oldest first. The sort is stable, so
//! identical inputs always produce the identical order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::{Action, HISTORY_CAP, Interaction};
use crate::item::{EnergyLevel, Item, Urgency};

/// Number of most recent interactions the behavioral signal looks at.
pub const ANALYSIS_WINDOW: usize = 50;
/// Points removed from HIGH-energy tasks when the penalty is active.
pub const ADAPTIVE_PENALTY: i32 = 25;
/// Skip rate strictly above which the penalty activates.
pub const SKIP_RATE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyWeights {
    pub low: i32,
    pub medium: i32,
    pub high: i32,
}

impl Default for UrgencyWeights {
    fn default() -> Self {
        Self {
            low: 10,
            medium: 20,
            high: 30,
        }
    }
}

impl UrgencyWeights {
    pub fn weight(&self, urgency: Urgency) -> i32 {
        match urgency {
            Urgency::Low => self.low,
            Urgency::Medium => self.medium,
            Urgency::High => self.high,
        }
    }
}

/// One row of the energy-match table: points per task energy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyRow {
    pub low: i32,
    pub medium: i32,
    pub high: i32,
}

impl EnergyRow {
    pub const fn new(low: i32, medium: i32, high: i32) -> Self {
        Self { low, medium, high }
    }

    fn get(&self, task: EnergyLevel) -> i32 {
        match task {
            EnergyLevel::Low => self.low,
            EnergyLevel::Medium => self.medium,
            EnergyLevel::High => self.high,
        }
    }
}

/// Energy-match table keyed by the user's declared energy.
///
/// Mismatch in the expensive direction (tired user, demanding task) is
/// penalized harder than the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyMatch {
    pub low: EnergyRow,
    pub medium: EnergyRow,
    pub high: EnergyRow,
}

impl Default for EnergyMatch {
    fn default() -> Self {
        Self {
            low: EnergyRow::new(50, 10, -50),
            medium: EnergyRow::new(20, 30, 0),
            high: EnergyRow::new(0, 20, 40),
        }
    }
}

impl EnergyMatch {
    pub fn score(&self, task: EnergyLevel, user: EnergyLevel) -> i32 {
        let row = match user {
            EnergyLevel::Low => &self.low,
            EnergyLevel::Medium => &self.medium,
            EnergyLevel::High => &self.high,
        };
        row.get(task)
    }
}

/// Tunable constants of the ranking heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub urgency: UrgencyWeights,
    pub energy_match: EnergyMatch,
    pub adaptive_penalty: i32,
    pub skip_rate_threshold: f64,
    /// Bounds analysis, not storage.
    pub analysis_window: usize,
    /// Bounds storage, not analysis.
    pub history_cap: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            urgency: UrgencyWeights::default(),
            energy_match: EnergyMatch::default(),
            adaptive_penalty: ADAPTIVE_PENALTY,
            skip_rate_threshold: SKIP_RATE_THRESHOLD,
            analysis_window: ANALYSIS_WINDOW,
            history_cap: HISTORY_CAP,
        }
    }
}

/// Per-task score split into its three terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub urgency: i32,
    pub energy_match: i32,
    /// Zero or negative.
    pub penalty: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.urgency + self.energy_match + self.penalty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTask {
    pub task: Item,
    pub score: ScoreBreakdown,
}

/// Share of skips among HIGH-energy interactions in the `window` most
/// recent entries (by timestamp). Zero when there are none.
pub fn high_energy_skip_rate(history: &[Interaction], window: usize) -> f64 {
    let mut recent: Vec<&Interaction> = history.iter().collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(window);

    let (high, skipped) = recent
        .iter()
        .filter(|i| i.task_energy == EnergyLevel::High)
        .fold((0usize, 0usize), |(n, s), i| {
            (n + 1, s + usize::from(i.action == Action::Skipped))
        });

    if high == 0 {
        return 0.0;
    }
    skipped as f64 / high as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sequencer {
    config: SequencerConfig,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn penalty_active(&self, user_energy: EnergyLevel, skip_rate: f64) -> bool {
        user_energy != EnergyLevel::High && skip_rate > self.config.skip_rate_threshold
    }

    pub fn score(&self, task: &Item, user_energy: EnergyLevel, skip_rate: f64) -> ScoreBreakdown {
        let penalty = if task.energy == EnergyLevel::High && self.penalty_active(user_energy, skip_rate) {
            -self.config.adaptive_penalty
        } else {
            0
        };

        ScoreBreakdown {
            urgency: self.config.urgency.weight(task.urgency),
            energy_match: self.config.energy_match.score(task.energy, user_energy),
            penalty,
        }
    }

    /// Rank tasks and keep the per-task score alongside.
    pub fn rank_scored(
        &self,
        tasks: Vec<Item>,
        user_energy: EnergyLevel,
        history: &[Interaction],
    ) -> Vec<ScoredTask> {
        let skip_rate = high_energy_skip_rate(history, self.config.analysis_window);

        let mut scored: Vec<ScoredTask> = tasks
            .into_iter()
            .map(|task| {
                let score = self.score(&task, user_energy, skip_rate);
                ScoredTask { task, score }
            })
            .collect();

        scored.sort_by(|a, b| {
            // score desc
            b.score
                .total()
                .cmp(&a.score.total())
                // then oldest first
                .then_with(|| a.task.created_at.cmp(&b.task.created_at))
        });

        debug!(
            tasks = scored.len(),
            user_energy = user_energy.as_str(),
            skip_rate,
            penalty_active = self.penalty_active(user_energy, skip_rate),
            "ranked task pool"
        );

        scored
    }

    /// Total order over `tasks` for the declared energy and history.
    pub fn rank(&self, tasks: Vec<Item>, user_energy: EnergyLevel, history: &[Interaction]) -> Vec<Item> {
        self.rank_scored(tasks, user_energy, history)
            .into_iter()
            .map(|s| s.task)
            .collect()
    }
}

/// Rank with the default constants.
pub fn rank(tasks: Vec<Item>, user_energy: EnergyLevel, history: &[Interaction]) -> Vec<Item> {
    Sequencer::default().rank(tasks, user_energy, history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn task(id: &str, energy: EnergyLevel, urgency: Urgency, created_secs: i64) -> Item {
        Item::new(id, id, t0() + Duration::seconds(created_secs))
            .with_energy(energy)
            .with_urgency(urgency)
    }

    fn interactions(energy: EnergyLevel, skipped: usize, completed: usize, start: DateTime<Utc>) -> Vec<Interaction> {
        let t = Item::new("h", "h", start).with_energy(energy);
        let mut out = Vec::new();
        for i in 0..(skipped + completed) {
            let action = if i < skipped { Action::Skipped } else { Action::Completed };
            out.push(Interaction::new(&t, action, start + Duration::seconds(i as i64)));
        }
        out
    }

    fn ids(tasks: &[Item]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn end_to_end_scenario_from_scores() {
        let a = task("A", EnergyLevel::High, Urgency::High, 1);
        let b = task("B", EnergyLevel::Low, Urgency::Low, 2);

        let seq = Sequencer::default();
        let scored = seq.rank_scored(vec![a, b], EnergyLevel::Low, &[]);
        assert_eq!(scored[0].task.id, "B");
        assert_eq!(scored[0].score.total(), 60);
        assert_eq!(scored[1].task.id, "A");
        assert_eq!(scored[1].score.total(), -20);
    }

    #[test]
    fn tired_user_prefers_low_energy_over_high_at_equal_urgency() {
        for urgency in [Urgency::Low, Urgency::Medium, Urgency::High] {
            let ranked = rank(
                vec![
                    task("hard", EnergyLevel::High, urgency, 0),
                    task("easy", EnergyLevel::Low, urgency, 1),
                ],
                EnergyLevel::Low,
                &[],
            );
            assert_eq!(ids(&ranked), vec!["easy", "hard"]);
        }
    }

    #[test]
    fn energetic_user_eats_the_frog() {
        let ranked = rank(
            vec![
                task("easy", EnergyLevel::Low, Urgency::Medium, 0),
                task("mid", EnergyLevel::Medium, Urgency::Medium, 1),
                task("hard", EnergyLevel::High, Urgency::Medium, 2),
            ],
            EnergyLevel::High,
            &[],
        );
        assert_eq!(ids(&ranked), vec!["hard", "mid", "easy"]);
    }

    #[test]
    fn ties_go_to_oldest() {
        let ranked = rank(
            vec![
                task("newer", EnergyLevel::Medium, Urgency::Medium, 20),
                task("older", EnergyLevel::Medium, Urgency::Medium, 10),
            ],
            EnergyLevel::Medium,
            &[],
        );
        assert_eq!(ids(&ranked), vec!["older", "newer"]);
    }

    #[test]
    fn empty_pool_ranks_to_empty() {
        assert!(rank(vec![], EnergyLevel::Medium, &[]).is_empty());
    }

    #[test]
    fn skip_rate_zero_without_high_energy_history() {
        let h = interactions(EnergyLevel::Low, 10, 0, t0());
        assert_eq!(high_energy_skip_rate(&h, ANALYSIS_WINDOW), 0.0);
        assert_eq!(high_energy_skip_rate(&[], ANALYSIS_WINDOW), 0.0);
    }

    #[test]
    fn penalty_applies_exactly_once_above_threshold() {
        let seq = Sequencer::default();
        let hard = task("hard", EnergyLevel::High, Urgency::High, 0);
        let h = interactions(EnergyLevel::High, 26, 24, t0());
        let rate = high_energy_skip_rate(&h, ANALYSIS_WINDOW);
        assert!(rate > 0.5);

        for energy in [EnergyLevel::Low, EnergyLevel::Medium] {
            let base = seq.score(&hard, energy, 0.0).total();
            let penalized = seq.score(&hard, energy, rate).total();
            assert_eq!(base - penalized, 25);
        }
        // declared HIGH energy overrides the penalty
        assert_eq!(seq.score(&hard, EnergyLevel::High, rate).penalty, 0);
    }

    #[test]
    fn penalty_not_applied_at_exactly_half() {
        let seq = Sequencer::default();
        let h = interactions(EnergyLevel::High, 25, 25, t0());
        let rate = high_energy_skip_rate(&h, ANALYSIS_WINDOW);
        assert_eq!(rate, 0.5);
        assert!(!seq.penalty_active(EnergyLevel::Medium, rate));
    }

    #[test]
    fn penalty_skips_non_high_tasks() {
        let seq = Sequencer::default();
        let mid = task("mid", EnergyLevel::Medium, Urgency::Low, 0);
        assert_eq!(seq.score(&mid, EnergyLevel::Medium, 1.0).penalty, 0);
    }

    #[test]
    fn window_ignores_entries_beyond_most_recent_fifty() {
        // 50 recent HIGH completions, 50 older HIGH skips.
        let old = interactions(EnergyLevel::High, 50, 0, t0());
        let recent = interactions(EnergyLevel::High, 0, 50, t0() + Duration::hours(1));
        let mut h = recent.clone();
        h.extend(old);
        assert_eq!(high_energy_skip_rate(&h, ANALYSIS_WINDOW), 0.0);

        // Same set in scrambled storage order gives the same answer.
        h.reverse();
        assert_eq!(high_energy_skip_rate(&h, ANALYSIS_WINDOW), 0.0);
    }

    #[test]
    fn penalty_can_reorder_medium_session() {
        let hard = task("hard", EnergyLevel::High, Urgency::High, 0); // 30 + 0 = 30
        let light = task("light", EnergyLevel::Low, Urgency::Low, 1); // 10 + 20 = 30

        let calm = rank(vec![hard.clone(), light.clone()], EnergyLevel::Medium, &[]);
        assert_eq!(ids(&calm), vec!["hard", "light"]); // 30 vs 30, older first

        let avoidant = interactions(EnergyLevel::High, 8, 2, t0());
        let ranked = rank(vec![hard, light], EnergyLevel::Medium, &avoidant);
        assert_eq!(ids(&ranked), vec!["light", "hard"]); // 5 vs 30
    }

    #[test]
    fn config_round_trips_with_partial_override() {
        let cfg: SequencerConfig = serde_json::from_str(r#"{"adaptive_penalty": 40}"#).unwrap();
        assert_eq!(cfg.adaptive_penalty, 40);
        assert_eq!(cfg.analysis_window, ANALYSIS_WINDOW);
        assert_eq!(cfg.energy_match.low.high, -50);
    }
}
