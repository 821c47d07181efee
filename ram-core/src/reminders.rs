//! Reminder policy and cooldown gates.
//!
//! Decides *whether* something should happen now; delivery and the storage
//! of the "last time" stamps belong to the caller.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const REMINDERS: [&str; 7] = [
    "Brain getting full? Dump it into RAM.",
    "You're doing great. Need to offload a thought?",
    "Quick check-in: How's your energy level?",
    "Don't hold it all in. Externalize it.",
    "Did you forget something? That's okay. Write it down.",
    "Closing tabs in your brain is allowed.",
    "Alert: Cognitive load high. Suggesting dump.",
];

pub const NUDGE_TITLE: &str = "External Brain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderPolicy {
    pub enabled: bool,
    pub nudge_interval_hours: i64,
    /// Minimum gap between two mental-loop analyses.
    pub loop_check_minutes: i64,
    /// How long clustered ideas are reused before asking the model again.
    pub cluster_cache_minutes: i64,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            nudge_interval_hours: 6,
            loop_check_minutes: 10,
            cluster_cache_minutes: 60,
        }
    }
}

impl ReminderPolicy {
    pub fn nudge_gate(&self) -> Cooldown {
        Cooldown::new(Duration::hours(self.nudge_interval_hours))
    }

    pub fn loop_check_gate(&self) -> Cooldown {
        Cooldown::new(Duration::minutes(self.loop_check_minutes))
    }

    pub fn cluster_cache_gate(&self) -> Cooldown {
        Cooldown::new(Duration::minutes(self.cluster_cache_minutes))
    }
}

/// "At most once per interval" gate over a last-run timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    interval: Duration,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn is_ready(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        self.remaining(last, now).is_none()
    }

    /// Time left before the gate opens; `None` when it is open.
    pub fn remaining(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Duration> {
        let last = last?;
        let elapsed = now - last;
        if elapsed >= self.interval {
            None
        } else {
            Some(self.interval - elapsed)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nudge {
    pub title: &'static str,
    pub body: &'static str,
}

/// A gentle reminder, if one is due.
pub fn due_nudge<R: Rng + ?Sized>(
    policy: &ReminderPolicy,
    last_notified: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<Nudge> {
    if !policy.enabled || !policy.nudge_gate().is_ready(last_notified, now) {
        return None;
    }
    let body = REMINDERS.choose(rng).copied().unwrap_or(REMINDERS[0]);
    Some(Nudge {
        title: NUDGE_TITLE,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 6, 18, 0, 0).unwrap()
    }

    #[test]
    fn cooldown_opens_after_interval() {
        let gate = Cooldown::new(Duration::minutes(10));
        assert!(gate.is_ready(None, now()));
        assert!(!gate.is_ready(Some(now() - Duration::minutes(9)), now()));
        assert_eq!(
            gate.remaining(Some(now() - Duration::minutes(4)), now()),
            Some(Duration::minutes(6))
        );
        assert!(gate.is_ready(Some(now() - Duration::minutes(10)), now()));
    }

    #[test]
    fn nudge_respects_interval_and_switch() {
        let mut rng = StdRng::seed_from_u64(7);
        let policy = ReminderPolicy::default();

        let n = due_nudge(&policy, None, now(), &mut rng).unwrap();
        assert_eq!(n.title, NUDGE_TITLE);
        assert!(REMINDERS.contains(&n.body));

        assert!(due_nudge(&policy, Some(now() - Duration::hours(2)), now(), &mut rng).is_none());
        assert!(due_nudge(&policy, Some(now() - Duration::hours(7)), now(), &mut rng).is_some());

        let off = ReminderPolicy {
            enabled: false,
            ..ReminderPolicy::default()
        };
        assert!(due_nudge(&off, None, now(), &mut rng).is_none());
    }
}
