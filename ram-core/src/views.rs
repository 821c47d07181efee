//! Read-only projections over the item list: dashboard and idea garden.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::classify::IdeaCluster;
use crate::item::{Item, ItemType};

/// Items shown in the "recent" list unless the user asks for everything.
pub const RECENT_PREVIEW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub active_tasks: Vec<Item>,
    /// Thoughts and ideas, discarded excluded.
    pub thoughts: Vec<Item>,
    /// Newest first.
    pub recent: Vec<Item>,
    pub hidden_recent: usize,
}

impl Dashboard {
    pub fn build(items: &[Item], show_all: bool) -> Self {
        let kept = || items.iter().filter(|i| !i.is_discarded);

        let mut recent: Vec<Item> = kept().cloned().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = recent.len();
        if !show_all {
            recent.truncate(RECENT_PREVIEW);
        }

        Self {
            active_tasks: crate::item::active_tasks(items),
            thoughts: kept()
                .filter(|i| matches!(i.item_type, ItemType::Thought | ItemType::Idea))
                .cloned()
                .collect(),
            hidden_recent: total - recent.len(),
            recent,
        }
    }
}

/// Ideas split by age and cluster membership.
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaGarden {
    /// Created within the last 24 hours, newest first.
    pub sprouts: Vec<Item>,
    pub clusters: Vec<IdeaCluster>,
    /// Older ideas that belong to no cluster.
    pub wildflowers: Vec<Item>,
}

/// Open ideas (not discarded, not completed).
pub fn open_ideas(items: &[Item]) -> Vec<Item> {
    items
        .iter()
        .filter(|i| i.item_type == ItemType::Idea && i.is_open())
        .cloned()
        .collect()
}

impl IdeaGarden {
    pub fn build(items: &[Item], clusters: Vec<IdeaCluster>, now: DateTime<Utc>) -> Self {
        let ideas = open_ideas(items);
        let cutoff = now - Duration::hours(24);

        let mut sprouts: Vec<Item> = ideas.iter().filter(|i| i.created_at > cutoff).cloned().collect();
        sprouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let clustered: HashSet<&str> = clusters
            .iter()
            .flat_map(|c| c.item_ids.iter().map(String::as_str))
            .collect();
        let wildflowers = ideas
            .iter()
            .filter(|i| !clustered.contains(i.id.as_str()) && i.created_at <= cutoff)
            .cloned()
            .collect();

        Self {
            sprouts,
            clusters,
            wildflowers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap()
    }

    fn item(id: &str, t: ItemType, hours_ago: i64) -> Item {
        Item::new(id, id, now() - Duration::hours(hours_ago)).with_type(t)
    }

    #[test]
    fn dashboard_partitions_and_limits_recent() {
        let mut noise = item("n", ItemType::Noise, 0);
        noise.is_discarded = true;
        let items = vec![
            item("t1", ItemType::Task, 1),
            item("t2", ItemType::Task, 2),
            item("i1", ItemType::Idea, 3),
            item("th", ItemType::Thought, 4),
            item("t3", ItemType::Task, 5),
            item("t4", ItemType::Task, 6),
            noise,
        ];

        let d = Dashboard::build(&items, false);
        assert_eq!(d.active_tasks.len(), 4);
        assert_eq!(d.thoughts.len(), 2);
        assert_eq!(d.recent.len(), 5);
        assert_eq!(d.recent[0].id, "t1");
        assert_eq!(d.hidden_recent, 1);

        let all = Dashboard::build(&items, true);
        assert_eq!(all.recent.len(), 6);
        assert_eq!(all.hidden_recent, 0);
    }

    #[test]
    fn garden_splits_sprouts_and_wildflowers() {
        let items = vec![
            item("fresh", ItemType::Idea, 2),
            item("fresher", ItemType::Idea, 1),
            item("old-clustered", ItemType::Idea, 48),
            item("old-loose", ItemType::Idea, 72),
            item("task", ItemType::Task, 100),
        ];
        let clusters = vec![IdeaCluster {
            id: "c".into(),
            name: "Grove".into(),
            description: "d".into(),
            item_ids: vec!["old-clustered".into(), "fresh".into()],
            tags: vec![],
        }];

        let g = IdeaGarden::build(&items, clusters, now());
        let sprouts: Vec<&str> = g.sprouts.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(sprouts, vec!["fresher", "fresh"]);
        assert_eq!(g.wildflowers.len(), 1);
        assert_eq!(g.wildflowers[0].id, "old-loose");
    }
}
