//! Item and history stores.
//!
//! The sequencer never touches storage; these are the collaborators its
//! caller reads from and writes back to. `JsonStore` keeps one JSON array
//! of items and one user record (which carries the history) in a directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::history::{Action, Interaction, record_interaction_at};
use crate::item::{Item, ItemType, Urgency};
use crate::session::Step;
use crate::user::UserState;

pub trait ItemStore {
    /// Open TASK items only (not completed, not discarded).
    fn list_active_tasks(&self) -> Result<Vec<Item>>;

    /// Returns false if no item has this id.
    fn mark_completed(&mut self, id: &str, at: DateTime<Utc>) -> Result<bool>;
}

pub trait HistoryStore {
    fn get(&self) -> Result<Vec<Interaction>>;
    fn set(&mut self, history: Vec<Interaction>) -> Result<()>;
}

/// Persist a session step: history first, then (for completions) the item.
///
/// The two writes are issued back to back with nothing in between, so the
/// caller observes "logged and marked done" together.
pub fn commit_step<S>(store: &mut S, step: &Step) -> Result<()>
where
    S: ItemStore + HistoryStore,
{
    persist(store, &step.interaction, step.history.clone())
}

/// Log a done/skip made outside a walk and persist it like a step.
pub fn commit_interaction<S>(
    store: &mut S,
    task: &Item,
    action: Action,
    now: DateTime<Utc>,
    cap: usize,
) -> Result<Interaction>
where
    S: ItemStore + HistoryStore,
{
    let history = record_interaction_at(&store.get()?, task, action, now, cap);
    let interaction = Interaction::new(task, action, now);
    persist(store, &interaction, history)?;
    Ok(interaction)
}

fn persist<S>(store: &mut S, interaction: &Interaction, history: Vec<Interaction>) -> Result<()>
where
    S: ItemStore + HistoryStore,
{
    store.set(history).context("write interaction history")?;

    if interaction.action == Action::Completed {
        let id = interaction.task_id.as_str();
        let found = store
            .mark_completed(id, interaction.timestamp)
            .with_context(|| format!("mark {id} completed"))?;
        if !found {
            warn!(task_id = id, "completed task not found in item store");
        }
    }
    Ok(())
}

/// In-memory store, used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub items: Vec<Item>,
    pub history: Vec<Interaction>,
}

impl MemoryStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            history: Vec::new(),
        }
    }
}

impl ItemStore for MemoryStore {
    fn list_active_tasks(&self) -> Result<Vec<Item>> {
        Ok(crate::item::active_tasks(&self.items))
    }

    fn mark_completed(&mut self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        Ok(mark_in(&mut self.items, id, at))
    }
}

impl HistoryStore for MemoryStore {
    fn get(&self) -> Result<Vec<Interaction>> {
        Ok(self.history.clone())
    }

    fn set(&mut self, history: Vec<Interaction>) -> Result<()> {
        self.history = history;
        Ok(())
    }
}

fn mark_in(items: &mut [Item], id: &str, at: DateTime<Utc>) -> bool {
    match items.iter_mut().find(|i| i.id == id) {
        Some(item) => {
            item.completed_at = Some(at);
            true
        }
        None => false,
    }
}

/// File-backed store rooted at a directory (`items.json`, `user.json`).
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub const ITEMS_FILE: &'static str = "items.json";
    pub const USER_FILE: &'static str = "user.json";

    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn items_path(&self) -> PathBuf {
        self.dir.join(Self::ITEMS_FILE)
    }

    fn user_path(&self) -> PathBuf {
        self.dir.join(Self::USER_FILE)
    }

    /// All items, newest first as stored. Corrupt data loads as empty.
    pub fn items(&self) -> Result<Vec<Item>> {
        Ok(read_json(&self.items_path())?.unwrap_or_default())
    }

    pub fn save_items(&self, items: &[Item]) -> Result<()> {
        write_json(&self.items_path(), &items)
    }

    pub fn find(&self, id: &str) -> Result<Option<Item>> {
        Ok(self.items()?.into_iter().find(|i| i.id == id))
    }

    /// Insert at the front of the list.
    pub fn add_item(&self, item: Item) -> Result<()> {
        let mut items = self.items()?;
        debug!(id = %item.id, item_type = ?item.item_type, "adding item");
        items.insert(0, item);
        self.save_items(&items)
    }

    pub fn delete_item(&self, id: &str) -> Result<bool> {
        let mut items = self.items()?;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Ok(false);
        }
        self.save_items(&items)?;
        Ok(true)
    }

    /// Turn an idea into a HIGH-urgency task.
    pub fn promote_idea(&self, id: &str) -> Result<bool> {
        let mut items = self.items()?;
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };
        item.item_type = ItemType::Task;
        item.urgency = Urgency::High;
        self.save_items(&items)?;
        Ok(true)
    }

    pub fn load_user(&self) -> Result<Option<UserState>> {
        read_json(&self.user_path())
    }

    pub fn save_user(&self, user: &UserState) -> Result<()> {
        write_json(&self.user_path(), user)
    }

    /// Hard reset: forget every item and the user record.
    pub fn clear(&self) -> Result<()> {
        for p in [self.items_path(), self.user_path()] {
            if p.exists() {
                fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
            }
        }
        Ok(())
    }
}

impl ItemStore for JsonStore {
    fn list_active_tasks(&self) -> Result<Vec<Item>> {
        Ok(crate::item::active_tasks(&self.items()?))
    }

    fn mark_completed(&mut self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut items = self.items()?;
        if !mark_in(&mut items, id, at) {
            return Ok(false);
        }
        self.save_items(&items)?;
        Ok(true)
    }
}

impl HistoryStore for JsonStore {
    fn get(&self) -> Result<Vec<Interaction>> {
        Ok(self.load_user()?.map(|u| u.history).unwrap_or_default())
    }

    fn set(&mut self, history: Vec<Interaction>) -> Result<()> {
        let mut user = self.load_user()?.unwrap_or_else(UserState::anonymous);
        user.history = history;
        self.save_user(&user)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    match serde_json::from_str(&s) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable store file, treating as empty");
            Ok(None)
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize store data")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Action;
    use crate::item::EnergyLevel;
    use crate::session::TunnelSession;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 3, 8, 0, 0).unwrap()
    }

    #[test]
    fn memory_store_commit_logs_and_marks_done() {
        let mut store = MemoryStore::new(vec![Item::new("a", "a", now())]);
        let mut session = TunnelSession::default();
        session
            .declare_energy(EnergyLevel::Medium, store.list_active_tasks().unwrap(), &[])
            .unwrap();

        let step = session.complete(&store.get().unwrap(), now()).unwrap();
        commit_step(&mut store, &step).unwrap();

        assert_eq!(store.history.len(), 1);
        assert_eq!(store.history[0].action, Action::Completed);
        assert_eq!(store.items[0].completed_at, Some(now()));
        assert!(store.list_active_tasks().unwrap().is_empty());
    }

    #[test]
    fn skip_commit_leaves_item_open() {
        let mut store = MemoryStore::new(vec![Item::new("a", "a", now())]);
        let mut session = TunnelSession::default();
        session
            .declare_energy(EnergyLevel::Low, store.list_active_tasks().unwrap(), &[])
            .unwrap();
        let step = session.skip(&[], now()).unwrap();
        commit_step(&mut store, &step).unwrap();
        assert_eq!(store.history.len(), 1);
        assert!(store.items[0].is_active_task());
    }

    #[test]
    fn interaction_outside_a_walk_uses_the_same_write_path() {
        let mut store = MemoryStore::new(vec![Item::new("a", "a", now()), Item::new("b", "b", now())]);
        let a = store.items[0].clone();
        let b = store.items[1].clone();

        let skipped = commit_interaction(&mut store, &b, Action::Skipped, now(), 100).unwrap();
        assert_eq!(skipped.action, Action::Skipped);
        assert!(store.items[1].is_active_task());

        commit_interaction(&mut store, &a, Action::Completed, now(), 100).unwrap();
        assert_eq!(store.history.len(), 2);
        assert_eq!(store.history[0].task_id, "a");
        assert_eq!(store.items[0].completed_at, Some(now()));

        // Unknown ids are still logged; the missing item only warns.
        let ghost = Item::new("ghost", "ghost", now());
        commit_interaction(&mut store, &ghost, Action::Completed, now(), 2).unwrap();
        assert_eq!(store.history.len(), 2);
        assert_eq!(store.history[0].task_id, "ghost");
    }

    #[test]
    fn json_store_crud() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert!(store.items().unwrap().is_empty());

        store.add_item(Item::new("old", "old", now())).unwrap();
        store
            .add_item(Item::new("idea", "idea", now()).with_type(ItemType::Idea).with_urgency(Urgency::Low))
            .unwrap();
        assert_eq!(store.items().unwrap()[0].id, "idea");

        assert!(store.promote_idea("idea").unwrap());
        let promoted = store.find("idea").unwrap().unwrap();
        assert_eq!(promoted.item_type, ItemType::Task);
        assert_eq!(promoted.urgency, Urgency::High);

        assert!(store.delete_item("old").unwrap());
        assert!(!store.delete_item("old").unwrap());
        assert_eq!(store.items().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_items_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(JsonStore::ITEMS_FILE), "{not json").unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert!(store.items().unwrap().is_empty());
    }

    #[test]
    fn history_set_without_user_creates_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(dir.path()).unwrap();
        let task = Item::new("a", "a", now());
        let h = crate::history::record_interaction_at(&[], &task, Action::Skipped, now(), 100);
        store.set(h).unwrap();

        let user = store.load_user().unwrap().unwrap();
        assert!(!user.has_onboarded);
        assert_eq!(store.get().unwrap().len(), 1);

        store.clear().unwrap();
        assert!(store.load_user().unwrap().is_none());
    }
}
