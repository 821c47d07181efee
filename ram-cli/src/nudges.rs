use anyhow::Result;
use chrono::{DateTime, Utc};
use ram_core::{
    Classifier, IdeaCluster, IdeaGarden, Item, ItemType, LanguageModel, MentalLoop, ReminderPolicy, UserState,
    due_nudge,
    classify::{MIN_LOOP_CANDIDATES, loop_candidates},
    views::open_ideas,
};
use tracing::{debug, info};

use crate::state::{CachedClusters, SessionCache, read_cache, write_cache};

/// Fresh cached clusters, if the cache window has not expired.
pub fn cached_clusters(cache: &SessionCache, policy: &ReminderPolicy, now: DateTime<Utc>) -> Option<Vec<IdeaCluster>> {
    let c = cache.clusters.as_ref()?;
    if policy.cluster_cache_gate().is_ready(Some(c.at), now) {
        return None;
    }
    Some(c.clusters.clone())
}

/// Run loop analysis unless it already ran within the cooldown.
///
/// Too few candidates is a clear result that leaves the cooldown untouched.
pub fn check_loops<M: LanguageModel>(
    classifier: &Classifier<M>,
    items: &[Item],
    user: &UserState,
    policy: &ReminderPolicy,
    cache: &mut SessionCache,
    force: bool,
    now: DateTime<Utc>,
) -> LoopCheck {
    let candidates = loop_candidates(items).len();
    if candidates < MIN_LOOP_CANDIDATES {
        debug!(candidates, "not enough thoughts for a loop check");
        return LoopCheck::Clear;
    }
    let gate = policy.loop_check_gate();
    if !force {
        if let Some(wait) = gate.remaining(cache.last_loop_check, now) {
            debug!(wait_secs = wait.num_seconds(), "loop check throttled");
            return LoopCheck::Throttled;
        }
    }
    cache.last_loop_check = Some(now);
    match classifier.analyze_mental_loops(items, user.language) {
        Some(l) => LoopCheck::Found(l),
        None => LoopCheck::Clear,
    }
}

#[derive(Debug)]
pub enum LoopCheck {
    Throttled,
    Clear,
    Found(MentalLoop),
}

pub fn print_loop(l: &MentalLoop, items: &[Item]) {
    println!("Mental loop detected: {}", l.theme);
    println!("  {} (seen {}x, {})", l.insight, l.frequency, l.time_span);
    for id in &l.item_ids {
        if let Some(item) = items.iter().find(|i| &i.id == id) {
            println!("  - {}", item.processed_text);
        }
    }
}

pub fn run_loops<M: LanguageModel>(
    classifier: &Classifier<M>,
    items: &[Item],
    user: &UserState,
    policy: &ReminderPolicy,
    force: bool,
) -> Result<()> {
    let now = Utc::now();
    let mut cache = read_cache()?;
    let outcome = check_loops(classifier, items, user, policy, &mut cache, force, now);
    write_cache(&cache)?;

    match outcome {
        LoopCheck::Throttled => {
            println!("Checked recently. Run with --force to look again.");
        }
        LoopCheck::Clear => println!("No mental loops right now."),
        LoopCheck::Found(l) => print_loop(&l, items),
    }

    let thoughts: Vec<String> = items
        .iter()
        .filter(|i| matches!(i.item_type, ItemType::Thought | ItemType::Idea) && !i.is_discarded)
        .take(20)
        .map(|i| i.processed_text.clone())
        .collect();
    println!("\nMental replay: {}", classifier.mental_replay_insight(&thoughts, user.language));
    Ok(())
}

pub fn run_ideas<M: LanguageModel>(
    classifier: &Classifier<M>,
    items: &[Item],
    user: &UserState,
    policy: &ReminderPolicy,
    refresh: bool,
) -> Result<()> {
    let now = Utc::now();
    let mut cache = read_cache()?;

    let clusters = match (refresh, cached_clusters(&cache, policy, now)) {
        (false, Some(c)) => {
            debug!(count = c.len(), "using cached clusters");
            c
        }
        _ => {
            let ideas = open_ideas(items);
            let clusters = classifier.cluster_ideas(&ideas, user.language);
            info!(ideas = ideas.len(), clusters = clusters.len(), "clustered ideas");
            cache.clusters = Some(CachedClusters {
                at: now,
                clusters: clusters.clone(),
            });
            write_cache(&cache)?;
            clusters
        }
    };

    let garden = IdeaGarden::build(items, clusters, now);
    let find = |id: &str| items.iter().find(|i| i.id == id);

    println!("Sprouts (last 24h): {}", garden.sprouts.len());
    for i in &garden.sprouts {
        println!("  * {}  [{}]", i.processed_text, i.id);
    }
    for c in &garden.clusters {
        println!("\nGrove: {}  ({})", c.name, c.description);
        for id in &c.item_ids {
            if let Some(i) = find(id) {
                println!("  - {}  [{}]", i.processed_text, i.id);
            }
        }
    }
    if !garden.wildflowers.is_empty() {
        println!("\nWildflowers:");
        for i in &garden.wildflowers {
            println!("  ~ {}  [{}]", i.processed_text, i.id);
        }
    }
    if garden.sprouts.is_empty() && garden.clusters.is_empty() && garden.wildflowers.is_empty() {
        println!("No ideas yet. Dump a few and come back.");
    }
    Ok(())
}

pub fn run_nudge(policy: &ReminderPolicy) -> Result<()> {
    let now = Utc::now();
    let mut cache = read_cache()?;
    match due_nudge(policy, cache.last_nudge, now, &mut rand::thread_rng()) {
        Some(n) => {
            println!("{}: {}", n.title, n.body);
            cache.last_nudge = Some(now);
            write_cache(&cache)?;
        }
        None => debug!("no nudge due"),
    }
    Ok(())
}
