use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ram_core::{IdeaCluster, JsonStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// `$RAM_HOME`, or `~/.ram`.
pub fn ram_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RAM_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".ram"))
}

pub fn ensure_ram_home() -> Result<PathBuf> {
    let dir = ram_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn open_store() -> Result<JsonStore> {
    JsonStore::open(ensure_ram_home()?.join("data"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedClusters {
    pub at: DateTime<Utc>,
    pub clusters: Vec<IdeaCluster>,
}

/// Throttle stamps and cached model output. Never read by the sequencer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionCache {
    #[serde(default)]
    pub last_loop_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_nudge: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clusters: Option<CachedClusters>,
}

pub fn cache_path() -> Result<PathBuf> {
    Ok(ensure_ram_home()?.join("cache.json"))
}

pub fn read_cache() -> Result<SessionCache> {
    let p = cache_path()?;
    if !p.exists() {
        return Ok(SessionCache::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    match serde_json::from_str(&s) {
        Ok(cache) => Ok(cache),
        Err(e) => {
            tracing::warn!(path = %p.display(), error = %e, "discarding unreadable cache");
            Ok(SessionCache::default())
        }
    }
}

pub fn write_cache(cache: &SessionCache) -> Result<()> {
    let p = cache_path()?;
    let json = serde_json::to_string_pretty(cache)?;
    fs::write(&p, json).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn clear_cache() -> Result<()> {
    let p = cache_path()?;
    if p.exists() {
        fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
    }
    Ok(())
}
