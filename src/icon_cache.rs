use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::state::CharacterIcon;

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "replay_terminal";
const CACHE_FILE: &str = "icons.json";
const DEFAULT_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct IconCacheFile {
    version: u32,
    fetched_at: u64,
    icons: Vec<CharacterIcon>,
}

fn ttl_secs() -> u64 {
    env::var("ICON_CACHE_SECS")
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TTL_SECS)
        .max(60)
}

/// Returns the cached roster if it is present, the right version and still
/// within its TTL.
pub fn load_fresh() -> Option<Vec<CharacterIcon>> {
    let path = cache_path()?;
    let raw = fs::read_to_string(path).ok()?;
    let cache = serde_json::from_str::<IconCacheFile>(&raw).ok()?;
    if cache.version != CACHE_VERSION || cache.icons.is_empty() {
        return None;
    }
    let age = now_secs().saturating_sub(cache.fetched_at);
    if age > ttl_secs() {
        return None;
    }
    Some(cache.icons)
}

/// Best-effort write; a failure is invisible beyond a refetch next run.
pub fn store(icons: &[CharacterIcon]) {
    let _ = try_store(icons);
}

fn try_store(icons: &[CharacterIcon]) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();

    let cache = IconCacheFile {
        version: CACHE_VERSION,
        fetched_at: now_secs(),
        icons: icons.to_vec(),
    };
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(&cache).context("serialize icon cache")?;
    fs::write(&tmp, json).context("write icon cache")?;
    fs::rename(&tmp, &path).context("swap icon cache")?;
    Ok(())
}

fn cache_path() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(CACHE_DIR)
            .join(CACHE_FILE),
    )
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
