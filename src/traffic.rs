use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use crate::rng::{seed_from_text, SeededRng};

pub const TAKKENAI_ORIGIN: &str = "https://takkenai.jp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlGroup {
    Tool,
    Takken,
}

impl UrlGroup {
    pub fn label(self) -> &'static str {
        match self {
            UrlGroup::Tool => "tool",
            UrlGroup::Takken => "takken",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "tool" => Some(UrlGroup::Tool),
            "takken" => Some(UrlGroup::Takken),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlTier {
    High,
    Explore,
    Cooldown,
}

impl UrlTier {
    pub fn label(self) -> &'static str {
        match self {
            UrlTier::High => "high",
            UrlTier::Explore => "explore",
            UrlTier::Cooldown => "cooldown",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "high" => Some(UrlTier::High),
            "explore" => Some(UrlTier::Explore),
            "cooldown" => Some(UrlTier::Cooldown),
            _ => None,
        }
    }

    fn search_order(self) -> [UrlTier; 3] {
        match self {
            UrlTier::High => [UrlTier::High, UrlTier::Explore, UrlTier::Cooldown],
            UrlTier::Explore => [UrlTier::Explore, UrlTier::High, UrlTier::Cooldown],
            UrlTier::Cooldown => [UrlTier::Cooldown, UrlTier::Explore, UrlTier::High],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficUrlProfileItem {
    pub path: String,
    pub label_ja: String,
    pub group: UrlGroup,
    pub tier: UrlTier,
    pub weight: u32,
    pub source_score: f64,
    pub bounce_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStrategy {
    pub high_share: f64,
    pub explore_share: f64,
}

impl Default for TrafficStrategy {
    fn default() -> Self {
        Self {
            high_share: 0.7,
            explore_share: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficUrlProfile {
    pub version: u32,
    pub generated_at: String,
    pub strategy: TrafficStrategy,
    pub items: Vec<TrafficUrlProfileItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    version: Option<u32>,
    generated_at: Option<String>,
    strategy: Option<RawStrategy>,
    items: Option<Vec<RawItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStrategy {
    high_share: Option<f64>,
    explore_share: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    path: Option<String>,
    label_ja: Option<String>,
    group: Option<String>,
    tier: Option<String>,
    weight: Option<f64>,
    source_score: Option<f64>,
    bounce_rate: Option<f64>,
}

pub fn canonicalize_takken_path(raw: &str) -> Option<String> {
    let mut value = raw.trim().to_lowercase();
    let without_host = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .map(|rest| match rest.find('/') {
            Some(index) => rest[index..].to_string(),
            None => "/".to_string(),
        });
    if let Some(stripped) = without_host {
        value = stripped;
    }
    if let Some(index) = value.find('#') {
        value.truncate(index);
    }
    if let Some(index) = value.find('?') {
        value.truncate(index);
    }
    while value.len() > 1 && value.ends_with('/') {
        value.pop();
    }
    if value.is_empty() || value == "/" {
        return None;
    }
    if !value.starts_with('/') {
        value.insert(0, '/');
    }
    Some(value)
}

pub fn build_takken_url_from_path(path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", TAKKENAI_ORIGIN, path)
    } else {
        format!("{}/{}", TAKKENAI_ORIGIN, path)
    }
}

fn normalize_profile(raw: RawProfile) -> TrafficUrlProfile {
    let strategy = match raw.strategy {
        Some(strategy) => TrafficStrategy {
            high_share: strategy.high_share.unwrap_or(0.7).clamp(0.0, 1.0),
            explore_share: strategy.explore_share.unwrap_or(0.3).clamp(0.0, 1.0),
        },
        None => TrafficStrategy::default(),
    };

    let mut items: Vec<TrafficUrlProfileItem> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for raw_item in raw.items.unwrap_or_default() {
        let Some(path) = raw_item.path.as_deref().and_then(canonicalize_takken_path) else {
            tracing::warn!("dropping traffic profile item without a resolvable path");
            continue;
        };
        let (Some(group), Some(tier)) = (
            raw_item.group.as_deref().and_then(UrlGroup::from_str),
            raw_item.tier.as_deref().and_then(UrlTier::from_str),
        ) else {
            tracing::warn!(path = %path, "dropping traffic profile item with unknown group or tier");
            continue;
        };
        let item = TrafficUrlProfileItem {
            label_ja: raw_item.label_ja.unwrap_or_else(|| path.clone()),
            group,
            tier,
            weight: raw_item
                .weight
                .map(|weight| weight.max(1.0).round() as u32)
                .unwrap_or(1),
            source_score: raw_item.source_score.unwrap_or(0.0).max(0.0),
            bounce_rate: raw_item.bounce_rate,
            path,
        };
        match positions.get(&item.path) {
            Some(&index) => items[index] = item,
            None => {
                positions.insert(item.path.clone(), items.len());
                items.push(item);
            }
        }
    }

    TrafficUrlProfile {
        version: raw.version.unwrap_or(1),
        generated_at: raw.generated_at.unwrap_or_default(),
        strategy,
        items,
    }
}

struct CachedProfile {
    modified: SystemTime,
    profile: Arc<TrafficUrlProfile>,
}

pub struct TrafficProfileStore {
    path: PathBuf,
    cache: Mutex<Option<CachedProfile>>,
}

impl TrafficProfileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cache: Mutex::new(None),
        }
    }

    pub fn load(&self) -> Option<Arc<TrafficUrlProfile>> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()?;

        let mut guard = self.lock_cache();
        if let Some(cached) = guard.as_ref() {
            if cached.modified == modified {
                return Some(cached.profile.clone());
            }
        }

        let data = std::fs::read_to_string(&self.path).ok()?;
        let raw: RawProfile = match serde_json::from_str(&data) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "failed to parse traffic profile: {}", err);
                return None;
            }
        };

        tracing::debug!(path = %self.path.display(), "refreshing traffic profile cache");
        let profile = Arc::new(normalize_profile(raw));
        *guard = Some(CachedProfile {
            modified,
            profile: profile.clone(),
        });
        Some(profile)
    }

    pub fn clear_cache(&self) {
        *self.lock_cache() = None;
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<CachedProfile>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub fn choose_tier(date: &str, platform: &str, salt: u32, strategy: &TrafficStrategy) -> UrlTier {
    let seed = seed_from_text(&format!("{}:{}:{}:tier", date, platform, salt));
    let roll = SeededRng::new(seed).next_f64();
    if roll < strategy.high_share {
        UrlTier::High
    } else {
        UrlTier::Explore
    }
}

#[allow(clippy::too_many_arguments)]
pub fn pick_for_slot<'a>(
    profile: &'a TrafficUrlProfile,
    date: &str,
    platform: &str,
    group: UrlGroup,
    preferred_tier: UrlTier,
    exclude: &HashSet<String>,
    salt: u32,
    attempt: u32,
) -> Option<&'a TrafficUrlProfileItem> {
    let grouped: Vec<&TrafficUrlProfileItem> = profile
        .items
        .iter()
        .filter(|item| item.group == group)
        .collect();
    if grouped.is_empty() {
        return None;
    }

    for tier in preferred_tier.search_order() {
        let candidates: Vec<&TrafficUrlProfileItem> = grouped
            .iter()
            .filter(|item| item.tier == tier && !exclude.contains(&item.path))
            .copied()
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let seed = seed_from_text(&format!(
            "{}:{}:{}:{}:{}:{}",
            date,
            platform,
            group.label(),
            tier.label(),
            salt,
            attempt
        ));
        return Some(weighted_pick(&candidates, seed));
    }

    let seed = seed_from_text(&format!(
        "{}:{}:{}:any:{}:{}",
        date,
        platform,
        group.label(),
        salt,
        attempt
    ));
    Some(weighted_pick(&grouped, seed))
}

fn weighted_pick<'a>(
    candidates: &[&'a TrafficUrlProfileItem],
    seed: u32,
) -> &'a TrafficUrlProfileItem {
    let total: f64 = candidates
        .iter()
        .map(|item| item.weight.max(1) as f64)
        .sum();
    let mut roll = SeededRng::new(seed).next_f64() * total;
    for item in candidates {
        roll -= item.weight.max(1) as f64;
        if roll < 0.0 {
            return item;
        }
    }
    candidates[candidates.len() - 1]
}
