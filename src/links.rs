use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::rng::seed_from_text;
use crate::season::parse_date;

pub const DEFAULT_COOLDOWN_DAYS: u32 = 7;
const MAX_COOLDOWN_DAYS: u32 = 30;
const TOP_CANDIDATES: usize = 3;
const RECENCY_HORIZON_DAYS: i64 = 45;
const TITLE_OVERLAP_WEIGHT: f64 = 8.0;
const URL_OVERLAP_WEIGHT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKey {
    Standard,
    Variant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInternalLinkItem {
    pub url: String,
    pub canonical_url: String,
    pub account: String,
    pub title: String,
    pub date: String,
    pub platform: String,
    pub content_key: ContentKey,
    pub published_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInternalLinkPool {
    pub version: u32,
    pub updated_at: String,
    pub allowed_accounts: Vec<String>,
    pub items: Vec<NoteInternalLinkItem>,
}

impl Default for NoteInternalLinkPool {
    fn default() -> Self {
        Self {
            version: 1,
            updated_at: String::new(),
            allowed_accounts: Vec::new(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPool {
    version: Option<u32>,
    updated_at: Option<String>,
    allowed_accounts: Option<Vec<String>>,
    items: Option<Vec<RawItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    url: Option<String>,
    title: Option<String>,
    date: Option<String>,
    platform: Option<String>,
    content_key: Option<String>,
    published_at: Option<String>,
}

pub fn canonicalize_note_url(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))?;
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let rest = rest.strip_prefix("note.com/")?;
    let rest = match rest.find(|ch: char| ch == '?' || ch == '#') {
        Some(index) => &rest[..index],
        None => rest,
    };
    let mut segments = rest.split('/').filter(|segment| !segment.is_empty());
    let account = segments.next()?.to_lowercase();
    if segments.next()? != "n" {
        return None;
    }
    let id = segments.next()?.to_lowercase();
    if segments.next().is_some() {
        return None;
    }
    let account_ok = !account.is_empty()
        && account
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    let id_ok = !id.is_empty() && id.chars().all(|ch| ch.is_ascii_alphanumeric());
    if !account_ok || !id_ok {
        return None;
    }
    let canonical = format!("https://note.com/{}/n/{}", account, id);
    Some((account, canonical))
}

pub trait LinkPoolRepository {
    fn load(&self) -> Result<NoteInternalLinkPool, String>;
    fn save(&self, pool: &NoteInternalLinkPool) -> Result<(), String>;
}

pub struct FileLinkPoolRepository {
    path: PathBuf,
}

impl FileLinkPoolRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl LinkPoolRepository for FileLinkPoolRepository {
    fn load(&self) -> Result<NoteInternalLinkPool, String> {
        if !self.path.exists() {
            return Ok(NoteInternalLinkPool::default());
        }
        let data = std::fs::read_to_string(&self.path)
            .map_err(|err| format!("failed to read link pool: {}", err))?;
        if data.trim().is_empty() {
            return Ok(NoteInternalLinkPool::default());
        }
        let raw: RawPool = match serde_json::from_str(&data) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "failed to parse link pool: {}", err);
                return Ok(NoteInternalLinkPool::default());
            }
        };
        Ok(normalize_pool(raw))
    }

    fn save(&self, pool: &NoteInternalLinkPool) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create link pool dir: {}", err))?;
        }
        let payload = serde_json::to_string_pretty(pool)
            .map_err(|err| format!("failed to serialize link pool: {}", err))?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, payload)
            .map_err(|err| format!("failed to write link pool: {}", err))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|err| format!("failed to finalize link pool: {}", err))?;
        Ok(())
    }
}

fn normalize_pool(raw: RawPool) -> NoteInternalLinkPool {
    let mut items = Vec::new();
    for raw_item in raw.items.unwrap_or_default() {
        let Some(url) = raw_item.url else {
            tracing::warn!("dropping link pool item without a url");
            continue;
        };
        let Some((account, canonical_url)) = canonicalize_note_url(&url) else {
            tracing::warn!(url = %url, "dropping link pool item with a non-note url");
            continue;
        };
        let content_key = match raw_item.content_key.as_deref() {
            Some("variant") => ContentKey::Variant,
            _ => ContentKey::Standard,
        };
        items.push(NoteInternalLinkItem {
            url,
            canonical_url,
            account,
            title: raw_item.title.unwrap_or_default(),
            date: raw_item.date.unwrap_or_default(),
            platform: raw_item.platform.unwrap_or_else(|| "note".to_string()),
            content_key,
            published_at: raw_item.published_at.unwrap_or_default(),
        });
    }
    NoteInternalLinkPool {
        version: raw.version.unwrap_or(1),
        updated_at: raw.updated_at.unwrap_or_default(),
        allowed_accounts: raw.allowed_accounts.unwrap_or_default(),
        items,
    }
}

pub fn register_published_link(
    repo: &dyn LinkPoolRepository,
    url: &str,
    title: &str,
    date: &str,
    published_at: Option<&str>,
    content_key: ContentKey,
) -> Result<NoteInternalLinkItem, String> {
    parse_date(date)?;
    let (account, canonical_url) =
        canonicalize_note_url(url).ok_or_else(|| format!("invalid note article url: {}", url))?;

    let mut pool = repo.load()?;
    if pool.allowed_accounts.is_empty() {
        pool.allowed_accounts.push(account.clone());
    } else if !pool.allowed_accounts.contains(&account) {
        return Err(format!(
            "account is not allowed for internal links: {}",
            account
        ));
    }

    let now = Utc::now().to_rfc3339();
    let item = NoteInternalLinkItem {
        url: url.trim().to_string(),
        canonical_url: canonical_url.clone(),
        account,
        title: title.to_string(),
        date: date.to_string(),
        platform: "note".to_string(),
        content_key,
        published_at: published_at.map(str::to_string).unwrap_or_else(|| now.clone()),
    };

    match pool
        .items
        .iter()
        .position(|existing| existing.canonical_url == canonical_url)
    {
        Some(index) => pool.items[index] = item.clone(),
        None => pool.items.push(item.clone()),
    }
    pool.items.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.canonical_url.cmp(&b.canonical_url))
    });
    pool.updated_at = now;

    repo.save(&pool)?;
    Ok(item)
}

#[derive(Debug, Clone)]
pub struct RelatedLinkRequest<'a> {
    pub date: &'a str,
    pub content_key: ContentKey,
    pub title: &'a str,
    pub takkenai_url: &'a str,
    pub generated_dir: Option<&'a Path>,
    pub exclude_urls: &'a [String],
    pub cooldown_days: u32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedLinkCandidate {
    pub url: String,
    pub title: String,
    pub account: String,
    pub allowed_accounts: Vec<String>,
}

pub fn pick_related_link(
    repo: &dyn LinkPoolRepository,
    request: &RelatedLinkRequest,
) -> Result<Option<RelatedLinkCandidate>, String> {
    if !request.enabled || request.content_key == ContentKey::Variant {
        return Ok(None);
    }
    let current_date = parse_date(request.date)?;
    let cooldown_days = request.cooldown_days.clamp(1, MAX_COOLDOWN_DAYS);

    let mut excluded: HashSet<String> = HashSet::new();
    for url in request.exclude_urls {
        excluded.insert(exclusion_key(url));
    }
    if let Some(dir) = request.generated_dir {
        collect_recent_related_urls(dir, current_date, cooldown_days, &mut excluded);
    }

    let pool = repo.load()?;
    let title_tokens = tokenize(request.title);
    let url_tokens = tokenize(request.takkenai_url);

    let mut scored: Vec<(f64, &NoteInternalLinkItem)> = pool
        .items
        .iter()
        .filter(|item| item.content_key == ContentKey::Standard)
        .filter(|item| item.date != request.date)
        .filter(|item| !excluded.contains(&item.canonical_url))
        .filter(|item| {
            pool.allowed_accounts.is_empty() || pool.allowed_accounts.contains(&item.account)
        })
        .map(|item| (score_candidate(item, current_date, &title_tokens, &url_tokens), item))
        .collect();
    if scored.is_empty() {
        return Ok(None);
    }

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.canonical_url.cmp(&b.1.canonical_url))
    });

    let top = scored.len().min(TOP_CANDIDATES);
    let seed = seed_from_text(&format!(
        "{}:{}:{}",
        request.date, request.title, request.takkenai_url
    ));
    let chosen = scored[(seed as usize) % top].1;

    Ok(Some(RelatedLinkCandidate {
        url: chosen.url.clone(),
        title: chosen.title.clone(),
        account: chosen.account.clone(),
        allowed_accounts: pool.allowed_accounts.clone(),
    }))
}

fn exclusion_key(url: &str) -> String {
    match canonicalize_note_url(url) {
        Some((_, canonical)) => canonical,
        None => url.trim().to_lowercase(),
    }
}

fn collect_recent_related_urls(
    dir: &Path,
    current_date: NaiveDate,
    cooldown_days: u32,
    excluded: &mut HashSet<String>,
) {
    for day_offset in 1..=i64::from(cooldown_days) {
        let day = current_date - Duration::days(day_offset);
        let file = dir.join(format!("{}-note.json", day.format("%Y-%m-%d")));
        let Ok(data) = std::fs::read_to_string(&file) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&data) else {
            continue;
        };
        if let Some(url) = value
            .get("meta")
            .and_then(|meta| meta.get("relatedNoteUrl"))
            .and_then(|url| url.as_str())
        {
            excluded.insert(exclusion_key(url));
        }
    }
}

fn score_candidate(
    item: &NoteInternalLinkItem,
    current_date: NaiveDate,
    title_tokens: &HashSet<String>,
    url_tokens: &HashSet<String>,
) -> f64 {
    let age_days = published_date(item)
        .map(|published| (current_date - published).num_days().max(0))
        .unwrap_or(RECENCY_HORIZON_DAYS);
    let recency = (RECENCY_HORIZON_DAYS - age_days.min(RECENCY_HORIZON_DAYS)) as f64;
    let candidate_tokens = tokenize(&item.title);
    let title_overlap = overlap_count(title_tokens, &candidate_tokens);
    let url_overlap = overlap_count(url_tokens, &candidate_tokens);
    recency + TITLE_OVERLAP_WEIGHT * title_overlap + URL_OVERLAP_WEIGHT * url_overlap
}

fn published_date(item: &NoteInternalLinkItem) -> Option<NaiveDate> {
    let published = item.published_at.get(..10).unwrap_or("");
    NaiveDate::parse_from_str(published, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&item.date, "%Y-%m-%d"))
        .ok()
}

fn overlap_count(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    left.intersection(right).count() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenClass {
    Ascii,
    Hiragana,
    Katakana,
    Cjk,
}

fn classify(ch: char) -> Option<TokenClass> {
    let code = ch as u32;
    if ch.is_ascii_alphanumeric() {
        Some(TokenClass::Ascii)
    } else if (0x3040..=0x309F).contains(&code) {
        Some(TokenClass::Hiragana)
    } else if (0x30A0..=0x30FF).contains(&code) {
        Some(TokenClass::Katakana)
    } else if (0x4E00..=0x9FFF).contains(&code) {
        Some(TokenClass::Cjk)
    } else {
        None
    }
}

fn min_run_length(class: TokenClass) -> usize {
    match class {
        TokenClass::Ascii => 3,
        TokenClass::Hiragana | TokenClass::Katakana | TokenClass::Cjk => 2,
    }
}

pub fn tokenize(text: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();
    let mut run = String::new();
    let mut run_class: Option<TokenClass> = None;

    let flush = |run: &mut String, class: Option<TokenClass>, tokens: &mut HashSet<String>| {
        if let Some(class) = class {
            if run.chars().count() >= min_run_length(class) {
                tokens.insert(run.to_lowercase());
            }
        }
        run.clear();
    };

    for ch in text.chars() {
        let class = classify(ch);
        if class != run_class {
            flush(&mut run, run_class, &mut tokens);
            run_class = class;
        }
        if class.is_some() {
            run.push(ch);
        }
    }
    flush(&mut run, run_class, &mut tokens);
    tokens
}
