use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use takken_planner::traffic::{
    build_takken_url_from_path, canonicalize_takken_path, choose_tier, pick_for_slot,
    TrafficProfileStore, TrafficStrategy, TrafficUrlProfile, TrafficUrlProfileItem, UrlGroup,
    UrlTier,
};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("takken-traffic-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn item(path: &str, group: UrlGroup, tier: UrlTier, weight: u32) -> TrafficUrlProfileItem {
    TrafficUrlProfileItem {
        path: path.to_string(),
        label_ja: path.to_string(),
        group,
        tier,
        weight,
        source_score: 0.0,
        bounce_rate: None,
    }
}

fn profile(items: Vec<TrafficUrlProfileItem>) -> TrafficUrlProfile {
    TrafficUrlProfile {
        version: 1,
        generated_at: String::new(),
        strategy: TrafficStrategy::default(),
        items,
    }
}

#[test]
fn canonicalize_strips_host_query_fragment_and_slash() {
    assert_eq!(
        canonicalize_takken_path("https://takkenai.jp/tools/loan/?utm=x#top"),
        Some("/tools/loan".to_string())
    );
    assert_eq!(
        canonicalize_takken_path("/Tools/Loan/"),
        Some("/tools/loan".to_string())
    );
    assert_eq!(
        canonicalize_takken_path("tools/loan"),
        Some("/tools/loan".to_string())
    );
    assert_eq!(canonicalize_takken_path(""), None);
    assert_eq!(canonicalize_takken_path("https://takkenai.jp"), None);
    assert_eq!(canonicalize_takken_path("/"), None);
}

#[test]
fn canonicalize_is_idempotent() {
    let inputs = [
        "https://takkenai.jp/tools/loan/?utm=x#top",
        "/knowledge/teitoken",
        "HTTPS://TAKKENAI.JP/KAKOMON/2024/Q03/",
        "tools/moshi-saiten",
    ];
    for input in inputs {
        let once = canonicalize_takken_path(input);
        let twice = once.as_deref().and_then(canonicalize_takken_path);
        assert_eq!(once, twice);
    }
}

#[test]
fn url_round_trips_through_canonicalization() {
    let path = "/tools/loan";
    let url = build_takken_url_from_path(path);
    assert_eq!(url, "https://takkenai.jp/tools/loan");
    assert_eq!(canonicalize_takken_path(&url), Some(path.to_string()));
}

#[test]
fn load_normalizes_and_deduplicates_items() {
    let dir = temp_dir("normalize");
    let path = dir.join("profile.json");
    std::fs::write(
        &path,
        r#"{
            "strategy": {"highShare": 1.7, "exploreShare": -0.3},
            "items": [
                {"path": "https://takkenai.jp/tools/a/", "labelJa": "古いラベル", "group": "tool", "tier": "high", "weight": 0, "sourceScore": -5},
                {"labelJa": "パスなし", "group": "tool", "tier": "high"},
                {"path": "/tools/b", "labelJa": "不明tier", "group": "tool", "tier": "mystery"},
                {"path": "/tools/a", "labelJa": "新しいラベル", "group": "tool", "tier": "explore", "weight": 4, "sourceScore": 10}
            ]
        }"#,
    )
    .unwrap();

    let store = TrafficProfileStore::new(path);
    let profile = store.load().unwrap();

    assert_eq!(profile.items.len(), 1);
    let only = &profile.items[0];
    assert_eq!(only.path, "/tools/a");
    assert_eq!(only.label_ja, "新しいラベル");
    assert_eq!(only.tier, UrlTier::Explore);
    assert_eq!(only.weight, 4);
    assert!((profile.strategy.high_share - 1.0).abs() < 1e-9);
    assert!((profile.strategy.explore_share - 0.0).abs() < 1e-9);
    assert_eq!(profile.version, 1);
}

#[test]
fn load_returns_none_for_missing_or_malformed_file() {
    let dir = temp_dir("absent");
    let store = TrafficProfileStore::new(dir.join("nope.json"));
    assert!(store.load().is_none());

    let broken = dir.join("broken.json");
    std::fs::write(&broken, "{not json").unwrap();
    let store = TrafficProfileStore::new(broken);
    assert!(store.load().is_none());
}

#[test]
fn load_reuses_cache_until_cleared() {
    let dir = temp_dir("cache");
    let path = dir.join("profile.json");
    std::fs::write(
        &path,
        r#"{"items": [{"path": "/tools/a", "labelJa": "A", "group": "tool", "tier": "high", "weight": 1, "sourceScore": 1}]}"#,
    )
    .unwrap();

    let store = TrafficProfileStore::new(path.clone());
    let first = store.load().unwrap();
    let second = store.load().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    std::fs::write(
        &path,
        r#"{"items": [{"path": "/tools/a", "labelJa": "B", "group": "tool", "tier": "high", "weight": 1, "sourceScore": 1}]}"#,
    )
    .unwrap();
    store.clear_cache();
    let third = store.load().unwrap();
    assert_eq!(third.items[0].label_ja, "B");
}

#[test]
fn choose_tier_respects_strategy_bounds() {
    let always_high = TrafficStrategy {
        high_share: 1.0,
        explore_share: 0.0,
    };
    let never_high = TrafficStrategy {
        high_share: 0.0,
        explore_share: 1.0,
    };
    assert_eq!(
        choose_tier("2026-08-27", "note", 0, &always_high),
        UrlTier::High
    );
    assert_eq!(
        choose_tier("2026-08-27", "note", 0, &never_high),
        UrlTier::Explore
    );
}

#[test]
fn pick_for_slot_falls_through_to_explore_when_high_is_empty() {
    let profile = profile(vec![
        item("/tools/x", UrlGroup::Tool, UrlTier::Explore, 1),
        item("/tools/y", UrlGroup::Tool, UrlTier::Explore, 1),
    ]);
    let exclude = HashSet::new();

    for attempt in 0..50 {
        let chosen = pick_for_slot(
            &profile,
            "2026-08-27",
            "note",
            UrlGroup::Tool,
            UrlTier::High,
            &exclude,
            0,
            attempt,
        )
        .unwrap();
        assert_eq!(chosen.tier, UrlTier::Explore);
    }
}

#[test]
fn pick_for_slot_honors_exclusion_set() {
    let profile = profile(vec![
        item("/tools/x", UrlGroup::Tool, UrlTier::High, 9),
        item("/tools/y", UrlGroup::Tool, UrlTier::High, 1),
    ]);
    let mut exclude = HashSet::new();
    exclude.insert("/tools/x".to_string());

    for attempt in 0..50 {
        let chosen = pick_for_slot(
            &profile,
            "2026-08-27",
            "note",
            UrlGroup::Tool,
            UrlTier::High,
            &exclude,
            0,
            attempt,
        )
        .unwrap();
        assert_eq!(chosen.path, "/tools/y");
    }
}

#[test]
fn pick_for_slot_returns_none_for_empty_group() {
    let profile = profile(vec![item("/tools/x", UrlGroup::Tool, UrlTier::High, 1)]);
    let exclude = HashSet::new();
    let chosen = pick_for_slot(
        &profile,
        "2026-08-27",
        "note",
        UrlGroup::Takken,
        UrlTier::High,
        &exclude,
        0,
        0,
    );
    assert!(chosen.is_none());
}

#[test]
fn pick_for_slot_ignores_tier_when_all_tiers_are_exhausted() {
    let profile = profile(vec![item("/tools/x", UrlGroup::Tool, UrlTier::High, 1)]);
    let mut exclude = HashSet::new();
    exclude.insert("/tools/x".to_string());

    let chosen = pick_for_slot(
        &profile,
        "2026-08-27",
        "note",
        UrlGroup::Tool,
        UrlTier::High,
        &exclude,
        0,
        0,
    )
    .unwrap();
    assert_eq!(chosen.path, "/tools/x");
}

#[test]
fn heavier_weight_wins_more_often() {
    let profile = profile(vec![
        item("/tools/a", UrlGroup::Tool, UrlTier::High, 9),
        item("/tools/b", UrlGroup::Tool, UrlTier::High, 1),
    ]);
    let exclude = HashSet::new();

    let mut a_count = 0usize;
    let samples = 10_000u32;
    for attempt in 0..samples {
        let chosen = pick_for_slot(
            &profile,
            "2026-08-27",
            "note",
            UrlGroup::Tool,
            UrlTier::High,
            &exclude,
            0,
            attempt,
        )
        .unwrap();
        if chosen.path == "/tools/a" {
            a_count += 1;
        }
    }

    let share = a_count as f64 / samples as f64;
    assert!(share > 0.85 && share < 0.95, "share was {}", share);
}
