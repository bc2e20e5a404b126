use std::collections::HashSet;
use std::path::PathBuf;

use takken_planner::assets::{AssetPools, KnowledgePoint, PastQuestion, ToolAsset};
use takken_planner::generate_day_topics;
use takken_planner::rng::{seed_from_text, SeededRng};
use takken_planner::season::{seasonal_copy_context, Phase};
use takken_planner::traffic::TrafficProfileStore;
use takken_planner::UrlSelectionMode;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("takken-planner-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn missing_profile_store(name: &str) -> TrafficProfileStore {
    TrafficProfileStore::new(temp_dir(name).join("absent-profile.json"))
}

fn shared_destination_pools() -> AssetPools {
    AssetPools {
        knowledge_points: vec![KnowledgePoint {
            id: "kp-1".to_string(),
            title: "重要事項説明".to_string(),
            category: "宅建業法".to_string(),
            summary: String::new(),
            takkenai_url: "/tools/shared".to_string(),
        }],
        tools: vec![ToolAsset {
            id: "tool-1".to_string(),
            name: "一問一答".to_string(),
            category: "study".to_string(),
            description: String::new(),
            takkenai_url: "/tools/shared".to_string(),
        }],
        past_questions: vec![PastQuestion {
            id: "pq-1".to_string(),
            year: 2024,
            theme: "37条書面".to_string(),
            takkenai_url: "/tools/shared".to_string(),
        }],
    }
}

#[test]
fn seeded_rng_repeats_for_same_seed() {
    let mut a = SeededRng::new(42);
    let mut b = SeededRng::new(42);
    for _ in 0..100 {
        let x = a.next_f64();
        let y = b.next_f64();
        assert!((x - y).abs() < 1e-12);
        assert!((0.0..1.0).contains(&x));
    }
}

#[test]
fn seeded_rng_diverges_for_different_seeds() {
    let mut a = SeededRng::new(1);
    let mut b = SeededRng::new(2);
    let first: Vec<f64> = (0..8).map(|_| a.next_f64()).collect();
    let second: Vec<f64> = (0..8).map(|_| b.next_f64()).collect();
    assert_ne!(first, second);
}

#[test]
fn seed_from_text_is_stable() {
    let a = seed_from_text("2026-08-27:0");
    let b = seed_from_text("2026-08-27:0");
    assert_eq!(a, b);
    assert_ne!(a, seed_from_text("2026-08-28:0"));
}

#[test]
fn phase_follows_month_ranges() {
    assert_eq!(Phase::for_month(1), Phase::MotivationBasics);
    assert_eq!(Phase::for_month(3), Phase::MotivationBasics);
    assert_eq!(Phase::for_month(4), Phase::DeepDive);
    assert_eq!(Phase::for_month(6), Phase::DeepDive);
    assert_eq!(Phase::for_month(7), Phase::PracticeIntensive);
    assert_eq!(Phase::for_month(9), Phase::PracticeIntensive);
    assert_eq!(Phase::for_month(10), Phase::ExamTips);
    assert_eq!(Phase::for_month(11), Phase::ResultsCareer);
    assert_eq!(Phase::for_month(12), Phase::ResultsCareer);
}

#[test]
fn generate_day_topics_is_deterministic() {
    let pools = AssetPools::builtin();
    let store = missing_profile_store("determinism");

    let first = generate_day_topics("2026-08-27", 0, &pools, &store).unwrap();
    let second = generate_day_topics("2026-08-27", 0, &pools, &store).unwrap();

    let left = serde_json::to_string(&first).unwrap();
    let right = serde_json::to_string(&second).unwrap();
    assert_eq!(left, right);
}

#[test]
fn generate_day_topics_rejects_malformed_date() {
    let pools = AssetPools::builtin();
    let store = missing_profile_store("bad-date");
    assert!(generate_day_topics("2026/08/27", 0, &pools, &store).is_err());
}

#[test]
fn destinations_are_distinct_without_profile() {
    let pools = AssetPools::builtin();
    let store = missing_profile_store("distinct-no-profile");

    let day = generate_day_topics("2026-08-27", 0, &pools, &store).unwrap();
    assert_eq!(day.topics.len(), 3);
    assert_eq!(day.plans.len(), 3);

    let destinations: HashSet<String> = day
        .topics
        .iter()
        .map(|topic| topic.canonical_destination())
        .collect();
    assert_eq!(destinations.len(), 3);
    for topic in &day.topics {
        assert_eq!(topic.url_selection_mode, UrlSelectionMode::Asset);
        assert!(topic.url_tier.is_none());
        assert!(!topic.fallback_used);
    }
}

#[test]
fn destinations_are_distinct_with_traffic_profile() {
    let dir = temp_dir("distinct-profile");
    let profile_path = dir.join("profile.json");
    std::fs::write(
        &profile_path,
        r#"{
            "version": 1,
            "generatedAt": "2026-08-20T00:00:00Z",
            "strategy": {"highShare": 0.7, "exploreShare": 0.3},
            "items": [
                {"path": "/tools/a", "labelJa": "ツールA", "group": "tool", "tier": "high", "weight": 5, "sourceScore": 120},
                {"path": "/tools/b", "labelJa": "ツールB", "group": "tool", "tier": "high", "weight": 3, "sourceScore": 80},
                {"path": "/tools/c", "labelJa": "ツールC", "group": "tool", "tier": "explore", "weight": 2, "sourceScore": 40},
                {"path": "/tools/d", "labelJa": "ツールD", "group": "tool", "tier": "cooldown", "weight": 1, "sourceScore": 10},
                {"path": "/knowledge/a", "labelJa": "知識A", "group": "takken", "tier": "high", "weight": 4, "sourceScore": 90},
                {"path": "/knowledge/b", "labelJa": "知識B", "group": "takken", "tier": "explore", "weight": 2, "sourceScore": 30},
                {"path": "/knowledge/c", "labelJa": "知識C", "group": "takken", "tier": "cooldown", "weight": 1, "sourceScore": 5}
            ]
        }"#,
    )
    .unwrap();

    let pools = AssetPools::builtin();
    let store = TrafficProfileStore::new(profile_path);

    for salt in 0..20 {
        let day = generate_day_topics("2026-08-27", salt, &pools, &store).unwrap();
        let destinations: HashSet<String> = day
            .topics
            .iter()
            .map(|topic| topic.canonical_destination())
            .collect();
        assert_eq!(destinations.len(), 3, "collision at salt {}", salt);
        for topic in &day.topics {
            assert!(!topic.fallback_used);
        }
    }
}

#[test]
fn profile_overlay_sets_url_direct_mode() {
    let dir = temp_dir("overlay-mode");
    let profile_path = dir.join("profile.json");
    std::fs::write(
        &profile_path,
        r#"{
            "items": [
                {"path": "/tools/a", "labelJa": "ツールA", "group": "tool", "tier": "high", "weight": 5, "sourceScore": 120},
                {"path": "/tools/b", "labelJa": "ツールB", "group": "tool", "tier": "explore", "weight": 3, "sourceScore": 80},
                {"path": "/tools/c", "labelJa": "ツールC", "group": "tool", "tier": "cooldown", "weight": 2, "sourceScore": 40},
                {"path": "/knowledge/a", "labelJa": "知識A", "group": "takken", "tier": "high", "weight": 4, "sourceScore": 90},
                {"path": "/knowledge/b", "labelJa": "知識B", "group": "takken", "tier": "explore", "weight": 2, "sourceScore": 30},
                {"path": "/knowledge/c", "labelJa": "知識C", "group": "takken", "tier": "cooldown", "weight": 1, "sourceScore": 5}
            ]
        }"#,
    )
    .unwrap();

    let pools = AssetPools::builtin();
    let store = TrafficProfileStore::new(profile_path);
    let day = generate_day_topics("2026-08-27", 0, &pools, &store).unwrap();

    for topic in &day.topics {
        assert_eq!(topic.url_selection_mode, UrlSelectionMode::UrlDirect);
        assert!(topic.url_tier.is_some());
        assert!(topic.topic_label_override.is_some());
        assert!(topic.takkenai_url.starts_with("https://takkenai.jp/"));
    }
}

#[test]
fn exhausted_retries_fall_back_with_flag() {
    let pools = shared_destination_pools();
    let store = missing_profile_store("fallback");

    let day = generate_day_topics("2026-08-27", 0, &pools, &store).unwrap();

    assert!(!day.topics[0].fallback_used);
    assert!(day.topics[1].fallback_used);
    assert!(day.topics[2].fallback_used);
    assert_eq!(day.topics[1].canonical_destination(), "/tools/shared");
}

#[test]
fn plans_project_platform_constants() {
    let pools = AssetPools::builtin();
    let store = missing_profile_store("plans");
    let day = generate_day_topics("2026-01-15", 0, &pools, &store).unwrap();

    let note_plan = &day.plans[1];
    assert_eq!(note_plan.min_chars, 2000);
    assert_eq!(note_plan.max_chars, 3000);
    assert!(!note_plan.suggested_title.is_empty());
    assert!(!note_plan.suggested_title.contains("{topic}"));
    assert_eq!(note_plan.takkenai_url, day.topics[1].takkenai_url);
}

#[test]
fn seasonal_copy_context_follows_month() {
    let january = seasonal_copy_context("2026-01-10").unwrap();
    let october = seasonal_copy_context("2026-10-01").unwrap();
    assert_ne!(january, october);
    assert!(october.contains("直前"));
    assert!(seasonal_copy_context("not-a-date").is_err());
}
