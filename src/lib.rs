pub mod assets;
pub mod config;
pub mod links;
pub mod rng;
pub mod season;
pub mod traffic;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::assets::{AssetPools, AssetType, ContentAsset};
use crate::rng::{seed_from_text, SeededRng};
use crate::season::{parse_date, Phase};
use crate::traffic::{
    build_takken_url_from_path, canonicalize_takken_path, choose_tier, pick_for_slot,
    TrafficProfileStore, TrafficUrlProfile, UrlGroup, UrlTier,
};

const MAX_ATTEMPTS: u32 = 20;
const ATTEMPT_STEP: u32 = 7;
const FALLBACK_OFFSET: u32 = 9973;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ameba,
    Note,
    Hatena,
}

impl Platform {
    pub fn all() -> [Platform; 3] {
        [Platform::Ameba, Platform::Note, Platform::Hatena]
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Ameba => "ameba",
            Platform::Note => "note",
            Platform::Hatena => "hatena",
        }
    }

    pub fn seed_offset(self) -> u32 {
        match self {
            Platform::Ameba => 0,
            Platform::Note => 997,
            Platform::Hatena => 1999,
        }
    }

    fn angle(self) -> &'static str {
        match self {
            Platform::Ameba => "受験生の日常に寄り添う体験談・共感型",
            Platform::Note => "学習手順を体系立てて示すノウハウ型",
            Platform::Hatena => "数字と根拠で論点を検証する考察型",
        }
    }

    fn length_range(self) -> (u32, u32) {
        match self {
            Platform::Ameba => (1200, 1800),
            Platform::Note => (2000, 3000),
            Platform::Hatena => (1600, 2400),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlSelectionMode {
    Asset,
    UrlDirect,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotherTopic {
    pub platform: Platform,
    pub date: String,
    pub asset: ContentAsset,
    pub secondary_asset: Option<ContentAsset>,
    pub phase: Phase,
    pub phase_label: String,
    pub takkenai_url: String,
    pub topic_label_override: Option<String>,
    pub url_selection_mode: UrlSelectionMode,
    pub url_tier: Option<UrlTier>,
    pub fallback_used: bool,
}

impl MotherTopic {
    pub fn topic_label(&self) -> &str {
        self.topic_label_override
            .as_deref()
            .unwrap_or_else(|| self.asset.title())
    }

    pub fn canonical_destination(&self) -> String {
        canonicalize_takken_path(&self.takkenai_url).unwrap_or_else(|| {
            format!(
                "asset:{}:{}",
                self.asset.asset_type().label(),
                self.asset.id()
            )
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPlan {
    pub platform: Platform,
    pub angle: String,
    pub suggested_title: String,
    pub min_chars: u32,
    pub max_chars: u32,
    pub takkenai_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTopics {
    pub date: String,
    pub topics: Vec<MotherTopic>,
    pub plans: Vec<PlatformPlan>,
}

pub fn generate_day_topics(
    date: &str,
    seed_salt: u32,
    pools: &AssetPools,
    traffic: &TrafficProfileStore,
) -> Result<DayTopics, String> {
    parse_date(date)?;
    let profile = traffic.load();

    let mut claimed: HashSet<String> = HashSet::new();
    let mut topics: Vec<MotherTopic> = Vec::with_capacity(3);

    for platform in Platform::all() {
        let mut chosen: Option<MotherTopic> = None;

        for attempt in 0..MAX_ATTEMPTS {
            let offset = platform.seed_offset() + attempt * ATTEMPT_STEP;
            let mut topic = generate_mother_topic(date, seed_salt, platform, pools, offset)?;
            if let Some(profile) = profile.as_deref() {
                overlay_traffic_destination(
                    &mut topic, profile, date, platform, &claimed, seed_salt, attempt,
                );
            }
            let destination = topic.canonical_destination();
            if !claimed.contains(&destination) {
                claimed.insert(destination);
                chosen = Some(topic);
                break;
            }
        }

        let topic = match chosen {
            Some(topic) => topic,
            None => {
                let offset = platform.seed_offset() + FALLBACK_OFFSET;
                let mut topic =
                    generate_mother_topic(date, seed_salt + 1, platform, pools, offset)?;
                if let Some(profile) = profile.as_deref() {
                    overlay_traffic_destination(
                        &mut topic,
                        profile,
                        date,
                        platform,
                        &claimed,
                        seed_salt + 1,
                        MAX_ATTEMPTS,
                    );
                }
                topic.fallback_used = true;
                tracing::warn!(
                    platform = platform.label(),
                    date,
                    "slot allocation exhausted retries; claiming fallback destination"
                );
                claimed.insert(topic.canonical_destination());
                topic
            }
        };
        topics.push(topic);
    }

    let plans = topics.iter().map(build_platform_plan).collect();

    Ok(DayTopics {
        date: date.to_string(),
        topics,
        plans,
    })
}

pub fn generate_mother_topic(
    date: &str,
    seed_salt: u32,
    platform: Platform,
    pools: &AssetPools,
    offset: u32,
) -> Result<MotherTopic, String> {
    use chrono::Datelike;

    let parsed = parse_date(date)?;
    let phase = Phase::for_month(parsed.month());
    let base_seed = seed_from_text(&format!("{}:{}", date, seed_salt));
    let mut rng = SeededRng::new(base_seed.wrapping_add(offset));

    let asset_type = phase.pick_asset_type(&mut rng);
    let (asset, secondary_asset) = match asset_type {
        AssetType::KnowledgePoint => (
            ContentAsset::KnowledgePoint(pools.pick_knowledge_point(base_seed, offset)?.clone()),
            None,
        ),
        AssetType::Tool => (
            ContentAsset::Tool(pools.pick_tool(base_seed, offset)?.clone()),
            pools
                .pick_secondary_knowledge_point(base_seed, offset)
                .map(|point| ContentAsset::KnowledgePoint(point.clone())),
        ),
        AssetType::PastQuestion => (
            ContentAsset::PastQuestion(pools.pick_past_question(base_seed, offset)?.clone()),
            None,
        ),
    };

    let takkenai_url = build_takken_url_from_path(asset.takkenai_path());

    Ok(MotherTopic {
        platform,
        date: date.to_string(),
        asset,
        secondary_asset,
        phase,
        phase_label: phase.label_ja().to_string(),
        takkenai_url,
        topic_label_override: None,
        url_selection_mode: UrlSelectionMode::Asset,
        url_tier: None,
        fallback_used: false,
    })
}

fn overlay_traffic_destination(
    topic: &mut MotherTopic,
    profile: &TrafficUrlProfile,
    date: &str,
    platform: Platform,
    claimed: &HashSet<String>,
    salt: u32,
    attempt: u32,
) {
    let group = match topic.asset.asset_type() {
        AssetType::Tool => UrlGroup::Tool,
        _ => UrlGroup::Takken,
    };
    let preferred_tier = choose_tier(date, platform.label(), salt, &profile.strategy);
    if let Some(item) = pick_for_slot(
        profile,
        date,
        platform.label(),
        group,
        preferred_tier,
        claimed,
        salt,
        attempt,
    ) {
        topic.takkenai_url = build_takken_url_from_path(&item.path);
        topic.topic_label_override = Some(item.label_ja.clone());
        topic.url_selection_mode = UrlSelectionMode::UrlDirect;
        topic.url_tier = Some(item.tier);
    }
}

fn build_platform_plan(topic: &MotherTopic) -> PlatformPlan {
    let platform = topic.platform;
    let (min_chars, max_chars) = platform.length_range();
    let templates = title_templates(platform, topic.phase);
    let suggested_title = templates[0].replace("{topic}", topic.topic_label());

    PlatformPlan {
        platform,
        angle: platform.angle().to_string(),
        suggested_title,
        min_chars,
        max_chars,
        takkenai_url: topic.takkenai_url.clone(),
    }
}

fn title_templates(platform: Platform, phase: Phase) -> &'static [&'static str] {
    match (platform, phase) {
        (Platform::Ameba, Phase::MotivationBasics) => &[
            "宅建の勉強を始めた私が最初にやった「{topic}」の話",
            "{topic}でつまずいた初学者のリアルな記録",
        ],
        (Platform::Ameba, Phase::DeepDive) => &[
            "{topic}が急にわかるようになったきっかけ",
            "勉強疲れの夜に{topic}と向き合ってみた",
        ],
        (Platform::Ameba, Phase::PracticeIntensive) => &[
            "過去問で何度も間違えた{topic}、こう乗り越えました",
            "{topic}の演習を1週間続けて感じたこと",
        ],
        (Platform::Ameba, Phase::ExamTips) => &[
            "試験直前、{topic}だけは最後まで見直した理由",
            "本番1週間前の私と{topic}",
        ],
        (Platform::Ameba, Phase::ResultsCareer) => &[
            "合格発表のあとに{topic}を振り返って思うこと",
            "{topic}と過ごした受験期を終えて",
        ],
        (Platform::Note, Phase::MotivationBasics) => &[
            "{topic}の全体像を30分でつかむ学習ガイド",
            "初学者向け：{topic}を最短で理解する手順",
        ],
        (Platform::Note, Phase::DeepDive) => &[
            "{topic}を得点源にする体系的整理ノート",
            "{topic}の頻出パターンを表で整理する",
        ],
        (Platform::Note, Phase::PracticeIntensive) => &[
            "{topic}の演習効率を上げる復習サイクル設計",
            "過去問データで見る{topic}の優先順位",
        ],
        (Platform::Note, Phase::ExamTips) => &[
            "直前期に効く{topic}の総まとめチェックリスト",
            "試験当日に迷わないための{topic}最終確認",
        ],
        (Platform::Note, Phase::ResultsCareer) => &[
            "合格後に活きる{topic}の実務知識マップ",
            "{topic}から始める宅建士キャリアの設計",
        ],
        (Platform::Hatena, Phase::MotivationBasics) => &[
            "{topic}はなぜ出題され続けるのか：出題データから考える",
            "{topic}を学習初期に固めるべき根拠を検証する",
        ],
        (Platform::Hatena, Phase::DeepDive) => &[
            "{topic}の正答率データを分解して弱点構造を探る",
            "{topic}の論点整理：条文と判例から読み直す",
        ],
        (Platform::Hatena, Phase::PracticeIntensive) => &[
            "{topic}の演習量と得点の相関を検証してみた",
            "直近5年の出題傾向から見る{topic}対策",
        ],
        (Platform::Hatena, Phase::ExamTips) => &[
            "直前期の{topic}、捨て問と拾い問の境界線",
            "{topic}の時間配分を過去問実測で検証する",
        ],
        (Platform::Hatena, Phase::ResultsCareer) => &[
            "合格点推移と{topic}の配点から来年度を予測する",
            "{topic}は実務でどう使われるかをデータで見る",
        ],
    }
}
