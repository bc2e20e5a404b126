use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::assets::AssetType;
use crate::rng::SeededRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    MotivationBasics,
    DeepDive,
    PracticeIntensive,
    ExamTips,
    ResultsCareer,
}

#[derive(Debug, Clone, Copy)]
pub struct PhaseWeights {
    pub knowledge_point: f64,
    pub tool: f64,
    pub past_question: f64,
}

impl Phase {
    pub fn for_month(month: u32) -> Self {
        match month {
            1..=3 => Phase::MotivationBasics,
            4..=6 => Phase::DeepDive,
            7..=9 => Phase::PracticeIntensive,
            10 => Phase::ExamTips,
            _ => Phase::ResultsCareer,
        }
    }

    pub fn label_ja(self) -> &'static str {
        match self {
            Phase::MotivationBasics => "基礎固め・学習開始期",
            Phase::DeepDive => "深掘り学習期",
            Phase::PracticeIntensive => "演習強化期",
            Phase::ExamTips => "直前対策期",
            Phase::ResultsCareer => "合格発表・キャリア期",
        }
    }

    pub fn weights(self) -> PhaseWeights {
        PhaseWeights {
            knowledge_point: 0.067,
            tool: 0.8,
            past_question: 0.133,
        }
    }

    pub fn pick_asset_type(self, rng: &mut SeededRng) -> AssetType {
        let weights = self.weights();
        let roll = rng.next_f64();
        if roll < weights.knowledge_point {
            AssetType::KnowledgePoint
        } else if roll < weights.knowledge_point + weights.past_question {
            AssetType::PastQuestion
        } else {
            AssetType::Tool
        }
    }
}

pub fn parse_date(date: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|err| format!("invalid date (expected YYYY-MM-DD): {}: {}", date, err))
}

pub fn seasonal_copy_context(date: &str) -> Result<String, String> {
    let parsed = parse_date(date)?;
    let guidance = match parsed.month() {
        1..=3 => "新年度に向けた学習スタートの季節。モチベーション作りと基礎用語の定着を促す切り口が響きやすい。",
        4..=6 => "本格的な学習期。権利関係や宅建業法の深掘り解説、学習計画の見直し提案が有効。",
        7..=9 => "過去問演習と弱点補強の季節。演習ツールや年度別過去問への導線を厚めにする。",
        10 => "試験直前期。頻出論点の総まとめ、当日の持ち物・時間配分など実務的な直前情報を優先する。",
        _ => "合格発表と次年度準備の季節。自己採点、登録実務講習、キャリア活用の話題が中心になる。",
    };
    Ok(format!("{}（{}）", guidance, Phase::for_month(parsed.month()).label_ja()))
}
