use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::rng::SeededRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetType {
    KnowledgePoint,
    Tool,
    PastQuestion,
}

impl AssetType {
    pub fn label(self) -> &'static str {
        match self {
            AssetType::KnowledgePoint => "knowledge-point",
            AssetType::Tool => "tool",
            AssetType::PastQuestion => "past-question",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePoint {
    pub id: String,
    pub title: String,
    pub category: String,
    pub summary: String,
    pub takkenai_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAsset {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub takkenai_url: String,
}

impl ToolAsset {
    pub fn is_video_marketing(&self) -> bool {
        matches!(self.category.as_str(), "video" | "marketing")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastQuestion {
    pub id: String,
    pub year: u32,
    pub theme: String,
    pub takkenai_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ContentAsset {
    KnowledgePoint(KnowledgePoint),
    Tool(ToolAsset),
    PastQuestion(PastQuestion),
}

impl ContentAsset {
    pub fn asset_type(&self) -> AssetType {
        match self {
            ContentAsset::KnowledgePoint(_) => AssetType::KnowledgePoint,
            ContentAsset::Tool(_) => AssetType::Tool,
            ContentAsset::PastQuestion(_) => AssetType::PastQuestion,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ContentAsset::KnowledgePoint(asset) => &asset.id,
            ContentAsset::Tool(asset) => &asset.id,
            ContentAsset::PastQuestion(asset) => &asset.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ContentAsset::KnowledgePoint(asset) => &asset.title,
            ContentAsset::Tool(asset) => &asset.name,
            ContentAsset::PastQuestion(asset) => &asset.theme,
        }
    }

    pub fn takkenai_path(&self) -> &str {
        match self {
            ContentAsset::KnowledgePoint(asset) => &asset.takkenai_url,
            ContentAsset::Tool(asset) => &asset.takkenai_url,
            ContentAsset::PastQuestion(asset) => &asset.takkenai_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPools {
    pub knowledge_points: Vec<KnowledgePoint>,
    pub tools: Vec<ToolAsset>,
    pub past_questions: Vec<PastQuestion>,
}

const TOOL_VIDEO_BIAS: f64 = 0.4;
const TOOL_BIAS_SALT: u32 = 4423;
const SECONDARY_ASSET_SALT: u32 = 211;

impl AssetPools {
    pub fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read asset pools: {}", err))?;
        let pools: AssetPools = serde_json::from_str(&data)
            .map_err(|err| format!("failed to parse asset pools: {}", err))?;
        Ok(pools)
    }

    pub fn pick_knowledge_point(&self, seed: u32, offset: u32) -> Result<&KnowledgePoint, String> {
        select_from_pool(&self.knowledge_points, seed, offset)
            .ok_or_else(|| "knowledge point pool is empty".to_string())
    }

    pub fn pick_tool(&self, seed: u32, offset: u32) -> Result<&ToolAsset, String> {
        let mut bias_rng = SeededRng::new(seed.wrapping_add(offset).wrapping_add(TOOL_BIAS_SALT));
        if bias_rng.next_f64() < TOOL_VIDEO_BIAS {
            let featured: Vec<&ToolAsset> =
                self.tools.iter().filter(|tool| tool.is_video_marketing()).collect();
            if let Some(tool) = select_from_pool(&featured, seed, offset).copied() {
                return Ok(tool);
            }
        }
        select_from_pool(&self.tools, seed, offset).ok_or_else(|| "tool pool is empty".to_string())
    }

    pub fn pick_past_question(&self, seed: u32, offset: u32) -> Result<&PastQuestion, String> {
        let latest_year = self
            .past_questions
            .iter()
            .fold(0u32, |latest, question| latest.max(question.year));
        let latest: Vec<&PastQuestion> = self
            .past_questions
            .iter()
            .filter(|question| question.year == latest_year)
            .collect();
        if let Some(question) = select_from_pool(&latest, seed, offset).copied() {
            return Ok(question);
        }
        select_from_pool(&self.past_questions, seed, offset)
            .ok_or_else(|| "past question pool is empty".to_string())
    }

    pub fn pick_secondary_knowledge_point(
        &self,
        seed: u32,
        offset: u32,
    ) -> Option<&KnowledgePoint> {
        select_from_pool(
            &self.knowledge_points,
            seed,
            offset.wrapping_add(SECONDARY_ASSET_SALT),
        )
    }

    pub fn builtin() -> Self {
        AssetPools {
            knowledge_points: vec![
                knowledge("kp-001", "宅建業法の基本構造", "宅建業法", "免許制度と規制の全体像を整理する。", "/knowledge/gyohou-kihon"),
                knowledge("kp-002", "35条書面と37条書面の違い", "宅建業法", "重要事項説明と契約書面の記載事項を比較する。", "/knowledge/35jo-37jo"),
                knowledge("kp-003", "意思表示と錯誤", "権利関係", "民法改正後の錯誤取消しの要件を押さえる。", "/knowledge/ishi-hyoji"),
                knowledge("kp-004", "抵当権の基礎", "権利関係", "抵当権の効力範囲と物上代位を理解する。", "/knowledge/teitoken"),
                knowledge("kp-005", "都市計画法の開発許可", "法令上の制限", "開発許可が必要になる規模と例外を整理する。", "/knowledge/kaihatsu-kyoka"),
                knowledge("kp-006", "建築基準法の用途制限", "法令上の制限", "用途地域ごとに建てられる建物を押さえる。", "/knowledge/yoto-seigen"),
                knowledge("kp-007", "不動産取得税と固定資産税", "税・その他", "課税主体と課税標準の特例を比較する。", "/knowledge/fudosan-zei"),
                knowledge("kp-008", "借地借家法の更新ルール", "権利関係", "正当事由と法定更新の仕組みを整理する。", "/knowledge/shakuchi-shakka"),
            ],
            tools: vec![
                tool("tool-001", "宅建一問一答トレーナー", "study", "分野別の一問一答を毎日続けられる演習ツール。", "/tools/ichimon-itto"),
                tool("tool-002", "学習スケジュール診断", "study", "試験日から逆算して週ごとの学習計画を作る。", "/tools/schedule-shindan"),
                tool("tool-003", "統計問題対策シート", "study", "地価公示や建築着工統計の最新数値をまとめる。", "/tools/toukei-sheet"),
                tool("tool-004", "宅建動画講義ライブラリ", "video", "頻出論点を10分で解説する講義動画シリーズ。", "/tools/douga-library"),
                tool("tool-005", "過去問解説動画プレーヤー", "video", "年度別過去問を動画解説付きで演習できる。", "/tools/kakomon-douga"),
                tool("tool-006", "合格体験記まとめ", "marketing", "独学合格者の学習時間と教材選びの体験記特集。", "/tools/goukaku-taikenki"),
                tool("tool-007", "教材比較ナビ", "marketing", "通信講座とテキストを価格と合格率で比較する。", "/tools/kyozai-hikaku"),
                tool("tool-008", "民法語呂合わせ辞典", "study", "覚えにくい数字要件を語呂合わせで整理する。", "/tools/goro-jiten"),
                tool("tool-009", "模試自動採点フォーム", "study", "マークシート入力で分野別正答率を出す採点ツール。", "/tools/moshi-saiten"),
                tool("tool-010", "宅建士収入シミュレーター", "marketing", "資格取得後の年収モデルを職種別に試算する。", "/tools/shunyu-simulator"),
            ],
            past_questions: vec![
                question("pq-2023-12", 2023, "宅建業法・媒介契約", "/kakomon/2023/q12"),
                question("pq-2023-28", 2023, "重要事項説明", "/kakomon/2023/q28"),
                question("pq-2024-03", 2024, "意思表示・代理", "/kakomon/2024/q03"),
                question("pq-2024-15", 2024, "都市計画法", "/kakomon/2024/q15"),
                question("pq-2024-26", 2024, "宅建業の免許", "/kakomon/2024/q26"),
                question("pq-2024-40", 2024, "37条書面", "/kakomon/2024/q40"),
            ],
        }
    }
}

pub fn select_from_pool<T>(pool: &[T], seed: u32, offset: u32) -> Option<&T> {
    if pool.is_empty() {
        return None;
    }
    let index = (seed.wrapping_add(offset) as usize) % pool.len();
    pool.get(index)
}

fn knowledge(id: &str, title: &str, category: &str, summary: &str, url: &str) -> KnowledgePoint {
    KnowledgePoint {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        summary: summary.to_string(),
        takkenai_url: url.to_string(),
    }
}

fn tool(id: &str, name: &str, category: &str, description: &str, url: &str) -> ToolAsset {
    ToolAsset {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        takkenai_url: url.to_string(),
    }
}

fn question(id: &str, year: u32, theme: &str, url: &str) -> PastQuestion {
    PastQuestion {
        id: id.to_string(),
        year,
        theme: theme.to_string(),
        takkenai_url: url.to_string(),
    }
}
