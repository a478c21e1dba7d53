//! Product card model handed to the chat front end, plus a plain-text writer.
//!
//! [`present`] never fails: an empty result becomes a notice, a record missing
//! required fields becomes a [`FieldDiagnostic`], and missing optional pieces
//! become warning notices inside the card. Only writing the panel can fail;
//! [`display_product`] logs such failures with the shape of the input before
//! returning them.

use std::io::{self, Write};
use std::path::PathBuf;

use product_model::{ProductRecord, RetrievalResult, StockStatus};
use tracing::{debug, error, info, warn};

use crate::assets::AssetResolver;

pub const GREETING: &str = "こちらは対話型の商品レコメンド生成AIアプリです。「こんな商品が欲しい」という情報・要望を送信いただければ、おすすめの商品をレコメンドいたします。";
pub const INPUT_EXAMPLES: [&str; 3] = [
    "長時間使える、高音質なワイヤレスイヤホン",
    "机のライト",
    "USBで充電できる加湿器",
];

const INTRO: &str = "以下の商品をご提案いたします。";
const NO_RESULT: &str = "商品情報を取得できませんでした。";
const LOW_STOCK_MESSAGE: &str = "⚠️ ご好評につき、在庫数が残りわずかです。購入をご希望の場合、お早めのご注文をおすすめいたします。";
const OUT_OF_STOCK_MESSAGE: &str = "❗ 申し訳ございませんが、本商品は在庫切れとなっております。入荷までもうしばらくお待ちください。";
const NO_IMAGE_INFO: &str = "商品画像情報がありません。";
const IMAGE_UNAVAILABLE: &str = "商品画像を表示できませんでした。";
const NO_DESCRIPTION: &str = "商品説明がありません。";
const RECOMMENDED_HEADING: &str = "こんな方におすすめ！";
const LINK_LABEL: &str = "商品ページを開く";
const DEFAULT_PRODUCT_URL: &str = "https://google.com";
const RAW_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    fn tag(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub tone: Tone,
    pub text: String,
}

impl Notice {
    pub fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self { tone, text: text.into() }
    }
}

/// Shown instead of a card when required fields are missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiagnostic {
    pub missing: Vec<String>,
    pub available: Vec<String>,
    /// Raw `page_content`, cut to a preview length.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    Found(PathBuf),
    Missing(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionSlot {
    Text(String),
    Missing(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCard {
    pub intro: String,
    /// `商品名：{name}（商品ID: {id}）`
    pub headline: String,
    /// `価格：{price}` followed by the stock annotation, if any.
    pub price_line: String,
    pub stock_notice: Option<Notice>,
    /// Category, maker and rating lines.
    pub details: Vec<String>,
    pub image: ImageSlot,
    pub description: DescriptionSlot,
    pub recommended_people: Option<String>,
    pub link: ProductLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductPanel {
    NoResult(Notice),
    Diagnostic(FieldDiagnostic),
    Card(ProductCard),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to render product information for {shape} result: {message}")]
    Unknown { shape: String, message: String },
}

impl RenderError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Unknown { shape, message } => {
                format!("商品情報の表示に失敗しました。\nエラーの詳細: {message}\n入力データ: {shape}")
            }
        }
    }
}

/// Build the panel for the top document of `result`.
pub fn present(result: &RetrievalResult, assets: &AssetResolver) -> ProductPanel {
    let Some(doc) = result.top() else {
        return ProductPanel::NoResult(Notice::new(Tone::Error, NO_RESULT));
    };
    info!(shape = %result.shape(), row = doc.row, "presenting product");

    let record = match ProductRecord::parse_validated(&doc.page_content) {
        Ok(r) => r,
        Err(e) => {
            warn!(missing = ?e.missing, available = ?e.available, "product record lacks required fields");
            return ProductPanel::Diagnostic(FieldDiagnostic { missing: e.missing, available: e.available, raw: preview(&e.raw) });
        }
    };
    debug!(fields = ?record.keys().collect::<Vec<_>>(), "parsed product fields");
    ProductPanel::Card(card(&record, assets))
}

fn card(record: &ProductRecord, assets: &AssetResolver) -> ProductCard {
    let name = record.name().unwrap_or_default();
    let id = record.id().unwrap_or_default();
    let price = record.price().unwrap_or_default();

    let (annotation, stock_notice) = match record.stock_status() {
        Some(StockStatus::InStock) => (" ✅ 在庫あり", None),
        Some(StockStatus::LowStock) => (" ⚠️ 残りわずか", Some(Notice::new(Tone::Warning, LOW_STOCK_MESSAGE))),
        Some(StockStatus::OutOfStock) => (" ❌ 在庫なし", Some(Notice::new(Tone::Error, OUT_OF_STOCK_MESSAGE))),
        None => ("", None),
    };

    let image = match record.file_name() {
        None => ImageSlot::Missing(Notice::new(Tone::Warning, NO_IMAGE_INFO)),
        Some(file) => match assets.resolve(file) {
            Ok(path) => ImageSlot::Found(path),
            Err(e) => {
                warn!(error = %e, "product image unavailable");
                ImageSlot::Missing(Notice::new(Tone::Warning, IMAGE_UNAVAILABLE))
            }
        },
    };

    let description = match record.description() {
        Some(text) => DescriptionSlot::Text(text.to_string()),
        None => DescriptionSlot::Missing(Notice::new(Tone::Warning, NO_DESCRIPTION)),
    };

    ProductCard {
        intro: INTRO.to_string(),
        headline: format!("商品名：{name}（商品ID: {id}）"),
        price_line: format!("価格：{price}{annotation}"),
        stock_notice,
        details: vec![
            format!("商品カテゴリ：{}", record.category()),
            format!("メーカー：{}", record.maker()),
            format!("評価：{}（{}件）", record.score(), record.review_number()),
        ],
        image,
        description,
        recommended_people: record.recommended_people().map(str::to_string),
        link: ProductLink {
            label: LINK_LABEL.to_string(),
            url: record.get("url").unwrap_or(DEFAULT_PRODUCT_URL).to_string(),
        },
    }
}

fn preview(raw: &str) -> String {
    if raw.chars().count() <= RAW_PREVIEW_CHARS { return raw.to_string(); }
    let mut cut: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

fn write_notice(out: &mut dyn Write, notice: &Notice) -> io::Result<()> {
    writeln!(out, "[{}] {}", notice.tone.tag(), notice.text)
}

/// Plain-text rendering of a panel.
pub fn write_panel(out: &mut dyn Write, panel: &ProductPanel) -> io::Result<()> {
    match panel {
        ProductPanel::NoResult(notice) => write_notice(out, notice),
        ProductPanel::Diagnostic(d) => {
            writeln!(out, "[error] 必須項目が不足しています: {}", d.missing.join(", "))?;
            writeln!(out, "利用可能なフィールド: {}", d.available.join(", "))?;
            writeln!(out, "商品データの生の内容:")?;
            writeln!(out, "{}", d.raw)
        }
        ProductPanel::Card(c) => {
            writeln!(out, "{}", c.intro)?;
            writeln!(out, "{}", c.headline)?;
            writeln!(out, "{}", c.price_line)?;
            if let Some(n) = &c.stock_notice { write_notice(out, n)?; }
            for line in &c.details {
                writeln!(out, "  {line}")?;
            }
            match &c.image {
                ImageSlot::Found(path) => writeln!(out, "画像: {}", path.display())?,
                ImageSlot::Missing(n) => write_notice(out, n)?,
            }
            match &c.description {
                DescriptionSlot::Text(text) => writeln!(out, "{text}")?,
                DescriptionSlot::Missing(n) => write_notice(out, n)?,
            }
            if let Some(people) = &c.recommended_people {
                writeln!(out, "{RECOMMENDED_HEADING}")?;
                writeln!(out, "  {people}")?;
            }
            writeln!(out, "{}: {}", c.link.label, c.link.url)
        }
    }
}

/// Present `result` and write it to `out`.
///
/// Write failures are logged with the result shape and returned as
/// [`RenderError::Unknown`] so the caller decides what the user sees.
pub fn display_product(out: &mut dyn Write, result: &RetrievalResult, assets: &AssetResolver) -> Result<(), RenderError> {
    let panel = present(result, assets);
    write_panel(out, &panel).and_then(|_| out.flush()).map_err(|e| {
        let shape = result.shape();
        error!(shape = %shape, top_row = ?result.top().map(|d| d.row), error = %e, "failed to render product panel");
        RenderError::Unknown { shape, message: e.to_string() }
    })
}

/// Greeting and input examples shown before the first query.
pub fn write_greeting(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{GREETING}")?;
    writeln!(out, "入力例")?;
    for example in INPUT_EXAMPLES {
        writeln!(out, "  - 「{example}」")?;
    }
    Ok(())
}
