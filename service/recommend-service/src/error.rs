use crate::assets::AssetNotFoundError;
use crate::config::ConfigError;
use crate::present::RenderError;

/// Appended to every message shown to the user after a failure.
pub const COMMON_ERROR_MESSAGE: &str = "このエラーが繰り返し発生する場合は、管理者にお問い合わせください。";

/// Join a user-facing error message with the administrator-contact sentence.
pub fn error_message(message: &str) -> String {
    [message, COMMON_ERROR_MESSAGE].join("\n")
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("catalog `{path}` produced no documents")]
    EmptyCatalog { path: String },
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("logging error: {0}")]
    Logging(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Asset(#[from] AssetNotFoundError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ServiceError {
    /// Steps the user can take to fix the failure, when there are any.
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::EmptyCatalog { .. } | Self::Catalog(_) => &[
                "1. 商品データファイル（既定: data/products.csv）が存在し、商品行を含んでいるか確認してください。",
                "2. 埋め込みモデルの設定（RECOMMEND_EMBEDDER / RECOMMEND_ONNX_MODEL）や認証情報が正しいか確認してください。",
                "3. 文字コードの設定（RECOMMEND_CATALOG_ENCODING）がファイルと一致しているか確認してください。",
            ],
            Self::Config(_) => &["設定値（.env または環境変数）を見直してください。"],
            _ => &[],
        }
    }

    /// Message for the end user: summary, remediation steps, contact sentence.
    pub fn user_message(&self) -> String {
        let summary = match self {
            Self::EmptyCatalog { .. } | Self::Catalog(_) => "商品データの読み込みに失敗しました。".to_string(),
            Self::Render(e) => e.user_message(),
            _ => format!("処理中にエラーが発生しました: {self}"),
        };
        let mut lines = vec![summary];
        lines.extend(self.remediation().iter().map(|s| s.to_string()));
        error_message(&lines.join("\n"))
    }
}
