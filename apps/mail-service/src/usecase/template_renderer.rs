//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで配信プロファイルのテンプレートを HTML に変換する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **テンプレート識別子**: 配信プロファイルの `template_path`（例: `email/assurantis/contact_admin`）を
//!   そのまま tera のテンプレート名として使う
//! - **自動エスケープ無効**: 変数は [`TemplateVariables`] の構築時にエスケープ済み

use mailrelay_domain::{notification::NotificationError, template_variables::TemplateVariables};
use tera::{Context, Tera};

/// テンプレート識別子 → HTML の変換
///
/// ディスパッチ処理はこのトレイト越しにレンダリングする。
pub trait MailRenderer: Send + Sync {
    fn render(
        &self,
        template: &str,
        variables: &TemplateVariables,
    ) -> Result<String, NotificationError>;
}

/// 埋め込みテンプレート
const TEMPLATES: &[(&str, &str)] = &[
    (
        "email/assurantis/contact_admin",
        include_str!("../../templates/email/assurantis/contact_admin.html"),
    ),
    (
        "email/assurantis/contact_confirmation",
        include_str!("../../templates/email/assurantis/contact_confirmation.html"),
    ),
    (
        "email/assurantis/quote_admin",
        include_str!("../../templates/email/assurantis/quote_admin.html"),
    ),
    (
        "email/assurantis/quote_confirmation",
        include_str!("../../templates/email/assurantis/quote_confirmation.html"),
    ),
    (
        "email/assurantis/claim_admin",
        include_str!("../../templates/email/assurantis/claim_admin.html"),
    ),
    (
        "email/assurantis/claim_confirmation",
        include_str!("../../templates/email/assurantis/claim_confirmation.html"),
    ),
    (
        "email/gilmotech/contact",
        include_str!("../../templates/email/gilmotech/contact.html"),
    ),
];

/// tera によるテンプレートレンダラー
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// 埋め込みテンプレートを登録したレンダラーを作成する
    pub fn new() -> Result<Self, NotificationError> {
        let mut engine = Tera::default();
        engine.autoescape_on(vec![]);

        engine
            .add_raw_templates(TEMPLATES.iter().copied())
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine })
    }

    /// テンプレートが登録されているか
    pub fn has_template(&self, template: &str) -> bool {
        self.engine.get_template_names().any(|name| name == template)
    }
}

impl MailRenderer for TemplateRenderer {
    fn render(
        &self,
        template: &str,
        variables: &TemplateVariables,
    ) -> Result<String, NotificationError> {
        let mut context = Context::new();
        for (key, value) in variables.iter() {
            context.insert(key, value);
        }

        let html = self
            .engine
            .render(template, &context)
            .map_err(|e| NotificationError::TemplateFailed(format!("{template}: {e}")))?;

        tracing::debug!(template, "テンプレートを生成");
        Ok(html)
    }
}
