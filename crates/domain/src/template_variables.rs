//! # テンプレート変数
//!
//! フォーム送信からメールテンプレートに渡す変数を構築する。
//!
//! ## 設計方針
//!
//! - **1 回だけエスケープ**: 自由記述欄は `<` `>` `"` `'` をエンティティに置き換える。
//!   `&` は置き換えないため、エスケープ済みの値に再適用しても変化しない
//! - **メールアドレスはそのまま**: 宛先として使うためエスケープしない
//! - **固定キー**: 受付番号と添付情報は追加データで上書きされないよう最後に設定する
//!
//! ## 変数一覧
//!
//! | キー | 内容 |
//! |------|------|
//! | `name` `phone` `message` `subject` `company` | エスケープ済みの自由記述（未入力は空文字列） |
//! | `email` | 送信者のメールアドレス |
//! | 追加データのキー | 文字列はエスケープ、それ以外はそのまま |
//! | `hasAttachments` `attachmentCount` `attachments` | 添付ファイルのメタデータ |
//! | `referenceNumber` | 受付番号 |

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::{clock::Clock, reference_number::ReferenceNumber, submission::Submission};

/// 受付番号のキー
pub const REFERENCE_NUMBER_KEY: &str = "referenceNumber";

/// プレーンテキスト本文の見出し
const PLAIN_TEXT_HEADER: &str = "Nouveau message de contact";

/// HTML 特殊文字をエスケープする
pub fn escape_html(input: &str) -> String {
    input
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn escape_optional(input: Option<&str>) -> String {
    input.map(escape_html).unwrap_or_default()
}

/// テンプレート変数
///
/// 送信ごとに新しく構築し、保存しない。
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateVariables {
    values:           BTreeMap<String, Value>,
    reference_number: ReferenceNumber,
}

impl TemplateVariables {
    /// フォーム送信から変数を構築し、受付番号を採番する
    pub fn build(submission: &Submission, clock: &dyn Clock) -> Self {
        let reference_number = ReferenceNumber::issue(submission.mail_type, clock);
        Self::with_reference_number(submission, reference_number)
    }

    /// 採番済みの受付番号で変数を構築する
    pub fn with_reference_number(
        submission: &Submission,
        reference_number: ReferenceNumber,
    ) -> Self {
        let mut values = BTreeMap::new();

        values.insert("name".to_string(), json!(escape_html(&submission.name)));
        values.insert("email".to_string(), json!(submission.email));
        values.insert(
            "phone".to_string(),
            json!(escape_optional(submission.phone.as_deref())),
        );
        values.insert(
            "message".to_string(),
            json!(escape_html(&submission.message)),
        );
        values.insert(
            "subject".to_string(),
            json!(escape_optional(submission.subject.as_deref())),
        );
        values.insert(
            "company".to_string(),
            json!(escape_optional(submission.company.as_deref())),
        );

        for (key, value) in &submission.additional_data {
            let value = match value {
                Value::String(s) => Value::String(escape_html(s)),
                other => other.clone(),
            };
            values.insert(key.clone(), value);
        }

        let attachments: Vec<Value> = submission
            .attachments
            .iter()
            .map(|a| {
                json!({
                    "filename": escape_html(&a.filename),
                    "mimeType": a.mime_type,
                    "description": escape_optional(a.description.as_deref()),
                })
            })
            .collect();
        values.insert(
            "hasAttachments".to_string(),
            json!(!submission.attachments.is_empty()),
        );
        values.insert(
            "attachmentCount".to_string(),
            json!(submission.attachments.len()),
        );
        values.insert("attachments".to_string(), Value::Array(attachments));

        values.insert(
            REFERENCE_NUMBER_KEY.to_string(),
            json!(reference_number.as_str()),
        );

        Self {
            values,
            reference_number,
        }
    }

    pub fn reference_number(&self) -> &ReferenceNumber {
        &self.reference_number
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// キー順に走査する
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// プレーンテキスト本文を生成する
    ///
    /// HTML を表示できないメールクライアント向けの代替本文。
    /// null と配列・オブジェクトは出力しない。
    pub fn to_plain_text(&self) -> String {
        let mut text = format!("{PLAIN_TEXT_HEADER}\n\n");
        for (key, value) in &self.values {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => continue,
            };
            text.push_str(&capitalize(key));
            text.push_str(": ");
            text.push_str(&rendered);
            text.push('\n');
        }
        text
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
