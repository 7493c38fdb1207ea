//! # 通知
//!
//! 送信するメールメッセージと送信エラーを定義する。
//!
//! ## 設計方針
//!
//! - **送信手段から独立**: [`EmailMessage`] は SMTP の表現に依存しない。
//!   MIME の組み立ては infra 層の `NotificationSender` 実装が担当する
//! - **2 種類のメール**: 管理者宛と送信者への確認メールは同じ型で表現し、
//!   失敗時の扱いの違いはディスパッチ側が決める

use thiserror::Error;

use crate::attachment::ValidatedAttachment;

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

/// 送信元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub address: String,
    pub name:    String,
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。NotificationSender に渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from:        Sender,
    /// 宛先（1 件以上）
    pub to:          Vec<String>,
    pub cc:          Vec<String>,
    pub bcc:         Vec<String>,
    pub reply_to:    Option<String>,
    pub subject:     String,
    /// HTML 本文
    pub html_body:   String,
    /// プレーンテキスト本文
    pub text_body:   String,
    pub attachments: Vec<ValidatedAttachment>,
}

impl EmailMessage {
    /// 全受信者（To, Cc, Bcc）を順に返す
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
    }

    /// 指定したアドレスが受信者に含まれるか
    pub fn is_addressed_to(&self, address: &str) -> bool {
        self.recipients()
            .any(|r| r.eq_ignore_ascii_case(address))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_message() -> EmailMessage {
        EmailMessage {
            from:        Sender {
                address: "contact@assurantis.be".to_string(),
                name:    "Assurantis".to_string(),
            },
            to:          vec!["contact@assurantis.be".to_string()],
            cc:          vec!["manager@assurantis.be".to_string()],
            bcc:         vec!["archive@assurantis.be".to_string()],
            reply_to:    Some("jean@example.be".to_string()),
            subject:     "Nouveau message de contact - Assurantis".to_string(),
            html_body:   "<p>Bonjour</p>".to_string(),
            text_body:   "Bonjour".to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_受信者はto_cc_bccの順に列挙される() {
        let message = make_message();

        let recipients: Vec<_> = message.recipients().collect();

        assert_eq!(
            recipients,
            vec![
                "contact@assurantis.be",
                "manager@assurantis.be",
                "archive@assurantis.be",
            ]
        );
    }

    #[test]
    fn test_受信者判定は大文字小文字を区別しない() {
        let message = make_message();

        assert!(message.is_addressed_to("Archive@Assurantis.be"));
        assert!(!message.is_addressed_to("jean@example.be"));
    }
}
