//! # フォーム送信
//!
//! クライアントアプリケーションから受け付けたフォーム送信を表現する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`AppCode`] | アプリケーションコード | 送信元のブランド・サイト |
//! | [`MailType`] | メール種別 | 問い合わせ、見積依頼、事故報告など |
//! | [`Submission`] | フォーム送信 | 1 リクエストにつき 1 つ。同期的に処理され、保存しない |
//! | [`FileAttachment`] | 添付ファイル | Base64 エンコード済みのファイル |
//!
//! コードのパースは大文字小文字を区別しない。未知の値は
//! [`MailError::InvalidArgument`] として扱う。

use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::error::MailError;

/// アプリケーションコード（送信元ブランド）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AppCode {
    Assurantis,
    Gilmotech,
}

impl AppCode {
    /// 文字列からパースする（大文字小文字を区別しない）
    pub fn parse(code: &str) -> Result<Self, MailError> {
        Self::from_str(code)
            .map_err(|_| MailError::invalid_argument(format!("Code application invalide: {code}")))
    }
}

/// メール種別（フォームの種類）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum MailType {
    ContactForm,
    QuoteRequest,
    NewsletterSubscription,
    AppointmentRequest,
    ClaimRequest,
}

impl MailType {
    /// 文字列からパースする（大文字小文字を区別しない）
    pub fn parse(value: &str) -> Result<Self, MailError> {
        Self::from_str(value)
            .map_err(|_| MailError::invalid_argument(format!("Type de mail invalide: {value}")))
    }
}

/// 添付ファイル
///
/// `content` は Base64 エンコードされたまま保持する。
/// デコードと検証は [`crate::attachment`] が担当する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename:    String,
    pub content:     String,
    pub mime_type:   String,
    pub description: Option<String>,
}

impl FileAttachment {
    /// ファイル名の拡張子（ドットを含む）。拡張子がなければ空文字列
    pub fn extension(&self) -> &str {
        self.filename
            .rfind('.')
            .map_or("", |pos| &self.filename[pos..])
    }

    /// 画像ファイルかどうか
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// フォーム送信
///
/// 受付時に構築され、ディスパッチ処理で消費される。永続化はしない。
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub app_code:        AppCode,
    pub mail_type:       MailType,
    pub name:            String,
    pub email:           String,
    pub phone:           Option<String>,
    pub message:         String,
    pub subject:         Option<String>,
    pub company:         Option<String>,
    /// ハニーポット（正規の利用者は空のまま送信する）
    pub website:         Option<String>,
    pub additional_data: BTreeMap<String, serde_json::Value>,
    pub attachments:     Vec<FileAttachment>,
    /// reCAPTCHA トークン（受け取るが検証しない）
    pub recaptcha_token: Option<String>,
}

impl Submission {
    /// ハニーポットが埋められているか
    pub fn is_honeypot_filled(&self) -> bool {
        self.website.as_deref().is_some_and(|w| !w.is_empty())
    }

    /// 添付ファイルを持つか
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}
