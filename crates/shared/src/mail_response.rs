//! # メール送信 API のレスポンスエンベロープ
//!
//! 送信エンドポイントの成功・失敗に共通するレスポンス形式を提供する。
//!
//! ```json
//! {
//!   "success": false,
//!   "message": "Type de fichier non autorisé: application/zip",
//!   "timestamp": "2024-12-11T10:00:00Z",
//!   "errorCode": "INVALID_FILE_TYPE"
//! }
//! ```
//!
//! `errorCode` は成功時も `null` として出力する。
//! `referenceNumber` は成功時のみ出力する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// メール送信 API のレスポンス型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailResponse {
    pub success:          bool,
    pub message:          String,
    pub timestamp:        DateTime<Utc>,
    pub error_code:       Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
}

impl MailResponse {
    /// 成功レスポンスを作成する
    pub fn success(
        message: impl Into<String>,
        reference_number: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            timestamp,
            error_code: None,
            reference_number: Some(reference_number.into()),
        }
    }

    /// 失敗レスポンスを作成する
    pub fn error(
        message: impl Into<String>,
        error_code: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            timestamp,
            error_code: Some(error_code.into()),
            reference_number: None,
        }
    }
}
