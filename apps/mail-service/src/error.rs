//! # Mail Service エラー定義
//!
//! Mail Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! | エラー | ステータス | `errorCode` |
//! |--------|-----------|-------------|
//! | [`MailError`] | 400 | 各バリアントのコード |
//! | 不正なリクエストボディ | 400 | `INVALID_ARGUMENT` |
//! | レート制限超過 | 429 | `RATE_LIMIT_EXCEEDED` |
//! | 内部エラー | 500 | `INTERNAL_ERROR`（詳細はクライアントに返さない） |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use mailrelay_domain::{ErrorCode, MailError};
use mailrelay_shared::{MailResponse, event_log::error::category};
use thiserror::Error;

/// レート制限超過時のメッセージ
pub const RATE_LIMIT_MESSAGE: &str = "Trop de requêtes. Veuillez réessayer plus tard.";

/// 内部エラー時のメッセージ
pub const INTERNAL_ERROR_MESSAGE: &str = "Une erreur s'est produite lors de l'envoi";

/// Mail Service で発生するエラー
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 送信パイプラインのエラー
    #[error(transparent)]
    Mail(#[from] MailError),

    /// リクエストボディをデシリアライズできない
    #[error("不正なリクエスト: {0}")]
    InvalidRequest(String),

    /// レート制限超過
    #[error("レート制限を超過しました")]
    RateLimited,

    /// 分類できない内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl ServiceError {
    /// レスポンスのステータスとエラーコード
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            Self::Mail(e) => (StatusCode::BAD_REQUEST, e.code()),
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidArgument),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, ErrorCode::RateLimitExceeded),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Mail(e) => {
                // 管理者宛の送信失敗はディスパッチ側で原因の種別とともに記録済み
                if !matches!(e, MailError::AdminSendFailed { .. }) {
                    tracing::warn!(error_code = %code, error = %e, "送信リクエストを拒否");
                }
                e.to_string()
            }
            Self::InvalidRequest(detail) => {
                tracing::warn!(detail = %detail, "リクエストボディが不正");
                detail.clone()
            }
            Self::RateLimited => RATE_LIMIT_MESSAGE.to_string(),
            Self::Internal(detail) => {
                tracing::error!(
                    error.category = category::INTERNAL,
                    detail = %detail,
                    "内部エラー"
                );
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };

        let code: &'static str = code.into();
        (status, Json(MailResponse::error(message, code, Utc::now()))).into_response()
    }
}
