//! # メール送信ハンドラ
//!
//! - `POST /api/mail/send`: フォーム送信を受け付け、メールを配信する
//! - `GET /api/mail/health`: 稼働確認（プレーンテキスト）
//!
//! リクエストボディは camelCase の JSON。`appCode` と `mailType` は文字列で受け取り、
//! 大文字小文字を区別せずにパースする（未知の値は `INVALID_ARGUMENT`）。

use std::{collections::BTreeMap, sync::Arc};

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use chrono::Utc;
use mailrelay_domain::{
    MailError,
    submission::{AppCode, FileAttachment, MailType, Submission},
};
use mailrelay_shared::MailResponse;
use serde::Deserialize;

use crate::{error::ServiceError, usecase::DispatchService};

/// 送信成功時のメッセージ
pub const SUCCESS_MESSAGE: &str = "Email envoyé avec succès";

/// 稼働確認のレスポンス本文
pub const HEALTH_MESSAGE: &str = "Email service is running";

/// メールハンドラの State
pub struct MailState {
    pub dispatch: DispatchService,
}

/// 送信リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    pub app_code:        String,
    pub mail_type:       String,
    pub name:            String,
    pub email:           String,
    pub phone:           Option<String>,
    pub message:         String,
    pub subject:         Option<String>,
    pub company:         Option<String>,
    /// ハニーポット
    pub website:         Option<String>,
    #[serde(default)]
    pub additional_data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub attachments:     Vec<FileAttachmentDto>,
    pub recaptcha_token: Option<String>,
}

/// 添付ファイル（Base64）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachmentDto {
    pub filename:    String,
    pub content:     String,
    pub mime_type:   String,
    pub description: Option<String>,
}

impl From<FileAttachmentDto> for FileAttachment {
    fn from(dto: FileAttachmentDto) -> Self {
        Self {
            filename:    dto.filename,
            content:     dto.content,
            mime_type:   dto.mime_type,
            description: dto.description,
        }
    }
}

impl TryFrom<SendMailRequest> for Submission {
    type Error = MailError;

    fn try_from(request: SendMailRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            app_code:        AppCode::parse(&request.app_code)?,
            mail_type:       MailType::parse(&request.mail_type)?,
            name:            request.name,
            email:           request.email,
            phone:           request.phone,
            message:         request.message,
            subject:         request.subject,
            company:         request.company,
            website:         request.website,
            additional_data: request.additional_data,
            attachments:     request.attachments.into_iter().map(Into::into).collect(),
            recaptcha_token: request.recaptcha_token,
        })
    }
}

/// フォーム送信を受け付ける
///
/// ディスパッチは別タスクで実行し、パニックは `INTERNAL_ERROR` として返す。
#[tracing::instrument(skip_all)]
pub async fn send_mail(
    State(state): State<Arc<MailState>>,
    payload: Result<Json<SendMailRequest>, JsonRejection>,
) -> Result<Json<MailResponse>, ServiceError> {
    let Json(request) = payload.map_err(|e| ServiceError::InvalidRequest(e.body_text()))?;
    tracing::info!(
        app_code = %request.app_code,
        mail_type = %request.mail_type,
        "メール送信リクエストを受信"
    );

    let submission = Submission::try_from(request)?;

    let reference_number = tokio::spawn(async move { state.dispatch.dispatch(submission).await })
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))??;

    Ok(Json(MailResponse::success(
        SUCCESS_MESSAGE,
        reference_number.into_string(),
        Utc::now(),
    )))
}

/// 稼働確認
pub async fn mail_health() -> &'static str {
    HEALTH_MESSAGE
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_request_json() -> serde_json::Value {
        serde_json::json!({
            "appCode": "assurantis",
            "mailType": "QUOTE_REQUEST",
            "name": "Jean Dupont",
            "email": "jean@example.be",
            "message": "Je souhaite un devis auto.",
            "website": "",
            "additionalData": { "insuranceType": "auto" },
            "attachments": [
                { "filename": "carte.png", "content": "iVBORw0KGgo=", "mimeType": "image/png" }
            ]
        })
    }

    #[test]
    fn test_camel_caseのリクエストをsubmissionに変換する() {
        let request: SendMailRequest = serde_json::from_value(make_request_json()).unwrap();

        let submission = Submission::try_from(request).unwrap();

        assert_eq!(submission.app_code, AppCode::Assurantis);
        assert_eq!(submission.mail_type, MailType::QuoteRequest);
        assert_eq!(submission.website.as_deref(), Some(""));
        assert_eq!(
            submission.additional_data.get("insuranceType"),
            Some(&serde_json::json!("auto"))
        );
        assert_eq!(submission.attachments.len(), 1);
        assert_eq!(submission.attachments[0].mime_type, "image/png");
        assert_eq!(submission.attachments[0].description, None);
    }

    #[test]
    fn test_未知のapp_codeはinvalid_argument() {
        let mut json = make_request_json();
        json["appCode"] = serde_json::json!("ACME");
        let request: SendMailRequest = serde_json::from_value(json).unwrap();

        let err = Submission::try_from(request).unwrap_err();

        assert_eq!(err, MailError::invalid_argument("Code application invalide: ACME"));
    }

    #[test]
    fn test_任意項目は省略できる() {
        let request: SendMailRequest = serde_json::from_value(serde_json::json!({
            "appCode": "GILMOTECH",
            "mailType": "CONTACT_FORM",
            "name": "Marie",
            "email": "marie@example.be",
            "message": "Bonjour à toute l'équipe"
        }))
        .unwrap();

        let submission = Submission::try_from(request).unwrap();

        assert!(submission.attachments.is_empty());
        assert!(submission.additional_data.is_empty());
        assert!(!submission.is_honeypot_filled());
    }
}
