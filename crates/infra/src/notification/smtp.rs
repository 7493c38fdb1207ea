//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 本番では STARTTLS リレーに認証付きで接続し、
//! 開発環境では Mailpit（ローカル SMTP サーバー）に平文で接続する。
//!
//! MIME 構造:
//!
//! ```text
//! multipart/mixed            ← 添付ファイルがある場合のみ
//! ├── multipart/alternative
//! │   ├── text/plain
//! │   └── text/html
//! └── 添付ファイル × N
//! ```

use std::{fmt, time::Duration};

use async_trait::async_trait;
use lettre::{
    Address,
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Attachment, Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use mailrelay_domain::notification::{EmailMessage, NotificationError};

use super::NotificationSender;
use crate::error::InfraError;

/// SMTP 接続設定
///
/// `Debug` 出力ではパスワードを伏せる。
#[derive(Clone)]
pub struct SmtpSettings {
    pub host:     String,
    pub port:     u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// STARTTLS でリレーに接続するか
    pub starttls: bool,
    /// 接続・コマンドのタイムアウト
    pub timeout:  Duration,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("starttls", &self.starttls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// ユーザー名とパスワードは両方指定した場合のみ認証に使用する。
    pub fn new(settings: &SmtpSettings) -> Result<Self, InfraError> {
        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| InfraError::transport(e.to_string()))?
        } else {
            // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };

        let builder = builder
            .port(settings.port)
            .timeout(Some(settings.timeout));

        let builder = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(InfraError::transport(
                    "SMTP_USERNAME と SMTP_PASSWORD は両方指定する必要があります",
                ));
            }
            (None, None) => builder,
        };

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}

fn parse_address(address: &str, field: &str) -> Result<Address, NotificationError> {
    address
        .parse()
        .map_err(|e| NotificationError::SendFailed(format!("{field} アドレス不正 ({address}): {e}")))
}

fn mailbox(address: &str, field: &str) -> Result<Mailbox, NotificationError> {
    Ok(Mailbox::new(None, parse_address(address, field)?))
}

/// [`EmailMessage`] から MIME メッセージを組み立てる
fn build_message(email: &EmailMessage) -> Result<Message, NotificationError> {
    let from = Mailbox::new(
        Some(email.from.name.clone()),
        parse_address(&email.from.address, "送信元")?,
    );

    let mut builder = Message::builder().from(from).subject(&email.subject);
    for to in &email.to {
        builder = builder.to(mailbox(to, "宛先")?);
    }
    for cc in &email.cc {
        builder = builder.cc(mailbox(cc, "Cc")?);
    }
    for bcc in &email.bcc {
        builder = builder.bcc(mailbox(bcc, "Bcc")?);
    }
    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(mailbox(reply_to, "Reply-To")?);
    }

    let alternative = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(email.text_body.clone()),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(email.html_body.clone()),
        );

    let body = if email.attachments.is_empty() {
        alternative
    } else {
        let mut mixed = MultiPart::mixed().multipart(alternative);
        for attachment in &email.attachments {
            let content_type = ContentType::parse(&attachment.mime_type).map_err(|e| {
                NotificationError::SendFailed(format!(
                    "添付ファイルの Content-Type 不正 ({}): {e}",
                    attachment.mime_type
                ))
            })?;
            tracing::debug!(
                filename = %attachment.filename,
                size = attachment.size(),
                "添付ファイルを追加"
            );
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        mixed
    };

    builder
        .multipart(body)
        .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
}
