//! # HTTP ハンドラ
//!
//! ## モジュール構成
//!
//! - `health`: ヘルスチェック
//! - `mail`: メール送信と稼働確認

mod health;
mod mail;

pub use health::health_check;
pub use mail::{
    FileAttachmentDto,
    HEALTH_MESSAGE,
    MailState,
    SUCCESS_MESSAGE,
    SendMailRequest,
    mail_health,
    send_mail,
};
