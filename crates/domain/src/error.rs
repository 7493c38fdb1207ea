//! # エラーコードとドメインエラー
//!
//! 送信パイプラインで発生するエラーと、クライアントに返すエラーコードを定義する。
//!
//! ## 設計方針
//!
//! - **閉じたコード集合**: [`ErrorCode`] はレスポンスの `errorCode` にそのまま出力される
//! - **1 エラー 1 コード**: [`MailError`] の各バリアントは必ず 1 つのコードに対応する
//! - **メッセージはクライアント向け**: フォーム利用者に表示されるため、メッセージはフランス語

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

/// クライアントに返すエラーコード
///
/// `SCREAMING_SNAKE_CASE` でシリアライズされる。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// ハニーポットが埋められていた
    SpamDetected,
    /// 許可されていない MIME タイプ
    InvalidFileType,
    /// Base64 としてデコードできない
    InvalidFileContent,
    /// 1 ファイルあたりの上限超過
    FileTooLarge,
    /// 添付ファイル合計の上限超過
    TotalSizeTooLarge,
    /// 管理者宛メールの送信失敗
    AdminSendFailed,
    /// 不正な引数（コード不正、配信プロファイル未定義）
    InvalidArgument,
    /// レート制限超過
    RateLimitExceeded,
    /// 添付ファイル処理の汎用エラー
    AttachmentError,
    /// 分類できない内部エラー
    InternalError,
}

/// 送信パイプラインのエラー
///
/// 確認メールの送信失敗はここに含めない（呼び出しを失敗させないため）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    /// ハニーポットが埋められていた
    #[error("Requête invalide")]
    SpamDetected,

    /// 許可されていない MIME タイプ
    #[error("Type de fichier non autorisé: {mime_type}")]
    InvalidFileType { mime_type: String },

    /// Base64 としてデコードできない
    #[error("Le contenu du fichier n'est pas en Base64 valide: {filename}")]
    InvalidFileContent { filename: String },

    /// 1 ファイルあたりの上限超過
    #[error(
        "Le fichier '{filename}' dépasse la taille maximale de 5MB (taille: {:.2} MB)",
        mebibytes(.size)
    )]
    FileTooLarge { filename: String, size: u64 },

    /// 添付ファイル合計の上限超過
    #[error(
        "La taille totale des fichiers dépasse 20MB (taille: {:.2} MB)",
        mebibytes(.size)
    )]
    TotalSizeTooLarge { size: u64 },

    /// 不正な引数
    #[error("{0}")]
    InvalidArgument(String),

    /// 管理者宛メールの送信失敗（レンダリング失敗を含む）
    #[error("Impossible d'envoyer l'email à l'admin")]
    AdminSendFailed { reason: String },
}

impl MailError {
    /// 対応するエラーコードを返す
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SpamDetected => ErrorCode::SpamDetected,
            Self::InvalidFileType { .. } => ErrorCode::InvalidFileType,
            Self::InvalidFileContent { .. } => ErrorCode::InvalidFileContent,
            Self::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            Self::TotalSizeTooLarge { .. } => ErrorCode::TotalSizeTooLarge,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::AdminSendFailed { .. } => ErrorCode::AdminSendFailed,
        }
    }

    /// 不正な引数エラーを生成する
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

fn mebibytes(size: &u64) -> f64 {
    *size as f64 / (1024.0 * 1024.0)
}
