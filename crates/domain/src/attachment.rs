//! # 添付ファイル検証
//!
//! フォーム送信に含まれる添付ファイルを検証し、デコード済みのバイト列を返す。
//!
//! ## 検証順序
//!
//! ファイルごとに以下の順で検証し、最初の違反で失敗する:
//!
//! 1. MIME タイプが許可リストに含まれるか → `INVALID_FILE_TYPE`
//! 2. 内容が Base64 としてデコードできるか → `INVALID_FILE_CONTENT`
//! 3. デコード後のサイズが 1 ファイルの上限以下か → `FILE_TOO_LARGE`
//!
//! 全ファイルが個別に通過した後、合計サイズを検証する → `TOTAL_SIZE_TOO_LARGE`
//!
//! 許可リストは完全一致で判定する（ワイルドカードなし）。

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::{error::MailError, submission::FileAttachment};

/// 許可する MIME タイプ
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// 1 ファイルあたりの上限: 5 MiB
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// 合計の上限: 20 MiB
pub const MAX_TOTAL_SIZE: u64 = 20 * 1024 * 1024;

/// 検証済み添付ファイル
///
/// メールのバイナリパートとしてそのまま添付できる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAttachment {
    pub filename:  String,
    pub mime_type: String,
    pub content:   Vec<u8>,
}

impl ValidatedAttachment {
    /// デコード後のサイズ（バイト）
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// MIME タイプが許可リストに含まれるか
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// 添付ファイルを検証する
///
/// 空のリストは何もせずに成功する。
pub fn validate_attachments(
    attachments: &[FileAttachment],
) -> Result<Vec<ValidatedAttachment>, MailError> {
    if attachments.is_empty() {
        return Ok(Vec::new());
    }

    let mut validated = Vec::with_capacity(attachments.len());
    let mut total_size: u64 = 0;

    for attachment in attachments {
        if !is_allowed_mime_type(&attachment.mime_type) {
            return Err(MailError::InvalidFileType {
                mime_type: attachment.mime_type.clone(),
            });
        }

        let content =
            BASE64
                .decode(&attachment.content)
                .map_err(|_| MailError::InvalidFileContent {
                    filename: attachment.filename.clone(),
                })?;

        let size = content.len() as u64;
        if size > MAX_FILE_SIZE {
            return Err(MailError::FileTooLarge {
                filename: attachment.filename.clone(),
                size,
            });
        }

        total_size += size;
        validated.push(ValidatedAttachment {
            filename: attachment.filename.clone(),
            mime_type: attachment.mime_type.clone(),
            content,
        });
    }

    if total_size > MAX_TOTAL_SIZE {
        return Err(MailError::TotalSizeTooLarge { size: total_size });
    }

    Ok(validated)
}
