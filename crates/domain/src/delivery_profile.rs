//! # 配信プロファイル
//!
//! (アプリケーションコード, メール種別) ごとの配信設定と、その解決を定義する。
//!
//! ## 設計方針
//!
//! - **不変**: プロファイルは起動時に一度だけ構築され、以後変更されない
//! - **読み取り専用のレジストリ**: [`DeliveryProfileRegistry`] は構築後に共有されるだけなのでロック不要
//! - **非アクティブ = 未定義**: 無効化されたプロファイルは存在しないものとして扱う
//!
//! 解決失敗は設定不備であり一時的な障害ではないため、`INVALID_ARGUMENT` として返す。

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    error::MailError,
    submission::{AppCode, MailType},
};

/// プロファイルのキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub app_code:  AppCode,
    pub mail_type: MailType,
}

/// 配信プロファイルの構築パラメータ
#[derive(Debug, Clone)]
pub struct NewDeliveryProfile {
    pub app_code: AppCode,
    pub mail_type: MailType,
    pub from_address: String,
    pub from_name: String,
    pub to_addresses: Vec<String>,
    pub cc_addresses: Vec<String>,
    pub bcc_addresses: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub template_path: String,
    pub confirmation_template_path: Option<String>,
    pub active: bool,
}

/// 配信プロファイル
///
/// 送信元、宛先、件名、テンプレート識別子をまとめた不変の値。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryProfile {
    app_code: AppCode,
    mail_type: MailType,
    from_address: String,
    from_name: String,
    to_addresses: Vec<String>,
    cc_addresses: Vec<String>,
    bcc_addresses: Vec<String>,
    reply_to: Option<String>,
    subject: String,
    template_path: String,
    confirmation_template_path: Option<String>,
    active: bool,
}

impl DeliveryProfile {
    pub fn new(params: NewDeliveryProfile) -> Self {
        Self {
            app_code: params.app_code,
            mail_type: params.mail_type,
            from_address: params.from_address,
            from_name: params.from_name,
            to_addresses: params.to_addresses,
            cc_addresses: params.cc_addresses,
            bcc_addresses: params.bcc_addresses,
            reply_to: params.reply_to.filter(|r| !r.is_empty()),
            subject: params.subject,
            template_path: params.template_path,
            confirmation_template_path: params
                .confirmation_template_path
                .filter(|p| !p.is_empty()),
            active: params.active,
        }
    }

    pub fn key(&self) -> ProfileKey {
        ProfileKey {
            app_code:  self.app_code,
            mail_type: self.mail_type,
        }
    }

    pub fn app_code(&self) -> AppCode {
        self.app_code
    }

    pub fn mail_type(&self) -> MailType {
        self.mail_type
    }

    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    pub fn from_name(&self) -> &str {
        &self.from_name
    }

    pub fn to_addresses(&self) -> &[String] {
        &self.to_addresses
    }

    pub fn cc_addresses(&self) -> &[String] {
        &self.cc_addresses
    }

    pub fn bcc_addresses(&self) -> &[String] {
        &self.bcc_addresses
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn template_path(&self) -> &str {
        &self.template_path
    }

    pub fn confirmation_template_path(&self) -> Option<&str> {
        self.confirmation_template_path.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 確認メールの Reply-To（未設定なら送信元アドレス）
    pub fn confirmation_reply_to(&self) -> &str {
        self.reply_to().unwrap_or(&self.from_address)
    }

    /// 管理者宛メールの件名
    ///
    /// 添付ファイルがある場合は件数を付記する。
    pub fn admin_subject(&self, attachment_count: usize) -> String {
        if attachment_count == 0 {
            self.subject.clone()
        } else {
            format!("{} ({attachment_count} pièce(s) jointe(s))", self.subject)
        }
    }

    /// 確認メールの件名
    ///
    /// 管理者宛の件名の定型句を利用者向けに置き換える。
    pub fn confirmation_subject(&self) -> String {
        self.subject
            .replace("Nouveau message", "Confirmation de votre message")
            .replace("Nouvelle demande", "Confirmation de votre demande")
    }
}

/// プロファイルのキー重複
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("配信プロファイルが重複しています: {app_code} / {mail_type}")]
pub struct DuplicateProfileError {
    pub app_code:  AppCode,
    pub mail_type: MailType,
}

/// 配信プロファイルのレジストリ（設定リゾルバ）
///
/// 起動時に構築し、`Arc` で共有する。
#[derive(Debug, Clone, Default)]
pub struct DeliveryProfileRegistry {
    profiles: HashMap<ProfileKey, DeliveryProfile>,
}

impl DeliveryProfileRegistry {
    /// プロファイル一覧からレジストリを構築する
    ///
    /// 同じキーのプロファイルが複数ある場合はエラー。
    pub fn new(
        profiles: impl IntoIterator<Item = DeliveryProfile>,
    ) -> Result<Self, DuplicateProfileError> {
        let mut map = HashMap::new();
        for profile in profiles {
            let key = profile.key();
            if map.insert(key, profile).is_some() {
                return Err(DuplicateProfileError {
                    app_code:  key.app_code,
                    mail_type: key.mail_type,
                });
            }
        }
        Ok(Self { profiles: map })
    }

    /// アクティブなプロファイルを解決する
    pub fn resolve(
        &self,
        app_code: AppCode,
        mail_type: MailType,
    ) -> Result<&DeliveryProfile, MailError> {
        self.profiles
            .get(&ProfileKey {
                app_code,
                mail_type,
            })
            .filter(|p| p.is_active())
            .ok_or_else(|| {
                MailError::invalid_argument(format!(
                    "Configuration non trouvée pour {app_code} / {mail_type}"
                ))
            })
    }

    /// 登録されているプロファイル数（非アクティブを含む）
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// アクティブなプロファイル数
    pub fn active_count(&self) -> usize {
        self.active_profiles().count()
    }

    /// アクティブなプロファイルを走査する（順序は不定）
    pub fn active_profiles(&self) -> impl Iterator<Item = &DeliveryProfile> {
        self.profiles.values().filter(|p| p.is_active())
    }
}
