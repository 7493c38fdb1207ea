//! # 配信プロファイルの読み込み
//!
//! TOML ファイルから配信プロファイルを読み込み、
//! [`DeliveryProfileRegistry`] を構築する。起動時に一度だけ呼び出す。
//!
//! ## ファイル形式
//!
//! ```toml
//! [[profiles]]
//! app_code = "ASSURANTIS"
//! mail_type = "CONTACT_FORM"
//! from_address = "contact@assurantis.be"
//! from_name = "Assurantis"
//! to_addresses = ["contact@assurantis.be"]
//! reply_to = "contact@assurantis.be"
//! subject = "Nouveau message de contact - Assurantis"
//! template_path = "email/assurantis/contact_admin"
//! confirmation_template_path = "email/assurantis/contact_confirmation"
//! ```
//!
//! `cc_addresses` / `bcc_addresses` は省略時に空、`active` は省略時に `true`。

use std::path::Path;

use config::{Config, File, FileFormat};
use mailrelay_domain::{
    delivery_profile::{DeliveryProfile, DeliveryProfileRegistry, NewDeliveryProfile},
    submission::{AppCode, MailType},
};
use serde::Deserialize;

use crate::error::InfraError;

#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: Vec<ProfileRecord>,
}

#[derive(Debug, Deserialize)]
struct ProfileRecord {
    app_code: String,
    mail_type: String,
    from_address: String,
    from_name: String,
    to_addresses: Vec<String>,
    #[serde(default)]
    cc_addresses: Vec<String>,
    #[serde(default)]
    bcc_addresses: Vec<String>,
    reply_to: Option<String>,
    subject: String,
    template_path: String,
    confirmation_template_path: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl TryFrom<ProfileRecord> for DeliveryProfile {
    type Error = InfraError;

    fn try_from(record: ProfileRecord) -> Result<Self, Self::Error> {
        let app_code =
            AppCode::parse(&record.app_code).map_err(|e| InfraError::invalid_profile(e.to_string()))?;
        let mail_type = MailType::parse(&record.mail_type)
            .map_err(|e| InfraError::invalid_profile(e.to_string()))?;

        if record.from_address.trim().is_empty() {
            return Err(InfraError::invalid_profile(format!(
                "{app_code} / {mail_type}: from_address が空です"
            )));
        }
        if record.to_addresses.is_empty() {
            return Err(InfraError::invalid_profile(format!(
                "{app_code} / {mail_type}: to_addresses が空です"
            )));
        }
        if record.template_path.trim().is_empty() {
            return Err(InfraError::invalid_profile(format!(
                "{app_code} / {mail_type}: template_path が空です"
            )));
        }

        Ok(DeliveryProfile::new(NewDeliveryProfile {
            app_code,
            mail_type,
            from_address: record.from_address,
            from_name: record.from_name,
            to_addresses: record.to_addresses,
            cc_addresses: record.cc_addresses,
            bcc_addresses: record.bcc_addresses,
            reply_to: record.reply_to,
            subject: record.subject,
            template_path: record.template_path,
            confirmation_template_path: record.confirmation_template_path,
            active: record.active,
        }))
    }
}

/// ファイルから配信プロファイルを読み込む
pub fn load_profiles(path: impl AsRef<Path>) -> Result<DeliveryProfileRegistry, InfraError> {
    let path = path.as_ref();
    let config = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml))
        .build()?;

    let registry = build_registry(config)?;
    tracing::info!(
        path = %path.display(),
        total = registry.len(),
        active = registry.active_count(),
        "配信プロファイルを読み込みました"
    );
    Ok(registry)
}

/// TOML 文字列から配信プロファイルを読み込む
pub fn parse_profiles(toml: &str) -> Result<DeliveryProfileRegistry, InfraError> {
    let config = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?;

    build_registry(config)
}

fn build_registry(config: Config) -> Result<DeliveryProfileRegistry, InfraError> {
    let file: ProfileFile = config.try_deserialize()?;

    let profiles = file
        .profiles
        .into_iter()
        .map(DeliveryProfile::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DeliveryProfileRegistry::new(profiles)?)
}
