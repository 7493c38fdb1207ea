//! # Mail Service 設定
//!
//! 環境変数から Mail Service サーバーの設定を読み込む。

use std::{env, num::NonZeroU64, path::PathBuf, str::FromStr, time::Duration};

use mailrelay_infra::notification::SmtpSettings;
use thiserror::Error;

/// CORS で許可するオリジン（`CORS_ALLOWED_ORIGINS` 未設定時）
const DEFAULT_CORS_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:4200",
    "https://assurantis.be",
    "https://www.assurantis.be",
];

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 値をパースできない
    #[error("{name} の値が不正です: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Mail Service サーバーの設定
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// 配信プロファイルファイルのパス
    pub delivery_profiles_path: PathBuf,
    /// CORS で許可するオリジン
    pub cors_allowed_origins: Vec<String>,
    /// レート制限設定
    pub rate_limit: RateLimitConfig,
    /// 通知設定
    pub notification: NotificationConfig,
}

/// レート制限の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// 無効の場合は全リクエストを通し、記録もしない
    pub enabled:        bool,
    /// 1 時間あたりの上限（IP ごと）
    pub max_per_hour:   usize,
    /// 期限切れウィンドウの掃除間隔
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled:        true,
            max_per_hour:   10,
            sweep_interval: Duration::from_secs(600),
        }
    }
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    /// SMTP サーバー経由で送信
    Smtp,
    /// 送信しない（ログ出力のみ）
    Noop,
}

impl FromStr for NotificationBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "noop" => Ok(Self::Noop),
            _ => Err(()),
        }
    }
}

/// 通知機能の設定
///
/// `NOTIFICATION_BACKEND` 環境変数で送信バックエンドを切り替える。
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub backend: NotificationBackend,
    /// SMTP 接続設定（backend=smtp の場合に使用）
    pub smtp:    SmtpSettings,
}

impl ServiceConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = RateLimitConfig::default();

        Ok(Self {
            host: lookup("MAIL_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "MAIL_PORT", 8080)?,
            delivery_profiles_path: lookup("DELIVERY_PROFILES_PATH")
                .map_or_else(|| PathBuf::from("config/delivery_profiles.toml"), PathBuf::from),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS").map_or_else(
                || {
                    DEFAULT_CORS_ALLOWED_ORIGINS
                        .iter()
                        .map(ToString::to_string)
                        .collect()
                },
                |origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(ToString::to_string)
                        .collect()
                },
            ),
            rate_limit: RateLimitConfig {
                enabled:        parse_bool_or(&lookup, "RATE_LIMIT_ENABLED", defaults.enabled)?,
                max_per_hour:   parse_or(&lookup, "RATE_LIMIT_MAX_PER_HOUR", defaults.max_per_hour)?,
                sweep_interval: parse_secs_or(
                    &lookup,
                    "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                    defaults.sweep_interval,
                )?,
            },
            notification: NotificationConfig {
                backend: parse_or(&lookup, "NOTIFICATION_BACKEND", NotificationBackend::Noop)?,
                smtp:    SmtpSettings {
                    host:     lookup("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
                    port:     parse_or(&lookup, "SMTP_PORT", 1025)?,
                    username: lookup("SMTP_USERNAME").filter(|v| !v.is_empty()),
                    password: lookup("SMTP_PASSWORD").filter(|v| !v.is_empty()),
                    starttls: parse_bool_or(&lookup, "SMTP_STARTTLS", false)?,
                    timeout:  parse_secs_or(&lookup, "SMTP_TIMEOUT_SECS", Duration::from_secs(30))?,
                },
            },
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}

/// 秒数を 1 以上の [`Duration`] として読み込む
///
/// 0 は `tokio::time::interval` や SMTP タイムアウトで使えないため不正な値とする。
fn parse_secs_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<NonZeroU64>()
            .map(|secs| Duration::from_secs(secs.get()))
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
