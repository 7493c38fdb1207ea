//! # インフラ層エラー定義
//!
//! 設定ファイルの読み込みや SMTP トランスポートの構築で発生するエラーを表現する。
//!
//! ## 設計方針
//!
//! - **エラーの変換**: `config::ConfigError` などをラップ
//! - **起動時エラー**: ここで扱うエラーの多くは起動時に発生し、プロセスを終了させる
//! - **SpanTrace 自動捕捉**: `From` 実装や convenience constructor で
//!   エラー生成時の呼び出し経路を自動記録する
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別

use std::fmt;

use derive_more::Display;
use mailrelay_domain::delivery_profile::DuplicateProfileError;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別（[`InfraErrorKind`]）と [`SpanTrace`]（呼び出し経路）を保持する。
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// 設定ファイルの読み込み・デシリアライズに失敗
    #[error("設定ファイルエラー: {0}")]
    Config(#[source] config::ConfigError),

    /// 配信プロファイルの値が不正
    #[error("配信プロファイルが不正です: {0}")]
    InvalidProfile(String),

    /// 配信プロファイルのキー重複
    #[error(transparent)]
    DuplicateProfile(DuplicateProfileError),

    /// SMTP トランスポートの構築に失敗
    #[error("SMTP トランスポートの構築に失敗: {0}")]
    Transport(String),
}

// ===== InfraError のメソッド =====

impl InfraError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// InfraError を分解して InfraErrorKind と SpanTrace を取り出す
    pub fn into_parts(self) -> (InfraErrorKind, SpanTrace) {
        (self.kind, self.span_trace)
    }

    // ===== Convenience constructors =====

    /// 不正な配信プロファイルエラーを生成する
    pub fn invalid_profile(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::InvalidProfile(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// トランスポート構築エラーを生成する
    pub fn transport(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Transport(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<config::ConfigError> for InfraError {
    fn from(source: config::ConfigError) -> Self {
        Self {
            kind:       InfraErrorKind::Config(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<DuplicateProfileError> for InfraError {
    fn from(source: DuplicateProfileError) -> Self {
        Self {
            kind:       InfraErrorKind::DuplicateProfile(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use mailrelay_domain::submission::{AppCode, MailType};
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// テスト用に ErrorLayer 付き subscriber を設定する
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_config_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_load_profiles");
            let _enter = span.enter();

            let err: InfraError = config::ConfigError::NotFound("profiles".to_string()).into();

            assert!(matches!(err.kind(), InfraErrorKind::Config(_)));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("test_load_profiles"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_invalid_profileでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_profile");
            let _enter = span.enter();

            let err = InfraError::invalid_profile("宛先が空です");

            assert!(matches!(
                err.kind(),
                InfraErrorKind::InvalidProfile(msg) if msg == "宛先が空です"
            ));
            assert!(format!("{}", err.span_trace()).contains("test_profile"));
        });
    }

    #[test]
    fn test_displayがinfra_error_kindのメッセージを出力する() {
        let err: InfraError = DuplicateProfileError {
            app_code:  AppCode::Gilmotech,
            mail_type: MailType::ContactForm,
        }
        .into();

        assert_eq!(
            format!("{err}"),
            "配信プロファイルが重複しています: GILMOTECH / CONTACT_FORM"
        );
    }

    #[test]
    fn test_sourceがinfra_error_kindに委譲する() {
        use std::error::Error;

        let err: InfraError = config::ConfigError::Message("bad".to_string()).into();
        assert!(err.source().is_some());

        let err = InfraError::transport("relay");
        assert!(err.source().is_none());
    }
}
