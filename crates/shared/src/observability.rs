//! # ログ出力の初期化
//!
//! Mail Service のトレーシング購読者を組み立てる。
//!
//! | 環境変数 | 役割 |
//! |----------|------|
//! | `RUST_LOG` | ログレベルのフィルタ（未設定なら [`DEFAULT_ENV_FILTER`]） |
//! | `LOG_FORMAT` | `json`（本番）または `pretty`（開発） |
//!
//! JSON 出力ではイベントのフィールドをトップレベルに展開するため、
//! [`log_business_event!`](crate::log_business_event) の `event.*` フィールドを
//! そのままログ基盤で検索できる。

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_ENV_FILTER: &str = "info,mailrelay=debug,tower_http=info";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 JSON（本番環境向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式を決める
    ///
    /// 大文字小文字と前後の空白は無視する。
    /// 不明な値は stderr に警告を出して [`Pretty`](LogFormat::Pretty) にする。
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => {
                eprintln!("WARNING: unknown LOG_FORMAT={s:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT").map_or_else(|_| Self::default(), |val| Self::parse(&val))
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// サービス名（起動時のログに出力）
    pub service_name:   String,
    pub log_format:     LogFormat,
    /// `RUST_LOG` 未設定時に使うフィルタ
    pub default_filter: String,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            default_filter: DEFAULT_ENV_FILTER.to_string(),
        }
    }

    /// 環境変数 `LOG_FORMAT` から設定を読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }

    /// `RUST_LOG` 未設定時のフィルタを差し替える
    #[must_use]
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    /// 実際に使うフィルタ式を決める
    ///
    /// 空の `RUST_LOG` は未設定として扱う。
    pub fn filter_directives(&self, rust_log: Option<&str>) -> String {
        rust_log
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.default_filter)
            .to_string()
    }
}

/// トレーシングを初期化する
///
/// サービス名は呼び出し元の `tracing::info_span!("app", service = "...")` で
/// `span.service` として JSON に含まれる。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = config.filter_directives(rust_log.as_deref());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("WARNING: invalid RUST_LOG={directives:?} ({e}), falling back to default");
        tracing_subscriber::EnvFilter::new(&config.default_filter)
    });

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "トレーシングを初期化しました"
    );
}
