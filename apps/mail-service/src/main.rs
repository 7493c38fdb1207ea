//! # Mail Service サーバー
//!
//! クライアントサイトのフォーム送信を受け付け、メール通知として配信する API サーバー。
//!
//! ## アーキテクチャ
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Web サイト   │────▶│ Mail Service │────▶│ SMTP リレー   │
//! │ (フォーム)    │     │  port: 8080  │     │              │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `MAIL_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `MAIL_PORT` | No | ポート番号（デフォルト: `8080`） |
//! | `DELIVERY_PROFILES_PATH` | No | 配信プロファイルファイル（デフォルト: `config/delivery_profiles.toml`） |
//! | `CORS_ALLOWED_ORIGINS` | No | 許可するオリジン（カンマ区切り） |
//! | `RATE_LIMIT_ENABLED` | No | レート制限の有効化（デフォルト: `true`） |
//! | `RATE_LIMIT_MAX_PER_HOUR` | No | IP ごとの 1 時間あたりの上限（デフォルト: `10`） |
//! | `RATE_LIMIT_SWEEP_INTERVAL_SECS` | No | 期限切れウィンドウの掃除間隔（デフォルト: `600`） |
//! | `NOTIFICATION_BACKEND` | No | `smtp` または `noop`（デフォルト: `noop`） |
//! | `SMTP_HOST` / `SMTP_PORT` | No | SMTP リレー（デフォルト: `localhost:1025`） |
//! | `SMTP_USERNAME` / `SMTP_PASSWORD` | No | SMTP 認証情報（両方指定した場合のみ使用） |
//! | `SMTP_STARTTLS` | No | STARTTLS の使用（デフォルト: `false`） |
//! | `SMTP_TIMEOUT_SECS` | No | SMTP タイムアウト（デフォルト: `30`） |
//! | `LOG_FORMAT` | No | `json` または `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（.env ファイルを使用、送信はログ出力のみ）
//! cargo run -p mailrelay-service
//!
//! # 本番環境
//! NOTIFICATION_BACKEND=smtp SMTP_HOST=smtp.example.be SMTP_STARTTLS=true \
//!   cargo run -p mailrelay-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use mailrelay_domain::{clock::SystemClock, delivery_profile::DeliveryProfileRegistry};
use mailrelay_infra::{
    notification::{NoopNotificationSender, NotificationSender, SmtpNotificationSender},
    profile_loader::load_profiles,
};
use mailrelay_service::{
    app_builder::build_app,
    config::{NotificationBackend, NotificationConfig, ServiceConfig},
    rate_limit::{RateLimiter, spawn_sweeper},
    usecase::{DispatchService, TemplateRenderer},
};
use mailrelay_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Mail Service サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. アプリケーション設定と配信プロファイルの読み込み
/// 4. 送信バックエンド・レート制限の初期化
/// 5. HTTP サーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("mail-service"));
    let _tracing_guard = tracing::info_span!("app", service = "mail-service").entered();

    let config = ServiceConfig::from_env().context("設定の読み込みに失敗しました")?;

    let profiles = load_profiles(&config.delivery_profiles_path).with_context(|| {
        format!(
            "配信プロファイルの読み込みに失敗しました: {}",
            config.delivery_profiles_path.display()
        )
    })?;
    let renderer = TemplateRenderer::new().context("テンプレートの登録に失敗しました")?;
    ensure_templates_exist(&profiles, &renderer)?;

    let sender = build_sender(&config.notification)?;

    let clock = Arc::new(SystemClock);
    let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit, clock.clone()));
    if rate_limiter.is_enabled() {
        spawn_sweeper(rate_limiter.clone(), config.rate_limit.sweep_interval);
    } else {
        tracing::warn!("レート制限は無効です");
    }

    let dispatch = DispatchService::new(sender, Arc::new(renderer), Arc::new(profiles), clock);
    let app = build_app(&config, dispatch, rate_limiter);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("バインドアドレスが不正です")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Mail Service サーバーを起動しました: {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// 送信バックエンドを構築する
fn build_sender(config: &NotificationConfig) -> anyhow::Result<Arc<dyn NotificationSender>> {
    match config.backend {
        NotificationBackend::Smtp => {
            tracing::info!(
                host = %config.smtp.host,
                port = config.smtp.port,
                starttls = config.smtp.starttls,
                "SMTP で送信します"
            );
            Ok(Arc::new(SmtpNotificationSender::new(&config.smtp)?))
        }
        NotificationBackend::Noop => {
            tracing::warn!("送信バックエンドが noop のため、メールは送信されません");
            Ok(Arc::new(NoopNotificationSender))
        }
    }
}

/// アクティブなプロファイルが参照するテンプレートが全て登録されているか検証する
fn ensure_templates_exist(
    profiles: &DeliveryProfileRegistry,
    renderer: &TemplateRenderer,
) -> anyhow::Result<()> {
    for profile in profiles.active_profiles() {
        let templates = std::iter::once(profile.template_path())
            .chain(profile.confirmation_template_path());
        for template in templates {
            if !renderer.has_template(template) {
                anyhow::bail!(
                    "テンプレートが見つかりません: {template} ({} / {})",
                    profile.app_code(),
                    profile.mail_type()
                );
            }
        }
    }
    Ok(())
}
