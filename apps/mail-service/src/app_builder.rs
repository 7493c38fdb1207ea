//! # Mail Service アプリケーション構築
//!
//! State の初期化とルーター構築を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。
//!
//! ## ルート
//!
//! | メソッド | パス | 説明 |
//! |---------|------|------|
//! | POST | `/api/mail/send` | フォーム送信（レート制限あり） |
//! | GET | `/api/mail/health` | 稼働確認（プレーンテキスト） |
//! | GET | `/health` | Liveness Check（JSON） |

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::ServiceConfig,
    handler::{MailState, health_check, mail_health, send_mail},
    middleware::enforce_rate_limit,
    rate_limit::RateLimiter,
    usecase::DispatchService,
};

/// CORS プリフライトのキャッシュ期間
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// ルーターを構築する
pub fn build_app(
    config: &ServiceConfig,
    dispatch: DispatchService,
    rate_limiter: Arc<RateLimiter>,
) -> Router {
    let mail_state = Arc::new(MailState { dispatch });

    // レート制限ミドルウェアは送信パスのみを対象にする
    let api = Router::new()
        .route("/api/mail/send", post(send_mail))
        .route("/api/mail/health", get(mail_health))
        .with_state(mail_state)
        .layer(from_fn_with_state(rate_limiter, enforce_rate_limit))
        .layer(cors_layer(&config.cors_allowed_origins));

    Router::new()
        .route("/health", get(health_check))
        .merge(api)
        .layer(TraceLayer::new_for_http())
}

/// CORS レイヤーを構築する
///
/// 資格情報を許可するため、許可ヘッダーはワイルドカードではなくリクエストをミラーする。
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "不正な CORS オリジンを無視");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}
