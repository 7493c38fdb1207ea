//! # レート制限ミドルウェア
//!
//! 送信エンドポイントへのリクエストをクライアント IP ごとに制限する。
//! それ以外のパスは素通しする。
//!
//! ## 使い方
//!
//! ```rust,ignore
//! use axum::middleware::from_fn_with_state;
//!
//! Router::new()
//!     .route("/api/mail/send", post(send_mail))
//!     .layer(from_fn_with_state(rate_limiter, enforce_rate_limit))
//! ```
//!
//! ## クライアント IP の決定
//!
//! 空でない最初の値を使う:
//!
//! 1. `X-Forwarded-For`（カンマ区切りの先頭）
//! 2. `X-Real-IP`
//! 3. 接続元アドレス（`ConnectInfo`）

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mailrelay_shared::{event_log::event, log_business_event};

use crate::{error::ServiceError, rate_limit::RateLimiter};

/// レート制限の対象パス
pub const RATE_LIMITED_PATH: &str = "/api/mail/send";

/// クライアント IP が特定できない場合のキー
const UNKNOWN_CLIENT: &str = "unknown";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// リクエストからクライアント IP を決定する
pub fn client_ip(request: &Request<Body>) -> String {
    let headers = request.headers();

    let forwarded = header_value(headers, "x-forwarded-for").and_then(|forwarded| {
        forwarded
            .split(',')
            .map(str::trim)
            .find(|ip| !ip.is_empty())
    });
    if let Some(first) = forwarded {
        return first.to_string();
    }

    if let Some(real_ip) = header_value(headers, "x-real-ip") {
        return real_ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(
            || UNKNOWN_CLIENT.to_string(),
            |ConnectInfo(addr)| addr.ip().to_string(),
        )
}

/// レート制限ミドルウェア
///
/// 上限を超えた場合は 429 と `RATE_LIMIT_EXCEEDED` を返し、後続のハンドラを呼ばない。
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.is_enabled() || !request.uri().path().starts_with(RATE_LIMITED_PATH) {
        return next.run(request).await;
    }

    let client_ip = client_ip(&request);
    if !limiter.try_acquire(&client_ip) {
        log_business_event!(
            event.category = event::category::RATE_LIMIT,
            event.action = event::action::RATE_LIMIT_EXCEEDED,
            event.result = event::result::FAILURE,
            event.client_ip = %client_ip,
            max_per_hour = limiter.max_per_hour(),
            "レート制限を超過"
        );
        return ServiceError::RateLimited.into_response();
    }

    next.run(request).await
}
