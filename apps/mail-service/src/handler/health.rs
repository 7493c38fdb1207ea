//! # ヘルスチェックハンドラ
//!
//! `/health`: Liveness Check（常に `"healthy"` を返す）
//!
//! レスポンス型は [`mailrelay_shared::HealthResponse`] を参照。

use axum::Json;
use mailrelay_shared::HealthResponse;

/// Mail Service のヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
