//! # Mailrelay インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **メール送信**: [`notification::NotificationSender`] の SMTP / Noop 実装
//! - **設定ファイル読み込み**: 配信プロファイルを TOML から読み込み、
//!   ドメインの [`DeliveryProfileRegistry`](mailrelay_domain::delivery_profile::DeliveryProfileRegistry) を構築する
//!
//! ## 依存関係
//!
//! ```text
//! mail-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`notification`] - メール送信の抽象と実装
//! - [`profile_loader`] - 配信プロファイルの読み込み
//! - [`error`] - インフラ層エラー定義
//! - `mock` - テスト用モック（`test-utils` feature）

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod profile_loader;

pub use error::{InfraError, InfraErrorKind};
