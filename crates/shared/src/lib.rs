//! # Mailrelay 共有ユーティリティ
//!
//! このクレートは、Mailrelay プロジェクト全体で使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - ドメイン層に依存しない（エラーコードは文字列として受け取る）
//! - 外部クレートへの依存は最小限に抑える

pub mod event_log;
pub mod health;
pub mod mail_response;
pub mod observability;

pub use health::HealthResponse;
pub use mail_response::MailResponse;
