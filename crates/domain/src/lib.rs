//! # Mailrelay ドメイン層
//!
//! フォーム送信をメール通知に変換するためのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋なビジネスルール**: HTTP・SMTP・ファイル I/O には依存しない
//! - **不変の値**: 配信プロファイルや送信内容は構築後に変更しない
//! - **エラーコード**: クライアントに返すエラーコードはドメインで閉じた集合として定義する
//!
//! ## 依存関係の方向
//!
//! ```text
//! mail-service → infra → domain
//!        ↘                 ↑
//!          ───────────────
//! ```
//!
//! ## モジュール構成
//!
//! - [`submission`] - フォーム送信（アプリケーションコード、メール種別、添付ファイル）
//! - [`attachment`] - 添付ファイルの検証（MIME タイプ、Base64、サイズ上限）
//! - [`delivery_profile`] - (アプリケーション, メール種別) ごとの配信プロファイルと解決
//! - [`template_variables`] - テンプレート変数の構築とサニタイズ
//! - [`reference_number`] - 受付番号の採番
//! - [`notification`] - 送信するメールメッセージ
//! - [`error`] - エラーコードとドメインエラー
//! - [`clock`] - 時刻プロバイダ

pub mod attachment;
pub mod clock;
pub mod delivery_profile;
pub mod error;
pub mod notification;
pub mod reference_number;
pub mod submission;
pub mod template_variables;

pub use error::{ErrorCode, MailError};
