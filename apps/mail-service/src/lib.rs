//! # Mail Service ライブラリ
//!
//! フォーム送信を受け付け、配信プロファイルに従ってメールを送る HTTP サーバーのコアモジュール。
//!
//! ## モジュール構成
//!
//! - `app_builder`: ルーター構築
//! - `config`: 環境変数からの設定読み込み
//! - `error`: HTTP レスポンスへのエラー変換
//! - `handler`: HTTP ハンドラ
//! - `middleware`: レート制限ミドルウェア
//! - `rate_limit`: クライアント IP ごとのスライディングウィンドウ
//! - `usecase`: テンプレートレンダリングとディスパッチ

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod rate_limit;
pub mod usecase;

#[cfg(test)]
mod test_utils;
