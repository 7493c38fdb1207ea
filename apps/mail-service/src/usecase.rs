//! # ユースケース
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによる HTML 生成
//! - [`dispatch`] - 検証 + レンダリング + 送信を統合するディスパッチサービス

pub mod dispatch;
pub mod template_renderer;

pub use dispatch::DispatchService;
pub use template_renderer::{MailRenderer, TemplateRenderer};
