//! # ミドルウェア
//!
//! Mail Service 用のミドルウェアを提供する。

mod rate_limit;

pub use rate_limit::{RATE_LIMITED_PATH, client_ip, enforce_rate_limit};
