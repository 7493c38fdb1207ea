//! # テスト用モック
//!
//! ユースケーステストや統合テストで使用するインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! mailrelay-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailrelay_domain::notification::{EmailMessage, NotificationError};

use crate::notification::NotificationSender;

// ===== MockNotificationSender =====

/// 送信したメールを記録するモック
///
/// 失敗させる宛先を登録すると、その宛先を含むメールの送信は
/// 記録されずに `SendFailed` を返す。
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent_emails:       Arc<Mutex<Vec<EmailMessage>>>,
    failing_addresses: Arc<Mutex<Vec<String>>>,
    attempts:          Arc<Mutex<usize>>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定したアドレス宛の送信を失敗させる
    pub fn fail_when_addressed_to(&self, address: impl Into<String>) {
        self.failing_addresses.lock().unwrap().push(address.into());
    }

    /// 送信に成功したメール
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent_emails.lock().unwrap().clone()
    }

    /// 送信の試行回数（失敗を含む）
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        *self.attempts.lock().unwrap() += 1;

        let should_fail = self
            .failing_addresses
            .lock()
            .unwrap()
            .iter()
            .any(|address| email.is_addressed_to(address));
        if should_fail {
            return Err(NotificationError::SendFailed(format!(
                "モック: 送信失敗 ({:?})",
                email.to
            )));
        }

        self.sent_emails.lock().unwrap().push(email.clone());
        Ok(())
    }
}
