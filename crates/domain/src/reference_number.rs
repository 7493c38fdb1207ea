//! # 受付番号
//!
//! フォーム送信ごとに採番する、人が読める追跡用の番号。
//!
//! 形式: `{プレフィックス}-{YYYYMMDD}-{4 桁の乱数}`（例: `SIN-20241211-1234`）
//!
//! | メール種別 | プレフィックス |
//! |-----------|--------------|
//! | `CLAIM_REQUEST` | `SIN` |
//! | `QUOTE_REQUEST` | `DEV` |
//! | `CONTACT_FORM` | `CNT` |
//! | その他 | `REF` |

use std::fmt;

use chrono::NaiveDate;
use rand::Rng;

use crate::{clock::Clock, submission::MailType};

/// 受付番号
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    /// メール種別に対応するプレフィックス
    pub fn prefix_for(mail_type: MailType) -> &'static str {
        match mail_type {
            MailType::ClaimRequest => "SIN",
            MailType::QuoteRequest => "DEV",
            MailType::ContactForm => "CNT",
            MailType::NewsletterSubscription | MailType::AppointmentRequest => "REF",
        }
    }

    /// 日付と乱数源を指定して採番する
    pub fn generate(mail_type: MailType, date: NaiveDate, rng: &mut impl Rng) -> Self {
        let suffix: u16 = rng.random_range(0..10_000);
        Self(format!(
            "{}-{}-{suffix:04}",
            Self::prefix_for(mail_type),
            date.format("%Y%m%d")
        ))
    }

    /// 現在日付（UTC）で採番する
    pub fn issue(mail_type: MailType, clock: &dyn Clock) -> Self {
        Self::generate(mail_type, clock.now().date_naive(), &mut rand::rng())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
