//! # レート制限
//!
//! クライアント IP ごとのスライディングウィンドウ（直近 1 時間）で
//! 送信リクエスト数を制限する。
//!
//! ## 設計方針
//!
//! - **IP ごとのロック**: `DashMap` のエントリロック内で判定と記録を行い、
//!   同時リクエストで件数を数え漏らさない
//! - **遅延削除**: 1 時間より古いタイムスタンプは参照時に取り除く
//! - **定期掃除**: ウィンドウが空になった IP は [`RateLimiter::sweep_expired`] で削除し、
//!   キー数の増加を抑える
//! - **無効化**: `enabled = false` の場合は全リクエストを通し、状態を持たない

use std::{collections::VecDeque, sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use mailrelay_domain::clock::Clock;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;

/// ウィンドウ長（秒）
const WINDOW_SECONDS: i64 = 60 * 60;

/// 掃除間隔の下限
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// IP ごとのリクエスト時刻
type RateWindow = VecDeque<DateTime<Utc>>;

/// クライアント IP ごとのレート制限
pub struct RateLimiter {
    windows:      DashMap<String, RateWindow>,
    enabled:      bool,
    max_per_hour: usize,
    clock:        Arc<dyn Clock>,
}

fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::seconds(WINDOW_SECONDS)
}

/// ウィンドウ開始より前のタイムスタンプを取り除く
fn prune(window: &mut RateWindow, now: DateTime<Utc>) {
    let start = window_start(now);
    while window.front().is_some_and(|t| *t < start) {
        window.pop_front();
    }
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            enabled: config.enabled,
            max_per_hour: config.max_per_hour,
            clock,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_per_hour(&self) -> usize {
        self.max_per_hour
    }

    /// リクエストを受け付けられるか（記録はしない）
    pub fn allow(&self, client_ip: &str) -> bool {
        self.allow_at(client_ip, self.clock.now())
    }

    /// 指定時刻でリクエストを受け付けられるか
    pub fn allow_at(&self, client_ip: &str, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        match self.windows.get_mut(client_ip) {
            Some(mut window) => {
                prune(&mut window, now);
                window.len() < self.max_per_hour
            }
            None => true,
        }
    }

    /// 受け付けたリクエストを記録する
    pub fn record(&self, client_ip: &str) {
        self.record_at(client_ip, self.clock.now());
    }

    /// 指定時刻のリクエストを記録する
    pub fn record_at(&self, client_ip: &str, now: DateTime<Utc>) {
        if !self.enabled {
            return;
        }
        let mut window = self.windows.entry(client_ip.to_string()).or_default();
        prune(&mut window, now);
        window.push_back(now);
    }

    /// 判定と記録を 1 回のロックで行う
    ///
    /// 受け付けた場合のみ記録し `true` を返す。拒否した場合は状態を変更しない。
    pub fn try_acquire(&self, client_ip: &str) -> bool {
        self.try_acquire_at(client_ip, self.clock.now())
    }

    /// 指定時刻で判定と記録を行う
    pub fn try_acquire_at(&self, client_ip: &str, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        let mut window = self.windows.entry(client_ip.to_string()).or_default();
        prune(&mut window, now);
        if window.len() >= self.max_per_hour {
            return false;
        }
        window.push_back(now);
        true
    }

    /// 直近 1 時間のリクエスト数
    pub fn count_at(&self, client_ip: &str, now: DateTime<Utc>) -> usize {
        let start = window_start(now);
        self.windows
            .get(client_ip)
            .map_or(0, |window| window.iter().filter(|t| **t >= start).count())
    }

    /// 追跡中の IP 数
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// ウィンドウが空になった IP を削除し、削除した件数を返す
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(self.clock.now())
    }

    /// 指定時刻を基準に期限切れの IP を削除する
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            prune(window, now);
            !window.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }
}

/// 期限切れウィンドウを定期的に掃除するタスクを起動する
///
/// `interval` は [`MIN_SWEEP_INTERVAL`] 未満なら切り上げる。
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // 初回の tick は即時に完了する
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep_expired();
            if removed > 0 {
                tracing::debug!(
                    removed,
                    remaining = limiter.tracked_clients(),
                    "期限切れのレート制限ウィンドウを削除"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mailrelay_domain::clock::FixedClock;
    use pretty_assertions::assert_eq;

    use super::*;

    const IP: &str = "203.0.113.10";

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 11, 10, 0, 0).unwrap()
    }

    fn make_limiter(enabled: bool, max_per_hour: usize) -> RateLimiter {
        RateLimiter::new(
            &RateLimitConfig {
                enabled,
                max_per_hour,
                sweep_interval: Duration::from_secs(600),
            },
            Arc::new(FixedClock::new(base_time())),
        )
    }

    #[test]
    fn test_上限までは受け付け上限を超えると拒否する() {
        let limiter = make_limiter(true, 10);
        let now = base_time();

        for i in 0..10 {
            assert!(
                limiter.try_acquire_at(IP, now + TimeDelta::seconds(i)),
                "{i} 件目は受け付けること"
            );
        }

        assert!(!limiter.try_acquire_at(IP, now + TimeDelta::seconds(10)));
        assert_eq!(limiter.count_at(IP, now + TimeDelta::seconds(10)), 10);
    }

    #[test]
    fn test_拒否されたリクエストは記録されない() {
        let limiter = make_limiter(true, 1);
        let now = base_time();

        assert!(limiter.try_acquire_at(IP, now));
        assert!(!limiter.try_acquire_at(IP, now));
        assert!(!limiter.try_acquire_at(IP, now));

        assert_eq!(limiter.count_at(IP, now), 1);
    }

    #[test]
    fn test_61分前の記録はカウントしない() {
        let limiter = make_limiter(true, 1);
        let now = base_time();

        limiter.record_at(IP, now - TimeDelta::minutes(61));

        assert!(limiter.allow_at(IP, now));
        assert!(limiter.try_acquire_at(IP, now));
    }

    #[test]
    fn test_59分前の記録はカウントする() {
        let limiter = make_limiter(true, 1);
        let now = base_time();

        limiter.record_at(IP, now - TimeDelta::minutes(59));

        assert!(!limiter.allow_at(IP, now));
    }

    #[test]
    fn test_allowは状態を変更しない() {
        let limiter = make_limiter(true, 2);

        assert!(limiter.allow(IP));
        assert!(limiter.allow(IP));
        assert_eq!(limiter.tracked_clients(), 0);

        limiter.record(IP);
        limiter.record(IP);
        assert!(!limiter.allow(IP));
    }

    #[test]
    fn test_ipごとに独立してカウントする() {
        let limiter = make_limiter(true, 1);
        let now = base_time();

        assert!(limiter.try_acquire_at("198.51.100.1", now));
        assert!(limiter.try_acquire_at("198.51.100.2", now));
        assert!(!limiter.try_acquire_at("198.51.100.1", now));
    }

    #[test]
    fn test_無効の場合は全て受け付け記録もしない() {
        let limiter = make_limiter(false, 1);

        for _ in 0..100 {
            assert!(limiter.try_acquire(IP));
        }
        limiter.record(IP);

        assert!(limiter.allow(IP));
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_掃除で期限切れのipのみ削除される() {
        let limiter = make_limiter(true, 10);
        let now = base_time();
        limiter.record_at("198.51.100.1", now - TimeDelta::minutes(90));
        limiter.record_at("198.51.100.2", now - TimeDelta::minutes(10));

        let removed = limiter.sweep_expired_at(now);

        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.count_at("198.51.100.2", now), 1);
    }

    #[test]
    fn test_同時リクエストでも上限を超えて受け付けない() {
        let limiter = Arc::new(make_limiter(true, 10));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.try_acquire(IP))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();

        assert_eq!(accepted, 10);
        assert_eq!(limiter.count_at(IP, base_time()), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_掃除タスクが期限切れのipを削除する() {
        let limiter = Arc::new(make_limiter(true, 10));
        limiter.record_at(IP, base_time() - TimeDelta::hours(2));

        let handle = spawn_sweeper(Arc::clone(&limiter), Duration::from_secs(600));
        tokio::time::sleep(Duration::from_secs(601)).await;

        assert_eq!(limiter.tracked_clients(), 0);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_掃除間隔が0でも掃除タスクは動き続ける() {
        let limiter = Arc::new(make_limiter(true, 10));
        limiter.record_at(IP, base_time() - TimeDelta::hours(2));

        let handle = spawn_sweeper(Arc::clone(&limiter), Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!handle.is_finished());
        assert_eq!(limiter.tracked_clients(), 0);
        handle.abort();
    }
}
