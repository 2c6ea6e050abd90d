use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Process-wide pacing gate for outbound HTTP requests.
///
/// One permit becomes available per `delay`; `acquire` waits for the next
/// one. Every feed fetch and every item download goes through the same gate,
/// so global request spacing holds no matter how many watchers and download
/// tasks are active. Constructed once at startup and shared by `Arc`.
pub struct RequestLimiter {
    ticker: Mutex<Interval>,
}

impl RequestLimiter {
    /// Panics if `delay` is zero (rejected during startup validation).
    pub fn new(delay: Duration) -> Self {
        let mut ticker = interval(delay);
        // An idle gate must not bank permits for a later burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker: Mutex::new(ticker),
        }
    }

    /// Waits until the next permit is issued. The first permit after
    /// construction is available immediately.
    pub async fn acquire(&self) {
        self.ticker.lock().await.tick().await;
    }
}
