//! Async pacing of outbound API calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::Pacing;

/// Throttles calls either by sleeping after each successful read or by keeping a minimum interval between calls.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    pacing: Pacing,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Called before a request goes out. Only cooldown pacing waits here.
    pub async fn before_call(&self) {
        let Pacing::Cooldown(cooldown) = self.pacing else {
            return;
        };
        let mut guard = self.last_call.lock().await;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < cooldown {
                sleep(cooldown - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }

    /// Called after a successful read. Only fixed-delay pacing waits here.
    pub async fn after_read(&self) {
        if let Pacing::FixedDelay(delay) = self.pacing {
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn disabled() -> Self {
        Self::new(Pacing::FixedDelay(Duration::ZERO))
    }
}
