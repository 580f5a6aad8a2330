//! Resend cooldown arithmetic and its display ticker

use crate::config::AuthConfig;
use logistics_http::types::MAX_COOLDOWN_SECS;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Source of "now" for cooldown arithmetic
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Interval during which a resend is refused locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownWindow {
    resend_until: Instant,
}

impl CooldownWindow {
    /// Window of `seconds` from `now`, capped at [`MAX_COOLDOWN_SECS`]
    pub fn starting_at(now: Instant, seconds: u64) -> Self {
        let length = Duration::from_secs(seconds.min(MAX_COOLDOWN_SECS));
        Self {
            resend_until: now.checked_add(length).unwrap_or(now),
        }
    }

    pub fn resend_until(&self) -> Instant {
        self.resend_until
    }

    /// Whole seconds left, rounded up
    pub fn seconds_left(&self, now: Instant) -> u64 {
        let remaining = self.resend_until.saturating_duration_since(now);
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }
}

/// Background task republishing `seconds_left` until the window elapses.
/// Dropping the ticker stops it.
#[derive(Debug)]
pub struct CooldownTicker {
    task: JoinHandle<()>,
}

impl CooldownTicker {
    /// Returns `None` outside a tokio runtime.
    pub fn start(
        window: CooldownWindow,
        clock: Arc<dyn Clock>,
        seconds_left: Arc<watch::Sender<u64>>,
    ) -> Option<Self> {
        let handle = Handle::try_current().ok()?;
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(AuthConfig::COOLDOWN_TICK);
            loop {
                interval.tick().await;
                let left = window.seconds_left(clock.now());
                seconds_left.send_if_modified(|current| {
                    let changed = *current != left;
                    *current = left;
                    changed
                });
                if left == 0 {
                    break;
                }
            }
        });
        Some(Self { task })
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for CooldownTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
