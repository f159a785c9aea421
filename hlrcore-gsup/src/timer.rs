//! Connection timers
//!
//! Each session owns a reconnect-retry timer and a ping timer. A timer is
//! either disarmed or armed with an absolute deadline; [`Timer::expired`]
//! resolves at the deadline and never resolves while disarmed, so both
//! timers can sit in the same `tokio::select!` unconditionally.

use std::future::pending;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// One-shot countdown timer
#[derive(Debug, Default)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer to fire `after` from now, replacing any earlier deadline.
    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    /// Arms the timer to fire on the next poll.
    pub fn arm_now(&mut self) {
        self.deadline = Some(Instant::now());
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves once the deadline has passed. Pending forever while disarmed.
    ///
    /// Does not disarm the timer; the caller does that when handling expiry.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => pending().await,
        }
    }
}

/// The two timers of a GSUP client session
#[derive(Debug, Default)]
pub struct ConnectionTimers {
    /// Next connection attempt while disconnected
    pub reconnect: Timer,
    /// Handshake deadline while connecting, next liveness check while connected
    pub ping: Timer,
}

impl ConnectionTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disarm_all(&mut self) {
        self.reconnect.disarm();
        self.ping.disarm();
    }
}
