//! Per-container check rate limiting.
//!
//! Each container may only be checked for a newer image once per cooldown
//! window. The limiter keys on container name, so a container recreated
//! under the same name stays within its cooldown; entries for renamed or
//! removed containers age out harmlessly.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracks the last check time per container and enforces a cooldown.
///
/// Time is passed in explicitly so tests control the clock.
#[derive(Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    last_checked: HashMap<String, Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given cooldown window.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_checked: HashMap::new(),
        }
    }

    /// Returns whether the named container may be checked at `now`,
    /// recording the check time when it may.
    ///
    /// A container with no prior entry is always allowed. Once allowed,
    /// further calls within the cooldown window return false.
    pub fn acquire(&mut self, container: &str, now: Instant) -> bool {
        match self.last_checked.get(container) {
            Some(&last) if now.duration_since(last) < self.cooldown => false,
            _ => {
                self.last_checked.insert(container.to_owned(), now);
                true
            }
        }
    }

    /// Remaining cooldown for a container at `now`, zero when it may be
    /// checked.
    pub fn remaining(&self, container: &str, now: Instant) -> Duration {
        match self.last_checked.get(container) {
            Some(&last) => self.cooldown.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Number of tracked containers.
    pub fn tracked(&self) -> usize {
        self.last_checked.len()
    }
}
