//! Per-member XP throttle.
//!
//! A member earns XP for at most `limit` messages inside any sliding window of `window`.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Sliding-window limiter keyed by `(guild_id, user_id)`.
#[derive(Debug)]
pub struct XpThrottle {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<(u64, u64), VecDeque<Instant>>>,
}

impl XpThrottle {
    /// Allows `limit` awards per `window`.
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: usize::try_from(limit).unwrap_or(usize::MAX),
            window,
            hits: Mutex::default(),
        }
    }

    /// Records an award at `now` if the member is under the limit. Returns whether it was allowed.
    pub async fn allow(&self, guild_id: u64, user_id: u64, now: Instant) -> bool {
        let mut hits = self.hits.lock().await;

        // Forget members whose window has fully lapsed.
        if hits.len() > 1024 {
            hits.retain(|_, times| {
                times
                    .back()
                    .is_some_and(|last| now.duration_since(*last) < self.window)
            });
        }

        let times = hits.entry((guild_id, user_id)).or_default();
        while times
            .front()
            .is_some_and(|first| now.duration_since(*first) >= self.window)
        {
            times.pop_front();
        }

        if times.len() >= self.limit {
            return false;
        }
        times.push_back(now);
        true
    }
}
