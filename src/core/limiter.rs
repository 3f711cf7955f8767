//! Sliding-window admission control
//!
//! Bounds requests within any trailing one-second interval, not fixed
//! calendar-second buckets. One window exists per provider; the mutex is
//! scoped to that provider alone so waiting on one backend never stalls
//! dispatch to another.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, Instant};

/// Width of the admission window
const WINDOW: Duration = Duration::from_millis(1000);

/// Per-provider sliding-window rate limiter.
///
/// `acquire` suspends the caller until admitting one more request would not
/// exceed `limit` requests in the trailing second, then records the request
/// and returns. It never fails, only delays.
#[derive(Debug)]
pub struct SlidingWindow {
    limit: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait for admission, then atomically record this request.
    pub async fn acquire(&self) {
        loop {
            let now = Instant::now();
            let wait = {
                // Never held across an await.
                let mut q = self.timestamps.lock().expect("limiter mutex poisoned");
                while q
                    .front()
                    .is_some_and(|&t| now.duration_since(t) >= WINDOW)
                {
                    q.pop_front();
                }

                if q.len() < self.limit {
                    q.push_back(now);
                    return;
                }

                let oldest = *q.front().expect("queue is at limit");
                WINDOW.saturating_sub(now.duration_since(oldest))
            };

            // Jitter keeps concurrently-waiting batches from re-checking in
            // lockstep and bursting past the window edge together.
            let jitter = rand::thread_rng().gen_range(20..100);
            sleep(wait + Duration::from_millis(jitter)).await;
        }
    }

    /// Requests currently recorded inside the window (test hook)
    #[cfg(test)]
    fn in_window(&self) -> usize {
        let now = Instant::now();
        let mut q = self.timestamps.lock().unwrap();
        while q
            .front()
            .is_some_and(|&t| now.duration_since(t) >= WINDOW)
        {
            q.pop_front();
        }
        q.len()
    }
}
