//! Bounded attempts with a fresh randomized parameter each time, then a
//! guaranteed fallback.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

use crate::logw;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub pause: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: usize) -> Self {
        Self {
            attempts,
            pause: Duration::ZERO,
        }
    }

    pub const fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Runs `attempt(n)` for `n` in `0..attempts` until one yields `Some`.
    /// `Ok(None)` means "no usable result, try again"; errors are logged and
    /// treated the same way.
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt: F) -> Option<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        for n in 0..self.attempts {
            match attempt(n).await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {}
                Err(err) => logw(format!("{} failed (attempt {}/{}): {:#}", label, n + 1, self.attempts, err)),
            }
            if !self.pause.is_zero() && n + 1 < self.attempts {
                tokio::time::sleep(self.pause).await;
            }
        }
        None
    }

    /// Like [`run`](Self::run) but substitutes `fallback()` on exhaustion.
    pub async fn run_or_else<T, F, Fut, G, GFut>(&self, label: &str, attempt: F, fallback: G) -> T
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = T>,
    {
        match self.run(label, attempt).await {
            Some(value) => value,
            None => {
                logw(format!("{}: attempts exhausted, using fallback", label));
                fallback().await
            }
        }
    }
}
