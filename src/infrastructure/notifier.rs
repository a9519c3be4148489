//! Outbound notification delivery.
//!
//! The chat platform itself is a collaborator behind the [`Notifier`] trait;
//! this module supplies the delivery policy around it: sends are paced with
//! a global rate limiter and retried with backoff when the sink reports rate
//! limiting or a timeout.

use crate::domain::errors::TradeError;
use crate::domain::repositories::gateways::Notifier;
use crate::infrastructure::retry::{with_backoff, RetryPolicy};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::info;

type SendLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Wraps any sink with pacing and bounded retry.
pub struct RetryingNotifier<N> {
    inner: N,
    limiter: Arc<SendLimiter>,
    retry: RetryPolicy,
}

impl<N: Notifier> RetryingNotifier<N> {
    pub fn new(inner: N, sends_per_minute: u32, retry: RetryPolicy) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(sends_per_minute.max(1)).expect("non-zero after max(1)"),
        );
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry,
        }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for RetryingNotifier<N> {
    async fn send_text(&self, user_id: u64, text: &str) -> Result<(), TradeError> {
        self.limiter.until_ready().await;
        with_backoff(&self.retry, "notify_text", || {
            self.inner.send_text(user_id, text)
        })
        .await
    }

    async fn send_photo(
        &self,
        user_id: u64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), TradeError> {
        self.limiter.until_ready().await;
        with_backoff(&self.retry, "notify_photo", || {
            self.inner.send_photo(user_id, photo_url, caption)
        })
        .await
    }
}

/// Sink that writes deliveries to the log. Stands in for the chat platform
/// when none is wired up.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_text(&self, user_id: u64, text: &str) -> Result<(), TradeError> {
        info!(user_id, text, "notification");
        Ok(())
    }

    async fn send_photo(
        &self,
        user_id: u64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), TradeError> {
        info!(user_id, photo_url, caption, "photo notification");
        Ok(())
    }
}
