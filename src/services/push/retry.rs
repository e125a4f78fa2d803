//! Caller-side retry composition.
//!
//! The dispatcher makes exactly one provider call per `send`; callers that
//! want retries wrap it with [`send_with_retry`].

use std::time::Duration;

use rand::Rng;

use crate::services::push::dispatcher::Dispatcher;
use crate::services::push::outcome::{RetryClass, SendOutcome};
use crate::services::push::request::NotificationRequest;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total sends, the first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Full jitter: sleep a uniform random duration up to the computed delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Exactly one attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (0-based), without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        if !self.jitter || backoff.is_zero() {
            return backoff;
        }
        rand::rng().random_range(Duration::ZERO..=backoff)
    }
}

/// Sends until delivered, a non-retryable outcome, or attempts run out.
///
/// A credential refused by the provider is retried without waiting since the
/// dispatcher already dropped it; a credential source that failed gets the
/// same backoff as any other infrastructure failure.
pub async fn send_with_retry(
    dispatcher: &Dispatcher,
    request: &NotificationRequest,
    policy: &RetryPolicy,
) -> SendOutcome {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let outcome = dispatcher.send(request).await;
        attempt += 1;

        let class = outcome.retry_class();
        if class == RetryClass::Never || attempt >= attempts {
            return outcome;
        }

        let delay = match class {
            RetryClass::Immediately => Duration::ZERO,
            _ => policy.delay_for(attempt - 1),
        };
        tracing::debug!(
            attempt,
            max_attempts = attempts,
            outcome = outcome.label(),
            delay_ms = delay.as_millis() as u64,
            "Retrying notification"
        );
        tokio::time::sleep(delay).await;
    }
}
