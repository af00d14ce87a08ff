use std::time::Duration;
use thiserror::Error;

/// Outcome classification of a failed channel send
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Network failure, timeout, 5xx or 429. Retried.
    #[error("transient delivery error: {0}")]
    Transient(String),
    #[error("permanent delivery error: {0}")]
    Permanent(String),
    /// The push service no longer knows the subscription
    #[error("subscription gone")]
    SubscriptionGone,
    #[error("gateway_not_configured")]
    GatewayNotConfigured,
    #[error("gateway_not_connected")]
    GatewayNotConnected,
}

impl DeliveryError {
    /// Classifies a non success http status
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            404 | 410 => Self::SubscriptionGone,
            408 | 429 | 500..=599 => Self::Transient(format!("status {}: {}", status, body)),
            _ => Self::Permanent(format!("status {}: {}", status, body)),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the `attempt`th failed attempt (1 based), or
    /// `None` when no attempts are left
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let multiplier = self.factor.checked_pow(attempt - 1).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classifies_status_codes() {
        assert!(DeliveryError::from_status(503, "").is_retryable());
        assert!(DeliveryError::from_status(429, "").is_retryable());
        assert_eq!(
            DeliveryError::from_status(410, ""),
            DeliveryError::SubscriptionGone
        );
        assert!(!DeliveryError::from_status(400, "bad").is_retryable());
        assert!(!DeliveryError::GatewayNotConnected.is_retryable());
    }

    #[test]
    fn default_policy_backs_off_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_after(3), None);
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            ..Default::default()
        };
        assert_eq!(policy.delay_after(4), Some(Duration::from_secs(8)));
        assert_eq!(policy.delay_after(5), Some(Duration::from_secs(10)));
        assert_eq!(policy.delay_after(9), Some(Duration::from_secs(10)));
    }
}
