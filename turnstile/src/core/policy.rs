//! Minimum-interval admission policy and decision engine
//!
//! This module provides [`Throttle`], which applies a [`ThrottlePolicy`] to a
//! [`ThrottleStore`] and turns store admissions into caller-facing decisions.

use super::PolicyError;
use super::key::ClientKey;
use super::store::{Admission, ThrottleStore};
use std::time::{Duration, SystemTime};

/// Admission policy: at most one admitted request per client per interval
///
/// Immutable after construction. The interval must be non-zero.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use turnstile::ThrottlePolicy;
///
/// let policy = ThrottlePolicy::new(Duration::from_millis(250)).unwrap();
/// assert_eq!(policy.min_interval(), Duration::from_millis(250));
///
/// assert!(ThrottlePolicy::new(Duration::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    min_interval: Duration,
}

impl ThrottlePolicy {
    /// Default minimum interval between admitted requests per client
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

    /// Create a policy with the given minimum interval
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ZeroInterval`] if the interval is zero.
    pub fn new(min_interval: Duration) -> Result<Self, PolicyError> {
        if min_interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }
        Ok(ThrottlePolicy { min_interval })
    }

    /// The configured minimum interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        ThrottlePolicy {
            min_interval: Self::DEFAULT_MIN_INTERVAL,
        }
    }
}

/// Outcome of an admission decision
///
/// A throttled rejection is expected control flow, not an error: the caller
/// turns it into a rate-limit response. `retry_after` is the remaining part
/// of the client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Forward the request to the inner handler
    Allow,
    /// Reject without invoking the inner handler
    Throttled {
        /// Time until the client's next request can be admitted
        retry_after: Duration,
    },
}

impl Decision {
    /// Whether the request was admitted
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decision engine applying one policy to one store
///
/// This is the policy seam: alternative admission rules can replace the
/// minimum-interval check behind the same `admit` contract, as long as they
/// keep per-key check-and-update atomic.
///
/// # Example
///
/// ```
/// use std::time::SystemTime;
/// use turnstile::{ClientKey, SweepStore, Throttle, ThrottlePolicy};
///
/// let throttle = Throttle::new(ThrottlePolicy::default(), SweepStore::new());
/// let decision = throttle.admit(&ClientKey::from("10.0.0.1"), SystemTime::now());
/// assert!(decision.is_allowed());
/// ```
pub struct Throttle<S> {
    policy: ThrottlePolicy,
    store: S,
}

impl<S: ThrottleStore> Throttle<S> {
    /// Create an engine from a policy and a store
    pub fn new(policy: ThrottlePolicy, store: S) -> Self {
        Throttle { policy, store }
    }

    /// Decide whether to admit a request from `key` at `now`
    ///
    /// The first request from a key is always admitted. Subsequent requests
    /// are admitted only when at least the policy interval has elapsed since
    /// the last admission; rejected attempts do not extend the window.
    pub fn admit(&self, key: &ClientKey, now: SystemTime) -> Decision {
        match self
            .store
            .check_and_update(key.as_str(), now, self.policy.min_interval)
        {
            Admission::Admit => Decision::Allow,
            Admission::Reject { retry_after } => Decision::Throttled { retry_after },
        }
    }

    /// The configured policy
    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }
}
