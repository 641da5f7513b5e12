use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::{CHECK_LATENCY, LOGIN_CHECKS_TOTAL, LOGIN_DENIED_TOTAL, STORE_ERRORS_TOTAL};
use crate::rate_limit::{DEFAULT_DENIED_MESSAGE, RateLimitStore, StoreError};

pub const LOGIN_BUCKET: &str = "login";

pub const UNAVAILABLE_MESSAGE: &str = "Login is temporarily unavailable. Please try again later.";

/// What to do with a login attempt when the store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FailurePolicy {
    /// Let the attempt through and log it.
    #[default]
    Open,
    /// Refuse the attempt.
    Closed,
}

/// Result of a login rate limit check, as returned to the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCheck {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    // set when the denial came from the failure policy, not the limit
    #[serde(skip)]
    pub store_unavailable: bool,
}

impl LoginCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            error: None,
            retry_after: None,
            store_unavailable: false,
        }
    }
}

/// Gate in front of login attempts. Holds no counters itself.
#[derive(Clone)]
pub struct LoginGuard {
    store: Arc<dyn RateLimitStore>,
    failure_policy: FailurePolicy,
    timeout: Duration,
}

impl LoginGuard {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        failure_policy: FailurePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            failure_policy,
            timeout,
        }
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub async fn check_login_rate_limit(&self, client_key: &str) -> LoginCheck {
        LOGIN_CHECKS_TOTAL.inc();
        let start_time = Instant::now();

        let result = tokio::time::timeout(
            self.timeout,
            self.store.check_and_increment(LOGIN_BUCKET, client_key),
        )
        .await
        .unwrap_or(Err(StoreError::Timeout(self.timeout)));

        CHECK_LATENCY.observe(start_time.elapsed().as_secs_f64());

        let check = match result {
            Ok(decision) if decision.success => LoginCheck::allowed(),
            Ok(decision) => {
                tracing::info!(
                    store = self.store.name(),
                    retry_after = ?decision.retry_after,
                    "login attempt rate limited"
                );
                LoginCheck {
                    allowed: false,
                    error: Some(
                        decision
                            .error
                            .unwrap_or_else(|| DEFAULT_DENIED_MESSAGE.to_string()),
                    ),
                    retry_after: decision.retry_after,
                    store_unavailable: false,
                }
            }
            Err(e) => {
                STORE_ERRORS_TOTAL.inc();
                self.on_store_error(e)
            }
        };

        if !check.allowed {
            LOGIN_DENIED_TOTAL.inc();
        }
        check
    }

    fn on_store_error(&self, err: StoreError) -> LoginCheck {
        match self.failure_policy {
            FailurePolicy::Open => {
                tracing::warn!(
                    store = self.store.name(),
                    error = %err,
                    "rate limit store failed, allowing login attempt"
                );
                LoginCheck::allowed()
            }
            FailurePolicy::Closed => {
                tracing::error!(
                    store = self.store.name(),
                    error = %err,
                    "rate limit store failed, refusing login attempt"
                );
                LoginCheck {
                    allowed: false,
                    error: Some(UNAVAILABLE_MESSAGE.to_string()),
                    retry_after: None,
                    store_unavailable: true,
                }
            }
        }
    }
}
