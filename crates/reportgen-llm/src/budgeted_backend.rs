//! Budgeted backend wrapper for model call limiting
//!
//! Wraps any `LlmBackend` and enforces a cap on the number of invocations for
//! the lifetime of the process.

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Default cap for OpenRouter when `[llm.openrouter] budget` is unset.
pub(crate) const DEFAULT_OPENROUTER_BUDGET: u32 = 100;

/// A wrapper around an `LlmBackend` that enforces a budget limit on invocations.
///
/// The budget tracks attempted calls, not successful requests: a failed call
/// still consumes its slot, so retry loops cannot bypass the limit.
pub struct BudgetedBackend {
    inner: Box<dyn LlmBackend>,
    budget: Arc<AtomicU32>,
    limit: u32,
}

impl BudgetedBackend {
    pub fn new(inner: Box<dyn LlmBackend>, limit: u32) -> Self {
        debug!(limit = limit, "Creating BudgetedBackend");
        Self {
            inner,
            budget: Arc::new(AtomicU32::new(0)),
            limit,
        }
    }

    /// Calls attempted so far, including rejected ones.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.budget.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[async_trait]
impl LlmBackend for BudgetedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        // Count before calling so that attempts, not successes, are tracked.
        let current = self.budget.fetch_add(1, Ordering::SeqCst);

        if current >= self.limit {
            let attempted = current + 1;
            warn!(
                limit = self.limit,
                attempted = attempted,
                "Budget limit exceeded"
            );
            return Err(LlmError::BudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }

        debug!(
            call_count = current + 1,
            limit = self.limit,
            "Budget check passed, invoking inner backend"
        );

        let result = self.inner.invoke(inv).await;

        if let Err(e) = &result {
            debug!(
                call_count = current + 1,
                limit = self.limit,
                error = %e,
                "Inner backend invocation failed (budget slot still consumed)"
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct EchoBackend;

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            Ok(LlmResult::new("echo", "test", "test-model"))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl LlmBackend for FailingBackend {
        async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            Err(LlmError::ProviderOutage("down".to_string()))
        }
    }

    fn inv() -> LlmInvocation {
        LlmInvocation::new("", Duration::from_secs(1), vec![])
    }

    #[tokio::test]
    async fn test_budget_allows_calls_up_to_limit() {
        let backend = BudgetedBackend::new(Box::new(EchoBackend), 2);

        assert!(backend.invoke(inv()).await.is_ok());
        assert!(backend.invoke(inv()).await.is_ok());

        match backend.invoke(inv()).await {
            Err(LlmError::BudgetExceeded { limit, attempted }) => {
                assert_eq!(limit, 2);
                assert_eq!(attempted, 3);
            }
            other => panic!("expected BudgetExceeded, got {other:?}"),
        }
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_calls_consume_budget() {
        let backend = BudgetedBackend::new(Box::new(FailingBackend), 1);

        assert!(matches!(
            backend.invoke(inv()).await,
            Err(LlmError::ProviderOutage(_))
        ));
        assert!(matches!(
            backend.invoke(inv()).await,
            Err(LlmError::BudgetExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_budget_rejects_first_call() {
        let backend = BudgetedBackend::new(Box::new(EchoBackend), 0);
        assert!(matches!(
            backend.invoke(inv()).await,
            Err(LlmError::BudgetExceeded { limit: 0, attempted: 1 })
        ));
        assert_eq!(backend.limit(), 0);
    }
}
