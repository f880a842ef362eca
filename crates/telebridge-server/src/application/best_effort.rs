//! Best-effort side effects
//!
//! Logging and bookkeeping calls that must never block call handling go
//! through [`best_effort`]: failures are logged and swallowed.

use std::fmt::Display;
use std::future::Future;

/// Run `operation`, log a failure, and return `None` instead of the error.
pub async fn best_effort<T, E, F>(operation: &str, future: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match future.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(operation, error = %e, "Best-effort operation failed, continuing");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_passes_value_through() {
        let value = best_effort("ok", async { Ok::<_, String>(7) }).await;
        assert_eq!(value, Some(7));
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let value = best_effort("log_interaction", async { Err::<(), _>("boom") }).await;
        assert_eq!(value, None);
    }
}
