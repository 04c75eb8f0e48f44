//! # Call Wrapper
//!
//! Every gateway call goes through [`attempt`]: the failure is logged once,
//! here, and handed back to the caller as a plain `Err`.

use crate::error::EpayResult;
use std::future::Future;
use tracing::error;

/// Await a gateway call and log it if it fails.
///
/// `operation` names the call in the log event (e.g. `"initiate_payment"`).
/// Code inside `future` must not log its own failure; this is the single
/// point where failures are reported.
pub async fn attempt<T, F>(operation: &'static str, future: F) -> EpayResult<T>
where
    F: Future<Output = EpayResult<T>>,
{
    match future.await {
        Ok(value) => Ok(value),
        Err(err) => {
            error!(
                operation,
                retryable = err.is_retryable(),
                error = %err,
                "Gateway call failed"
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EpayError;

    #[tokio::test]
    async fn test_success_passes_value_through() {
        let result = attempt("test", async { Ok::<_, EpayError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_failure_is_returned_not_swallowed() {
        let result: EpayResult<()> =
            attempt("test", async { Err(EpayError::Network("connection reset".into())) }).await;

        match result {
            Err(EpayError::Network(msg)) => assert_eq!(msg, "connection reset"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
