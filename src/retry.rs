use std::future::Future;

use serde_json::Value;
use tokio::time::{sleep, timeout};

use crate::{wire::Envelope, CallFailure, ClientOptions, Result, RpcClientError};

/// Runs `attempt` until it yields an envelope or the attempt budget is spent.
///
/// Each attempt is raced against `options.timeout_ms`. On timeout the attempt
/// future is dropped, so a late outcome is never observed; the remote side may
/// still have executed the call. Attempts are strictly sequential and are
/// separated by `options.retry_delay_ms`.
pub(crate) async fn run_with_retry<F, Fut>(
    options: &ClientOptions,
    method: &str,
    mut attempt: F,
) -> Result<Value>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Envelope, CallFailure>>,
{
    let attempts = options.attempts();

    for current in 1..=attempts {
        let failure = match timeout(options.timeout(), attempt()).await {
            Ok(Ok(envelope)) => {
                #[cfg(feature = "tracing")]
                if current > 1 {
                    tracing::debug!(method, attempt = current, "rpc call succeeded after retry");
                }
                return Ok(envelope.result);
            }
            Ok(Err(failure)) => failure,
            Err(_) => CallFailure::Timeout {
                timeout_ms: options.timeout_ms,
            },
        };

        if current == attempts {
            #[cfg(feature = "tracing")]
            tracing::debug!(method, attempts, error = %failure, "rpc call failed on final attempt");
            return Err(RpcClientError::Call {
                method: method.to_owned(),
                attempts,
                cause: failure,
            });
        }

        if let Some(logger) = &options.logger {
            logger.log(current, method, &failure);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method,
            attempt = current,
            error = %failure,
            "retrying rpc call after {} ms",
            options.retry_delay_ms
        );

        sleep(options.retry_delay()).await;
    }

    Err(RpcClientError::ExhaustedRetries {
        method: method.to_owned(),
    })
}
