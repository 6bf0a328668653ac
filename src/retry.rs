//! Single-retry handling for rate-limited API calls.
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::ApiError;

/// Outcome of one call against a rate-limited API.
#[derive(Debug)]
pub enum Attempt<T> {
    Success(T),
    RateLimited(Duration),
    Fatal(ApiError),
}

impl<T> From<Result<T, ApiError>> for Attempt<T> {
    fn from(res: Result<T, ApiError>) -> Self {
        match res {
            Ok(v) => Attempt::Success(v),
            Err(err) => match err.retry_after() {
                Some(delay) => Attempt::RateLimited(delay),
                None => Attempt::Fatal(err),
            },
        }
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Run `op`; if it is rate limited, wait the requested delay and run it exactly
/// once more. The second outcome is final, including a second rate limit.
pub async fn with_rate_limit_retry<T, F, Fut>(
    label: &str,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    match Attempt::from(op().await) {
        Attempt::Success(v) => Ok(v),
        Attempt::Fatal(err) => Err(err),
        Attempt::RateLimited(delay) => {
            warn!(
                operation = label,
                retry_after_secs = delay.as_secs(),
                "rate limited; retrying once"
            );
            sleeper.sleep(delay).await;
            op().await
        }
    }
}
