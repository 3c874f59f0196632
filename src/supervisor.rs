use crate::error::Result;
use crate::metrics::CrawlMetrics;
use std::future::Future;
use tracing::{error, info, warn};

/// How often a failed run may be restarted from scratch
#[derive(Debug, Clone, Copy, Default)]
pub struct RestartPolicy {
    /// `None` restarts forever.
    pub max_restarts: Option<u32>,
}

/// Run `attempt` until it succeeds, restarting from scratch on non-fatal errors.
///
/// Fatal errors (see [`crate::error::ScraperError::is_fatal`]) are returned at once.
/// The attempt number (starting at 1) is passed to each call.
pub async fn supervise<F, Fut, T>(policy: RestartPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut restarts: u32 = 0;
    loop {
        let n = restarts + 1;
        match attempt(n).await {
            Ok(value) => {
                if restarts > 0 {
                    info!(restarts, "Run succeeded after restarts");
                }
                return Ok(value);
            }
            Err(e) if e.is_fatal() => {
                error!(attempt = n, error = %e, "Fatal error, not restarting");
                return Err(e);
            }
            Err(e) => {
                if policy.max_restarts.is_some_and(|max| restarts >= max) {
                    error!(attempt = n, restarts, error = %e, "Restart limit reached");
                    return Err(e);
                }
                restarts += 1;
                CrawlMetrics::run_restarted();
                warn!(attempt = n, restarts, error = %e, "Error scraping, retrying...");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScraperError;

    #[tokio::test]
    async fn test_restarts_until_success() {
        let mut calls = 0;
        let result = supervise(RestartPolicy::default(), |n| {
            calls += 1;
            async move {
                if n < 3 {
                    Err(ScraperError::Markup("flaky".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_restarted() {
        let mut calls = 0;
        let result: Result<()> = supervise(RestartPolicy::default(), |_| {
            calls += 1;
            async {
                Err(ScraperError::NoResults {
                    partition: "25".into(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(ScraperError::NoResults { .. })));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_restart_limit() {
        let mut calls = 0;
        let policy = RestartPolicy {
            max_restarts: Some(2),
        };
        let result: Result<()> = supervise(policy, |_| {
            calls += 1;
            async { Err(ScraperError::Markup("broken".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
