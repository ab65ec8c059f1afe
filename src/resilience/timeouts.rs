//! Timeout enforcement.
//!
//! Timed-out upstream calls surface as [`TransportError::Timeout`] and map
//! to 504 Gateway Timeout.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::TransportError;

/// Run `future` with a deadline, converting expiry into a transport error.
pub async fn with_deadline<F, T>(
    backend: SocketAddr,
    timeout: Duration,
    future: F,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout { backend, timeout }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    #[tokio::test]
    async fn expired_deadline_is_timeout() {
        let result: Result<(), _> = with_deadline(addr(), Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[tokio::test]
    async fn completes_within_deadline() {
        let result = with_deadline(addr(), Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
