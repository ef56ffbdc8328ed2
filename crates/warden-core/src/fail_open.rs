//! Fail-open utilities for page reads
//!
//! A probe must never fail. When the page driver errors while reading the
//! page, the read is logged and treated as "structure missing", which every
//! probe already knows how to turn into a worst-case observation.
//!
//! DO NOT use fail-open for:
//! - Activating controls (the caller needs to know nothing was clicked)
//! - Reloading (the guard must only record reloads that happened)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Run a page read that should degrade to `None` on driver failure
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use warden_core::fail_open::fail_open;
/// use warden_core::Result;
///
/// async fn read_countdown() -> Result<Option<String>> {
///     Ok(Some("00:10:00:00".to_string()))
/// }
///
/// async fn example() {
///     let text = fail_open("countdown", || read_countdown()).await.flatten();
///     // text is None if the read failed or the element was absent
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WardenError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("probe", || async { Ok::<_, WardenError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_driver_error() {
        let result = fail_open("probe", || async {
            Err::<i32, _>(WardenError::Browser("target closed".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }
}
