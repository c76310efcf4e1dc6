//! Shared utility functions.

use std::time::Duration;

use tokio::task::spawn_blocking;
use tokio::time::timeout;

use crate::{Error, Result};

/// Run `f` on the blocking pool, giving up after `duration`.
///
/// The closure keeps running in the background after a timeout; only the
/// wait is abandoned.
pub async fn blocking_with_timeout<F, T>(duration: Duration, f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match timeout(duration, spawn_blocking(f)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_err)) => Err(Error::TaskJoin(join_err.to_string())),
        Err(_) => Err(Error::Timeout(duration)),
    }
}

/// Whole minutes in `elapsed`, rounded up.
pub fn elapsed_minutes(elapsed: Duration) -> u32 {
    let minutes = elapsed.as_secs().div_ceil(60);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
