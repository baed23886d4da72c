//! Bridge - drive async runs from synchronous code
//!
//! Callers without an async context (scripts, UI callbacks) and callers
//! already inside a runtime both need to wait on a run. [`block_on`] picks
//! the strategy from the current context:
//!
//! - no runtime: a fresh current-thread runtime
//! - multi-thread runtime: `block_in_place` on the current handle
//! - current-thread runtime: a dedicated OS thread with its own runtime

use crate::error::{Error, Result};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use std::future::Future;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tracing::debug;

fn current_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build runtime: {}", e)))
}

/// Run `fut` to completion from synchronous code.
pub fn block_on<F>(fut: F) -> Result<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Err(_) => {
            debug!("No runtime, building one");
            Ok(current_thread_runtime()?.block_on(fut))
        }
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            debug!("Inside multi-thread runtime, blocking in place");
            Ok(tokio::task::block_in_place(|| handle.block_on(fut)))
        }
        Ok(_) => {
            debug!("Inside current-thread runtime, using a helper thread");
            std::thread::spawn(move || current_thread_runtime().map(|rt| rt.block_on(fut)))
                .join()
                .map_err(|_| Error::Internal("bridge thread panicked".to_string()))?
        }
    }
}

/// Collect every line of a run, stopping at the first error.
pub fn collect_lines_blocking(lines: BoxStream<'static, Result<String>>) -> Result<Vec<String>> {
    block_on(async move { lines.try_collect::<Vec<_>>().await })?
}
