//! In-Flight Computations
//!
//! A population in progress is represented by a `Shared` future so every
//! caller asking for the same key awaits the same result.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::error::{CacheError, Result};

/// The shared computation awaited by all callers of one key.
pub type Flight = Shared<BoxFuture<'static, Result<Value>>>;

// == In-Flight Record ==
/// At most one per key.
pub struct InFlight {
    /// Distinguishes successive computations of the same key; a settling
    /// computation only writes back if its generation is still registered.
    pub generation: u64,
    pub flight: Flight,
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

// == Run Compute ==
/// Invokes `compute` once and maps its error or panic into [`CacheError`].
pub async fn run_compute<F, Fut>(compute: F) -> Result<Value>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    match AssertUnwindSafe(async move { compute().await })
        .catch_unwind()
        .await
    {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CacheError::ComputeFailure(Arc::new(err))),
        Err(payload) => Err(CacheError::ComputePanicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
