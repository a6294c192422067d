//! Execution normalizer
//!
//! Stages return a [`StageCall`]: either a value that is already available or a
//! future that still has to be driven. [`ExecutionNormalizer::resolve`] turns
//! both into a single awaited `Result`, applying the configured bound to the
//! deferred case. Waiting is cooperative (tokio timer), so other requests keep
//! being served while a stage is pending.

use super::stage::StageError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A stage's return value, immediate or deferred
pub enum StageCall<T> {
    Immediate(Result<T, StageError>),
    Deferred(BoxFuture<'static, Result<T, StageError>>),
}

impl<T> StageCall<T> {
    pub fn ready(value: T) -> Self {
        StageCall::Immediate(Ok(value))
    }

    pub fn fail(error: StageError) -> Self {
        StageCall::Immediate(Err(error))
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, StageError>> + Send + 'static,
    {
        StageCall::Deferred(future.boxed())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, StageCall::Deferred(_))
    }
}

impl<T> From<Result<T, StageError>> for StageCall<T> {
    fn from(result: Result<T, StageError>) -> Self {
        StageCall::Immediate(result)
    }
}

impl<T> fmt::Debug for StageCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageCall::Immediate(Ok(_)) => f.write_str("StageCall::Immediate(Ok(..))"),
            StageCall::Immediate(Err(e)) => write!(f, "StageCall::Immediate(Err({:?}))", e),
            StageCall::Deferred(_) => f.write_str("StageCall::Deferred(..)"),
        }
    }
}

/// Resolves [`StageCall`]s with a bounded wait
#[derive(Debug, Clone, Copy)]
pub struct ExecutionNormalizer {
    timeout: Duration,
}

impl ExecutionNormalizer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Return the stage's result, awaiting it if deferred
    ///
    /// A deferred value still pending after the timeout is dropped and
    /// reported as [`StageError::Timeout`].
    pub async fn resolve<T>(&self, call: StageCall<T>) -> Result<T, StageError> {
        match call {
            StageCall::Immediate(result) => result,
            StageCall::Deferred(future) => match tokio::time::timeout(self.timeout, future).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_secs = self.timeout.as_secs_f64(), "Deferred stage result timed out");
                    Err(StageError::Timeout(self.timeout))
                }
            },
        }
    }
}
