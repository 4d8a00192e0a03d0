//! Concurrent fan-out of blocking backend calls.
//!
//! Every task runs on the blocking pool and the caller waits for all of
//! them. Nothing is cancelled when a task fails and nothing is rolled back;
//! the first failure in completion order is reported once all are done.

use crate::error::{CoreError, CoreResult};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Outcome of a fan-out: per-task values in input order, plus the first
/// failure observed.
#[derive(Debug)]
pub(crate) struct FanOut<T> {
    pub(crate) values: Vec<Option<T>>,
    pub(crate) first_error: Option<CoreError>,
}

impl<T> FanOut<T> {
    /// Returns every value, or the first failure.
    pub(crate) fn into_result(self) -> CoreResult<Vec<T>> {
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(self.values.into_iter().flatten().collect()),
        }
    }
}

/// Runs `tasks` concurrently and waits for all of them.
pub(crate) async fn fan_out<T, F>(operation: &'static str, tasks: Vec<F>) -> FanOut<T>
where
    T: Send + 'static,
    F: FnOnce() -> CoreResult<T> + Send + 'static,
{
    let total = tasks.len();
    debug!(operation, tasks = total, "fanning out");

    let mut set = JoinSet::new();
    for (index, task) in tasks.into_iter().enumerate() {
        set.spawn_blocking(move || (index, task()));
    }

    let mut values: Vec<Option<T>> = (0..total).map(|_| None).collect();
    let mut first_error = None;
    let mut failed = 0usize;
    while let Some(joined) = set.join_next().await {
        let err = match joined {
            Ok((index, Ok(value))) => {
                values[index] = Some(value);
                continue;
            }
            Ok((_, Err(err))) => err,
            Err(join_err) => CoreError::TaskFailed {
                message: join_err.to_string(),
            },
        };
        failed += 1;
        warn!(operation, error = %err, "fan-out task failed");
        first_error.get_or_insert(err);
    }

    debug!(operation, tasks = total, failed, "fan-out complete");
    FanOut {
        values,
        first_error,
    }
}
