use anyhow::anyhow;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{RelicError, Result};

/// Default width for the bounded fan-outs over projects, boards and issues.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Launch-all-then-await-all with a concurrency bound; per-item failures
/// stay isolated in the result slots. Output order matches input order.
pub async fn best_effort<T, F>(tasks: Vec<F>, limit: usize) -> Vec<Result<T>>
where
    F: Future<Output = Result<T>>,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));

    join_all(tasks.into_iter().map(|task| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| RelicError::upstream("acquire concurrency permit", anyhow!(e)))?;
            task.await
        }
    }))
    .await
}

/// Same bounded fan-out, but the first failure fails the whole batch.
/// Already-launched siblings still run to completion before the error
/// surfaces.
pub async fn all_succeed<T, F>(tasks: Vec<F>, limit: usize) -> Result<Vec<T>>
where
    F: Future<Output = Result<T>>,
{
    best_effort(tasks, limit).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_best_effort_preserves_input_order() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let results = runtime.block_on(async {
            let tasks: Vec<_> = (0..4u64)
                .map(|i| async move {
                    // Earlier tasks finish later.
                    tokio::time::sleep(Duration::from_millis(40 - i * 10)).await;
                    Ok(i)
                })
                .collect();
            best_effort(tasks, 4).await
        });

        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_best_effort_isolates_failures() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let results = runtime.block_on(async {
            let tasks: Vec<_> = (0..3u64)
                .map(|i| async move {
                    if i == 1 {
                        Err(RelicError::NotFound(format!("item {}", i)))
                    } else {
                        Ok(i)
                    }
                })
                .collect();
            best_effort(tasks, 2).await
        });

        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_all_succeed_propagates_first_failure() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(async {
            let tasks: Vec<_> = (0..3u64)
                .map(|i| async move {
                    if i == 2 {
                        Err(RelicError::NotFound("boards for project X".to_string()))
                    } else {
                        Ok(i)
                    }
                })
                .collect();
            all_succeed(tasks, 2).await
        });

        assert!(matches!(result, Err(RelicError::NotFound(_))));
    }

    #[test]
    fn test_concurrency_limit_is_respected() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        runtime.block_on(async {
            let tasks: Vec<_> = (0..8u64)
                .map(|i| {
                    let in_flight = Arc::clone(&in_flight);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(i)
                    }
                })
                .collect();
            best_effort(tasks, 2).await
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
