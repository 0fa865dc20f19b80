// Bounded fetch pool.
// Fans units of work (listing pages, README requests) out over a fixed set of workers.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{Result, StarError};

/// A fixed number of workers, each draining its own queue.
///
/// Units are dealt round-robin onto per-worker channels. A unit's failure is whatever its
/// result type says it is; siblings keep running and the pool itself only fails when a worker
/// task dies.
#[derive(Debug, Clone, Copy)]
pub struct FetchPool {
    workers: usize,
}

impl FetchPool {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(StarError::InvalidInput(
                "fetch pool needs at least one worker".to_string(),
            ));
        }
        Ok(Self { workers })
    }

    /// Run `work` on every unit and return the results in unit order.
    ///
    /// Returns only after every worker has drained its queue. A worker that died is reported
    /// as [`StarError::Worker`] once the others are done; units still queued on it are lost.
    pub async fn run<U, R, F, Fut>(&self, units: Vec<U>, work: F) -> Result<Vec<R>>
    where
        U: Send + 'static,
        R: Send + 'static,
        F: Fn(U) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        if units.is_empty() {
            return Ok(Vec::new());
        }

        let total = units.len();
        let lanes = self.workers.min(total);
        let work = Arc::new(work);

        let mut queues = Vec::with_capacity(lanes);
        let mut handles = Vec::with_capacity(lanes);
        for _ in 0..lanes {
            let (tx, mut rx) = mpsc::unbounded_channel::<(usize, U)>();
            let work = Arc::clone(&work);
            handles.push(tokio::spawn(async move {
                // Each worker keeps its own results; they are merged after the join.
                let mut done = Vec::new();
                while let Some((slot, unit)) = rx.recv().await {
                    done.push((slot, work(unit).await));
                }
                done
            }));
            queues.push(tx);
        }

        for (slot, unit) in units.into_iter().enumerate() {
            // Only fails if that worker already died; the join below reports it.
            let _ = queues[slot % lanes].send((slot, unit));
        }
        drop(queues);

        // Join every worker before reporting a dead one; no task outlives the call.
        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        let mut first_failure = None;
        for handle in handles {
            match handle.await {
                Ok(done) => {
                    for (slot, result) in done {
                        slots[slot] = Some(result);
                    }
                }
                Err(err) => {
                    first_failure.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_failure {
            return Err(err.into());
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_zero_workers_is_invalid() {
        assert!(matches!(FetchPool::new(0), Err(StarError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let pool = FetchPool::new(4).unwrap();
        let results: Vec<u32> = pool.run(Vec::<u32>::new(), |n| async move { n }).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_follow_unit_order() {
        let pool = FetchPool::new(3).unwrap();
        let units: Vec<u64> = (0..25).collect();
        let results = pool
            .run(units, |n| async move {
                // Later units finish first.
                tokio::time::sleep(Duration::from_millis(25 - n)).await;
                n * 2
            })
            .await
            .unwrap();
        assert_eq!(results, (0..25).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_unit() {
        let pool = FetchPool::new(2).unwrap();
        let results = pool
            .run(vec![1, 2, 3], |n| async move {
                if n == 2 {
                    Err(format!("unit {} timed out", n))
                } else {
                    Ok(format!("readme {}", n))
                }
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok("readme 1".to_string()));
        assert!(results[1].is_err());
        assert_eq!(results[2], Ok("readme 3".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = FetchPool::new(3).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        pool.run((0..30).collect::<Vec<u32>>(), move |_| {
            let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_worker_panic_is_reported_after_siblings_drain() {
        let pool = FetchPool::new(2).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));

        let done = Arc::clone(&finished);
        let result = pool
            .run(vec![1, 2, 3, 4], move |n| {
                let done = Arc::clone(&done);
                async move {
                    if n == 1 {
                        panic!("boom");
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    n
                }
            })
            .await;

        assert!(matches!(result, Err(StarError::Worker(_))));
        // Units 2 and 4 share the surviving worker; unit 3 died with unit 1's worker.
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }
}
