//! Bounded worker pool owned by a scanner.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use parking_lot::RwLock;
use rayon::{ThreadPool, ThreadPoolBuilder};

use projscan_core::ScanError;

/// Stack size of worker threads; traversal recurses once per directory level.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// A rayon pool that can be shut down with a grace period.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    pool: RwLock<Option<Arc<ThreadPool>>>,
    exits: Receiver<usize>,
    threads: usize,
}

impl WorkerPool {
    /// Start `threads` named worker threads.
    pub(crate) fn new(threads: usize) -> Result<Self, ScanError> {
        let (exit_tx, exits) = unbounded();

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("projscan-worker-{index}"))
            .stack_size(WORKER_STACK_SIZE)
            .panic_handler(|payload| {
                tracing::error!("Worker panicked: {}", panic_message(payload.as_ref()));
            })
            .exit_handler(move |index| {
                let _ = exit_tx.send(index);
            })
            .build()
            .map_err(|e| ScanError::PoolBuild {
                message: e.to_string(),
            })?;

        tracing::debug!(threads, "Started worker pool");

        Ok(Self {
            pool: RwLock::new(Some(Arc::new(pool))),
            exits,
            threads,
        })
    }

    /// The running pool, unless shut down.
    pub(crate) fn get(&self) -> Option<Arc<ThreadPool>> {
        self.pool.read().clone()
    }

    /// Number of worker threads.
    pub(crate) fn threads(&self) -> usize {
        self.threads
    }

    /// Release the pool and wait up to `grace` for its threads to exit.
    ///
    /// Workers still busy with in-flight scans keep the pool alive until they
    /// finish; those that outlive the grace period are left detached. Returns
    /// `true` if every worker exited in time.
    pub(crate) fn shutdown(&self, grace: Duration) -> bool {
        let Some(pool) = self.pool.write().take() else {
            return true;
        };
        drop(pool);

        let deadline = Instant::now() + grace;
        let mut exited = 0;
        while exited < self.threads {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exits.recv_timeout(remaining) {
                Ok(_) => exited += 1,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        exited,
                        threads = self.threads,
                        "Worker threads still busy after grace period, detaching"
                    );
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::debug!(exited, "Worker pool stopped");
        true
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threads_are_named() {
        let pool = WorkerPool::new(2).unwrap();
        let name = pool
            .get()
            .unwrap()
            .install(|| std::thread::current().name().map(str::to_string));

        assert!(name.unwrap().starts_with("projscan-worker-"));
        assert_eq!(pool.threads(), 2);
    }

    #[test]
    fn test_shutdown_waits_for_exit() {
        let pool = WorkerPool::new(3).unwrap();

        assert!(pool.shutdown(Duration::from_secs(5)));
        assert!(pool.get().is_none());
        // Idempotent.
        assert!(pool.shutdown(Duration::from_millis(1)));
    }

    #[test]
    fn test_shutdown_detaches_busy_workers() {
        let pool = WorkerPool::new(2).unwrap();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        pool.get().unwrap().spawn(move || {
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
        });

        assert!(!pool.shutdown(Duration::from_millis(50)));
        drop(release_tx);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
