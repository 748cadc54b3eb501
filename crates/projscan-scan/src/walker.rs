//! Bounded parallel traversal.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, unbounded};
use rayon::{ThreadPool, Yield};

use projscan_core::{
    CancelReason, FileEntry, ScanSource, ScanWarning, SourceEntry, relative_path,
};
use projscan_ignore::IgnoreEngine;

use crate::pool::panic_message;
use crate::progress::ProgressSink;
use crate::session::ScanSession;

/// How long a waiting unit blocks before looking for pool work again.
const HELP_INTERVAL: Duration = Duration::from_millis(2);

/// Jobs a waiting thread may run nested on its own stack.
const MAX_HELP_DEPTH: usize = 32;

thread_local! {
    static HELP_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct WalkContext {
    source: Arc<dyn ScanSource>,
    engine: IgnoreEngine,
    session: Arc<ScanSession>,
    pool: Arc<ThreadPool>,
    progress: Option<ProgressSink>,
}

/// Walks a source on a bounded pool, filtering through an ignore engine.
///
/// Small directories are handled inline by the unit that lists them. Larger
/// ones are split into `batch_size` chunks that run as separate pool jobs
/// while the listing unit waits for them, up to `batch_wait_timeout`.
#[derive(Clone)]
pub struct ConcurrentWalker {
    ctx: Arc<WalkContext>,
}

impl ConcurrentWalker {
    /// Create a walker for one scan session.
    pub fn new(
        source: Arc<dyn ScanSource>,
        engine: IgnoreEngine,
        session: Arc<ScanSession>,
        pool: Arc<ThreadPool>,
    ) -> Self {
        Self::build(source, engine, session, pool, None)
    }

    pub(crate) fn build(
        source: Arc<dyn ScanSource>,
        engine: IgnoreEngine,
        session: Arc<ScanSession>,
        pool: Arc<ThreadPool>,
        progress: Option<ProgressSink>,
    ) -> Self {
        Self {
            ctx: Arc::new(WalkContext {
                source,
                engine,
                session,
                pool,
                progress,
            }),
        }
    }

    /// The session this walker fills.
    pub fn session(&self) -> &ScanSession {
        &self.ctx.session
    }

    /// The ignore rules in effect.
    pub fn engine(&self) -> &IgnoreEngine {
        &self.ctx.engine
    }

    /// Traverse from the root on the calling thread.
    ///
    /// Returns once every batch has finished or been abandoned; the results
    /// are left in the session.
    pub fn walk(&self) {
        let root = self.ctx.source.root().to_path_buf();
        walk_dir(&self.ctx, &root, 0);
    }
}

fn walk_dir(ctx: &Arc<WalkContext>, dir: &Path, depth: usize) {
    let session = &ctx.session;
    if session.is_cancelled() {
        return;
    }

    let limits = session.limits();
    if depth > limits.max_depth {
        tracing::debug!(dir = %dir.display(), depth, "Max depth exceeded, skipping branch");
        return;
    }

    if !session.try_enter_directory() {
        return;
    }

    let children = match ctx.source.read_dir(dir) {
        Ok(children) => children,
        Err(err) if depth == 0 => {
            session.push_warning(ScanWarning::read_error(dir, &err));
            session.fail(
                CancelReason::RootUnreadable,
                format!("Cannot list scan root {}: {err}", dir.display()),
            );
            return;
        }
        Err(err) => {
            tracing::warn!(dir = %dir.display(), "Failed to read directory: {err}");
            session.push_warning(ScanWarning::read_error(dir, &err));
            return;
        }
    };

    if children.is_empty() {
        return;
    }

    if children.len() <= limits.batch_size {
        process_children(ctx, children, depth);
        return;
    }

    let batches = split_batches(children, limits.batch_size);
    let expected = batches.len();
    tracing::debug!(dir = %dir.display(), batches = expected, "Fanning out directory");

    let (done_tx, done_rx) = unbounded::<()>();
    for batch in batches {
        let ctx_batch = Arc::clone(ctx);
        let done = done_tx.clone();
        ctx.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                process_children(&ctx_batch, batch, depth);
            }));
            if let Err(payload) = result {
                ctx_batch
                    .session
                    .fail(CancelReason::Panic, panic_message(payload.as_ref()));
            }
            let _ = done.send(());
        });
    }
    drop(done_tx);

    if !wait_for_batches(&done_rx, expected, limits.batch_wait_timeout)
        && session.cancel(CancelReason::BatchTimeout)
    {
        tracing::warn!(
            dir = %dir.display(),
            timeout_ms = limits.batch_wait_timeout.as_millis() as u64,
            "Timed out waiting for directory batches"
        );
    }
}

fn process_children(ctx: &Arc<WalkContext>, children: Vec<SourceEntry>, depth: usize) {
    let root = ctx.source.root();

    for child in children {
        if ctx.session.is_cancelled() {
            return;
        }

        let Some(relative) = relative_path(root, &child.path) else {
            continue;
        };
        if ctx.engine.should_ignore(&relative, child.is_dir) {
            continue;
        }

        if child.is_dir {
            walk_dir(ctx, &child.path, depth + 1);
            continue;
        }

        let entry = FileEntry::from_source(child, relative);
        match &ctx.progress {
            Some(progress) => {
                let path = entry.path.clone();
                if let Some(count) = ctx.session.try_add_file(entry) {
                    progress.file_collected(&ctx.session, count, &path);
                }
            }
            None => {
                ctx.session.try_add_file(entry);
            }
        }
    }
}

fn split_batches(children: Vec<SourceEntry>, batch_size: usize) -> Vec<Vec<SourceEntry>> {
    let mut batches = Vec::with_capacity(children.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);
    for child in children {
        current.push(child);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Wait for `expected` completion signals.
///
/// A waiter running on a pool thread executes queued jobs while it waits, so
/// nested waits cannot starve a bounded pool. Nesting stops at
/// `MAX_HELP_DEPTH`; deeper waiters only block. Returns `false` on timeout.
fn wait_for_batches(done: &Receiver<()>, expected: usize, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut finished = 0;

    while finished < expected {
        match done.try_recv() {
            Ok(()) => {
                finished += 1;
                continue;
            }
            // Every job has run or been dropped.
            Err(TryRecvError::Disconnected) => return true,
            Err(TryRecvError::Empty) => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }

        if help_pool() {
            continue;
        }

        match done.recv_timeout(HELP_INTERVAL.min(deadline - now)) {
            Ok(()) => finished += 1,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return true,
        }
    }

    true
}

/// Run one queued pool job on this thread, unless the help depth is exhausted.
fn help_pool() -> bool {
    HELP_DEPTH.with(|depth| {
        let current = depth.get();
        if current >= MAX_HELP_DEPTH {
            return false;
        }
        depth.set(current + 1);
        let executed = rayon::yield_now() == Some(Yield::Executed);
        depth.set(current);
        executed
    })
}
