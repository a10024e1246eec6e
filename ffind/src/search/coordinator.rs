//! Runs the walk for each root: a single-threaded seeding pass over the root's
//! children followed by a fixed pool of workers draining the directory stack.
//!
//! Workers never put work back on the stack. Each popped directory is walked
//! to the bottom by the worker that popped it, and a worker that finds the
//! stack empty exits for good, so one deep subtree can keep a single worker
//! busy while the others are already done.

use std::any::Any;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, error, info};

use super::engine::{Traversal, TraversalParams};
use super::fs::{Filesystem, OsFilesystem};
use super::stack::DirStack;
use crate::config::SearchConfig;
use crate::errors::{FindError, FindResult};
use crate::filters::DepthBudget;
use crate::metrics::{RunSummary, SearchMetrics};
use crate::output::OutputSink;

/// Drives a [`Traversal`] over a list of roots with a pool of worker threads
#[derive(Debug)]
pub struct Coordinator<'a, W: Write + Send, F: Filesystem> {
    traversal: Traversal<'a, W, F>,
    thread_count: NonZeroUsize,
}

impl<'a, W: Write + Send, F: Filesystem> Coordinator<'a, W, F> {
    /// Fails if `thread_count` is zero, since nothing would ever drain the
    /// stack
    pub fn new(traversal: Traversal<'a, W, F>, thread_count: usize) -> FindResult<Self> {
        let thread_count = NonZeroUsize::new(thread_count)
            .ok_or_else(|| FindError::config_error("thread count must be at least 1"))?;
        Ok(Self {
            traversal,
            thread_count,
        })
    }

    /// Searches every root in order.
    ///
    /// A root that cannot be opened or seeded is reported and counted, and the
    /// run moves on to the next one. Only output failures end the run early.
    pub fn run(&self, roots: &[PathBuf]) -> FindResult<RunSummary> {
        info!(
            "Searching {} root(s) with {} worker(s)",
            roots.len(),
            self.thread_count
        );

        for root in roots {
            match self.run_root(root) {
                Ok(()) => {}
                Err(e) if e.is_contained() => {
                    error!("{}", e);
                    self.traversal.metrics().record_failed_root();
                }
                Err(e) => return Err(e),
            }
        }

        let summary = self.traversal.metrics().get_stats();
        info!(
            "Search complete. Found {} matches in {} directories",
            summary.matches, summary.directories
        );
        Ok(summary)
    }

    fn run_root(&self, root: &Path) -> FindResult<()> {
        debug!(root = %root.display(), "Seeding");
        let stack = DirStack::new();
        let below = self.traversal.params().max_depth.descend();

        self.seed(root, &stack, below.is_some())?;
        self.traversal.metrics().record_pending(stack.len());

        let Some(below) = below else {
            return Ok(());
        };
        let result = self.drain(&stack, below);
        stack.drain_and_release();
        result
    }

    /// Tests the root's children and queues the subdirectories when `queue`
    /// is set. On failure nothing stays queued.
    fn seed(&self, root: &Path, stack: &DirStack, queue: bool) -> FindResult<()> {
        let children = self.traversal.list(root)?;

        for child in &children {
            let subdir = match self.traversal.visit(root, child) {
                Ok(subdir) => subdir,
                Err(e) => {
                    stack.drain_and_release();
                    return Err(e);
                }
            };
            let Some(subdir) = subdir.filter(|_| queue) else {
                continue;
            };
            if let Err(e) = stack.push(subdir) {
                stack.drain_and_release();
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Starts the workers and waits for all of them.
    ///
    /// If a thread cannot be started no further ones are launched; the
    /// workers already running still empty the stack.
    fn drain(&self, stack: &DirStack, budget: DepthBudget) -> FindResult<()> {
        let mut outcome = Ok(());

        thread::scope(|scope| {
            let mut workers = Vec::with_capacity(self.thread_count.get());
            for id in 0..self.thread_count.get() {
                let spawned = thread::Builder::new()
                    .name(format!("ffind-worker-{}", id))
                    .spawn_scoped(scope, move || self.worker(id, stack, budget));
                match spawned {
                    Ok(handle) => workers.push((id, handle)),
                    Err(source) => {
                        self.fail(FindError::ThreadStart { id, source });
                        break;
                    }
                }
            }

            for (id, handle) in workers {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        if outcome.is_ok() {
                            outcome = Err(e);
                        }
                    }
                    Err(payload) => self.fail(FindError::ThreadJoin {
                        id,
                        message: panic_message(&*payload),
                    }),
                }
            }
        });

        outcome
    }

    fn worker(&self, id: usize, stack: &DirStack, budget: DepthBudget) -> FindResult<()> {
        let mut walked = 0usize;
        while let Some(dir) = stack.pop() {
            if let Err(e) = self.traversal.traverse(&dir, budget) {
                if !e.is_contained() {
                    return Err(e);
                }
                self.traversal.report(&e);
            }
            walked += 1;
        }
        debug!(worker = id, walked, "Worker found the stack empty");
        Ok(())
    }

    fn fail(&self, err: FindError) {
        error!("{}", err);
        self.traversal.metrics().record_error();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Runs a search described by `config`, writing matches to stdout
pub fn run(config: &SearchConfig) -> FindResult<RunSummary> {
    let (summary, _) = run_to(config, io::stdout())?;
    Ok(summary)
}

/// Runs a search described by `config`, writing matches to `writer`. The
/// writer is flushed and handed back.
pub fn run_to<W: Write + Send>(config: &SearchConfig, writer: W) -> FindResult<(RunSummary, W)> {
    let pattern = config.compile_pattern()?;
    let filters = config.filters();
    let metrics = SearchMetrics::new();
    let sink = OutputSink::new(writer);
    let fs = OsFilesystem;

    let result = {
        let params = TraversalParams {
            pattern: &pattern,
            filters: &filters,
            max_depth: config.max_depth_budget(),
        };
        let traversal = Traversal::new(params, &sink, &fs, &metrics);
        Coordinator::new(traversal, config.thread_count).and_then(|c| c.run(&config.roots))
    };

    let finished = sink.finish();
    metrics.log_stats();
    let summary = result?;
    Ok((summary, finished?))
}
