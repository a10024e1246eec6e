use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::fs::{Child, EntryKind, Filesystem};
use super::matcher::Pattern;
use crate::errors::{FindError, FindResult};
use crate::filters::{DepthBudget, MatchFilters};
use crate::metrics::SearchMetrics;
use crate::output::OutputSink;

/// What every worker searches for. Built once per run and only ever read.
#[derive(Debug, Clone, Copy)]
pub struct TraversalParams<'a> {
    pub pattern: &'a Pattern,
    pub filters: &'a MatchFilters,
    pub max_depth: DepthBudget,
}

/// Walks directory subtrees, testing every entry and writing matches to the
/// sink. One value is shared by reference between all workers of a run.
#[derive(Debug)]
pub struct Traversal<'a, W: Write + Send, F: Filesystem> {
    params: TraversalParams<'a>,
    sink: &'a OutputSink<W>,
    fs: &'a F,
    metrics: &'a SearchMetrics,
}

impl<'a, W: Write + Send, F: Filesystem> Traversal<'a, W, F> {
    pub fn new(
        params: TraversalParams<'a>,
        sink: &'a OutputSink<W>,
        fs: &'a F,
        metrics: &'a SearchMetrics,
    ) -> Self {
        Self {
            params,
            sink,
            fs,
            metrics,
        }
    }

    pub fn params(&self) -> &TraversalParams<'a> {
        &self.params
    }

    pub fn metrics(&self) -> &SearchMetrics {
        self.metrics
    }

    /// Visits every entry below `dir`, descending while `budget` allows.
    ///
    /// A subdirectory that cannot be opened is reported and skipped. Failing to
    /// build a child path abandons the rest of `dir` and is returned to the
    /// caller; output errors are returned as well.
    pub fn traverse(&self, dir: &Path, budget: DepthBudget) -> FindResult<()> {
        let children = self.list(dir)?;
        let below = budget.descend();

        for child in &children {
            let Some(subdir) = self.visit(dir, child)? else {
                continue;
            };
            let Some(below) = below else {
                continue;
            };
            if let Err(e) = self.traverse(&subdir, below) {
                if !e.is_contained() {
                    return Err(e);
                }
                self.report(&e);
            }
        }
        Ok(())
    }

    /// Lists the children of `dir`
    pub fn list(&self, dir: &Path) -> FindResult<Vec<Child>> {
        let children = self
            .fs
            .list_children(dir)
            .map_err(|e| FindError::directory_open(dir, e))?;
        trace!(dir = %dir.display(), children = children.len(), "Listed directory");
        self.metrics.record_directory(children.len());
        Ok(children)
    }

    /// Tests one child of `dir` and writes it out if it matches.
    ///
    /// Returns the child's full path when it is a directory, so the caller can
    /// descend into it or queue it.
    pub fn visit(&self, dir: &Path, child: &Child) -> FindResult<Option<PathBuf>> {
        let path = self.fs.child_path(dir, &child.name)?;
        let kind = self.kind_of(&path, child.kind);

        if self.params.filters.accepts(kind) && self.params.pattern.is_match(&path.to_string_lossy())
        {
            self.sink
                .write_match(&path, self.params.filters.terminator)?;
            self.metrics.record_match();
        }

        Ok(kind.is_dir().then_some(path))
    }

    fn kind_of(&self, path: &Path, kind: EntryKind) -> EntryKind {
        if kind != EntryKind::Symlink || !self.params.filters.follow_symlinks {
            return kind;
        }
        match self.fs.resolve_kind(path) {
            Ok(resolved) => resolved,
            Err(e) => {
                // Dangling or unreadable link, report it as itself
                debug!(path = %path.display(), error = %e, "Failed to follow symlink");
                kind
            }
        }
    }

    /// Emits a diagnostic for an error the walk recovers from
    pub fn report(&self, err: &FindError) {
        warn!("{}", err);
        self.metrics.record_error();
    }
}
