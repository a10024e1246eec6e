//! Parallel directory walking.
//!
//! A run is built from a few small pieces:
//!
//! - [`matcher`] compiles the user's pattern, in one of seven dialects, into a
//!   [`Pattern`] that is shared read-only by every thread.
//! - [`fs`] is the seam over the operating system: listing a directory and
//!   probing what a symlink points at.
//! - [`engine`] walks one subtree depth-first, writing every accepted entry to
//!   the [`OutputSink`](crate::output::OutputSink).
//! - [`stack`] holds the root's subdirectories between the seeding pass and
//!   the workers.
//! - [`coordinator`] seeds the stack for each root and runs the worker pool.
//!
//! ```rust,ignore
//! let config = SearchConfig {
//!     pattern: Some("*.rs".to_string()),
//!     ..SearchConfig::default()
//! };
//! let summary = ffind::search::run(&config)?;
//! ```
pub mod coordinator;
pub mod engine;
pub mod fs;
pub mod matcher;
pub mod stack;

mod posix;
mod translate;

pub use coordinator::{run, run_to, Coordinator};
pub use engine::{Traversal, TraversalParams};
pub use fs::{EntryKind, Filesystem, OsFilesystem};
pub use matcher::{Dialect, Pattern, PatternFlags};
pub use stack::DirStack;
