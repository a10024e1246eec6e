/// Error types for ffind.
///
/// Errors fall into two groups. Per-subtree failures (a directory that cannot
/// be opened, a path that cannot be allocated) are contained by the traversal
/// engine: they are logged, counted, and the walk carries on elsewhere.
/// Everything else (a pattern that does not compile, a thread count of zero,
/// a root that cannot be opened) stops the run, or the current root, before
/// any worker is started.
///
/// ```rust,ignore
/// match ffind::search::run(&config) {
///     Ok(summary) if summary.is_clean() => // every path was visited,
///     Ok(summary) => // partial results, diagnostics were emitted,
///     Err(FindError::PatternCompile { .. }) => // nothing was searched,
///     Err(e) => // configuration problem
/// }
/// ```
use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

use crate::search::matcher::Dialect;

/// Result type for search operations
pub type FindResult<T> = Result<T, FindError>;

/// Errors that can occur while compiling a pattern or walking a tree
#[derive(Error, Debug)]
pub enum FindError {
    #[error("failed to allocate requested memory")]
    Allocation(#[from] TryReserveError),
    #[error("failed to open {} ({source})", .path.display())]
    DirectoryOpen {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to compile {dialect} pattern{} ({message})", at_offset(.offset))]
    PatternCompile {
        dialect: Dialect,
        message: String,
        offset: Option<usize>,
    },
    #[error("failed to start worker {id} ({source})")]
    ThreadStart { id: usize, source: std::io::Error },
    #[error("failed to join worker {id} ({message})")]
    ThreadJoin { id: usize, message: String },
    #[error("failed to write match ({0})")]
    Output(std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),
}

fn at_offset(offset: &Option<usize>) -> String {
    offset
        .map(|offset| format!(" at character {}", offset))
        .unwrap_or_default()
}

impl FindError {
    pub fn directory_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryOpen {
            path: path.into(),
            source,
        }
    }

    pub fn pattern_compile(
        dialect: Dialect,
        message: impl Into<String>,
        offset: Option<usize>,
    ) -> Self {
        Self::PatternCompile {
            dialect,
            message: message.into(),
            offset,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the traversal engine absorbs this error at the directory that
    /// produced it instead of unwinding further.
    pub fn is_contained(&self) -> bool {
        matches!(self, Self::Allocation(_) | Self::DirectoryOpen { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = FindError::directory_open("/root/secret", io::ErrorKind::PermissionDenied.into());
        assert!(matches!(
            &err,
            FindError::DirectoryOpen { path, .. } if path == Path::new("/root/secret")
        ));
        assert!(err.is_contained());

        let err = FindError::pattern_compile(Dialect::Pcre, "missing )", Some(3));
        assert!(matches!(err, FindError::PatternCompile { offset: Some(3), .. }));
        assert!(!err.is_contained());

        let err = FindError::config_error("thread count must be at least 1");
        assert!(matches!(err, FindError::Config(_)));
    }

    #[test]
    fn test_allocation_errors_are_contained() {
        let reserve_err = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
        let err = FindError::from(reserve_err);
        assert!(err.is_contained());
        assert_eq!(err.to_string(), "failed to allocate requested memory");
    }

    #[test]
    fn test_error_messages() {
        let err = FindError::pattern_compile(Dialect::Pcre, "unclosed group", Some(7));
        assert_eq!(
            err.to_string(),
            "failed to compile pcre pattern at character 7 (unclosed group)"
        );

        let err = FindError::pattern_compile(Dialect::PosixExtended, "size limit exceeded", None);
        assert_eq!(
            err.to_string(),
            "failed to compile posix-extended pattern (size limit exceeded)"
        );

        let err = FindError::config_error("Missing required field");
        assert_eq!(err.to_string(), "Configuration error: Missing required field");

        let err = FindError::ThreadJoin {
            id: 2,
            message: "worker panicked".to_string(),
        };
        assert_eq!(err.to_string(), "failed to join worker 2 (worker panicked)");
    }
}
