use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::FindResult;
use crate::filters::{DepthBudget, MatchFilters, Terminator, TypeFilter};
use crate::search::matcher::{Dialect, Pattern, PatternFlags};

/// Configuration for a find run.
///
/// # Configuration Locations
///
/// Values are layered, later sources overriding earlier ones:
/// 1. Global `$HOME/.config/ffind/config.yaml`
/// 2. Local `.ffind.yaml` in the current directory
/// 3. Custom config file specified via `--config`
/// 4. Command-line flags (see [`SearchConfig::merge_with_cli`])
///
/// # Configuration Format
///
/// ```yaml
/// # Directories to search
/// roots: ["src", "tests"]
///
/// # Pattern text and how to read it
/// pattern: "*.rs"
/// dialect: glob            # glob, glob-escaped, literal, posix-basic,
///                          # posix-extended, pcre, javascript
/// case_insensitive: false
///
/// # Only report files or directories (any, file, directory)
/// entry_type: file
///
/// follow_symlinks: false
/// print0: false
///
/// # Levels below the root's children to descend (-1: unlimited)
/// max_depth: -1
///
/// thread_count: 4
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Directories to search, processed one after another
    pub roots: Vec<PathBuf>,

    /// Pattern text; `None` matches every entry
    pub pattern: Option<String>,

    /// How `pattern` is interpreted
    pub dialect: Dialect,

    pub case_insensitive: bool,

    /// Which kinds of entries are reported
    pub entry_type: TypeFilter,

    /// Whether symlinks are classified (and descended into) by their target
    pub follow_symlinks: bool,

    /// Terminate each path with NUL instead of a newline
    pub print0: bool,

    /// Negative means unlimited
    pub max_depth: i64,

    /// Number of worker threads per root, must be at least 1
    pub thread_count: usize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

pub const DEFAULT_THREAD_COUNT: usize = 4;

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            pattern: None,
            dialect: Dialect::default(),
            case_insensitive: false,
            entry_type: TypeFilter::default(),
            follow_symlinks: false,
            print0: false,
            max_depth: -1,
            thread_count: DEFAULT_THREAD_COUNT,
            log_level: default_log_level(),
        }
    }
}

/// Values given explicitly on the command line. `None` leaves the configured
/// value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub roots: Option<Vec<PathBuf>>,
    pub pattern: Option<String>,
    pub dialect: Option<Dialect>,
    pub case_insensitive: Option<bool>,
    pub entry_type: Option<TypeFilter>,
    pub follow_symlinks: Option<bool>,
    pub print0: Option<bool>,
    pub max_depth: Option<i64>,
    pub thread_count: Option<usize>,
    pub log_level: Option<String>,
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> FindResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an explicit file,
    /// which must exist
    pub fn load_from(config_path: Option<&Path>) -> FindResult<Self> {
        let mut builder = ConfigBuilder::builder();

        // Optional config locations
        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("ffind/config.yaml")),
            // Local config
            Some(PathBuf::from(".ffind.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // Custom config
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges command-line values into the loaded configuration. Anything set
    /// on the command line wins.
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(roots) = cli.roots.filter(|roots| !roots.is_empty()) {
            self.roots = roots;
        }
        if cli.pattern.is_some() {
            self.pattern = cli.pattern;
        }
        if let Some(dialect) = cli.dialect {
            self.dialect = dialect;
        }
        if let Some(case_insensitive) = cli.case_insensitive {
            self.case_insensitive = case_insensitive;
        }
        if let Some(entry_type) = cli.entry_type {
            self.entry_type = entry_type;
        }
        if let Some(follow_symlinks) = cli.follow_symlinks {
            self.follow_symlinks = follow_symlinks;
        }
        if let Some(print0) = cli.print0 {
            self.print0 = print0;
        }
        if let Some(max_depth) = cli.max_depth {
            self.max_depth = max_depth;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Compiles the configured pattern. Without one, every entry matches.
    pub fn compile_pattern(&self) -> FindResult<Pattern> {
        let flags = PatternFlags {
            case_insensitive: self.case_insensitive,
        };
        match &self.pattern {
            Some(text) => Pattern::compile(text, self.dialect, flags),
            None => Pattern::compile("*", Dialect::Glob, flags),
        }
    }

    pub fn filters(&self) -> MatchFilters {
        MatchFilters {
            entry_type: self.entry_type,
            follow_symlinks: self.follow_symlinks,
            terminator: Terminator::from_print0(self.print0),
        }
    }

    pub fn max_depth_budget(&self) -> DepthBudget {
        DepthBudget::from_max_depth(self.max_depth)
    }
}
