pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod output;
pub mod search;

pub use config::{ConfigOverrides, SearchConfig};
pub use errors::{FindError, FindResult};
pub use filters::{DepthBudget, MatchFilters, Terminator, TypeFilter};
pub use metrics::RunSummary;
pub use search::{run, run_to, Dialect, Pattern, PatternFlags};
