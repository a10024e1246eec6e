use clap::Parser;
use ffind::{
    config::{ConfigOverrides, SearchConfig},
    search::{self, matcher::REGEX_TYPES},
    Dialect, FindError, TypeFilter,
};
use std::ffi::OsString;
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, FindError>;

/// Find files in parallel
#[derive(Parser, Debug)]
#[command(
    name = "ffind",
    version,
    about,
    long_about = None,
    after_help = "find(1)-style spellings are accepted too: -name, -regex, -regextype, -type, -maxdepth, -print0"
)]
struct Cli {
    /// Directories to search (default: .)
    paths: Vec<PathBuf>,

    /// Find entries whose path matches this glob
    #[arg(long, value_name = "PATTERN", conflicts_with = "regex")]
    name: Option<String>,

    /// Find entries whose path matches this regular expression
    #[arg(long, value_name = "PATTERN")]
    regex: Option<String>,

    /// Regex dialect for --regex; "help" lists them
    #[arg(long, value_name = "TYPE")]
    regextype: Option<String>,

    /// Only report directories (d) or files (f)
    #[arg(long = "type", value_name = "d|f", value_parser = parse_type)]
    entry_type: Option<TypeFilter>,

    /// Maximum recursion depth, -1 for unlimited
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    maxdepth: Option<i64>,

    /// Separate results with NUL instead of newline
    #[arg(long)]
    print0: bool,

    /// Number of worker threads
    #[arg(short = 'j', long = "threads", value_name = "N")]
    threads: Option<usize>,

    /// Follow symbolic links
    #[arg(short = 'L', overrides_with_all = ["no_follow_h", "no_follow_p"])]
    follow: bool,

    /// Do not follow symbolic links
    #[arg(short = 'H', overrides_with_all = ["follow", "no_follow_p"])]
    no_follow_h: bool,

    /// Do not follow symbolic links
    #[arg(short = 'P', overrides_with_all = ["follow", "no_follow_h"])]
    no_follow_p: bool,

    /// Ignore case when matching
    #[arg(short = 'I', long)]
    ignore_case: bool,

    /// Let \* stand for a literal asterisk in --name
    #[arg(short = 'e', long, conflicts_with = "literal")]
    escape: bool,

    /// Match --name as a plain substring
    #[arg(short = 'l', long)]
    literal: bool,

    /// Configuration file to load
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn parse_type(value: &str) -> std::result::Result<TypeFilter, String> {
    let mut letters = value.chars();
    match (letters.next(), letters.next()) {
        (Some(letter), None) => TypeFilter::from_letter(letter)
            .ok_or_else(|| format!("type {} is not supported", letter)),
        _ => Err("argument should only contain 1 letter".to_string()),
    }
}

/// Options spelled the find(1) way, with a single dash
const FIND_STYLE_OPTIONS: &[&str] = &["-name", "-regex", "-regextype", "-type", "-maxdepth"];

/// Rewrites `-name`, `-maxdepth` and friends into their `--` forms so clap
/// can parse them. Option values are left untouched.
fn normalize_find_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut normalized = Vec::new();
    let mut value_expected = false;
    let mut positional_only = false;

    for arg in args {
        if value_expected || positional_only {
            value_expected = false;
            normalized.push(arg);
            continue;
        }
        match arg.to_str() {
            Some("--") => {
                normalized.push(arg);
                positional_only = true;
            }
            Some(word) if FIND_STYLE_OPTIONS.contains(&word) => {
                normalized.push(format!("-{}", word).into());
                value_expected = true;
            }
            Some("-print0") => normalized.push("--print0".into()),
            Some(word) if is_value_option(word) => {
                normalized.push(arg);
                value_expected = true;
            }
            _ => normalized.push(arg),
        }
    }
    normalized
}

fn is_value_option(word: &str) -> bool {
    matches!(
        word,
        "--name"
            | "--regex"
            | "--regextype"
            | "--type"
            | "--maxdepth"
            | "-j"
            | "--threads"
            | "-c"
            | "--config"
            | "--log-level"
    )
}

impl Cli {
    fn follow_symlinks(&self) -> Option<bool> {
        if self.follow {
            Some(true)
        } else if self.no_follow_h || self.no_follow_p {
            Some(false)
        } else {
            None
        }
    }

    /// Pattern text and dialect implied by the pattern options
    fn pattern(&self) -> Result<(Option<String>, Option<Dialect>)> {
        if let Some(regex) = &self.regex {
            let dialect = match self.regextype.as_deref() {
                Some(name) => regex_dialect(name)?,
                None => Dialect::PosixBasic,
            };
            return Ok((Some(regex.clone()), Some(dialect)));
        }

        let dialect = if self.literal {
            Some(Dialect::Literal)
        } else if self.escape {
            Some(Dialect::GlobEscaped)
        } else if self.name.is_some() {
            Some(Dialect::Glob)
        } else {
            None
        };
        Ok((self.name.clone(), dialect))
    }

    fn overrides(&self) -> Result<ConfigOverrides> {
        let (pattern, dialect) = self.pattern()?;
        Ok(ConfigOverrides {
            roots: Some(self.paths.clone()),
            pattern,
            dialect,
            case_insensitive: self.ignore_case.then_some(true),
            entry_type: self.entry_type,
            follow_symlinks: self.follow_symlinks(),
            print0: self.print0.then_some(true),
            max_depth: self.maxdepth,
            thread_count: self.threads,
            log_level: self.log_level.clone(),
        })
    }
}

fn regex_dialect(name: &str) -> Result<Dialect> {
    Dialect::from_regextype(name).ok_or_else(|| {
        FindError::config_error(format!(
            "invalid regex type: {} (available: {})",
            name,
            regex_type_names()
        ))
    })
}

fn regex_type_names() -> String {
    REGEX_TYPES
        .iter()
        .map(|(name, _)| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Puts the tool name where the timestamp would go, so every diagnostic
/// reads `ffind: LEVEL message`
struct ToolPrefix;

impl FormatTime for ToolPrefix {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        w.write_str("ffind:")
    }
}

fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(ToolPrefix)
        .with_target(false)
        .with_ansi(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.regextype.as_deref() == Some("help") {
        println!("Regex types: {}", regex_type_names());
        return Ok(ExitCode::SUCCESS);
    }

    let config = SearchConfig::load_from(cli.config.as_deref())?.merge_with_cli(cli.overrides()?);
    setup_logging(&config.log_level);
    debug!(?config, "Effective configuration");

    let summary = search::run(&config)?;
    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_find_args(std::env::args_os()));

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ffind: {}", e);
            ExitCode::FAILURE
        }
    }
}
