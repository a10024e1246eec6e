use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::posix::{self, Engine, PosixSyntax};
use super::translate::{self, Translation};
use crate::errors::{FindError, FindResult};

/// The pattern syntaxes a search can be expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// Shell wildcard over the whole path, `*` also crosses `/`
    #[default]
    Glob,
    /// Wildcard where `*` is the only metacharacter and `\*` is a literal star
    GlobEscaped,
    /// Plain substring
    Literal,
    PosixBasic,
    PosixExtended,
    Pcre,
    #[serde(rename = "javascript")]
    JavaScript,
}

/// `-regextype` names and the dialect each one selects
pub const REGEX_TYPES: &[(&str, Dialect)] = &[
    ("default", Dialect::PosixBasic),
    ("posix-basic", Dialect::PosixBasic),
    ("grep", Dialect::PosixBasic),
    ("posix-extended", Dialect::PosixExtended),
    ("egrep", Dialect::PosixExtended),
    ("pcre", Dialect::Pcre),
    ("python", Dialect::Pcre),
    ("javascript", Dialect::JavaScript),
];

impl Dialect {
    /// Looks up a `-regextype` name
    pub fn from_regextype(name: &str) -> Option<Self> {
        REGEX_TYPES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|&(_, dialect)| dialect)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Glob => "glob",
            Self::GlobEscaped => "glob-escaped",
            Self::Literal => "literal",
            Self::PosixBasic => "posix-basic",
            Self::PosixExtended => "posix-extended",
            Self::Pcre => "pcre",
            Self::JavaScript => "javascript",
        }
    }

    pub fn is_regex(self) -> bool {
        matches!(
            self,
            Self::PosixBasic | Self::PosixExtended | Self::Pcre | Self::JavaScript
        )
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options that apply to every dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternFlags {
    pub case_insensitive: bool,
}

/// A compiled pattern, tested against full candidate paths
pub trait PathMatcher: Send + Sync + fmt::Debug {
    fn is_match(&self, candidate: &str) -> bool;
}

/// A compiled pattern plus the dialect and text it was built from.
///
/// Built once before the walk starts and shared read-only between workers.
/// The compiled engine state is owned here and released when the pattern is
/// dropped.
#[derive(Debug)]
pub struct Pattern {
    text: String,
    dialect: Dialect,
    matcher: Box<dyn PathMatcher>,
}

impl Pattern {
    /// Compiles `text` in the given dialect
    pub fn compile(text: &str, dialect: Dialect, flags: PatternFlags) -> FindResult<Self> {
        let matcher: Box<dyn PathMatcher> = match dialect {
            Dialect::Glob => Box::new(GlobMatcher::new(
                translate::fnmatch_glob(text),
                dialect,
                flags,
            )?),
            Dialect::GlobEscaped => Box::new(GlobMatcher::new(
                translate::escaped_glob(text),
                dialect,
                flags,
            )?),
            Dialect::Literal => Box::new(LiteralMatcher::new(text, flags)),
            Dialect::PosixBasic => posix_matcher(text, PosixSyntax::Basic, flags)?,
            Dialect::PosixExtended => posix_matcher(text, PosixSyntax::Extended, flags)?,
            Dialect::Pcre => Box::new(BacktrackingMatcher::new(
                Translation::verbatim(text),
                dialect,
                flags,
            )?),
            Dialect::JavaScript => Box::new(BacktrackingMatcher::new(
                translate::javascript_regex(text),
                dialect,
                flags,
            )?),
        };

        debug!(pattern = %text, %dialect, "Compiled pattern");
        Ok(Self {
            text: text.to_string(),
            dialect,
            matcher,
        })
    }

    /// Tests a candidate path. Safe to call from any number of threads.
    pub fn is_match(&self, candidate: &str) -> bool {
        self.matcher.is_match(candidate)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// fnmatch(3) without `FNM_PATHNAME`, on top of the `glob` crate
#[derive(Debug)]
struct GlobMatcher {
    pattern: glob::Pattern,
    options: glob::MatchOptions,
}

impl GlobMatcher {
    fn new(source: Translation, dialect: Dialect, flags: PatternFlags) -> FindResult<Self> {
        let pattern = glob::Pattern::new(source.as_str()).map_err(|e| {
            FindError::pattern_compile(dialect, e.msg, Some(source.source_offset_of_char(e.pos)))
        })?;
        Ok(Self {
            pattern,
            options: glob::MatchOptions {
                case_sensitive: !flags.case_insensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        })
    }
}

impl PathMatcher for GlobMatcher {
    fn is_match(&self, candidate: &str) -> bool {
        self.pattern.matches_with(candidate, self.options)
    }
}

#[derive(Debug)]
struct LiteralMatcher {
    needle: String,
    case_insensitive: bool,
}

impl LiteralMatcher {
    fn new(text: &str, flags: PatternFlags) -> Self {
        let needle = if flags.case_insensitive {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        Self {
            needle,
            case_insensitive: flags.case_insensitive,
        }
    }
}

impl PathMatcher for LiteralMatcher {
    fn is_match(&self, candidate: &str) -> bool {
        if self.case_insensitive {
            candidate.to_lowercase().contains(&self.needle)
        } else {
            candidate.contains(&self.needle)
        }
    }
}

/// Picks the engine for a POSIX pattern: the `regex` crate unless the pattern
/// uses back-references
fn posix_matcher(
    text: &str,
    syntax: PosixSyntax,
    flags: PatternFlags,
) -> FindResult<Box<dyn PathMatcher>> {
    let dialect = match syntax {
        PosixSyntax::Basic => Dialect::PosixBasic,
        PosixSyntax::Extended => Dialect::PosixExtended,
    };
    let translated = posix::translate(text, syntax)
        .map_err(|e| FindError::pattern_compile(dialect, e.message, Some(e.offset)))?;
    Ok(match translated.engine {
        Engine::Automaton => Box::new(RegexMatcher::new(translated.translation, dialect, flags)?),
        Engine::Backtracking => Box::new(BacktrackingMatcher::new(
            translated.translation,
            dialect,
            flags,
        )?),
    })
}

/// POSIX regular expressions, translated for the `regex` crate
#[derive(Debug)]
struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    fn new(translated: Translation, dialect: Dialect, flags: PatternFlags) -> FindResult<Self> {
        let regex = RegexBuilder::new(translated.as_str())
            .case_insensitive(flags.case_insensitive)
            .build()
            .map_err(|e| FindError::pattern_compile(dialect, e.to_string(), None))?;
        Ok(Self { regex })
    }
}

impl PathMatcher for RegexMatcher {
    fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

/// Regular expressions with look-around or back-references
#[derive(Debug)]
struct BacktrackingMatcher {
    regex: fancy_regex::Regex,
}

impl BacktrackingMatcher {
    fn new(source: Translation, dialect: Dialect, flags: PatternFlags) -> FindResult<Self> {
        let source = if flags.case_insensitive {
            source.prefixed("(?i)")
        } else {
            source
        };
        let regex = fancy_regex::Regex::new(source.as_str()).map_err(|e| {
            let offset = match &e {
                fancy_regex::Error::ParseError(pos, _) => Some(source.source_offset(*pos)),
                _ => None,
            };
            FindError::pattern_compile(dialect, e.to_string(), offset)
        })?;
        Ok(Self { regex })
    }
}

impl PathMatcher for BacktrackingMatcher {
    fn is_match(&self, candidate: &str) -> bool {
        match self.regex.is_match(candidate) {
            Ok(matched) => matched,
            Err(e) => {
                // Backtrack limit and similar; the entry is simply not reported
                debug!(candidate, error = %e, "Pattern evaluation failed");
                false
            }
        }
    }
}
