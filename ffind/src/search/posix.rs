//! POSIX basic and extended regular expressions on top of the `regex` crate.
//!
//! The two syntaxes differ mostly in which characters need a backslash to be
//! special: in a BRE `\(`, `\)`, `\{`, `\}` and `\|` are operators and the bare
//! characters are literals, in an ERE it is the other way around. Both are
//! rewritten into `regex` syntax here, keeping a map back to the original text
//! for error reporting. GNU extensions (`\+`, `\?`, `\|` in BREs, `\<`, `\>`,
//! `\b`, `\w`, ...) are honored. The `regex` crate has no back-references, so
//! a pattern that uses `\1`..`\9` is rewritten for the backtracking engine
//! instead.

use super::translate::{SyntaxError, Translation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PosixSyntax {
    Basic,
    Extended,
}

const CHARACTER_CLASSES: &[&str] = &[
    "alnum", "alpha", "blank", "cntrl", "digit", "graph", "lower", "print", "punct", "space",
    "upper", "xdigit",
];

/// The engine a translated pattern is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Engine {
    /// The `regex` crate
    Automaton,
    /// `fancy-regex`, needed for back-references
    Backtracking,
}

#[derive(Debug)]
pub(crate) struct PosixRegex {
    pub translation: Translation,
    pub engine: Engine,
}

/// Rewrites a POSIX regular expression into `regex` crate syntax, or into
/// `fancy-regex` syntax when it refers back to a group
pub(crate) fn translate(pattern: &str, syntax: PosixSyntax) -> Result<PosixRegex, SyntaxError> {
    let first = Translator::new(pattern, syntax, Engine::Automaton).run()?;
    if first.engine == Engine::Automaton {
        return Ok(first);
    }
    Translator::new(pattern, syntax, Engine::Backtracking).run()
}

struct Translator<'a> {
    pattern: &'a str,
    syntax: PosixSyntax,
    target: Engine,
    pos: usize,
    out: Translation,
    /// (source offset, output offset, group number) of every open group
    groups: Vec<(usize, usize, usize)>,
    /// Groups opened so far
    group_count: usize,
    /// Numbers of the groups already closed
    closed: Vec<usize>,
    back_references: bool,
    /// Output offset where the most recent repeatable atom starts
    last_atom: Option<usize>,
    /// Whether `last_atom` already carries a repetition operator
    repeated: bool,
    /// Whether `^` is an anchor at this point (BRE only cares)
    anchor_ok: bool,
}

impl<'a> Translator<'a> {
    fn new(pattern: &'a str, syntax: PosixSyntax, target: Engine) -> Self {
        Self {
            pattern,
            syntax,
            target,
            pos: 0,
            out: Translation::new(pattern),
            groups: Vec::new(),
            group_count: 0,
            closed: Vec::new(),
            back_references: false,
            last_atom: None,
            repeated: false,
            anchor_ok: true,
        }
    }

    fn next_char(&mut self) -> Option<(usize, char)> {
        let c = self.pattern[self.pos..].chars().next()?;
        let offset = self.pos;
        self.pos += c.len_utf8();
        Some((offset, c))
    }

    fn rest(&self) -> &'a str {
        &self.pattern[self.pos..]
    }

    fn is_basic(&self) -> bool {
        self.syntax == PosixSyntax::Basic
    }

    fn run(mut self) -> Result<PosixRegex, SyntaxError> {
        // regexec() without REG_NEWLINE lets `.` match a newline
        self.out.push("(?s)", 0);

        while let Some((offset, c)) = self.next_char() {
            match c {
                '\\' => self.escape(offset)?,
                '[' => self.bracket(offset)?,
                '.' => self.atom(".", offset),
                '*' => self.repeat("*", offset),
                '^' if !self.is_basic() || self.anchor_ok => self.anchor("^", offset),
                '$' if !self.is_basic() || self.at_bre_end() => self.anchor("$", offset),
                '+' | '?' if !self.is_basic() => {
                    let mut buf = [0u8; 4];
                    self.repeat(c.encode_utf8(&mut buf), offset)
                }
                '{' if !self.is_basic() => self.interval(offset, "}")?,
                '(' if !self.is_basic() => self.open_group(offset),
                ')' if !self.is_basic() && !self.groups.is_empty() => self.close_group(offset),
                '|' if !self.is_basic() => self.alternate(offset),
                _ => self.literal(c, offset),
            }
        }

        if let Some(&(offset, _, _)) = self.groups.last() {
            return Err(SyntaxError::new(offset, "unmatched ( or \\("));
        }
        let engine = if self.back_references {
            Engine::Backtracking
        } else {
            Engine::Automaton
        };
        Ok(PosixRegex {
            translation: self.out,
            engine,
        })
    }

    /// In a BRE `$` only anchors at the end of the pattern or of a group or
    /// alternative.
    fn at_bre_end(&self) -> bool {
        let rest = self.rest();
        rest.is_empty() || rest.starts_with("\\)") || rest.starts_with("\\|")
    }

    fn escape(&mut self, offset: usize) -> Result<(), SyntaxError> {
        let Some((_, c)) = self.next_char() else {
            return Err(SyntaxError::new(offset, "trailing backslash"));
        };
        match c {
            '(' if self.is_basic() => self.open_group(offset),
            ')' if self.is_basic() => {
                if self.groups.is_empty() {
                    return Err(SyntaxError::new(offset, "unmatched \\)"));
                }
                self.close_group(offset)
            }
            '{' if self.is_basic() => self.interval(offset, "\\}")?,
            '|' if self.is_basic() => self.alternate(offset),
            '+' if self.is_basic() => self.repeat("+", offset),
            '?' if self.is_basic() => self.repeat("?", offset),
            '<' => self.assertion(self.word_start(), offset),
            '>' => self.assertion(self.word_end(), offset),
            '`' => self.assertion(r"\A", offset),
            '\'' => self.assertion(r"\z", offset),
            'b' => self.assertion(r"\b", offset),
            'B' => self.assertion(r"\B", offset),
            'w' | 'W' | 's' | 'S' => {
                let mut class = String::from("\\");
                class.push(c);
                self.atom(&class, offset)
            }
            '1'..='9' => self.back_reference(c, offset)?,
            _ => self.literal(c, offset),
        }
        Ok(())
    }

    fn word_start(&self) -> &'static str {
        match self.target {
            Engine::Automaton => r"\b{start}",
            Engine::Backtracking => r"\b(?=\w)",
        }
    }

    fn word_end(&self) -> &'static str {
        match self.target {
            Engine::Automaton => r"\b{end}",
            Engine::Backtracking => r"\b(?<=\w)",
        }
    }

    /// `\N` may only name a group that is already closed
    fn back_reference(&mut self, digit: char, offset: usize) -> Result<(), SyntaxError> {
        let group = usize::from(digit as u8 - b'0');
        if !self.closed.contains(&group) {
            return Err(SyntaxError::new(offset, "invalid back reference"));
        }
        self.back_references = true;
        self.atom(&format!("\\{}", group), offset);
        Ok(())
    }

    fn atom(&mut self, s: &str, offset: usize) {
        let start = self.out.len();
        self.out.push(s, offset);
        self.last_atom = Some(start);
        self.repeated = false;
        self.anchor_ok = false;
    }

    fn literal(&mut self, c: char, offset: usize) {
        let mut buf = [0u8; 4];
        self.atom(&regex::escape(c.encode_utf8(&mut buf)), offset);
    }

    fn assertion(&mut self, s: &str, offset: usize) {
        self.out.push(s, offset);
        self.last_atom = None;
        self.anchor_ok = false;
    }

    fn anchor(&mut self, s: &str, offset: usize) {
        self.out.push(s, offset);
        self.last_atom = None;
        // `^*` keeps the star literal, but `^^` is a literal caret
        self.anchor_ok = false;
    }

    /// Applies `op` to the last atom. With nothing to repeat the operator is a
    /// literal; repeating an already repeated atom groups it first, since the
    /// engine rejects stacked quantifiers.
    fn repeat(&mut self, op: &str, offset: usize) {
        match self.last_atom {
            None => {
                for c in op.chars() {
                    self.literal(c, offset);
                }
            }
            Some(start) => {
                if self.repeated {
                    self.out.wrap(start, offset);
                }
                self.out.push(op, offset);
                self.repeated = true;
                self.anchor_ok = false;
            }
        }
    }

    fn interval(&mut self, offset: usize, close: &str) -> Result<(), SyntaxError> {
        if self.last_atom.is_none() {
            self.literal('{', offset);
            return Ok(());
        }
        let rest = self.rest();
        let Some(end) = rest.find(close) else {
            return Err(SyntaxError::new(offset, "unterminated interval"));
        };
        let body = &rest[..end];
        let bound = |text: &str| {
            text.parse::<u32>()
                .map_err(|_| SyntaxError::new(offset, "invalid interval"))
        };
        // GNU reads a missing minimum as zero
        let lower = |text: &str| if text.is_empty() { Ok(0) } else { bound(text) };

        let quantifier = match body.split_once(',') {
            None => format!("{{{}}}", bound(body)?),
            Some((min, "")) => format!("{{{},}}", lower(min)?),
            Some((min, max)) => {
                let (min, max) = (lower(min)?, bound(max)?);
                if max < min {
                    return Err(SyntaxError::new(offset, "invalid interval bounds"));
                }
                format!("{{{},{}}}", min, max)
            }
        };
        self.pos += end + close.len();
        self.repeat(&quantifier, offset);
        Ok(())
    }

    fn open_group(&mut self, offset: usize) {
        self.group_count += 1;
        self.groups.push((offset, self.out.len(), self.group_count));
        self.out.push("(", offset);
        self.last_atom = None;
        self.anchor_ok = true;
    }

    fn close_group(&mut self, offset: usize) {
        if let Some((_, start, number)) = self.groups.pop() {
            self.closed.push(number);
            self.out.push(")", offset);
            self.last_atom = Some(start);
            self.repeated = false;
            self.anchor_ok = false;
        }
    }

    fn alternate(&mut self, offset: usize) {
        self.out.push("|", offset);
        self.last_atom = None;
        self.anchor_ok = true;
    }

    /// Copies a bracket expression. POSIX brackets have no escapes, so
    /// characters that are special inside a `regex` class get a backslash.
    fn bracket(&mut self, offset: usize) -> Result<(), SyntaxError> {
        let start = self.out.len();
        self.out.push("[", offset);
        if self.rest().starts_with('^') {
            self.out.push("^", self.pos);
            self.pos += 1;
        }
        if self.rest().starts_with(']') {
            self.out.push("\\]", self.pos);
            self.pos += 1;
        }

        loop {
            let Some((at, c)) = self.next_char() else {
                return Err(SyntaxError::new(offset, "unterminated bracket expression"));
            };
            match c {
                ']' => break,
                '[' if self.rest().starts_with(':') => {
                    let body = &self.rest()[1..];
                    let Some(end) = body.find(":]") else {
                        return Err(SyntaxError::new(at, "unterminated character class"));
                    };
                    let name = &body[..end];
                    if !CHARACTER_CLASSES.contains(&name) {
                        return Err(SyntaxError::new(at, format!("invalid character class '{}'", name)));
                    }
                    self.out.push(&format!("[:{}:]", name), at);
                    self.pos += end + 3;
                }
                '[' if self.rest().starts_with('.') || self.rest().starts_with('=') => {
                    let delimiter = if self.rest().starts_with('.') { ".]" } else { "=]" };
                    let body = &self.rest()[1..];
                    let mut chars = body.chars();
                    match (chars.next(), body.find(delimiter)) {
                        (Some(single), Some(end)) if end == single.len_utf8() => {
                            let mut buf = [0u8; 4];
                            self.out
                                .push(&regex::escape(single.encode_utf8(&mut buf)), at);
                            self.pos += 1 + end + delimiter.len();
                        }
                        _ => {
                            return Err(SyntaxError::new(
                                at,
                                "multi-character collating elements are not supported",
                            ))
                        }
                    }
                }
                '[' | '\\' | '&' | '~' => {
                    self.out.push("\\", at);
                    self.out.push_char(c, at);
                }
                _ => self.out.push_char(c, at),
            }
        }

        self.out.push("]", self.pos.saturating_sub(1));
        self.last_atom = Some(start);
        self.repeated = false;
        self.anchor_ok = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(pattern: &str) -> String {
        translate(pattern, PosixSyntax::Basic)
            .unwrap()
            .translation
            .as_str()
            .to_string()
    }

    fn extended(pattern: &str) -> String {
        translate(pattern, PosixSyntax::Extended)
            .unwrap()
            .translation
            .as_str()
            .to_string()
    }

    #[test]
    fn test_basic_operators() {
        assert_eq!(basic(r"\(ab\)*"), r"(?s)(ab)*");
        assert_eq!(basic(r"a\{2,3\}"), r"(?s)a{2,3}");
        assert_eq!(basic(r"a\{2,\}"), r"(?s)a{2,}");
        assert_eq!(basic(r"a\{,2\}b"), r"(?s)a{0,2}b");
        assert_eq!(extended("a{,}"), "(?s)a{0,}");
        assert_eq!(basic(r"a\|b"), r"(?s)a|b");
        assert_eq!(basic(r"a\+b\?"), r"(?s)a+b?");
        // Bare ERE operators are literals in a BRE
        assert_eq!(basic("(a)+|{"), r"(?s)\(a\)\+\|\{");
    }

    #[test]
    fn test_basic_context_dependent_characters() {
        // Leading star is literal
        assert_eq!(basic("*a"), r"(?s)\*a");
        assert_eq!(basic(r"\(*a\)"), r"(?s)(\*a)");
        assert_eq!(basic("^*"), r"(?s)^\*");
        // `^` and `$` only anchor at the ends
        assert_eq!(basic("a^b$"), r"(?s)a\^b$");
        assert_eq!(basic("a$b"), r"(?s)a\$b");
        assert_eq!(basic(r"\(a$\)"), r"(?s)(a$)");
    }

    #[test]
    fn test_extended_operators() {
        assert_eq!(extended("(ab)+|c?"), "(?s)(ab)+|c?");
        assert_eq!(extended("a{2}"), "(?s)a{2}");
        assert_eq!(extended(r"\(\)"), r"(?s)\(\)");
        assert_eq!(extended("a)"), r"(?s)a\)");
        assert_eq!(extended("+a"), r"(?s)\+a");
    }

    #[test]
    fn test_stacked_repetition_is_grouped() {
        assert_eq!(basic("a**"), "(?s)(?:a*)*");
        assert_eq!(extended("a+?"), "(?s)(?:a+)?");
    }

    #[test]
    fn test_bracket_expressions() {
        assert_eq!(basic("[]a]"), r"(?s)[\]a]");
        assert_eq!(basic("[^]a]"), r"(?s)[^\]a]");
        assert_eq!(basic(r"[\.]"), r"(?s)[\\.]");
        assert_eq!(basic("[[:digit:]x]"), "(?s)[[:digit:]x]");
        assert_eq!(basic("[a&&b]"), r"(?s)[a\&\&b]");
        assert_eq!(basic("[[.-.]]"), r"(?s)[\-]");
    }

    #[test]
    fn test_gnu_escapes() {
        assert_eq!(basic(r"\<foo\>"), r"(?s)\b{start}foo\b{end}");
        assert_eq!(extended(r"\w+\s"), r"(?s)\w+\s");
        assert_eq!(basic(r"\."), r"(?s)\.");
    }

    #[test]
    fn test_back_references_select_backtracking() {
        let plain = translate(r"\<\(ab\)", PosixSyntax::Basic).unwrap();
        assert_eq!(plain.engine, Engine::Automaton);
        assert_eq!(plain.translation.as_str(), r"(?s)\b{start}(ab)");

        let backref = translate(r"\<\(ab\)\1", PosixSyntax::Basic).unwrap();
        assert_eq!(backref.engine, Engine::Backtracking);
        assert_eq!(backref.translation.as_str(), r"(?s)\b(?=\w)(ab)\1");

        assert_eq!(extended(r"(a)(b)\2\1\>"), r"(?s)(a)(b)\2\1\b(?<=\w)");
        // Nested groups count by their opening parenthesis
        assert_eq!(extended(r"((a)b)\2\1"), r"(?s)((a)b)\2\1");
    }

    #[test]
    fn test_syntax_errors() {
        // No such group
        let err = translate(r"ab\1", PosixSyntax::Basic).unwrap_err();
        assert_eq!(err.offset, 2);
        assert!(err.message.contains("back reference"));

        // Group still open
        let err = translate(r"(a\1)", PosixSyntax::Extended).unwrap_err();
        assert_eq!(err.offset, 2);

        let err = translate("a[bc", PosixSyntax::Extended).unwrap_err();
        assert_eq!(err.offset, 1);

        let err = translate(r"x\(a", PosixSyntax::Basic).unwrap_err();
        assert_eq!(err.offset, 1);

        let err = translate(r"a\)", PosixSyntax::Basic).unwrap_err();
        assert_eq!(err.offset, 1);

        let err = translate("(ab", PosixSyntax::Extended).unwrap_err();
        assert_eq!(err.offset, 0);

        let err = translate(r"a\{3,1\}", PosixSyntax::Basic).unwrap_err();
        assert_eq!(err.offset, 1);

        let err = translate("[[:bogus:]]", PosixSyntax::Basic).unwrap_err();
        assert_eq!(err.offset, 1);

        let err = translate("abc\\", PosixSyntax::Basic).unwrap_err();
        assert_eq!(err.offset, 3);
    }
}
