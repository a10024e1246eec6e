//! Source-to-source rewrites that let one pattern syntax run on another
//! engine: fnmatch globs on the `glob` crate and JavaScript regexes on the
//! PCRE-style backtracking engine.
//!
//! Every rewrite keeps a byte-offset map back to the user's text so compile
//! errors can point at the character the user actually typed.

/// A rewritten pattern plus, for every byte of it, the offset of the source
/// byte it came from.
#[derive(Debug, Clone, Default)]
pub(crate) struct Translation {
    text: String,
    origin: Vec<usize>,
    source_len: usize,
}

impl Translation {
    pub(crate) fn new(source: &str) -> Self {
        Self {
            text: String::with_capacity(source.len() + 8),
            origin: Vec::with_capacity(source.len() + 8),
            source_len: source.len(),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    pub(crate) fn len(&self) -> usize {
        self.text.len()
    }

    /// Appends `s`, attributing all of it to `source` in the original text
    pub(crate) fn push(&mut self, s: &str, source: usize) {
        self.text.push_str(s);
        self.origin.extend(std::iter::repeat(source).take(s.len()));
    }

    pub(crate) fn push_char(&mut self, c: char, source: usize) {
        let mut buf = [0u8; 4];
        self.push(c.encode_utf8(&mut buf), source);
    }

    /// Wraps everything from byte `from` to the end in a non-capturing group
    pub(crate) fn wrap(&mut self, from: usize, source: usize) {
        let opener_origin = self.origin.get(from).copied().unwrap_or(source);
        self.text.insert_str(from, "(?:");
        self.origin
            .splice(from..from, std::iter::repeat(opener_origin).take(3));
        self.push(")", source);
    }

    /// A translation that copies `source` unchanged
    pub(crate) fn verbatim(source: &str) -> Self {
        let mut out = Self::new(source);
        for (offset, c) in source.char_indices() {
            out.push_char(c, offset);
        }
        out
    }

    /// Inserts `s` in front of the text, attributed to the start of the source
    pub(crate) fn prefixed(mut self, s: &str) -> Self {
        self.text.insert_str(0, s);
        self.origin.splice(0..0, std::iter::repeat(0).take(s.len()));
        self
    }

    /// Maps a byte offset in the rewritten text back to the source text
    pub(crate) fn source_offset(&self, translated: usize) -> usize {
        self.origin
            .get(translated)
            .copied()
            .unwrap_or(self.source_len)
    }

    /// Maps a character index (as reported by the `glob` crate) back to a
    /// byte offset in the source text
    pub(crate) fn source_offset_of_char(&self, char_index: usize) -> usize {
        let byte = self
            .text
            .char_indices()
            .nth(char_index)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len());
        self.source_offset(byte)
    }
}

/// A syntax problem found while rewriting, located in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Prepares an fnmatch-style glob for the `glob` crate.
///
/// Without `FNM_PATHNAME` a run of stars means the same as a single star, but
/// the `glob` crate gives `**` a path-component meaning of its own, so runs are
/// collapsed. `[^...]` is rewritten to the `[!...]` negation the crate expects.
/// A backslash makes the next character literal, and a `[` that never closes
/// is an ordinary character.
pub(crate) fn fnmatch_glob(pattern: &str) -> Translation {
    let mut out = Translation::new(pattern);
    let mut in_bracket = false;
    let mut chars = pattern.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if in_bracket {
            if c == ']' {
                in_bracket = false;
            }
            out.push_char(c, offset);
            continue;
        }
        match c {
            '*' => {
                out.push("*", offset);
                while chars.next_if(|&(_, next)| next == '*').is_some() {}
            }
            '\\' => match chars.next() {
                Some((o, next)) => push_literal(&mut out, next, o),
                None => out.push("\\", offset),
            },
            '[' if !closes_set(&pattern[offset + 1..]) => push_literal(&mut out, c, offset),
            '[' => {
                in_bracket = true;
                out.push("[", offset);
                if let Some((o, _)) = chars.next_if(|&(_, next)| next == '^' || next == '!') {
                    out.push("!", o);
                }
                // A leading `]` is a member, not the end of the set
                if let Some((o, _)) = chars.next_if(|&(_, next)| next == ']') {
                    out.push("]", o);
                }
            }
            _ => out.push_char(c, offset),
        }
    }
    out
}

/// Whether the text after a `[` holds the `]` ending the set. A `]` right
/// after the opening (or its negation) is a member.
fn closes_set(body: &str) -> bool {
    let body = body.strip_prefix(|c| c == '!' || c == '^').unwrap_or(body);
    let body = body.strip_prefix(']').unwrap_or(body);
    body.contains(']')
}

/// Emits `c` so the `glob` crate matches it literally
fn push_literal(out: &mut Translation, c: char, offset: usize) {
    match c {
        '*' | '?' | '[' | ']' => {
            out.push("[", offset);
            out.push_char(c, offset);
            out.push("]", offset);
        }
        _ => out.push_char(c, offset),
    }
}

/// Prepares a glob where `*` is the only wildcard and `\*` is a literal star.
///
/// Every other character the `glob` crate would treat specially is wrapped in
/// a one-member set so it matches itself.
pub(crate) fn escaped_glob(pattern: &str) -> Translation {
    let mut out = Translation::new(pattern);
    let mut chars = pattern.char_indices().peekable();
    let mut after_star = false;

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' if chars.next_if(|&(_, next)| next == '*').is_some() => {
                push_literal(&mut out, '*', offset);
                after_star = false;
            }
            '*' => {
                if !after_star {
                    out.push("*", offset);
                }
                after_star = true;
            }
            '?' | '[' | ']' => {
                push_literal(&mut out, c, offset);
                after_star = false;
            }
            _ => {
                out.push_char(c, offset);
                after_star = false;
            }
        }
    }
    out
}

/// Rewrites the JavaScript-only constructs into their PCRE equivalents:
/// `\uHHHH` escapes, the empty set `[]` (never matches) and the full set
/// `[^]` (matches any character, newlines included).
pub(crate) fn javascript_regex(pattern: &str) -> Translation {
    let mut out = Translation::new(pattern);
    let mut in_class = false;
    let mut pos = 0;

    while let Some(c) = pattern[pos..].chars().next() {
        let offset = pos;
        pos += c.len_utf8();
        let rest = &pattern[pos..];

        match c {
            '\\' => match rest.chars().next() {
                Some('u') if is_hex4(&rest[1..]) => {
                    out.push("\\x{", offset);
                    out.push(&rest[1..5], offset);
                    out.push("}", offset);
                    pos += 5;
                }
                Some(next) => {
                    out.push("\\", offset);
                    out.push_char(next, pos);
                    pos += next.len_utf8();
                }
                None => out.push("\\", offset),
            },
            '[' if in_class => out.push("\\[", offset),
            '&' | '~' if in_class => {
                out.push("\\", offset);
                out.push_char(c, offset);
            }
            ']' if in_class => {
                in_class = false;
                out.push("]", offset);
            }
            '[' if rest.starts_with(']') => {
                out.push("(?!)", offset);
                pos += 1;
            }
            '[' if rest.starts_with("^]") => {
                out.push("(?s:.)", offset);
                pos += 2;
            }
            '[' => {
                in_class = true;
                out.push("[", offset);
                if rest.starts_with('^') {
                    out.push("^", pos);
                    pos += 1;
                }
            }
            _ => out.push_char(c, offset),
        }
    }
    out
}

fn is_hex4(s: &str) -> bool {
    s.len() >= 4 && s.as_bytes()[..4].iter().all(u8::is_ascii_hexdigit)
}
