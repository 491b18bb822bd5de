use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

/// Dialect configuration for the statement scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Treat `BEGIN ... END` as one block (MySQL routines, triggers).
    pub match_begin: bool,
    /// Treat only `BEGIN ATOMIC ... END` as a block (standard SQL bodies).
    pub match_begin_atomic: bool,
    /// Recognize dollar-quoted strings (Postgres).
    pub match_dollar_quote: bool,
    /// Backslash escapes strings (MySQL default sql_mode).
    pub backslash_escapes: bool,
}

/// One scanned statement: its byte position in the file, its text with the
/// trailing delimiter stripped, and the comments immediately preceding it
/// (markers included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub pos: usize,
    pub text: String,
    pub comments: Vec<String>,
}

static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ -~]*atlas:(\w+)(?: +(.+))?$").expect("directive regex"));

/// Extracts the argument of an `atlas:<name>` directive from a raw comment,
/// returning `Some("")` for argument-less directives.
#[must_use]
pub fn directive(comment: &str, name: &str) -> Option<String> {
    let body = strip_comment_markers(comment);
    let captures = DIRECTIVE_RE.captures(body.trim())?;
    if &captures[1] != name {
        return None;
    }
    Some(
        captures
            .get(2)
            .map(|args| args.as_str().trim().to_string())
            .unwrap_or_default(),
    )
}

/// File-level directives: the leading comment block of a file, when
/// separated from the remaining content by a blank line.
#[must_use]
pub fn file_directives(input: &str) -> Vec<(String, String)> {
    let mut directives = Vec::new();
    let mut lines = input.lines();
    for line in &mut lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // Blank separator reached; the leading block is complete.
            return directives;
        }
        if !trimmed.starts_with("--") && !trimmed.starts_with("/*") && !trimmed.starts_with('#') {
            // Content before any blank line: there is no directive block.
            return Vec::new();
        }
        let body = strip_comment_markers(trimmed);
        if let Some(captures) = DIRECTIVE_RE.captures(body.trim()) {
            let args = captures
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            directives.push((captures[1].to_string(), args));
        }
    }
    // File consists solely of comments; nothing follows the block.
    Vec::new()
}

fn strip_comment_markers(comment: &str) -> &str {
    let trimmed = comment.trim();
    if let Some(rest) = trimmed.strip_prefix("--") {
        return rest.trim();
    }
    if let Some(rest) = trimmed.strip_prefix('#') {
        return rest.trim();
    }
    if let Some(rest) = trimmed.strip_prefix("/*") {
        return rest.strip_suffix("*/").unwrap_or(rest).trim();
    }
    trimmed
}

/// Splits SQL text into statements, honoring quoting, comments, block
/// bodies, and the `atlas:delimiter` directive. Implemented as an explicit
/// state machine; directives are only honored between statements.
pub fn scan(input: &str, opts: &ScanOptions) -> Result<Vec<Stmt>> {
    Scanner::new(input, opts).run()
}

/// Statement texts only.
pub fn stmts(input: &str, opts: &ScanOptions) -> Result<Vec<String>> {
    Ok(scan(input, opts)?.into_iter().map(|s| s.text).collect())
}

struct Scanner<'a> {
    input: &'a str,
    opts: &'a ScanOptions,
    delimiter: String,
    pos: usize,
    stmts: Vec<Stmt>,
    pending_comments: Vec<String>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str, opts: &'a ScanOptions) -> Self {
        Self {
            input,
            opts,
            delimiter: ";".to_string(),
            pos: 0,
            stmts: Vec::new(),
            pending_comments: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Stmt>> {
        while self.pos < self.input.len() {
            self.skip_gap()?;
            if self.pos >= self.input.len() {
                break;
            }
            self.scan_statement()?;
        }
        Ok(self.stmts)
    }

    /// Consumes whitespace and comments between statements, recording
    /// comments and applying delimiter directives.
    fn skip_gap(&mut self) -> Result<()> {
        loop {
            let rest = &self.input[self.pos..];
            if rest.is_empty() {
                return Ok(());
            }
            let ch = rest.chars().next().expect("non-empty rest");
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
                continue;
            }
            if rest.starts_with("--") || rest.starts_with('#') {
                let end = rest.find('\n').map_or(self.input.len(), |i| self.pos + i);
                let comment = self.input[self.pos..end].to_string();
                if let Some(arg) = directive(&comment, "delimiter") {
                    self.set_delimiter(&arg)?;
                }
                self.pending_comments.push(comment);
                self.pos = end;
                continue;
            }
            if rest.starts_with("/*") {
                let end = rest
                    .find("*/")
                    .map(|i| self.pos + i + 2)
                    .ok_or_else(|| unterminated("block comment", self.pos))?;
                let comment = self.input[self.pos..end].to_string();
                if let Some(arg) = directive(&comment, "delimiter") {
                    self.set_delimiter(&arg)?;
                }
                self.pending_comments.push(comment);
                self.pos = end;
                continue;
            }
            return Ok(());
        }
    }

    fn set_delimiter(&mut self, arg: &str) -> Result<()> {
        if arg.is_empty() {
            return Err(Error::Internal(
                "atlas:delimiter directive requires an argument".to_string(),
            ));
        }
        self.delimiter = arg.replace("\\n", "\n");
        Ok(())
    }

    fn scan_statement(&mut self) -> Result<()> {
        let start = self.pos;
        let mut depth: u32 = 0;

        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];

            if depth == 0 && rest.starts_with(self.delimiter.as_str()) {
                self.push_stmt(start, self.pos);
                self.pos += self.delimiter.len();
                return Ok(());
            }

            let ch = rest.chars().next().expect("non-empty rest");
            match ch {
                '\'' => self.consume_quoted('\'', self.opts.backslash_escapes)?,
                '"' => self.consume_quoted('"', self.opts.backslash_escapes)?,
                '`' => self.consume_quoted('`', false)?,
                '[' => {
                    // Bracket identifiers never nest; an unmatched bracket is
                    // left to the server to reject.
                    match rest.find(']') {
                        Some(i) => self.pos += i + 1,
                        None => self.pos += 1,
                    }
                }
                '-' if rest.starts_with("--") => {
                    let end = rest.find('\n').map_or(self.input.len(), |i| self.pos + i);
                    self.pos = end;
                }
                '/' if rest.starts_with("/*") => {
                    let end = rest
                        .find("*/")
                        .map(|i| self.pos + i + 2)
                        .ok_or_else(|| unterminated("block comment", self.pos))?;
                    self.pos = end;
                }
                '$' if self.opts.match_dollar_quote => {
                    if !self.consume_dollar_quote()? {
                        self.pos += 1;
                    }
                }
                _ if ch.is_ascii_alphabetic() && self.at_word_boundary(start) => {
                    let word = self.peek_word();
                    let upper = word.to_ascii_uppercase();
                    if upper == "BEGIN" && self.begins_block(word.len()) {
                        depth += 1;
                    } else if upper == "END" && depth > 0 {
                        depth -= 1;
                    }
                    self.pos += word.len();
                }
                _ => self.pos += ch.len_utf8(),
            }
        }

        self.push_stmt(start, self.input.len());
        Ok(())
    }

    fn begins_block(&self, word_len: usize) -> bool {
        if self.opts.match_begin_atomic {
            let after = self.input[self.pos + word_len..].trim_start();
            return after
                .get(..6)
                .is_some_and(|next| next.eq_ignore_ascii_case("ATOMIC"));
        }
        self.opts.match_begin
    }

    fn at_word_boundary(&self, stmt_start: usize) -> bool {
        if self.pos == stmt_start {
            return true;
        }
        self.input[..self.pos]
            .chars()
            .next_back()
            .is_none_or(|prev| !prev.is_ascii_alphanumeric() && prev != '_' && prev != '$')
    }

    fn peek_word(&self) -> &str {
        let rest = &self.input[self.pos..];
        let end = rest
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn consume_quoted(&mut self, quote: char, backslash_escapes: bool) -> Result<()> {
        let start = self.pos;
        let mut chars = self.input[self.pos..].char_indices().skip(1).peekable();

        while let Some((offset, ch)) = chars.next() {
            if backslash_escapes && ch == '\\' {
                chars.next();
                continue;
            }
            if ch == quote {
                // A doubled quote is an escaped literal quote.
                if chars.peek().is_some_and(|(_, next)| *next == quote) {
                    chars.next();
                    continue;
                }
                self.pos = start + offset + ch.len_utf8();
                return Ok(());
            }
        }

        Err(unterminated("quoted literal", start))
    }

    /// Consumes `$tag$...$tag$`. Returns false when `$` does not open a
    /// valid dollar quote.
    fn consume_dollar_quote(&mut self) -> Result<bool> {
        let rest = &self.input[self.pos..];
        let tag_end = match rest[1..].find('$') {
            Some(i) => i + 1,
            None => return Ok(false),
        };
        let tag = &rest[1..tag_end];
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Ok(false);
        }

        let open = &rest[..tag_end + 1];
        let body_start = tag_end + 1;
        match rest[body_start..].find(open) {
            Some(i) => {
                self.pos += body_start + i + open.len();
                Ok(true)
            }
            None => Err(unterminated("dollar-quoted string", self.pos)),
        }
    }

    fn push_stmt(&mut self, start: usize, end: usize) {
        let text = self.input[start..end].trim_end();
        if text.is_empty() {
            self.pending_comments.clear();
            return;
        }
        self.stmts.push(Stmt {
            pos: start,
            text: text.to_string(),
            comments: std::mem::take(&mut self.pending_comments),
        });
    }
}

fn unterminated(what: &str, pos: usize) -> Error {
    Error::Internal(format!("unterminated {what} at byte {pos}"))
}
