//! Line lexer for directive markers

/// Marker opening a chart spec
pub(crate) const CHART_MARKER: &str = "CHART_JSON:";
/// Marker opening a code snippet
pub(crate) const CODE_MARKER: &str = "CODE_PY:";
/// Code fence delimiter
pub(crate) const FENCE: &str = "```";

/// Classification of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// `CHART_JSON:` marker; carries the trimmed rest of the line
    Chart(&'a str),
    /// `CODE_PY:` marker; carries the trimmed rest of the line
    Code(&'a str),
    /// Fence line; carries the info string (`python`, `json`, or empty)
    Fence(&'a str),
    /// Any other non-empty line
    Text,
    /// Whitespace-only line
    Blank,
}

/// A lexed line together with its raw text
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub raw: &'a str,
    pub token: Token<'a>,
}

pub(crate) fn lex(content: &str) -> Vec<Line<'_>> {
    content
        .lines()
        .map(|raw| Line {
            raw,
            token: classify(raw),
        })
        .collect()
}

fn classify(raw: &str) -> Token<'_> {
    let line = raw.trim();
    if line.is_empty() {
        Token::Blank
    } else if let Some(rest) = line.strip_prefix(CHART_MARKER) {
        Token::Chart(rest.trim())
    } else if let Some(rest) = line.strip_prefix(CODE_MARKER) {
        Token::Code(rest.trim())
    } else if let Some(info) = line.strip_prefix(FENCE) {
        Token::Fence(info.trim())
    } else {
        Token::Text
    }
}

/// Tracks brace depth over JSON text, ignoring braces inside strings.
#[derive(Debug, Default)]
pub(crate) struct BraceScanner {
    depth: usize,
    started: bool,
    in_string: bool,
    escaped: bool,
}

impl BraceScanner {
    /// Feed `text`; returns the byte offset just past the brace that closes
    /// the outermost object, if it is in `text`.
    pub(crate) fn feed(&mut self, text: &str) -> Option<usize> {
        for (i, c) in text.char_indices() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }

            match c {
                '"' if self.started => self.in_string = true,
                '{' => {
                    self.started = true;
                    self.depth += 1;
                }
                '}' if self.started => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }
}
