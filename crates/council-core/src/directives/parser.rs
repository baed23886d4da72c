//! Directive parser
//!
//! Consumes lexed lines in order. Chart and code markers pull in the lines
//! that make up their payload; every other non-blank line is an insight.

use super::lexer::{lex, BraceScanner, Line, Token, FENCE};
use super::{Directive, DirectiveKind, Fragment, TablePayload};
use council_tools::Table;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

pub(crate) fn parse(source: &str, content: &str) -> Vec<Fragment> {
    if let Some(fragments) = table_message(source, content) {
        return fragments;
    }
    Parser::new(source, lex(content)).run()
}

// ── Whole-message table ──

#[derive(Deserialize)]
struct RawTablePayload {
    #[serde(default)]
    preview_markdown: String,
    data_json: Value,
}

fn table_message(source: &str, content: &str) -> Option<Vec<Fragment>> {
    let trimmed = content.trim();
    if !trimmed.starts_with('{') || !trimmed.contains("\"data_json\"") {
        return None;
    }

    match parse_table_payload(trimmed) {
        Ok(payload) => {
            debug!(source, rows = payload.data.len(), "Table payload");
            Some(vec![Fragment::Directive(Directive::TablePayload(payload))])
        }
        Err(e) => {
            warn!(source, error = %e, "Skipping malformed table payload");
            Some(Vec::new())
        }
    }
}

fn parse_table_payload(text: &str) -> Result<TablePayload, serde_json::Error> {
    let raw: RawTablePayload = serde_json::from_str(text)?;
    let data: Table = match raw.data_json {
        Value::String(inner) => serde_json::from_str(&inner)?,
        other => serde_json::from_value(other)?,
    };
    Ok(TablePayload {
        preview_markdown: raw.preview_markdown,
        data,
    })
}

// ── Line parser ──

struct Parser<'a> {
    source: &'a str,
    lines: Vec<Line<'a>>,
    pos: usize,
    out: Vec<Fragment>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, lines: Vec<Line<'a>>) -> Self {
        Self {
            source,
            lines,
            pos: 0,
            out: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Fragment> {
        while let Some(line) = self.next() {
            match line.token {
                Token::Chart(rest) => self.chart(rest),
                Token::Code(rest) => self.code(line, rest),
                Token::Text | Token::Fence(_) => self.insight(line.raw),
                Token::Blank => {}
            }
        }
        self.out
    }

    fn next(&mut self) -> Option<Line<'a>> {
        let line = self.lines.get(self.pos).copied()?;
        self.pos += 1;
        Some(line)
    }

    fn peek_non_blank(&self) -> Option<(usize, Line<'a>)> {
        self.lines[self.pos..]
            .iter()
            .enumerate()
            .find(|(_, line)| line.token != Token::Blank)
            .map(|(offset, line)| (self.pos + offset, *line))
    }

    fn raw_since(&self, start: usize) -> String {
        self.lines[start..self.pos]
            .iter()
            .map(|line| line.raw)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn insight(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.out.push(Fragment::Insight {
                source: self.source.to_string(),
                text: text.to_string(),
            });
        }
    }

    fn malformed(&mut self, kind: DirectiveKind, error: impl Into<String>, raw: String) {
        let error = error.into();
        debug!(source = self.source, ?kind, error = %error, "Malformed directive");
        self.out.push(Fragment::Malformed { kind, error, raw });
    }

    /// Lines up to the next fence, consuming it. `None` when unterminated.
    fn fenced_body(&mut self) -> Option<Vec<&'a str>> {
        let mut body = Vec::new();
        while let Some(line) = self.next() {
            if let Token::Fence(_) = line.token {
                return Some(body);
            }
            body.push(line.raw);
        }
        None
    }

    /// Collect an unfenced JSON object starting at `first`. Returns the
    /// payload and any text trailing the closing brace.
    fn balanced_json(&mut self, first: &'a str) -> Option<(String, &'a str)> {
        let mut scanner = BraceScanner::default();
        if let Some(end) = scanner.feed(first) {
            return Some((first[..end].to_string(), &first[end..]));
        }

        let mut payload = first.to_string();
        while let Some(line) = self.next() {
            payload.push('\n');
            if let Some(end) = scanner.feed(line.raw) {
                payload.push_str(&line.raw[..end]);
                return Some((payload, &line.raw[end..]));
            }
            payload.push_str(line.raw);
        }
        None
    }

    fn chart(&mut self, rest: &'a str) {
        let start = self.pos - 1;
        let mut trailing = "";

        let payload = if rest.is_empty() {
            match self.peek_non_blank() {
                Some((idx, next)) if matches!(next.token, Token::Fence(_)) => {
                    self.pos = idx + 1;
                    self.fenced_body()
                        .map(|body| body.join("\n"))
                        .ok_or("unterminated chart fence")
                }
                Some((idx, next)) if next.raw.trim_start().starts_with('{') => {
                    self.pos = idx + 1;
                    match self.balanced_json(next.raw.trim_start()) {
                        Some((json, rest)) => {
                            trailing = rest;
                            Ok(json)
                        }
                        None => Err("unbalanced braces in chart spec"),
                    }
                }
                _ => Err("missing JSON payload after CHART_JSON:"),
            }
        } else if let Some(after) = rest.strip_prefix(FENCE) {
            let after = strip_info(after);
            match after.trim_end().strip_suffix(FENCE) {
                Some(inline) => Ok(inline.to_string()),
                None => self
                    .fenced_body()
                    .map(|body| {
                        let mut lines = vec![after];
                        lines.extend(body);
                        lines.join("\n")
                    })
                    .ok_or("unterminated chart fence"),
            }
        } else if rest.starts_with('{') {
            match self.balanced_json(rest) {
                Some((json, rest)) => {
                    trailing = rest;
                    Ok(json)
                }
                None => Err("unbalanced braces in chart spec"),
            }
        } else {
            Err("expected a JSON object after CHART_JSON:")
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(error) => {
                let raw = self.raw_since(start);
                self.malformed(DirectiveKind::Chart, error, raw);
                return;
            }
        };

        match serde_json::from_str::<Value>(&payload) {
            Ok(spec) if spec.is_object() => {
                self.out.push(Fragment::Directive(Directive::ChartSpec(spec)));
            }
            Ok(_) => {
                let raw = self.raw_since(start);
                self.malformed(DirectiveKind::Chart, "chart spec must be a JSON object", raw);
            }
            Err(e) => {
                let raw = self.raw_since(start);
                self.malformed(DirectiveKind::Chart, e.to_string(), raw);
            }
        }

        self.insight(trailing);
    }

    fn code(&mut self, line: Line<'a>, rest: &'a str) {
        let start = self.pos - 1;

        // Code written on the marker line after the fence's language word
        let tail = if rest.is_empty() {
            match self.peek_non_blank() {
                Some((idx, Line {
                    token: Token::Fence(info),
                    ..
                })) if is_python(info) => {
                    self.pos = idx + 1;
                    Some("")
                }
                _ => None,
            }
        } else {
            rest.strip_prefix(FENCE).and_then(fence_opening)
        };

        let Some(tail) = tail else {
            self.malformed(
                DirectiveKind::Code,
                "CODE_PY: must be followed by a ```python fence",
                line.raw.to_string(),
            );
            return;
        };

        let body = match tail.strip_suffix(FENCE) {
            Some(inline) => Some(vec![inline]),
            None => self.fenced_body().map(|mut body| {
                if !tail.is_empty() {
                    body.insert(0, tail);
                }
                body
            }),
        };

        match body {
            Some(body) => {
                let code = dedent(&body);
                if code.trim().is_empty() {
                    let raw = self.raw_since(start);
                    self.malformed(DirectiveKind::Code, "empty code block", raw);
                } else {
                    self.out.push(Fragment::Directive(Directive::CodeSnippet(code)));
                }
            }
            None => {
                let raw = self.raw_since(start);
                self.malformed(DirectiveKind::Code, "unterminated code fence", raw);
            }
        }
    }
}

/// Split a fence opening into its language word and any code after it.
/// `None` when the language is not python.
fn fence_opening(after_fence: &str) -> Option<&str> {
    let after = after_fence.trim();
    let (language, tail) = match after.find(char::is_whitespace) {
        Some(i) => (&after[..i], after[i..].trim_start()),
        None => (after, ""),
    };
    is_python(language).then_some(tail)
}

fn strip_info(after_fence: &str) -> &str {
    let trimmed = after_fence.trim_start();
    trimmed
        .strip_prefix("json")
        .or_else(|| trimmed.strip_prefix("JSON"))
        .unwrap_or(trimmed)
        .trim_start()
}

fn is_python(info: &str) -> bool {
    matches!(
        info.to_ascii_lowercase().as_str(),
        "" | "python" | "py" | "python3"
    )
}

fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}
