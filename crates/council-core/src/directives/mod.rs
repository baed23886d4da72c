//! Directives - structured payloads embedded in agent messages
//!
//! Three conventions are recognized inside free-form message text:
//!
//! - `CHART_JSON:` followed by a Vega-Lite object, inline, fenced or spread
//!   over several lines until its braces balance
//! - `CODE_PY:` followed by a ```` ```python ```` fenced block
//! - a whole message that is a `{"preview_markdown", "data_json"}` object
//!
//! Everything else is prose. [`extract`] returns directives and insight
//! lines in document order; a malformed directive becomes a
//! [`Fragment::Malformed`] and parsing carries on with the next line.

mod lexer;
mod parser;

#[cfg(test)]
mod tests;

use council_tools::Table;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    /// Chart specification
    Chart,
    /// Executable snippet
    Code,
    /// Tabular payload
    Table,
}

/// A tabular result carried by a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    /// Markdown preview as produced by the query tool
    pub preview_markdown: String,
    /// Full table
    pub data: Table,
}

/// A structured instruction embedded in a message
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Declarative chart specification
    ChartSpec(Value),
    /// Python source, fences stripped and dedented
    CodeSnippet(String),
    /// Query result
    TablePayload(TablePayload),
}

impl Directive {
    /// Kind of this directive
    #[must_use]
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Directive::ChartSpec(_) => DirectiveKind::Chart,
            Directive::CodeSnippet(_) => DirectiveKind::Code,
            Directive::TablePayload(_) => DirectiveKind::Table,
        }
    }
}

/// One item of parser output
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A well-formed directive
    Directive(Directive),
    /// A prose line
    Insight {
        /// Authoring agent
        source: String,
        /// Trimmed line text
        text: String,
    },
    /// A marker whose payload could not be parsed
    Malformed {
        /// Directive the marker announced
        kind: DirectiveKind,
        /// Parse error
        error: String,
        /// Lines consumed for the directive
        raw: String,
    },
}

/// Split `content` authored by `source` into fragments, in document order.
#[must_use]
pub fn extract(source: &str, content: &str) -> Vec<Fragment> {
    parser::parse(source, content)
}

/// Well-formed directives only, in document order.
#[must_use]
pub fn directives(content: &str) -> Vec<Directive> {
    extract("", content)
        .into_iter()
        .filter_map(|fragment| match fragment {
            Fragment::Directive(directive) => Some(directive),
            _ => None,
        })
        .collect()
}
