//! Tabular query results
//!
//! A [`Table`] serializes in "split" orientation:
//! `{"columns": [...], "index": [0, 1, ...], "data": [[...], ...]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rows shown in a markdown preview
pub const PREVIEW_ROWS: usize = 20;

/// A fully materialized result set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SplitTable", into = "SplitTable")]
pub struct Table {
    /// Column names in statement order
    pub columns: Vec<String>,
    /// Row values, each row aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

#[derive(Serialize, Deserialize)]
struct SplitTable {
    columns: Vec<String>,
    #[serde(default)]
    index: Vec<Value>,
    data: Vec<Vec<Value>>,
}

impl TryFrom<SplitTable> for Table {
    type Error = String;

    fn try_from(split: SplitTable) -> Result<Self, Self::Error> {
        let width = split.columns.len();
        if let Some((i, row)) = split
            .data
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
        {
            return Err(format!(
                "row {} has {} values but there are {} columns",
                i,
                row.len(),
                width
            ));
        }
        Ok(Self {
            columns: split.columns,
            rows: split.data,
        })
    }
}

impl From<Table> for SplitTable {
    fn from(table: Table) -> Self {
        Self {
            index: (0..table.rows.len()).map(Value::from).collect(),
            columns: table.columns,
            data: table.rows,
        }
    }
}

impl Table {
    /// Create a table from columns and rows
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows, in order
    #[must_use]
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Render as a GitHub-style pipe table.
    ///
    /// Numeric columns are right-aligned. A table without rows renders as an
    /// empty string.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();

        let numeric: Vec<bool> = (0..self.columns.len())
            .map(|c| {
                let mut values = self.rows.iter().map(|r| &r[c]).filter(|v| !v.is_null());
                let mut seen = false;
                let all_numbers = values.all(|v| {
                    seen = true;
                    v.is_number()
                });
                seen && all_numbers
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                cells
                    .iter()
                    .map(|row| row[c].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let pad = |text: &str, c: usize| {
            let fill = widths[c].saturating_sub(text.chars().count());
            if numeric[c] {
                format!("{}{}", " ".repeat(fill), text)
            } else {
                format!("{}{}", text, " ".repeat(fill))
            }
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| pad(name, c))
            .collect();
        lines.push(format!("| {} |", header.join(" | ")));

        let rule: Vec<String> = widths
            .iter()
            .zip(&numeric)
            .map(|(w, num)| {
                if *num {
                    format!("{}:", "-".repeat(w + 1))
                } else {
                    format!(":{}", "-".repeat(w + 1))
                }
            })
            .collect();
        lines.push(format!("|{}|", rule.join("|")));

        for row in &cells {
            let padded: Vec<String> = row.iter().enumerate().map(|(c, v)| pad(v, c)).collect();
            lines.push(format!("| {} |", padded.join(" | ")));
        }

        lines.join("\n")
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.replace('|', "\\|").replace('\n', " "),
        other => other.to_string(),
    }
}

/// Output of the query tool: a bounded preview plus the full table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Markdown rendering of at most [`PREVIEW_ROWS`] rows
    pub preview_markdown: String,
    /// Every row of the result set
    pub data_json: Table,
}

impl QueryOutput {
    /// Build the output for a materialized result set
    #[must_use]
    pub fn from_table(table: Table) -> Self {
        Self {
            preview_markdown: table.head(PREVIEW_ROWS).to_markdown(),
            data_json: table,
        }
    }
}
