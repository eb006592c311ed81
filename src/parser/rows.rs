use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::html::{Row, Table};
use crate::error::RowError;
use crate::model::{Category, UNKNOWN};

/// `Blueprint'/Game/Path'` style wrapper around the path itself.
static WRAPPED_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]+'(.+)'$").unwrap());

/// Category-specific fields pulled out of one listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Creature {
        name: String,
        entity_id: String,
        blueprint: String,
    },
    Item {
        name: String,
        item_type: String,
        class_name: String,
        blueprint: String,
    },
    Beacon {
        section: Option<String>,
        name: String,
        class_name: String,
    },
    EngramLink {
        name: String,
        href: String,
    },
}

impl RawRecord {
    pub fn category(&self) -> Category {
        match self {
            RawRecord::Creature { .. } => Category::Creature,
            RawRecord::Item { .. } => Category::Item,
            RawRecord::Beacon { .. } => Category::Beacon,
            RawRecord::EngramLink { .. } => Category::Engram,
        }
    }
}

/// A row that was not turned into a record, with its position on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub table: usize,
    pub row: usize,
    pub reason: RowError,
}

/// Every row outcome of one listing page.
#[derive(Debug, Clone, Default)]
pub struct TableParse {
    pub records: Vec<RawRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Parse every row of every table for `category`, collecting skip reasons.
pub fn parse_tables(category: Category, tables: &[Table]) -> TableParse {
    let mut out = TableParse::default();
    for (t, table) in tables.iter().enumerate() {
        for (r, row) in table.rows.iter().enumerate() {
            match parse_row(category, table.section.as_deref(), row) {
                Ok(raw) => out.records.push(raw),
                Err(reason) => {
                    // Short rows are mostly spacer/heading rows inside tables.
                    if matches!(reason, RowError::TooFewCells { .. }) {
                        debug!("{}: skipped row {}/{}: {}", category, t, r, reason);
                    } else {
                        warn!("{}: skipped row {}/{}: {}", category, t, r, reason);
                    }
                    out.skipped.push(SkippedRow {
                        table: t,
                        row: r,
                        reason,
                    });
                }
            }
        }
    }
    out
}

/// Turn one row into a raw record, or say why it cannot be used.
pub fn parse_row(
    category: Category,
    section: Option<&str>,
    row: &Row,
) -> Result<RawRecord, RowError> {
    let cells = &row.cells;
    let required = category.min_cells();
    if cells.len() < required {
        return Err(RowError::TooFewCells {
            found: cells.len(),
            required,
        });
    }
    let text = |i: usize| cells[i].text.trim();

    match category {
        Category::Creature => Ok(RawRecord::Creature {
            name: non_empty(strip_variant(text(0)))?,
            entity_id: or_unknown(text(3)),
            blueprint: blueprint_path(text(4)),
        }),
        Category::Item => Ok(RawRecord::Item {
            name: non_empty(text(0))?,
            item_type: or_unknown(text(1)),
            class_name: or_unknown(text(4)),
            blueprint: blueprint_path(text(5)),
        }),
        Category::Beacon => Ok(RawRecord::Beacon {
            section: section.map(str::to_string),
            name: non_empty(text(0))?,
            class_name: or_unknown(text(1)),
        }),
        Category::Engram => {
            let href = cells[0].href.as_deref().ok_or(RowError::MissingLink)?;
            Ok(RawRecord::EngramLink {
                name: text(0).to_string(),
                href: href.to_string(),
            })
        }
    }
}

/// `"Rex (Alpha)"` → `"Rex"`.
pub fn strip_variant(name: &str) -> &str {
    name.split(" (").next().unwrap_or(name).trim()
}

/// First double-quoted token of a spawn-command text, or `Unknown`.
///
/// An unterminated quote runs to the end of the text. A `Kind'path'` wrapper
/// is reduced to the inner path.
pub fn blueprint_path(text: &str) -> String {
    quoted_token(text)
        .map(|token| match WRAPPED_PATH_RE.captures(token) {
            Some(caps) => caps[1].to_string(),
            None => token.to_string(),
        })
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn quoted_token(text: &str) -> Option<&str> {
    let mut parts = text.split('"');
    parts.next()?;
    parts.next()
}

fn non_empty(s: &str) -> Result<String, RowError> {
    if s.is_empty() {
        Err(RowError::EmptyName)
    } else {
        Ok(s.to_string())
    }
}

fn or_unknown(s: &str) -> String {
    if s.is_empty() {
        UNKNOWN.to_string()
    } else {
        s.to_string()
    }
}

// ── Tests ──
