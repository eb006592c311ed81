use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, table.wikitable").unwrap());
static HEADLINE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".mw-headline").unwrap());
static EDIT_SECTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".mw-editsection").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// One `td` of a listing row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[cfg(test)]
impl Row {
    pub fn from_texts(texts: &[&str]) -> Self {
        Row {
            cells: texts
                .iter()
                .map(|t| Cell {
                    text: t.to_string(),
                    href: None,
                })
                .collect(),
        }
    }
}

/// A `wikitable` with the header row removed.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Title of the nearest heading above the table.
    pub section: Option<String>,
    pub rows: Vec<Row>,
}

/// All `table.wikitable` elements of a page, in document order.
pub fn listing_tables(html: &str) -> Vec<Table> {
    let doc = Html::parse_document(html);
    let mut tables = Vec::new();
    let mut section: Option<String> = None;

    for el in doc.select(&BLOCKS) {
        match el.value().name() {
            "h2" | "h3" => section = heading_title(el),
            _ => tables.push(Table {
                section: section.clone(),
                rows: el.select(&ROW).skip(1).map(row).collect(),
            }),
        }
    }

    tables
}

fn row(tr: ElementRef) -> Row {
    Row {
        cells: tr
            .select(&CELL)
            .map(|td| Cell {
                text: element_text(td),
                href: td
                    .select(&LINK)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string),
            })
            .collect(),
    }
}

fn heading_title(h: ElementRef) -> Option<String> {
    let title = match h.select(&HEADLINE).next() {
        Some(span) => element_text(span),
        None => {
            // Skip the "[edit]" link some skins put inside the heading.
            let edit: Vec<String> = h.select(&EDIT_SECTION).map(element_text).collect();
            let mut t = element_text(h);
            for e in edit {
                t = t.replace(&e, "");
            }
            t.trim().to_string()
        }
    };
    Some(title).filter(|t| !t.is_empty())
}

/// Text of an element with whitespace runs collapsed to one space.
pub fn element_text(el: ElementRef) -> String {
    el.text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ──
