use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::html::element_text;
use super::rows::blueprint_path;
use crate::model::UNKNOWN;

/// Masthead layouts seen on engram pages, tried in order.
static NAME_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        ".info-arkitex.info-X1-100.info-masthead",
        ".info-arkitex.info-unit-row",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});
static SPAWN_ENTRY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".info-arkitex-spawn-commands-entry").unwrap());
static SPAWN_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("code, .copy-content").unwrap());

/// Tokens that mark the spawn command carrying the blueprint path.
pub const BLUEPRINT_MARKERS: &[&str] = &["Blueprint", "giveitem"];

/// Canonical name and blueprint found on a detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailPage {
    pub name: Option<String>,
    pub blueprint: Option<String>,
}

impl DetailPage {
    pub fn parse(html: &str) -> DetailPage {
        let doc = Html::parse_document(html);

        let name = NAME_SELECTORS
            .iter()
            .find_map(|sel| doc.select(sel).next())
            .map(element_text)
            .filter(|n| !n.is_empty());

        let blueprint = doc
            .select(&SPAWN_ENTRY)
            .flat_map(|entry| entry.select(&SPAWN_TEXT).map(element_text))
            .find(|text| BLUEPRINT_MARKERS.iter().any(|m| text.contains(m)))
            .map(|text| blueprint_path(&text))
            .filter(|bp| bp != UNKNOWN);

        DetailPage { name, blueprint }
    }
}

// ── Tests ──
