use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Blacklist;
use crate::model::{Catalog, Category, Entity, Records};

/// Key records by their normalized key. A later record with the same key
/// replaces the earlier one.
pub fn index(entities: impl IntoIterator<Item = Entity>) -> Records {
    let mut records = Records::new();
    for entity in entities {
        if let Some(old) = records.insert(entity.key.clone(), entity) {
            debug!("{}: {} (id {}) replaced by a later row", old.category(), old.key, old.id);
        }
    }
    records
}

/// Wrap the four per-category mappings.
pub fn assemble(creatures: Records, items: Records, engrams: Records, beacons: Records) -> Catalog {
    Catalog {
        creatures,
        items,
        engrams,
        beacons,
    }
}

/// Keep records whose key contains none of `terms`, ignoring case.
pub fn filter_records(records: Records, terms: &BTreeSet<String>) -> Records {
    if terms.is_empty() {
        return records;
    }
    let lowered: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    records
        .into_iter()
        .filter(|(key, _)| {
            let key = key.to_lowercase();
            !lowered.iter().any(|t| key.contains(t.as_str()))
        })
        .collect()
}

/// Apply each category's blacklist.
pub fn apply_blacklist(mut catalog: Catalog, blacklist: &Blacklist) -> Catalog {
    for category in Category::ALL {
        let records = std::mem::take(catalog.get_mut(category));
        let before = records.len();
        let kept = filter_records(records, blacklist.terms(category));
        if kept.len() != before {
            info!("{}: blacklist removed {} of {}", category, before - kept.len(), before);
        }
        *catalog.get_mut(category) = kept;
    }
    catalog
}

/// Write the catalog as JSON with 4-space indentation.
pub fn write(path: &Path, catalog: &Catalog) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    catalog
        .serialize(&mut ser)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Entity counts per category of an existing catalog file.
pub fn summarize(path: &Path) -> Result<Vec<(String, usize)>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("Invalid catalog {}", path.display()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("{} is not a JSON object", path.display()))?;
    Ok(obj
        .iter()
        .map(|(k, v)| (k.clone(), v.as_object().map(|m| m.len()).unwrap_or(0)))
        .collect())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::{EntityDetail, UNKNOWN};

    fn creature(id: u32, key: &str) -> Entity {
        Entity {
            id,
            name: key.replace('_', " "),
            key: key.to_string(),
            detail: EntityDetail::Creature {
                entity_id: id.to_string(),
                blueprint: UNKNOWN.into(),
            },
        }
    }

    fn terms(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn later_duplicate_wins() {
        let records = index(vec![creature(1, "Rex"), creature(2, "Raptor"), creature(3, "Rex")]);
        assert_eq!(records.len(), 2);
        assert_eq!(records["Rex"].id, 3);
    }

    #[test]
    fn substring_match_ignores_case() {
        let records = index(vec![
            creature(1, "Rex"),
            creature(2, "Alpha_Rex"),
            creature(3, "Raptor"),
            creature(4, "Tek_REX"),
        ]);
        let kept = filter_records(records, &terms(&["rex"]));
        assert_eq!(kept.keys().collect::<Vec<_>>(), vec!["Raptor"]);
    }

    #[test]
    fn blacklist_only_touches_its_category() {
        let mut catalog = assemble(
            index(vec![creature(1, "Rex"), creature(2, "Dodo")]),
            Records::new(),
            Records::new(),
            Records::new(),
        );
        catalog.items = index(vec![Entity {
            id: 1,
            name: "Rex Saddle".into(),
            key: "Rex_Saddle".into(),
            detail: EntityDetail::Item {
                item_type: "Saddle".into(),
                class_name: UNKNOWN.into(),
                blueprint: UNKNOWN.into(),
            },
        }]);
        let blacklist = Blacklist::from_json(r#"{"Creatures": ["Rex"]}"#).unwrap();
        let filtered = apply_blacklist(catalog, &blacklist);
        assert!(!filtered.creatures.contains_key("Rex"));
        assert!(filtered.creatures.contains_key("Dodo"));
        assert!(filtered.items.contains_key("Rex_Saddle"));
    }

    #[test]
    fn written_file_uses_catalog_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ark_data.json");
        let catalog = assemble(
            index(vec![creature(1, "Rex")]),
            Records::new(),
            Records::new(),
            Records::new(),
        );
        write(&path, &catalog).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \"Creatures\": {\n        \"Rex\": {"));
        let summary = summarize(&path).unwrap();
        assert_eq!(
            summary,
            vec![
                ("Beacons".to_string(), 0),
                ("Creatures".to_string(), 1),
                ("Engrams".to_string(), 0),
                ("Items".to_string(), 0),
            ]
        );
    }

    fn arb_records() -> impl Strategy<Value = Records> {
        prop::collection::vec("[A-Za-z_]{1,10}", 0..20).prop_map(|keys| {
            index(
                keys.iter()
                    .enumerate()
                    .map(|(i, k)| creature(i as u32 + 1, k)),
            )
        })
    }

    proptest! {
        #[test]
        fn empty_blacklist_is_identity(records in arb_records()) {
            prop_assert_eq!(filter_records(records.clone(), &BTreeSet::new()), records);
        }

        #[test]
        fn more_terms_never_keep_more(
            records in arb_records(),
            base in prop::collection::btree_set("[A-Za-z]{1,3}", 0..4),
            extra in prop::collection::btree_set("[A-Za-z]{1,3}", 0..4),
        ) {
            let mut grown = base.clone();
            grown.extend(extra);
            let small = filter_records(records.clone(), &base);
            let large = filter_records(records, &grown);
            prop_assert!(large.len() <= small.len());
            prop_assert!(large.keys().all(|k| small.contains_key(k)));
        }
    }
}
