use crate::model::{Category, Entity, EntityDetail, UNKNOWN};
use crate::parser::rows::RawRecord;

/// Catalog key for a display name: spaces become underscores.
pub fn normalize_key(name: &str) -> String {
    name.replace(' ', "_")
}

/// Beacon display name and key, both prefixed by the section title.
pub fn beacon_names(section: Option<&str>, name: &str) -> (String, String) {
    match section.map(str::trim).filter(|s| !s.is_empty()) {
        Some(section) => (
            format!("[{}] {}", section, name),
            format!("{}_{}", normalize_key(section), normalize_key(name)),
        ),
        None => (name.to_string(), normalize_key(name)),
    }
}

/// Sequential ids for one category within one run, starting at 1.
#[derive(Debug, Clone)]
pub struct IdCounter {
    next: u32,
}

impl Default for IdCounter {
    fn default() -> Self {
        IdCounter { next: 1 }
    }
}

impl IdCounter {
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u32 {
        self.next - 1
    }
}

/// An engram row waiting for its detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEngram {
    pub id: u32,
    pub listed_name: String,
    pub url: String,
}

/// Enrichment result for one engram: key, canonical name, blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngramDetail {
    pub key: String,
    pub name: String,
    pub blueprint: String,
}

impl EngramDetail {
    pub fn unknown() -> Self {
        EngramDetail {
            key: UNKNOWN.to_string(),
            name: UNKNOWN.to_string(),
            blueprint: UNKNOWN.to_string(),
        }
    }

    pub fn from_page(name: Option<String>, blueprint: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| UNKNOWN.to_string());
        EngramDetail {
            key: normalize_key(&name),
            name,
            blueprint: blueprint.unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

impl PendingEngram {
    /// Engrams without a canonical name are dropped.
    pub fn complete(self, detail: EngramDetail) -> Option<Entity> {
        if detail.key == UNKNOWN || detail.key.is_empty() {
            return None;
        }
        Some(Entity {
            id: self.id,
            name: detail.name,
            key: detail.key,
            detail: EntityDetail::Engram {
                blueprint: detail.blueprint,
            },
        })
    }
}

/// Output of [`RecordBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Built {
    Entity(Entity),
    Pending(PendingEngram),
}

/// Turns raw row tuples of a single category into records.
#[derive(Debug)]
pub struct RecordBuilder {
    category: Category,
    base_url: String,
    ids: IdCounter,
}

impl RecordBuilder {
    pub fn new(category: Category, base_url: &str) -> Self {
        RecordBuilder {
            category,
            base_url: base_url.trim_end_matches('/').to_string(),
            ids: IdCounter::default(),
        }
    }

    pub fn issued(&self) -> u32 {
        self.ids.issued()
    }

    pub fn build(&mut self, raw: RawRecord) -> Built {
        debug_assert_eq!(raw.category(), self.category);
        let id = self.ids.next_id();
        match raw {
            RawRecord::Creature {
                name,
                entity_id,
                blueprint,
            } => Built::Entity(Entity {
                id,
                key: normalize_key(&name),
                name,
                detail: EntityDetail::Creature {
                    entity_id,
                    blueprint,
                },
            }),
            RawRecord::Item {
                name,
                item_type,
                class_name,
                blueprint,
            } => Built::Entity(Entity {
                id,
                key: normalize_key(&name),
                name,
                detail: EntityDetail::Item {
                    item_type,
                    class_name,
                    blueprint,
                },
            }),
            RawRecord::Beacon {
                section,
                name,
                class_name,
            } => {
                let (name, key) = beacon_names(section.as_deref(), &name);
                Built::Entity(Entity {
                    id,
                    name,
                    key,
                    detail: EntityDetail::Beacon { class_name },
                })
            }
            RawRecord::EngramLink { name, href } => Built::Pending(PendingEngram {
                id,
                listed_name: name,
                url: self.resolve(&href),
            }),
        }
    }

    fn resolve(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn creature(name: &str) -> RawRecord {
        RawRecord::Creature {
            name: name.into(),
            entity_id: "1".into(),
            blueprint: UNKNOWN.into(),
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut b = RecordBuilder::new(Category::Creature, "https://ark.wiki.gg");
        let ids: Vec<u32> = ["Rex", "Raptor", "Dodo"]
            .into_iter()
            .map(|n| match b.build(creature(n)) {
                Built::Entity(e) => e.id,
                Built::Pending(_) => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(b.issued(), 3);
    }

    #[test]
    fn counters_are_per_builder() {
        let mut creatures = RecordBuilder::new(Category::Creature, "");
        let mut items = RecordBuilder::new(Category::Item, "");
        creatures.build(creature("Rex"));
        creatures.build(creature("Dodo"));
        let item = items.build(RawRecord::Item {
            name: "Stone".into(),
            item_type: "Resource".into(),
            class_name: "PrimalItemResource_Stone_C".into(),
            blueprint: UNKNOWN.into(),
        });
        assert!(matches!(item, Built::Entity(Entity { id: 1, .. })));
    }

    #[test]
    fn beacon_key_has_section_prefix() {
        let mut b = RecordBuilder::new(Category::Beacon, "");
        let built = b.build(RawRecord::Beacon {
            section: Some("Tek".into()),
            name: "Generator".into(),
            class_name: "SupplyCrate_Generator_C".into(),
        });
        let Built::Entity(e) = built else {
            panic!("beacon should build directly")
        };
        assert_eq!(e.key, "Tek_Generator");
        assert_eq!(e.name, "[Tek] Generator");
    }

    #[test]
    fn beacon_section_is_normalized_too() {
        let (name, key) = beacon_names(Some("Scorched Earth"), "Desert Crate");
        assert_eq!(name, "[Scorched Earth] Desert Crate");
        assert_eq!(key, "Scorched_Earth_Desert_Crate");
        assert_eq!(beacon_names(None, "Crate Level 3").1, "Crate_Level_3");
    }

    #[test]
    fn engram_link_resolves_against_base() {
        let mut b = RecordBuilder::new(Category::Engram, "https://ark.wiki.gg/");
        let Built::Pending(p) = b.build(RawRecord::EngramLink {
            name: "Campfire".into(),
            href: "/wiki/Campfire".into(),
        }) else {
            panic!("engrams wait for details")
        };
        assert_eq!(p.id, 1);
        assert_eq!(p.url, "https://ark.wiki.gg/wiki/Campfire");

        let Built::Pending(p) = b.build(RawRecord::EngramLink {
            name: "Spear".into(),
            href: "https://other.example/wiki/Spear".into(),
        }) else {
            panic!()
        };
        assert_eq!(p.id, 2);
        assert_eq!(p.url, "https://other.example/wiki/Spear");
    }

    #[test]
    fn unknown_engram_is_dropped() {
        let p = PendingEngram {
            id: 7,
            listed_name: "Campfire".into(),
            url: "u".into(),
        };
        assert!(p.clone().complete(EngramDetail::unknown()).is_none());
        let e = p
            .complete(EngramDetail::from_page(Some("Stone Hatchet".into()), None))
            .unwrap();
        assert_eq!(e.id, 7);
        assert_eq!(e.key, "Stone_Hatchet");
        assert_eq!(e.blueprint(), Some(UNKNOWN));
    }

    proptest! {
        #[test]
        fn keys_never_contain_spaces(name in ".*") {
            prop_assert!(!normalize_key(&name).contains(' '));
        }

        #[test]
        fn normalize_is_idempotent(name in ".*") {
            let once = normalize_key(&name);
            prop_assert_eq!(normalize_key(&once), once);
        }

        #[test]
        fn beacon_keys_never_contain_spaces(section in "[A-Za-z ]{0,12}", name in "[A-Za-z ()]{1,20}") {
            let (_, key) = beacon_names(Some(&section), &name);
            prop_assert!(!key.contains(' '));
        }
    }
}
