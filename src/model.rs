use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Placeholder for a field that was looked for but could not be extracted.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Creature,
    Item,
    Engram,
    Beacon,
}

impl Category {
    /// Output order of the catalog.
    pub const ALL: [Category; 4] = [
        Category::Creature,
        Category::Item,
        Category::Engram,
        Category::Beacon,
    ];

    /// Position in [`Category::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used for the catalog's top-level key and the blacklist key.
    pub fn catalog_key(self) -> &'static str {
        match self {
            Category::Creature => "Creatures",
            Category::Item => "Items",
            Category::Engram => "Engrams",
            Category::Beacon => "Beacons",
        }
    }

    /// Minimum number of `td` cells a listing row needs to be usable.
    pub fn min_cells(self) -> usize {
        match self {
            Category::Creature => 5,
            Category::Item => 6,
            Category::Engram => 3,
            Category::Beacon => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_key())
    }
}

/// Category-specific fields. Every string is either extracted text or [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDetail {
    Creature {
        entity_id: String,
        blueprint: String,
    },
    Item {
        item_type: String,
        class_name: String,
        blueprint: String,
    },
    Engram {
        blueprint: String,
    },
    Beacon {
        class_name: String,
    },
}

impl EntityDetail {
    pub fn category(&self) -> Category {
        match self {
            EntityDetail::Creature { .. } => Category::Creature,
            EntityDetail::Item { .. } => Category::Item,
            EntityDetail::Engram { .. } => Category::Engram,
            EntityDetail::Beacon { .. } => Category::Beacon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: u32,
    pub name: String,
    pub key: String,
    pub detail: EntityDetail,
}

impl Entity {
    pub fn category(&self) -> Category {
        self.detail.category()
    }

    /// Value of the `Type` field in the catalog file.
    pub fn type_label(&self) -> &str {
        match &self.detail {
            EntityDetail::Creature { .. } => "creature",
            EntityDetail::Item { item_type, .. } => item_type,
            EntityDetail::Engram { .. } => "engram",
            EntityDetail::Beacon { .. } => "beacon",
        }
    }

    pub fn blueprint(&self) -> Option<&str> {
        match &self.detail {
            EntityDetail::Creature { blueprint, .. }
            | EntityDetail::Item { blueprint, .. }
            | EntityDetail::Engram { blueprint } => Some(blueprint),
            EntityDetail::Beacon { .. } => None,
        }
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("ID", &self.id)?;
        map.serialize_entry("Type", self.type_label())?;
        map.serialize_entry("Name", &self.name)?;
        match &self.detail {
            EntityDetail::Creature {
                entity_id,
                blueprint,
            } => {
                map.serialize_entry("EntityID", entity_id)?;
                map.serialize_entry("Blueprint", blueprint)?;
            }
            EntityDetail::Item {
                class_name,
                blueprint,
                ..
            } => {
                map.serialize_entry("ClassName", class_name)?;
                map.serialize_entry("Blueprint", blueprint)?;
            }
            EntityDetail::Engram { blueprint } => {
                map.serialize_entry("Blueprint", blueprint)?;
            }
            EntityDetail::Beacon { class_name } => {
                map.serialize_entry("ClassName", class_name)?;
            }
        }
        map.end()
    }
}

/// Records of one category keyed by normalized key.
pub type Records = BTreeMap<String, Entity>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    #[serde(rename = "Creatures")]
    pub creatures: Records,
    #[serde(rename = "Items")]
    pub items: Records,
    #[serde(rename = "Engrams")]
    pub engrams: Records,
    #[serde(rename = "Beacons")]
    pub beacons: Records,
}

impl Catalog {
    pub fn get(&self, category: Category) -> &Records {
        match category {
            Category::Creature => &self.creatures,
            Category::Item => &self.items,
            Category::Engram => &self.engrams,
            Category::Beacon => &self.beacons,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Records {
        match category {
            Category::Creature => &mut self.creatures,
            Category::Item => &mut self.items,
            Category::Engram => &mut self.engrams,
            Category::Beacon => &mut self.beacons,
        }
    }

    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c).len()).sum()
    }
}

// ── Tests ──
