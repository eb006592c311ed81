use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::builder::normalize_key;
use crate::enrich::DEFAULT_CONCURRENCY;
use crate::model::Category;

pub const DEFAULT_BASE_URL: &str = "https://ark.wiki.gg";
const ENV_PREFIX: &str = "ARK";

/// Run settings: compiled defaults, then an optional settings file, then `ARK_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub creatures_path: String,
    pub items_path: String,
    pub engrams_path: String,
    pub beacons_path: String,
    pub output: PathBuf,
    pub blacklist: PathBuf,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: DEFAULT_BASE_URL.to_string(),
            creatures_path: "/wiki/Creature_IDs".to_string(),
            items_path: "/wiki/Item_IDs".to_string(),
            engrams_path: "/wiki/Engrams".to_string(),
            beacons_path: "/wiki/Beacon_IDs".to_string(),
            output: PathBuf::from("ark_data.json"),
            blacklist: PathBuf::from("blacklist.json"),
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: 20,
            user_agent: concat!("ark_catalog/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    /// `file` may be absent on disk; only its parse errors are fatal.
    pub fn load(file: Option<&Path>) -> Result<Settings> {
        let d = Settings::default();
        let mut builder = ::config::Config::builder()
            .set_default("base_url", d.base_url)?
            .set_default("creatures_path", d.creatures_path)?
            .set_default("items_path", d.items_path)?
            .set_default("engrams_path", d.engrams_path)?
            .set_default("beacons_path", d.beacons_path)?
            .set_default("output", d.output.to_string_lossy().into_owned())?
            .set_default("blacklist", d.blacklist.to_string_lossy().into_owned())?
            .set_default("concurrency", d.concurrency as u64)?
            .set_default("timeout_secs", d.timeout_secs)?
            .set_default("user_agent", d.user_agent)?;

        builder = match file {
            Some(path) => builder.add_source(::config::File::from(path).required(false)),
            None => builder.add_source(::config::File::with_name("ark_catalog").required(false)),
        };

        let settings: Settings = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;
        Ok(settings)
    }

    pub fn listing_path(&self, category: Category) -> &str {
        match category {
            Category::Creature => &self.creatures_path,
            Category::Item => &self.items_path,
            Category::Engram => &self.engrams_path,
            Category::Beacon => &self.beacons_path,
        }
    }

    pub fn listing_url(&self, category: Category) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.listing_path(category)
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Raw file shape. Older files used the `*_blacklist` names.
#[derive(Debug, Default, Deserialize)]
struct BlacklistFile {
    #[serde(rename = "Creatures", alias = "dino_blacklist", default)]
    creatures: Vec<String>,
    #[serde(rename = "Items", alias = "item_blacklist", default)]
    items: Vec<String>,
    #[serde(rename = "Engrams", alias = "engram_blacklist", default)]
    engrams: Vec<String>,
    #[serde(rename = "Beacons", alias = "beacon_blacklist", default)]
    beacons: Vec<String>,
}

/// Per-category exclusion terms, already normalized like keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    creatures: BTreeSet<String>,
    items: BTreeSet<String>,
    engrams: BTreeSet<String>,
    beacons: BTreeSet<String>,
}

impl Blacklist {
    /// A missing file is not an error and yields an empty blacklist.
    pub fn load(path: &Path) -> Result<Blacklist> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No blacklist at {}, nothing will be filtered", path.display());
                return Ok(Blacklist::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        Blacklist::from_json(&text).with_context(|| format!("Invalid blacklist {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Blacklist> {
        let file: BlacklistFile = serde_json::from_str(text)?;
        let mut blacklist = Blacklist::default();
        for (category, terms) in [
            (Category::Creature, file.creatures),
            (Category::Item, file.items),
            (Category::Engram, file.engrams),
            (Category::Beacon, file.beacons),
        ] {
            for term in terms {
                blacklist.insert(category, &term);
            }
        }
        Ok(blacklist)
    }

    /// Empty terms would match every key, so they are dropped.
    pub fn insert(&mut self, category: Category, term: &str) {
        let term = normalize_key(term.trim());
        if !term.is_empty() {
            self.terms_mut(category).insert(term);
        }
    }

    pub fn terms(&self, category: Category) -> &BTreeSet<String> {
        match category {
            Category::Creature => &self.creatures,
            Category::Item => &self.items,
            Category::Engram => &self.engrams,
            Category::Beacon => &self.beacons,
        }
    }

    fn terms_mut(&mut self, category: Category) -> &mut BTreeSet<String> {
        match category {
            Category::Creature => &mut self.creatures,
            Category::Item => &mut self.items,
            Category::Engram => &mut self.engrams,
            Category::Beacon => &mut self.beacons,
        }
    }
}
