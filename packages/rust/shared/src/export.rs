//! The JSON export file written by `cookido export` and read by the
//! import and organize pipelines.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CookidoError, Result};

/// Export-file key of the managed collection whose recipes are treated as
/// platform suggestions.
pub const MANAGED_SUGGESTIONS_KEY: &str = "[Managed] Ideas sencillas";

/// Prefix for managed (subscribed) collections in [`ExportFile::collections`].
pub const MANAGED_PREFIX: &str = "[Managed]";

/// Prefix for custom (user-created) collections in [`ExportFile::collections`].
pub const CUSTOM_PREFIX: &str = "[Custom]";

/// Snapshot of every saved recipe id at export time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFile {
    /// Absent in hand-written exports. Timestamps without an offset are read as UTC.
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub locale: String,
    /// Every recipe id seen in any collection, sorted.
    #[serde(default)]
    pub all_recipes: Vec<String>,
    /// Recipe ids from managed collections, sorted and deduplicated.
    #[serde(default)]
    pub favorites: Vec<String>,
    /// `"[Managed] name"` / `"[Custom] name"` to recipe ids.
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<String>>,
}

/// Incrementally collects collections into an [`ExportFile`].
#[derive(Debug, Default)]
pub struct ExportBuilder {
    all_recipes: BTreeSet<String>,
    favorites: BTreeSet<String>,
    collections: BTreeMap<String, Vec<String>>,
}

impl ExportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a managed collection; its recipes also count as favorites.
    pub fn add_managed(&mut self, name: &str, recipe_ids: Vec<String>) {
        self.favorites.extend(recipe_ids.iter().cloned());
        self.add(MANAGED_PREFIX, name, recipe_ids);
    }

    /// Record a custom collection.
    pub fn add_custom(&mut self, name: &str, recipe_ids: Vec<String>) {
        self.add(CUSTOM_PREFIX, name, recipe_ids);
    }

    fn add(&mut self, prefix: &str, name: &str, recipe_ids: Vec<String>) {
        self.all_recipes.extend(recipe_ids.iter().cloned());
        if !recipe_ids.is_empty() {
            self.collections.insert(format!("{prefix} {name}"), recipe_ids);
        }
    }

    pub fn build(self, locale: &str, exported_at: DateTime<Utc>) -> ExportFile {
        ExportFile {
            exported_at: Some(exported_at),
            locale: locale.to_string(),
            all_recipes: self.all_recipes.into_iter().collect(),
            favorites: self.favorites.into_iter().collect(),
            collections: self.collections,
        }
    }
}

impl ExportFile {
    /// Load and parse an export file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CookidoError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            CookidoError::parse(format!("invalid export file {}: {e}", path.display()))
        })
    }

    /// Write the export as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CookidoError::parse(format!("failed to serialize export: {e}")))?;
        std::fs::write(path, json).map_err(|e| CookidoError::io(path, e))
    }

    /// Recipe ids listed under `key`, or `None` when the collection is absent.
    pub fn collection(&self, key: &str) -> Option<&[String]> {
        self.collections.get(key).map(Vec::as_slice)
    }
}

fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid exported_at {raw:?}: {e}")))
}
