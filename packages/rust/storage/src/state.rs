//! Resume state for the import and organize pipelines.

use std::collections::{BTreeMap, BTreeSet};

use cookido_shared::{RecipeClassification, RecipeDetails};
use serde::{Deserialize, Deserializer, Serialize};

use crate::PersistedState;

// ---------------------------------------------------------------------------
// ImportState
// ---------------------------------------------------------------------------

/// Progress through fetch → classify → organize for one export file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportState {
    pub export_file: String,
    #[serde(default)]
    pub fetched_recipes: BTreeMap<String, RecipeDetails>,
    #[serde(default)]
    pub classifications: BTreeMap<String, RecipeClassification>,
    /// Collection name → collection id.
    #[serde(default)]
    pub created_collections: BTreeMap<String, String>,
    /// Recipes already placed into their intended collection.
    #[serde(default)]
    pub assigned_recipes: BTreeSet<String>,
}

impl ImportState {
    pub fn new(export_file: impl Into<String>) -> Self {
        Self {
            export_file: export_file.into(),
            ..Default::default()
        }
    }

    /// Ids from `recipe_ids` that have not been fetched yet, in input order.
    pub fn pending_fetch(&self, recipe_ids: &[String]) -> Vec<String> {
        recipe_ids
            .iter()
            .filter(|id| !self.fetched_recipes.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Fetched recipes that still need a classification.
    pub fn pending_classification(&self) -> Vec<RecipeDetails> {
        self.fetched_recipes
            .values()
            .filter(|r| !self.classifications.contains_key(&r.recipe_id))
            .cloned()
            .collect()
    }

    /// Store classifications, replacing any earlier result for the same id.
    pub fn record_classifications(&mut self, results: &[RecipeClassification]) {
        for c in results {
            self.classifications.insert(c.recipe_id.clone(), c.clone());
        }
    }
}

impl PersistedState for ImportState {
    fn fresh(export_file: &str) -> Self {
        Self::new(export_file)
    }

    fn export_file(&self) -> &str {
        &self.export_file
    }
}

// ---------------------------------------------------------------------------
// OrganizeState
// ---------------------------------------------------------------------------

/// Progress through flatten → remove managed → delete legacy for one export file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizeState {
    pub export_file: String,
    /// Legacy collection ids whose members were copied to a flat collection.
    #[serde(default)]
    pub flattened_collections: BTreeSet<String>,
    /// Flat collection name → collection id.
    #[serde(default)]
    pub created_collections: BTreeMap<String, String>,
    /// Collection id → managed recipe ids already removed from it.
    #[serde(default, deserialize_with = "removed_map_or_legacy_list")]
    pub removed_managed_recipes: BTreeMap<String, BTreeSet<String>>,
    /// Legacy collection ids already deleted remotely.
    #[serde(default)]
    pub deleted_collections: BTreeSet<String>,
}

impl OrganizeState {
    pub fn new(export_file: impl Into<String>) -> Self {
        Self {
            export_file: export_file.into(),
            ..Default::default()
        }
    }

    /// Recipes already stripped from `collection_id`.
    pub fn removed_from(&self, collection_id: &str) -> Option<&BTreeSet<String>> {
        self.removed_managed_recipes.get(collection_id)
    }

    pub fn record_removal(&mut self, collection_id: &str, recipe_id: &str) {
        self.removed_managed_recipes
            .entry(collection_id.to_string())
            .or_default()
            .insert(recipe_id.to_string());
    }

    /// Total managed recipes removed across every collection.
    pub fn total_removed(&self) -> usize {
        self.removed_managed_recipes.values().map(BTreeSet::len).sum()
    }
}

impl PersistedState for OrganizeState {
    fn fresh(export_file: &str) -> Self {
        Self::new(export_file)
    }

    fn export_file(&self) -> &str {
        &self.export_file
    }
}

/// Older state files stored removals as a flat list with no collection ids.
/// Those cannot be attributed, so they load as empty and get re-processed.
fn removed_map_or_legacy_list<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Removed {
        PerCollection(BTreeMap<String, BTreeSet<String>>),
        Legacy(Vec<String>),
    }

    Ok(match Removed::deserialize(deserializer)? {
        Removed::PerCollection(map) => map,
        Removed::Legacy(_) => BTreeMap::new(),
    })
}
