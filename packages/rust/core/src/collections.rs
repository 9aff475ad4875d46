//! Cached, idempotent view of the user's custom collections.
//!
//! [`CollectionManager`] remembers every collection name and its member
//! recipe ids so repeated runs never create the same collection twice and
//! never re-submit a recipe that is already a member.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cookido_gateway::{RecipeGateway, fetch_all_custom_collections};
use cookido_shared::{CookidoError, Result};
use tracing::{debug, error, info};

/// Maximum recipe ids per add call.
pub const ADD_BATCH_SIZE: usize = 50;

pub struct CollectionManager<'a> {
    gateway: &'a dyn RecipeGateway,
    /// Collection name → id.
    ids: BTreeMap<String, String>,
    /// Collection id → member recipe ids.
    members: HashMap<String, BTreeSet<String>>,
}

impl<'a> CollectionManager<'a> {
    pub fn new(gateway: &'a dyn RecipeGateway) -> Self {
        Self {
            gateway,
            ids: BTreeMap::new(),
            members: HashMap::new(),
        }
    }

    /// Populate the cache from every page of custom collections.
    ///
    /// Collections without a name or id are skipped.
    pub async fn load_existing_collections(&mut self) -> Result<()> {
        let collections = fetch_all_custom_collections(self.gateway).await?;

        for collection in &collections {
            let (Some(name), Some(id)) = (collection.display_name(), collection.id.as_deref())
            else {
                debug!(id = ?collection.id, "skipping collection without name or id");
                continue;
            };
            self.ids.insert(name.to_string(), id.to_string());
            self.members
                .insert(id.to_string(), collection.recipe_ids().into_iter().collect());
        }

        info!(collections = self.ids.len(), "loaded existing collections");
        Ok(())
    }

    /// Id of the collection named `name`, creating it on first use.
    pub async fn ensure_collection(&mut self, name: &str) -> Result<String> {
        if let Some(id) = self.ids.get(name) {
            return Ok(id.clone());
        }

        info!(collection = name, "creating collection");
        let created = self.gateway.add_custom_collection(name).await?;
        let id = created.id.filter(|id| !id.is_empty()).ok_or_else(|| {
            CookidoError::parse(format!("create response for '{name}' has no collection id"))
        })?;

        self.ids.insert(name.to_string(), id.clone());
        self.members.insert(id.clone(), BTreeSet::new());
        Ok(id)
    }

    /// Add the recipes that are not yet members, in batches of [`ADD_BATCH_SIZE`].
    ///
    /// A failed batch is logged and left out of the cache; earlier batches
    /// stay committed. Returns how many ids were submitted successfully.
    pub async fn add_recipes_to_collection(
        &mut self,
        collection_id: &str,
        recipe_ids: &[String],
    ) -> usize {
        let existing = self.members.get(collection_id);
        let mut seen: BTreeSet<&String> = BTreeSet::new();
        let new_ids: Vec<String> = recipe_ids
            .iter()
            .filter(|id| !existing.is_some_and(|m| m.contains(*id)))
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();

        if new_ids.is_empty() {
            return 0;
        }

        let mut added = 0;
        for batch in new_ids.chunks(ADD_BATCH_SIZE) {
            match self
                .gateway
                .add_recipes_to_custom_collection(collection_id, batch)
                .await
            {
                Ok(()) => {
                    self.members
                        .entry(collection_id.to_string())
                        .or_default()
                        .extend(batch.iter().cloned());
                    added += batch.len();
                }
                Err(e) => {
                    error!(collection_id, batch = batch.len(), error = %e, "failed to add recipes");
                }
            }
        }
        added
    }

    /// Remove one recipe; `false` when the remote call failed.
    pub async fn remove_recipe_from_collection(
        &mut self,
        collection_id: &str,
        recipe_id: &str,
    ) -> bool {
        match self
            .gateway
            .remove_recipe_from_custom_collection(collection_id, recipe_id)
            .await
        {
            Ok(()) => {
                if let Some(members) = self.members.get_mut(collection_id) {
                    members.remove(recipe_id);
                }
                true
            }
            Err(e) => {
                error!(collection_id, recipe_id, error = %e, "failed to remove recipe");
                false
            }
        }
    }

    /// Delete a collection; `false` when the remote call failed.
    pub async fn delete_collection(&mut self, collection_id: &str) -> bool {
        match self.gateway.remove_custom_collection(collection_id).await {
            Ok(()) => {
                self.ids.retain(|_, id| id != collection_id);
                self.members.remove(collection_id);
                true
            }
            Err(e) => {
                error!(collection_id, error = %e, "failed to delete collection");
                false
            }
        }
    }

    pub fn collection_id(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    /// Known members of `collection_id` (empty when unknown).
    pub fn members(&self, collection_id: &str) -> BTreeSet<String> {
        self.members.get(collection_id).cloned().unwrap_or_default()
    }

    pub fn is_recipe_in_collection(&self, collection_id: &str, recipe_id: &str) -> bool {
        self.members
            .get(collection_id)
            .is_some_and(|m| m.contains(recipe_id))
    }

    /// Cached `(name, id)` pairs in name order.
    pub fn collections(&self) -> Vec<(String, String)> {
        self.ids
            .iter()
            .map(|(name, id)| (name.clone(), id.clone()))
            .collect()
    }
}
