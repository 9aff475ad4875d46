//! Remote Collection Gateway: the Cookidoo API as seen by the pipelines.
//!
//! This crate provides:
//! - [`RecipeGateway`], the async trait every pipeline talks to
//! - [`model`], typed decoding of collection and recipe payloads
//! - [`CookidooClient`], the reqwest implementation of the trait
//! - Pagination helpers that concatenate every page of a listing

mod client;
pub mod model;

use async_trait::async_trait;
use cookido_shared::Result;
use tracing::debug;

pub use client::CookidooClient;
pub use model::{Chapter, IngredientEntry, PageCount, RecipeDetail, RecipeRef, RemoteCollection};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Operations the pipelines need from the recipe platform.
///
/// Implementations issue one remote call per method; they do not retry and
/// do not rate-limit. Callers own both concerns.
#[async_trait]
pub trait RecipeGateway: Send + Sync {
    /// Authenticate; must succeed before any other call.
    async fn login(&self) -> Result<()>;

    async fn count_managed_collections(&self) -> Result<PageCount>;

    /// Managed collections on the zero-based `page`.
    async fn get_managed_collections(&self, page: u32) -> Result<Vec<RemoteCollection>>;

    async fn count_custom_collections(&self) -> Result<PageCount>;

    /// Custom collections on the zero-based `page`.
    async fn get_custom_collections(&self, page: u32) -> Result<Vec<RemoteCollection>>;

    /// Create a custom collection named `name`.
    async fn add_custom_collection(&self, name: &str) -> Result<RemoteCollection>;

    async fn remove_custom_collection(&self, collection_id: &str) -> Result<()>;

    async fn add_recipes_to_custom_collection(
        &self,
        collection_id: &str,
        recipe_ids: &[String],
    ) -> Result<()>;

    async fn remove_recipe_from_custom_collection(
        &self,
        collection_id: &str,
        recipe_id: &str,
    ) -> Result<()>;

    async fn get_recipe_details(&self, recipe_id: &str) -> Result<RecipeDetail>;
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Fetch every page of managed collections.
pub async fn fetch_all_managed_collections(
    gateway: &dyn RecipeGateway,
) -> Result<Vec<RemoteCollection>> {
    let count = gateway.count_managed_collections().await?;
    let mut all = Vec::new();
    for page in 0..count.total_pages {
        all.extend(gateway.get_managed_collections(page).await?);
    }
    debug!(pages = count.total_pages, collections = all.len(), "fetched managed collections");
    Ok(all)
}

/// Fetch every page of custom collections.
pub async fn fetch_all_custom_collections(
    gateway: &dyn RecipeGateway,
) -> Result<Vec<RemoteCollection>> {
    let count = gateway.count_custom_collections().await?;
    let mut all = Vec::new();
    for page in 0..count.total_pages {
        all.extend(gateway.get_custom_collections(page).await?);
    }
    debug!(pages = count.total_pages, collections = all.len(), "fetched custom collections");
    Ok(all)
}
