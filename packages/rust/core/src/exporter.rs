//! `export` pipeline: snapshot every saved recipe id into an [`ExportFile`].

use chrono::{DateTime, Local, Utc};
use cookido_gateway::{
    RecipeGateway, RemoteCollection, fetch_all_custom_collections, fetch_all_managed_collections,
};
use cookido_shared::{ExportBuilder, ExportFile, Result};
use tracing::{info, instrument};

use crate::progress::ProgressReporter;

/// Name used for collections that report neither a name nor a title.
const UNKNOWN_COLLECTION: &str = "Unknown";

/// `cookidoo-export-YYYYMMDD-HHMMSS.json` for the given local time.
pub fn export_file_name(at: DateTime<Local>) -> String {
    format!("cookidoo-export-{}.json", at.format("%Y%m%d-%H%M%S"))
}

fn collection_label(collection: &RemoteCollection) -> &str {
    collection.display_name().unwrap_or(UNKNOWN_COLLECTION)
}

/// Log in and collect every managed and custom collection.
///
/// `locale` is recorded in the export as-is (e.g. `"es-ES"`).
#[instrument(skip_all, fields(locale = %locale))]
pub async fn export_recipes(
    gateway: &dyn RecipeGateway,
    locale: &str,
    progress: &dyn ProgressReporter,
) -> Result<ExportFile> {
    progress.phase("Logging in");
    gateway.login().await?;

    progress.phase("Fetching managed collections");
    let managed = fetch_all_managed_collections(gateway).await?;

    progress.phase("Fetching custom collections");
    let custom = fetch_all_custom_collections(gateway).await?;

    let mut builder = ExportBuilder::new();
    for collection in &managed {
        builder.add_managed(collection_label(collection), collection.recipe_ids());
    }
    for collection in &custom {
        builder.add_custom(collection_label(collection), collection.recipe_ids());
    }

    let export = builder.build(locale, Utc::now());
    info!(
        managed = managed.len(),
        custom = custom.len(),
        recipes = export.all_recipes.len(),
        "export assembled"
    );
    progress.finish();
    Ok(export)
}
