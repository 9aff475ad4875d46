//! `import` pipeline: export file → fetch details → classify → legacy collections.
//!
//! Progress is checkpointed to the import state file after every fetched
//! recipe, every classified batch, and every populated collection, so an
//! interrupted run resumes where it stopped.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use cookido_gateway::{IngredientEntry, RecipeDetail, RecipeGateway};
use cookido_shared::{ExportFile, RecipeDetails, Result};
use cookido_storage::{ImportState, StateFile};
use tracing::{info, instrument, warn};

use crate::classifier::Classifier;
use crate::collections::CollectionManager;
use crate::llm::LlmClient;
use crate::pause;
use crate::progress::ProgressReporter;

/// Flat ingredient entries (or groups) scanned per recipe.
const MAX_INGREDIENT_ENTRIES: usize = 10;
/// Entries scanned inside each ingredient group.
const MAX_GROUP_ENTRIES: usize = 5;
/// Ingredient tokens kept in the summary.
const MAX_SUMMARY_TOKENS: usize = 8;
/// Recipe names listed per collection in the dry-run summary.
const DRY_RUN_PREVIEW: usize = 5;

pub const NO_INGREDIENTS: &str = "No ingredients found";

// ---------------------------------------------------------------------------
// Config & result
// ---------------------------------------------------------------------------

/// Configuration for the `import` pipeline.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Export file to import, as given by the user. Also binds the state file.
    pub export_file: PathBuf,
    /// Resume state location.
    pub state_file: PathBuf,
    /// Classify but do not touch collections.
    pub dry_run: bool,
    /// Delay after each recipe detail fetch.
    pub rate_limit: Duration,
}

/// Result of the `import` pipeline.
#[derive(Debug)]
pub struct ImportResult {
    /// Recipe ids listed in the export.
    pub total_recipes: usize,
    /// Recipes with cached details after this run.
    pub fetched: usize,
    /// Recipes with a classification after this run.
    pub classified: usize,
    /// Collections created or updated in this run.
    pub collections_updated: usize,
    /// Recipes confirmed in their collection, across all runs.
    pub assigned: usize,
    /// Present only in dry-run mode.
    pub dry_run: Option<DryRunSummary>,
    pub elapsed: Duration,
}

/// Planned collection contents, reported instead of applying changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DryRunSummary {
    /// Legacy collection name → recipe names.
    pub groups: BTreeMap<String, Vec<String>>,
    pub total_recipes: usize,
}

impl fmt::Display for DryRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "DRY RUN SUMMARY")?;
        writeln!(f, "{rule}")?;

        for (name, recipes) in &self.groups {
            writeln!(f)?;
            writeln!(f, "{name} ({} recipes):", recipes.len())?;
            for recipe in recipes.iter().take(DRY_RUN_PREVIEW) {
                writeln!(f, "  - {recipe}")?;
            }
            if recipes.len() > DRY_RUN_PREVIEW {
                writeln!(f, "  ... and {} more", recipes.len() - DRY_RUN_PREVIEW)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "Total: {} collections, {} recipes",
            self.groups.len(),
            self.total_recipes
        )?;
        write!(f, "Run without --dry-run to apply changes")
    }
}

// ---------------------------------------------------------------------------
// Ingredient summary
// ---------------------------------------------------------------------------

/// Text before the first comma, trimmed.
fn first_part(text: &str) -> Option<String> {
    let part = text.split(',').next().unwrap_or_default().trim();
    (!part.is_empty()).then(|| part.to_string())
}

/// Short ingredient list used as classifier context.
///
/// Prefers the flat ingredient list over grouped ingredients, scans at most
/// ten entries (five per group), and keeps the first eight tokens.
pub fn summarize_ingredients(detail: &RecipeDetail) -> String {
    let entries = if detail.ingredients.is_empty() {
        &detail.ingredient_groups
    } else {
        &detail.ingredients
    };

    let mut tokens = Vec::new();
    for entry in entries.iter().take(MAX_INGREDIENT_ENTRIES) {
        match entry {
            IngredientEntry::Text { text } | IngredientEntry::Plain(text) => {
                tokens.extend(first_part(text));
            }
            IngredientEntry::Named { name } => {
                let name = name.trim();
                if !name.is_empty() {
                    tokens.push(name.to_string());
                }
            }
            IngredientEntry::Group { ingredients } => {
                for sub in ingredients.iter().take(MAX_GROUP_ENTRIES) {
                    if let IngredientEntry::Text { text } = sub {
                        tokens.extend(first_part(text));
                    }
                }
            }
            IngredientEntry::Other(_) => {}
        }
    }

    tokens.truncate(MAX_SUMMARY_TOKENS);
    if tokens.is_empty() {
        NO_INGREDIENTS.to_string()
    } else {
        tokens.join(", ")
    }
}

/// Classifier input for one fetched recipe; the name falls back to the id.
pub fn recipe_details(recipe_id: &str, detail: &RecipeDetail) -> RecipeDetails {
    RecipeDetails {
        recipe_id: recipe_id.to_string(),
        name: detail.display_name().unwrap_or(recipe_id).to_string(),
        ingredients_summary: summarize_ingredients(detail),
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full `import` pipeline.
///
/// 1. Load the export (an empty export ends the run before login)
/// 2. Log in
/// 3. Fetch details for recipes not yet fetched
/// 4. Classify recipes not yet classified
/// 5. Populate legacy collections, or summarize the plan in dry-run mode
#[instrument(skip_all, fields(export = %config.export_file.display(), dry_run = config.dry_run))]
pub async fn run_import(
    config: &ImportConfig,
    gateway: &dyn RecipeGateway,
    llm: &dyn LlmClient,
    progress: &dyn ProgressReporter,
) -> Result<ImportResult> {
    let start = Instant::now();

    // --- Phase 1: Export ---
    progress.phase("Loading export");
    let export = ExportFile::load(&config.export_file)?;
    let recipe_ids = export.all_recipes;
    info!(recipes = recipe_ids.len(), "loaded export");

    if recipe_ids.is_empty() {
        info!("no recipes to import");
        return Ok(ImportResult {
            total_recipes: 0,
            fetched: 0,
            classified: 0,
            collections_updated: 0,
            assigned: 0,
            dry_run: None,
            elapsed: start.elapsed(),
        });
    }

    let export_key = config.export_file.to_string_lossy().into_owned();
    let state_file = StateFile::new(&config.state_file);
    let mut state: ImportState = state_file.load_or_new(&export_key);

    // --- Phase 2: Login ---
    progress.phase("Logging in");
    gateway.login().await?;

    // --- Phase 3: Fetch ---
    fetch_details(config, gateway, &state_file, &mut state, &recipe_ids, progress).await?;

    // --- Phase 4: Classify ---
    classify_pending(llm, &state_file, &mut state, progress).await?;

    // --- Phase 5: Organize ---
    let (collections_updated, dry_run) = if config.dry_run {
        (0, Some(dry_run_summary(&state)))
    } else {
        let touched = organize(gateway, &state_file, &mut state, progress).await?;
        (touched, None)
    };

    progress.finish();
    Ok(ImportResult {
        total_recipes: recipe_ids.len(),
        fetched: state.fetched_recipes.len(),
        classified: state.classifications.len(),
        collections_updated,
        assigned: state.assigned_recipes.len(),
        dry_run,
        elapsed: start.elapsed(),
    })
}

async fn fetch_details(
    config: &ImportConfig,
    gateway: &dyn RecipeGateway,
    state_file: &StateFile,
    state: &mut ImportState,
    recipe_ids: &[String],
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let pending = state.pending_fetch(recipe_ids);
    if pending.is_empty() {
        info!(recipes = recipe_ids.len(), "all recipes already fetched");
        return Ok(());
    }

    progress.phase("Fetching recipe details");
    let total = pending.len();
    for (i, recipe_id) in pending.iter().enumerate() {
        progress.step(recipe_id, i + 1, total);

        match gateway.get_recipe_details(recipe_id).await {
            Ok(detail) => {
                state
                    .fetched_recipes
                    .insert(recipe_id.clone(), recipe_details(recipe_id, &detail));
                state_file.save(&*state)?;
            }
            Err(e) => {
                warn!(%recipe_id, error = %e, "could not fetch recipe, will retry next run");
            }
        }

        pause(config.rate_limit).await;
    }

    info!(fetched = state.fetched_recipes.len(), "fetch stage complete");
    Ok(())
}

async fn classify_pending(
    llm: &dyn LlmClient,
    state_file: &StateFile,
    state: &mut ImportState,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let pending = state.pending_classification();
    if pending.is_empty() {
        info!(classified = state.classifications.len(), "all recipes already classified");
        return Ok(());
    }

    progress.phase("Classifying recipes");
    info!(recipes = pending.len(), "classifying");
    Classifier::new(llm)
        .classify_all(&pending, |results| {
            state.record_classifications(results);
            state_file.save(&*state)
        })
        .await?;

    info!(classified = state.classifications.len(), "classify stage complete");
    Ok(())
}

/// Returns the number of collections processed.
async fn organize(
    gateway: &dyn RecipeGateway,
    state_file: &StateFile,
    state: &mut ImportState,
    progress: &dyn ProgressReporter,
) -> Result<usize> {
    progress.phase("Organizing collections");
    let mut manager = CollectionManager::new(gateway);
    manager.load_existing_collections().await?;

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (recipe_id, classification) in &state.classifications {
        if state.assigned_recipes.contains(recipe_id) {
            continue;
        }
        groups
            .entry(classification.collection_name())
            .or_default()
            .push(recipe_id.clone());
    }

    let total = groups.len();
    let mut processed = 0;
    for (i, (name, recipe_ids)) in groups.iter().enumerate() {
        progress.step(name, i + 1, total);
        info!(collection = %name, recipes = recipe_ids.len(), "processing collection");

        let collection_id = match manager.ensure_collection(name).await {
            Ok(id) => id,
            Err(e) => {
                warn!(collection = %name, error = %e, "could not create collection, skipping");
                continue;
            }
        };
        state
            .created_collections
            .insert(name.clone(), collection_id.clone());

        let added = manager
            .add_recipes_to_collection(&collection_id, recipe_ids)
            .await;
        // Tracks intended placement; a failed add batch is not retried.
        state.assigned_recipes.extend(recipe_ids.iter().cloned());
        state_file.save(&*state)?;

        info!(collection = %name, added, "collection updated");
        processed += 1;
    }

    info!(
        collections = processed,
        assigned = state.assigned_recipes.len(),
        "organize stage complete"
    );
    Ok(processed)
}

/// Every classification grouped under its legacy collection name.
pub fn dry_run_summary(state: &ImportState) -> DryRunSummary {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (recipe_id, classification) in &state.classifications {
        let name = state
            .fetched_recipes
            .get(recipe_id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| classification.recipe_name.clone());
        groups
            .entry(classification.collection_name())
            .or_default()
            .push(name);
    }

    DryRunSummary {
        groups,
        total_recipes: state.classifications.len(),
    }
}
