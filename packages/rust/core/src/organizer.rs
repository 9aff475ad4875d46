//! `organize` pipeline: migrate legacy two-level collections to flat English
//! ones, strip managed suggestions out of custom collections, and delete the
//! legacy collections.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use cookido_gateway::RecipeGateway;
use cookido_shared::{
    ExportFile, MANAGED_SUGGESTIONS_KEY, Result, flat_collection_name, parse_legacy_name,
};
use cookido_storage::{OrganizeState, StateFile};
use tracing::{info, instrument, warn};

use crate::collections::CollectionManager;
use crate::pause;
use crate::progress::ProgressReporter;

// ---------------------------------------------------------------------------
// Config & result
// ---------------------------------------------------------------------------

/// Configuration for the `organize` pipeline.
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    /// Export file holding the managed suggestions list. Also binds the state file.
    pub export_file: PathBuf,
    /// Resume state location.
    pub state_file: PathBuf,
    /// Report planned changes without applying them.
    pub dry_run: bool,
    /// Delay after each remote mutation.
    pub rate_limit: Duration,
}

/// Result of the `organize` pipeline.
#[derive(Debug)]
pub struct OrganizeResult {
    pub summary: OrganizeSummary,
    pub elapsed: Duration,
}

/// Totals recorded in the organize state after a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizeSummary {
    pub dry_run: bool,
    pub flattened: usize,
    /// Flat collection names, sorted.
    pub created: Vec<String>,
    pub removed_recipes: usize,
    pub removed_from_collections: usize,
    pub deleted: usize,
}

impl OrganizeSummary {
    fn from_state(state: &OrganizeState, dry_run: bool) -> Self {
        Self {
            dry_run,
            flattened: state.flattened_collections.len(),
            created: state.created_collections.keys().cloned().collect(),
            removed_recipes: state.total_removed(),
            removed_from_collections: state.removed_managed_recipes.len(),
            deleted: state.deleted_collections.len(),
        }
    }
}

impl fmt::Display for OrganizeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        if self.dry_run {
            writeln!(f, "DRY RUN SUMMARY (no changes made)")?;
        } else {
            writeln!(f, "SUMMARY")?;
        }
        writeln!(f, "{rule}")?;
        writeln!(f, "Collections flattened: {}", self.flattened)?;
        writeln!(f, "New collections created: {}", self.created.len())?;
        for name in &self.created {
            writeln!(f, "  - {name}")?;
        }
        writeln!(
            f,
            "Managed recipes removed: {} (from {} collections)",
            self.removed_recipes, self.removed_from_collections
        )?;
        writeln!(f, "Old collections deleted: {}", self.deleted)?;
        write!(f, "{rule}")
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full `organize` pipeline.
///
/// 1. Load the managed suggestions from the export
/// 2. Log in and cache existing collections
/// 3. Flatten legacy collections into translated flat ones
/// 4. Remove managed suggestions from the remaining custom collections
/// 5. Delete legacy collections
#[instrument(skip_all, fields(export = %config.export_file.display(), dry_run = config.dry_run))]
pub async fn run_organize(
    config: &OrganizeConfig,
    gateway: &dyn RecipeGateway,
    progress: &dyn ProgressReporter,
) -> Result<OrganizeResult> {
    let start = Instant::now();

    // --- Phase 1: Export ---
    progress.phase("Loading export");
    let export = ExportFile::load(&config.export_file)?;
    let managed: BTreeSet<String> = match export.collection(MANAGED_SUGGESTIONS_KEY) {
        Some(ids) => {
            info!(recipes = ids.len(), "loaded managed suggestions");
            ids.iter().cloned().collect()
        }
        None => {
            info!(collection = MANAGED_SUGGESTIONS_KEY, "no managed suggestions in export");
            BTreeSet::new()
        }
    };

    let export_key = config.export_file.to_string_lossy().into_owned();
    let state_file = StateFile::new(&config.state_file);
    let mut state: OrganizeState = state_file.load_or_new(&export_key);

    // --- Phase 2: Login ---
    progress.phase("Logging in");
    gateway.login().await?;
    let mut manager = CollectionManager::new(gateway);
    manager.load_existing_collections().await?;

    let mut stage = Stage {
        config,
        state_file: &state_file,
        state: &mut state,
        manager: &mut manager,
        progress,
    };

    // --- Phase 3: Flatten ---
    stage.flatten().await?;

    // --- Phase 4: Managed suggestions ---
    stage.remove_managed(&managed).await?;

    // --- Phase 5: Delete legacy ---
    stage.delete_legacy().await?;

    progress.finish();
    Ok(OrganizeResult {
        summary: OrganizeSummary::from_state(&state, config.dry_run),
        elapsed: start.elapsed(),
    })
}

/// Shared handles for the organize stages.
struct Stage<'s, 'g> {
    config: &'s OrganizeConfig,
    state_file: &'s StateFile,
    state: &'s mut OrganizeState,
    manager: &'s mut CollectionManager<'g>,
    progress: &'s dyn ProgressReporter,
}

impl Stage<'_, '_> {
    fn save(&self) -> Result<()> {
        self.state_file.save(&*self.state)
    }

    /// Cached legacy collections as `(name, id, flat name)`.
    fn legacy_collections(&self) -> Vec<(String, String, String)> {
        self.manager
            .collections()
            .into_iter()
            .filter_map(|(name, id)| {
                let legacy = parse_legacy_name(&name)?;
                Some((name, id, flat_collection_name(legacy.dish_type)))
            })
            .collect()
    }

    async fn flatten(&mut self) -> Result<()> {
        self.progress.phase("Flattening collections");
        let pending: Vec<_> = self
            .legacy_collections()
            .into_iter()
            .filter(|(_, id, _)| !self.state.flattened_collections.contains(id))
            .collect();

        if pending.is_empty() {
            info!("no collections to flatten");
            return Ok(());
        }
        info!(collections = pending.len(), "found collections to flatten");

        let total = pending.len();
        for (i, (name, legacy_id, flat_name)) in pending.iter().enumerate() {
            self.progress.step(name, i + 1, total);
            info!("{name} -> {flat_name}");

            if self.config.dry_run {
                continue;
            }

            let members = self.manager.members(legacy_id);
            if members.is_empty() {
                info!(collection = %name, "no recipes to move");
                self.state.flattened_collections.insert(legacy_id.clone());
                self.save()?;
                continue;
            }

            let target_id = match self.manager.ensure_collection(flat_name).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(collection = %flat_name, error = %e, "could not create flat collection, skipping");
                    continue;
                }
            };
            self.state
                .created_collections
                .insert(flat_name.clone(), target_id.clone());

            let recipe_ids: Vec<String> = members.iter().cloned().collect();
            let moved = self
                .manager
                .add_recipes_to_collection(&target_id, &recipe_ids)
                .await;
            info!(collection = %name, moved, "moved recipes");

            self.state.flattened_collections.insert(legacy_id.clone());
            self.save()?;

            pause(self.config.rate_limit).await;
        }
        Ok(())
    }

    async fn remove_managed(&mut self, managed: &BTreeSet<String>) -> Result<()> {
        if managed.is_empty() {
            return Ok(());
        }
        self.progress.phase("Removing managed recipes");

        for (name, collection_id) in self.manager.collections() {
            if name == MANAGED_SUGGESTIONS_KEY || parse_legacy_name(&name).is_some() {
                continue;
            }

            let already_removed = self.state.removed_from(&collection_id);
            let to_remove: BTreeSet<String> = self
                .manager
                .members(&collection_id)
                .intersection(managed)
                .filter(|id| !already_removed.is_some_and(|done| done.contains(*id)))
                .cloned()
                .collect();

            if to_remove.is_empty() {
                continue;
            }
            info!(collection = %name, recipes = to_remove.len(), "removing managed recipes");

            if self.config.dry_run {
                continue;
            }

            let total = to_remove.len();
            for (i, recipe_id) in to_remove.iter().enumerate() {
                self.progress.step(recipe_id, i + 1, total);
                if self
                    .manager
                    .remove_recipe_from_collection(&collection_id, recipe_id)
                    .await
                {
                    self.state.record_removal(&collection_id, recipe_id);
                    self.save()?;
                }
                pause(self.config.rate_limit).await;
            }
        }
        Ok(())
    }

    async fn delete_legacy(&mut self) -> Result<()> {
        self.progress.phase("Deleting legacy collections");
        let pending: Vec<_> = self
            .legacy_collections()
            .into_iter()
            .filter(|(_, id, _)| !self.state.deleted_collections.contains(id))
            .collect();

        if pending.is_empty() {
            info!("no collections to delete");
            return Ok(());
        }
        info!(collections = pending.len(), "found collections to delete");

        for (name, collection_id, _) in &pending {
            info!(collection = %name, "deleting");

            if self.config.dry_run {
                continue;
            }

            if self.manager.delete_collection(collection_id).await {
                self.state.deleted_collections.insert(collection_id.clone());
                self.save()?;
            }
            pause(self.config.rate_limit).await;
        }
        Ok(())
    }
}
