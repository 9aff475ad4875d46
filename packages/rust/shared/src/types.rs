//! Core domain types persisted across pipeline runs.

use serde::{Deserialize, Serialize};

use crate::taxonomy::{DishType, Season, collection_name};

/// Confidence assumed when the model omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

// ---------------------------------------------------------------------------
// RecipeDetails
// ---------------------------------------------------------------------------

/// Recipe details fetched once per recipe and used as classifier input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetails {
    pub recipe_id: String,
    pub name: String,
    /// Up to 8 comma-joined ingredient tokens.
    pub ingredients_summary: String,
}

impl RecipeDetails {
    /// Single prompt line: `- id: name (ingredients: summary)`.
    pub fn prompt_line(&self) -> String {
        format!(
            "- {}: {} (ingredients: {})",
            self.recipe_id, self.name, self.ingredients_summary
        )
    }
}

// ---------------------------------------------------------------------------
// RecipeClassification
// ---------------------------------------------------------------------------

/// Classification result for a single recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeClassification {
    pub recipe_id: String,
    pub recipe_name: String,
    pub season: Season,
    pub dish_type: DishType,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl RecipeClassification {
    /// Name of the legacy two-level collection this recipe belongs in.
    pub fn collection_name(&self) -> String {
        collection_name(self.season, self.dish_type)
    }
}
