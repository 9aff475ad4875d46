//! Season and dish-type classification of recipes via an LLM.
//!
//! Recipes are sent in batches of [`BATCH_SIZE`] under a fixed prompt. The
//! reply must be a JSON array of `{id, season, dish_type, confidence}`
//! objects; anything that does not fit is dropped with a warning rather than
//! failing the batch.

use std::collections::HashMap;
use std::sync::LazyLock;

use cookido_shared::{
    CookidoError, DEFAULT_CONFIDENCE, DishType, RecipeClassification, RecipeDetails, Result,
    Season,
};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::llm::LlmClient;

/// Maximum recipes per LLM call.
pub const BATCH_SIZE: usize = 20;

/// Fixed instructions sent ahead of every batch.
pub const CLASSIFICATION_PROMPT: &str = r#"You are a culinary expert classifying Spanish Thermomix recipes.

For each recipe, determine:
1. **Season** (best fit): Primavera, Verano, Otoño, Invierno
2. **Dish Type** (primary): Sopas, Ensaladas, Carnes, Pescados, Pastas, Arroces, Postres, Panes, Salsas

Classification rules:
- **Season by ingredients and dish characteristics**:
  - Primavera: Light dishes, fresh vegetables, asparagus, peas, artichokes
  - Verano: Cold soups (gazpacho, salmorejo), salads, light dishes, tomatoes, peppers
  - Otoño: Mushrooms, squash, warm soups, legumes, chestnuts
  - Invierno: Heavy stews, cocidos, hot soups, comfort food, root vegetables

- **Dish Type by primary category**:
  - Sopas: Soups, creams, broths (crema, sopa, caldo, gazpacho, salmorejo)
  - Ensaladas: Salads, cold vegetable dishes
  - Carnes: Meat dishes (pollo, cerdo, ternera, cordero)
  - Pescados: Fish and seafood dishes
  - Pastas: Pasta dishes, noodles
  - Arroces: Rice dishes, risottos, paellas
  - Postres: Desserts, sweets, cakes (bizcocho, tarta, helado, flan)
  - Panes: Breads, doughs, pastries (pan, masa, empanada)
  - Salsas: Sauces, dips, condiments (salsa, alioli, mayonesa)

- When a recipe could fit multiple seasons, choose the MOST representative one
- When a recipe could fit multiple dish types, choose the PRIMARY category

Respond ONLY with a valid JSON array (no markdown, no explanation):
[{"id": "r123", "season": "Verano", "dish_type": "Sopas", "confidence": 0.9}, ...]
"#;

/// Markdown code fence around a reply, with an optional `json` tag.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"));

/// One element of the model's reply array, before validation.
#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    season: Option<String>,
    #[serde(default)]
    dish_type: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

// ---------------------------------------------------------------------------
// Prompt and reply handling
// ---------------------------------------------------------------------------

/// Full prompt for one batch.
pub fn build_prompt(recipes: &[RecipeDetails]) -> String {
    let lines: Vec<String> = recipes.iter().map(RecipeDetails::prompt_line).collect();
    format!(
        "{CLASSIFICATION_PROMPT}\n\nRecipes to classify:\n{}",
        lines.join("\n")
    )
}

/// Strip a surrounding markdown code fence, if the reply starts with one.
fn unwrap_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    FENCE_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed)
}

/// Validate the model reply against the recipes that were asked about.
///
/// Malformed JSON yields an empty result. Items with an unknown id are
/// skipped silently; items with an unknown season or dish type are skipped
/// with a warning.
pub fn parse_reply(reply: &str, recipes: &[RecipeDetails]) -> Vec<RecipeClassification> {
    let body = unwrap_fence(reply);
    let raw: Vec<RawClassification> = match serde_json::from_str(body) {
        Ok(items) => items,
        Err(e) => {
            let preview: String = body.chars().take(500).collect();
            warn!(error = %e, response = %preview, "failed to parse classifier response");
            return Vec::new();
        }
    };

    let by_id: HashMap<&str, &RecipeDetails> =
        recipes.iter().map(|r| (r.recipe_id.as_str(), r)).collect();

    raw.into_iter()
        .filter_map(|item| {
            let id = item.id?;
            let recipe = by_id.get(id.as_str())?;

            let season = match item.season.as_deref().map(str::parse::<Season>) {
                Some(Ok(season)) => season,
                other => {
                    warn!(recipe_id = %id, season = ?item.season, error = ?other.and_then(|r| r.err()), "invalid season, skipping");
                    return None;
                }
            };
            let dish_type = match item.dish_type.as_deref().map(str::parse::<DishType>) {
                Some(Ok(dish_type)) => dish_type,
                other => {
                    warn!(recipe_id = %id, dish_type = ?item.dish_type, error = ?other.and_then(|r| r.err()), "invalid dish type, skipping");
                    return None;
                }
            };

            Some(RecipeClassification {
                recipe_id: id,
                recipe_name: recipe.name.clone(),
                season,
                dish_type,
                confidence: item.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Batches recipes through an [`LlmClient`].
pub struct Classifier<'a> {
    llm: &'a dyn LlmClient,
}

impl<'a> Classifier<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    /// Classify up to [`BATCH_SIZE`] recipes in one call.
    ///
    /// LLM transport errors propagate; an unparseable reply is an empty result.
    pub async fn classify_batch(
        &self,
        recipes: &[RecipeDetails],
    ) -> Result<Vec<RecipeClassification>> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }
        if recipes.len() > BATCH_SIZE {
            return Err(CookidoError::validation(format!(
                "batch of {} recipes exceeds the limit of {BATCH_SIZE}",
                recipes.len()
            )));
        }

        let reply = self.llm.generate(&build_prompt(recipes)).await?;
        let results = parse_reply(&reply, recipes);
        debug!(requested = recipes.len(), classified = results.len(), "batch classified");
        Ok(results)
    }

    /// Classify every recipe in consecutive batches, in input order.
    ///
    /// `on_batch_complete` runs after each successful batch; an error it
    /// returns aborts the run. A failed batch is logged and skipped.
    #[instrument(skip_all, fields(recipes = recipes.len()))]
    pub async fn classify_all<F>(
        &self,
        recipes: &[RecipeDetails],
        mut on_batch_complete: F,
    ) -> Result<Vec<RecipeClassification>>
    where
        F: FnMut(&[RecipeClassification]) -> Result<()>,
    {
        let total_batches = recipes.len().div_ceil(BATCH_SIZE);
        let mut all = Vec::new();

        for (index, batch) in recipes.chunks(BATCH_SIZE).enumerate() {
            info!(
                batch = index + 1,
                total_batches,
                size = batch.len(),
                "classifying batch"
            );

            match self.classify_batch(batch).await {
                Ok(results) => {
                    // A failed checkpoint stops the run: later batches could not be resumed.
                    on_batch_complete(&results)?;
                    all.extend(results);
                }
                Err(e) => {
                    error!(batch = index + 1, error = %e, "batch classification failed");
                }
            }
        }

        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Replies with scripted responses in order and records prompts.
    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("[]".into()))
        }
    }

    fn recipe(id: &str, name: &str) -> RecipeDetails {
        RecipeDetails {
            recipe_id: id.into(),
            name: name.into(),
            ingredients_summary: "tomate, pepino".into(),
        }
    }

    #[test]
    fn prompt_lists_recipes_after_instructions() {
        let prompt = build_prompt(&[recipe("r1", "Gazpacho"), recipe("r2", "Cocido")]);
        assert!(prompt.starts_with("You are a culinary expert"));
        assert!(prompt.ends_with(
            "Recipes to classify:\n- r1: Gazpacho (ingredients: tomate, pepino)\n- r2: Cocido (ingredients: tomate, pepino)"
        ));
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let reply = "```json\n[{\"id\": \"r1\", \"season\": \"Verano\", \"dish_type\": \"Sopas\", \"confidence\": 0.95}]\n```";
        let results = parse_reply(reply, &[recipe("r1", "Gazpacho")]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].season, Season::Summer);
        assert_eq!(results[0].dish_type, DishType::Sopas);
        assert_eq!(results[0].recipe_name, "Gazpacho");
        assert!((results[0].confidence - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_items_are_dropped() {
        let reply = r#"[
            {"id": "r1", "season": "Verano", "dish_type": "Sopas"},
            {"id": "r2", "season": "Monzón", "dish_type": "Sopas"},
            {"id": "r3", "season": "Otoño", "dish_type": "Guisos"},
            {"id": "unknown", "season": "Otoño", "dish_type": "Carnes"},
            {"season": "Otoño", "dish_type": "Carnes"},
            {"id": "r4", "season": "Invierno", "dish_type": "Carnes", "confidence": 1.7}
        ]"#;
        let recipes = [
            recipe("r1", "Gazpacho"),
            recipe("r2", "Crema"),
            recipe("r3", "Guiso"),
            recipe("r4", "Cocido"),
        ];
        let results = parse_reply(reply, &recipes);
        let ids: Vec<_> = results.iter().map(|c| c.recipe_id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r4"]);
        assert!((results[0].confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
        assert!((results[1].confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_reply_is_empty() {
        assert!(parse_reply("Sorry, I cannot help", &[recipe("r1", "Gazpacho")]).is_empty());
        assert!(parse_reply(r#"{"id": "r1"}"#, &[recipe("r1", "Gazpacho")]).is_empty());
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let llm = ScriptedLlm::new(vec![]);
        let recipes: Vec<_> = (0..21).map(|i| recipe(&format!("r{i}"), "x")).collect();
        let err = Classifier::new(&llm).classify_batch(&recipes).await.unwrap_err();
        assert!(matches!(err, CookidoError::Validation { .. }));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn classify_all_batches_in_order_and_skips_failures() {
        let recipes: Vec<_> = (0..45).map(|i| recipe(&format!("r{i}"), "Receta")).collect();
        let llm = ScriptedLlm::new(vec![
            Ok(r#"[{"id": "r0", "season": "Verano", "dish_type": "Sopas"}]"#.into()),
            Err(CookidoError::Network("timeout".into())),
            Ok(r#"[{"id": "r44", "season": "Invierno", "dish_type": "Carnes"}]"#.into()),
        ]);

        let mut callbacks = Vec::new();
        let all = Classifier::new(&llm)
            .classify_all(&recipes, |batch| {
                callbacks.push(batch.len());
                Ok(())
            })
            .await
            .unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("- r0:") && prompts[0].contains("- r19:"));
        assert!(!prompts[0].contains("- r20:"));
        assert!(prompts[1].contains("- r20:") && prompts[1].contains("- r39:"));
        assert!(prompts[2].contains("- r40:") && prompts[2].contains("- r44:"));

        assert_eq!(callbacks, vec![1, 1]);
        let ids: Vec<_> = all.iter().map(|c| c.recipe_id.as_str()).collect();
        assert_eq!(ids, vec!["r0", "r44"]);
    }

    #[tokio::test]
    async fn callback_error_aborts() {
        let recipes = vec![recipe("r1", "Gazpacho")];
        let llm = ScriptedLlm::new(vec![Ok(
            r#"[{"id": "r1", "season": "Verano", "dish_type": "Sopas"}]"#.into(),
        )]);
        let result = Classifier::new(&llm)
            .classify_all(&recipes, |_| Err(CookidoError::Storage("disk full".into())))
            .await;
        assert!(matches!(result, Err(CookidoError::Storage(_))));
    }
}
