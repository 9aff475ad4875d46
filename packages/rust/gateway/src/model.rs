//! Typed decoding of Cookidoo API payloads.
//!
//! Every field the pipelines read is optional or defaulted, so a payload with
//! a missing section decodes to an explicit absence instead of failing.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// A managed or custom collection as returned by the list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteCollection {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// A section of a collection holding recipe references.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipes: Vec<RecipeRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl RemoteCollection {
    /// `name`, falling back to `title`. Empty strings count as absent.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.title.as_deref().filter(|t| !t.is_empty()))
    }

    /// Flattened recipe ids across all chapters, in document order.
    pub fn recipe_ids(&self) -> Vec<String> {
        self.chapters
            .iter()
            .flat_map(|chapter| chapter.recipes.iter())
            .filter_map(|recipe| recipe.id.clone())
            .collect()
    }
}

/// Pagination summary from a count call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCount {
    pub count: u32,
    pub total_pages: u32,
}

/// One page of a collection listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ListPage {
    #[serde(default, alias = "customlists", alias = "managedlists")]
    pub lists: Vec<RemoteCollection>,
    #[serde(default)]
    pub page: Option<PageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_elements: Option<u32>,
}

impl ListPage {
    pub(crate) fn page_count(&self) -> PageCount {
        let info = self.page.as_ref();
        PageCount {
            count: info
                .and_then(|p| p.total_elements)
                .unwrap_or(self.lists.len() as u32),
            total_pages: info.and_then(|p| p.total_pages).unwrap_or(1),
        }
    }
}

/// Create responses either wrap the collection in `content` or return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreatedCollection {
    Wrapped { content: RemoteCollection },
    Bare(RemoteCollection),
}

impl CreatedCollection {
    pub(crate) fn into_inner(self) -> RemoteCollection {
        match self {
            Self::Wrapped { content } => content,
            Self::Bare(collection) => collection,
        }
    }
}

// ---------------------------------------------------------------------------
// Recipe detail
// ---------------------------------------------------------------------------

/// Recipe detail, reduced to what classification needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeDetail {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Flat ingredient list, when the recipe has one.
    #[serde(default)]
    pub ingredients: Vec<IngredientEntry>,
    /// Grouped ingredients (e.g. "For the dough", "For the filling").
    #[serde(default, rename = "recipeIngredientGroups")]
    pub ingredient_groups: Vec<IngredientEntry>,
}

impl RecipeDetail {
    /// `name`, falling back to `title`. Empty strings count as absent.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.title.as_deref().filter(|t| !t.is_empty()))
    }
}

/// Ingredient list entries come in several shapes depending on the recipe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IngredientEntry {
    /// `{"text": "200 g tomate, troceado"}`
    Text {
        #[serde(alias = "ingredientNotation")]
        text: String,
    },
    /// `{"name": "tomate"}`
    Named { name: String },
    /// `"200 g tomate, troceado"`
    Plain(String),
    /// `{"ingredients": [...]}`, a nested group.
    Group {
        #[serde(alias = "recipeIngredients")]
        ingredients: Vec<IngredientEntry>,
    },
    /// Anything else; ignored.
    Other(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_extracts_nested_recipe_ids() {
        let json = r#"{
            "id": "col-1",
            "title": "☀️ Verano > Pescados",
            "chapters": [
                {"title": "", "recipes": [{"id": "r1"}, {"title": "no id"}, {"id": "r2"}]},
                {"recipes": [{"id": "r3"}]}
            ]
        }"#;
        let collection: RemoteCollection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.display_name(), Some("☀️ Verano > Pescados"));
        assert_eq!(collection.recipe_ids(), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn collection_without_chapters_is_empty() {
        let collection: RemoteCollection =
            serde_json::from_str(r#"{"id": "c", "name": "Cenas"}"#).unwrap();
        assert!(collection.recipe_ids().is_empty());
        assert_eq!(collection.display_name(), Some("Cenas"));
    }

    #[test]
    fn list_page_defaults_to_one_page() {
        let page: ListPage = serde_json::from_str(r#"{"customlists": []}"#).unwrap();
        assert_eq!(page.page_count(), PageCount { count: 0, total_pages: 1 });

        let page: ListPage = serde_json::from_str(
            r#"{"managedlists": [{"id": "m1"}], "page": {"totalPages": 3, "totalElements": 25}}"#,
        )
        .unwrap();
        assert_eq!(page.lists.len(), 1);
        assert_eq!(page.page_count(), PageCount { count: 25, total_pages: 3 });
    }

    #[test]
    fn created_collection_accepts_both_shapes() {
        let wrapped: CreatedCollection =
            serde_json::from_str(r#"{"content": {"id": "c1", "title": "Seafood"}}"#).unwrap();
        assert_eq!(wrapped.into_inner().id.as_deref(), Some("c1"));

        let bare: CreatedCollection =
            serde_json::from_str(r#"{"id": "c2", "title": "Meats"}"#).unwrap();
        assert_eq!(bare.into_inner().id.as_deref(), Some("c2"));
    }

    #[test]
    fn ingredient_entries_decode_every_shape() {
        let json = r#"{
            "title": "Lentejas",
            "ingredients": [
                {"text": "200 g lentejas, remojadas"},
                {"name": "chorizo"},
                "1 cebolla, picada",
                {"ingredients": [{"text": "sal"}]},
                42
            ],
            "recipeIngredientGroups": [
                {"recipeIngredients": [{"ingredientNotation": "agua"}]}
            ]
        }"#;
        let detail: RecipeDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.display_name(), Some("Lentejas"));
        assert_eq!(detail.ingredients.len(), 5);
        assert!(matches!(&detail.ingredients[0], IngredientEntry::Text { text } if text.starts_with("200 g")));
        assert!(matches!(&detail.ingredients[1], IngredientEntry::Named { name } if name == "chorizo"));
        assert!(matches!(&detail.ingredients[2], IngredientEntry::Plain(_)));
        assert!(matches!(&detail.ingredients[3], IngredientEntry::Group { .. }));
        assert!(matches!(&detail.ingredients[4], IngredientEntry::Other(_)));
        match &detail.ingredient_groups[0] {
            IngredientEntry::Group { ingredients } => {
                assert_eq!(ingredients[0], IngredientEntry::Text { text: "agua".into() });
            }
            other => panic!("expected group, got {other:?}"),
        }
    }
}
