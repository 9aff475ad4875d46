//! In-memory gateway and scripted LLM for pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use cookido_gateway::{
    Chapter, IngredientEntry, PageCount, RecipeDetail, RecipeGateway, RecipeRef, RemoteCollection,
};
use cookido_shared::{CookidoError, Result};

use crate::llm::LlmClient;

#[derive(Debug, Clone)]
struct FakeCollection {
    id: String,
    name: Option<String>,
    members: Vec<String>,
}

impl FakeCollection {
    fn to_remote(&self) -> RemoteCollection {
        RemoteCollection {
            id: Some(self.id.clone()),
            name: None,
            title: self.name.clone(),
            chapters: vec![Chapter {
                title: None,
                recipes: self
                    .members
                    .iter()
                    .map(|id| RecipeRef {
                        id: Some(id.clone()),
                        title: None,
                    })
                    .collect(),
            }],
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    custom: Vec<FakeCollection>,
    managed: Vec<FakeCollection>,
    recipes: HashMap<String, RecipeDetail>,
    page_size: usize,
    next_id: usize,
    omit_created_ids: bool,
    fail_mutations: bool,
    fail_add_call: Option<usize>,
    logins: usize,
    creates: usize,
    detail_calls: Vec<String>,
    add_calls: Vec<(String, Vec<String>)>,
    remove_calls: Vec<(String, String)>,
    delete_calls: Vec<String>,
}

/// Recipe platform held in memory. Mutations are applied to the stored
/// collections so a later listing reflects them.
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                page_size: 20,
                ..Default::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().expect("fake gateway lock"))
    }

    pub fn seed_collection(&self, id: &str, name: &str, members: &[&str]) {
        self.with(|s| {
            s.custom.push(FakeCollection {
                id: id.into(),
                name: Some(name.into()),
                members: members.iter().map(|m| m.to_string()).collect(),
            })
        });
    }

    pub fn seed_nameless_collection(&self, id: &str) {
        self.with(|s| {
            s.custom.push(FakeCollection {
                id: id.into(),
                name: None,
                members: Vec::new(),
            })
        });
    }

    pub fn seed_managed(&self, id: &str, name: &str, members: &[&str]) {
        self.with(|s| {
            s.managed.push(FakeCollection {
                id: id.into(),
                name: Some(name.into()),
                members: members.iter().map(|m| m.to_string()).collect(),
            })
        });
    }

    /// Store a recipe whose detail lists `ingredients` as plain text entries.
    pub fn seed_recipe(&self, id: &str, name: &str, ingredients: &[&str]) {
        let detail = RecipeDetail {
            id: Some(id.into()),
            title: Some(name.into()),
            ingredients: ingredients
                .iter()
                .map(|text| IngredientEntry::Text {
                    text: text.to_string(),
                })
                .collect(),
            ..Default::default()
        };
        self.with(|s| s.recipes.insert(id.into(), detail));
    }

    pub fn set_page_size(&self, size: usize) {
        self.with(|s| s.page_size = size.max(1));
    }

    pub fn omit_created_ids(&self) {
        self.with(|s| s.omit_created_ids = true);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.with(|s| s.fail_mutations = fail);
    }

    /// Make the `n`th (1-based) add call fail.
    pub fn fail_add_call(&self, n: usize) {
        self.with(|s| s.fail_add_call = Some(n));
    }

    pub fn logins(&self) -> usize {
        self.with(|s| s.logins)
    }

    pub fn create_calls(&self) -> usize {
        self.with(|s| s.creates)
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.with(|s| s.detail_calls.clone())
    }

    pub fn add_calls(&self) -> Vec<(String, Vec<String>)> {
        self.with(|s| s.add_calls.clone())
    }

    pub fn remove_calls(&self) -> Vec<(String, String)> {
        self.with(|s| s.remove_calls.clone())
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.with(|s| s.delete_calls.clone())
    }

    /// Current custom collections as name → members.
    pub fn custom_collections(&self) -> BTreeMap<String, Vec<String>> {
        self.with(|s| {
            s.custom
                .iter()
                .filter_map(|c| Some((c.name.clone()?, c.members.clone())))
                .collect()
        })
    }

    fn page_count(list: &[FakeCollection], page_size: usize) -> PageCount {
        PageCount {
            count: list.len() as u32,
            total_pages: list.len().div_ceil(page_size).max(1) as u32,
        }
    }

    fn page(list: &[FakeCollection], page_size: usize, page: u32) -> Vec<RemoteCollection> {
        list.iter()
            .skip(page as usize * page_size)
            .take(page_size)
            .map(FakeCollection::to_remote)
            .collect()
    }
}

fn rejected() -> CookidoError {
    CookidoError::Api {
        status: 500,
        message: "simulated failure".into(),
    }
}

#[async_trait]
impl RecipeGateway for FakeGateway {
    async fn login(&self) -> Result<()> {
        self.with(|s| s.logins += 1);
        Ok(())
    }

    async fn count_managed_collections(&self) -> Result<PageCount> {
        Ok(self.with(|s| Self::page_count(&s.managed, s.page_size)))
    }

    async fn get_managed_collections(&self, page: u32) -> Result<Vec<RemoteCollection>> {
        Ok(self.with(|s| Self::page(&s.managed, s.page_size, page)))
    }

    async fn count_custom_collections(&self) -> Result<PageCount> {
        Ok(self.with(|s| Self::page_count(&s.custom, s.page_size)))
    }

    async fn get_custom_collections(&self, page: u32) -> Result<Vec<RemoteCollection>> {
        Ok(self.with(|s| Self::page(&s.custom, s.page_size, page)))
    }

    async fn add_custom_collection(&self, name: &str) -> Result<RemoteCollection> {
        self.with(|s| {
            if s.fail_mutations {
                return Err(rejected());
            }
            s.creates += 1;
            s.next_id += 1;
            let collection = FakeCollection {
                id: format!("new-{}", s.next_id),
                name: Some(name.into()),
                members: Vec::new(),
            };
            s.custom.push(collection.clone());
            let mut remote = collection.to_remote();
            if s.omit_created_ids {
                remote.id = None;
            }
            Ok(remote)
        })
    }

    async fn remove_custom_collection(&self, collection_id: &str) -> Result<()> {
        self.with(|s| {
            if s.fail_mutations {
                return Err(rejected());
            }
            s.delete_calls.push(collection_id.into());
            s.custom.retain(|c| c.id != collection_id);
            Ok(())
        })
    }

    async fn add_recipes_to_custom_collection(
        &self,
        collection_id: &str,
        recipe_ids: &[String],
    ) -> Result<()> {
        self.with(|s| {
            s.add_calls.push((collection_id.into(), recipe_ids.to_vec()));
            if s.fail_mutations || s.fail_add_call == Some(s.add_calls.len()) {
                return Err(rejected());
            }
            let collection = s
                .custom
                .iter_mut()
                .find(|c| c.id == collection_id)
                .ok_or_else(rejected)?;
            let present: HashSet<String> = collection.members.iter().cloned().collect();
            collection
                .members
                .extend(recipe_ids.iter().filter(|id| !present.contains(*id)).cloned());
            Ok(())
        })
    }

    async fn remove_recipe_from_custom_collection(
        &self,
        collection_id: &str,
        recipe_id: &str,
    ) -> Result<()> {
        self.with(|s| {
            if s.fail_mutations {
                return Err(rejected());
            }
            s.remove_calls.push((collection_id.into(), recipe_id.into()));
            if let Some(c) = s.custom.iter_mut().find(|c| c.id == collection_id) {
                c.members.retain(|m| m != recipe_id);
            }
            Ok(())
        })
    }

    async fn get_recipe_details(&self, recipe_id: &str) -> Result<RecipeDetail> {
        self.with(|s| {
            s.detail_calls.push(recipe_id.into());
            s.recipes.get(recipe_id).cloned().ok_or_else(|| CookidoError::Api {
                status: 404,
                message: format!("recipe {recipe_id} not found"),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// FakeLlm
// ---------------------------------------------------------------------------

/// Classifies the recipes named in a prompt from a fixed answer table.
pub struct FakeLlm {
    answers: HashMap<String, (String, String, f64)>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    /// `answers`: `(recipe_id, season, dish_type, confidence)` in Spanish labels.
    pub fn new(answers: &[(&str, &str, &str, f64)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(id, season, dish, confidence)| {
                    (
                        id.to_string(),
                        (season.to_string(), dish.to_string(), *confidence),
                    )
                })
                .collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("fake llm lock").len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("fake llm lock").clone()
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("fake llm lock")
            .push(prompt.to_string());

        let items: Vec<serde_json::Value> = prompt
            .lines()
            .filter_map(|line| line.strip_prefix("- ")?.split_once(':'))
            .filter_map(|(id, _)| {
                let (season, dish, confidence) = self.answers.get(id)?;
                Some(serde_json::json!({
                    "id": id,
                    "season": season,
                    "dish_type": dish,
                    "confidence": confidence
                }))
            })
            .collect();

        Ok(format!(
            "```json\n{}\n```",
            serde_json::Value::Array(items)
        ))
    }
}
