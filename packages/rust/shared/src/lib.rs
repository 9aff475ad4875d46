//! Shared types, error model, and configuration for Cookido Agent.
//!
//! This crate is the foundation depended on by all other Cookido crates.
//! It provides:
//! - [`CookidoError`], the unified error type
//! - The categorization scheme ([`Season`], [`DishType`], [`DishTypeEn`]) and
//!   collection naming
//! - Domain types ([`RecipeDetails`], [`RecipeClassification`], [`ExportFile`])
//! - Configuration ([`AppConfig`], [`Region`], credential lookup)

pub mod config;
pub mod error;
pub mod export;
pub mod taxonomy;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CookidooConfig, CookidooSettings, DefaultsConfig, GeminiConfig, REGIONS, Region,
    StateConfig, config_dir, config_file_path, gemini_api_key, init_config, load_config,
    load_config_from, require_env, resolve_region,
};
pub use error::{CookidoError, Result};
pub use export::{ExportBuilder, ExportFile, MANAGED_SUGGESTIONS_KEY};
pub use taxonomy::{
    DishType, DishTypeEn, LegacyName, Season, collection_name, flat_collection_name,
    parse_legacy_name,
};
pub use types::{DEFAULT_CONFIDENCE, RecipeClassification, RecipeDetails};
