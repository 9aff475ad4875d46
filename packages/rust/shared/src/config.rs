//! Application configuration for Cookido Agent.
//!
//! User config lives at `~/.cookido/cookido.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults. Secrets are only ever read from the
//! environment; the config file names the variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CookidoError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "cookido.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".cookido";

/// Environment variable consulted when `--region` is not given.
pub const REGION_ENV: &str = "COOKIDOO_REGION";

// ---------------------------------------------------------------------------
// Config structs (matching cookido.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Cookidoo account settings.
    #[serde(default)]
    pub cookidoo: CookidooConfig,

    /// Gemini classifier settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Resume state file locations.
    #[serde(default)]
    pub state: StateConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Region code used when neither `--region` nor `COOKIDOO_REGION` is set.
    #[serde(default = "default_region")]
    pub region: String,

    /// Delay between consecutive Cookidoo calls.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            rate_limit_ms: default_rate_limit(),
        }
    }
}

fn default_region() -> String {
    "es".into()
}
fn default_rate_limit() -> u64 {
    500
}

/// `[cookidoo]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookidooConfig {
    /// Name of the env var holding the account email.
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Name of the env var holding the account password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// OAuth client id sent with the password grant.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Override for the API host (defaults to the regional mobile API).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl Default for CookidooConfig {
    fn default() -> Self {
        Self {
            username_env: default_username_env(),
            password_env: default_password_env(),
            client_id: default_client_id(),
            api_endpoint: None,
        }
    }
}

fn default_username_env() -> String {
    "COOKIDOO_USERNAME".into()
}
fn default_password_env() -> String {
    "COOKIDOO_PASSWORD".into()
}
fn default_client_id() -> String {
    "kupferwerk-client-nwot".into()
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for classification.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_model() -> String {
    "gemini-3-pro-preview".into()
}

/// `[state]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_import_state")]
    pub import_file: String,

    #[serde(default = "default_organize_state")]
    pub organize_file: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            import_file: default_import_state(),
            organize_file: default_organize_state(),
        }
    }
}

fn default_import_state() -> String {
    ".cookidoo-import-state.json".into()
}
fn default_organize_state() -> String {
    ".cookidoo-organize-state.json".into()
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// Localization settings for one Cookidoo market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub code: &'static str,
    pub country_code: &'static str,
    pub language: &'static str,
    pub url: &'static str,
}

/// Every supported market.
pub const REGIONS: [Region; 6] = [
    Region {
        code: "es",
        country_code: "es",
        language: "es-ES",
        url: "https://cookidoo.es/foundation/es-ES",
    },
    Region {
        code: "de",
        country_code: "de",
        language: "de-DE",
        url: "https://cookidoo.de/foundation/de-DE",
    },
    Region {
        code: "fr",
        country_code: "fr",
        language: "fr-FR",
        url: "https://cookidoo.fr/foundation/fr-FR",
    },
    Region {
        code: "it",
        country_code: "it",
        language: "it-IT",
        url: "https://cookidoo.it/foundation/it-IT",
    },
    Region {
        code: "uk",
        country_code: "uk",
        language: "en-GB",
        url: "https://cookidoo.co.uk/foundation/en-GB",
    },
    Region {
        code: "us",
        country_code: "us",
        language: "en-US",
        url: "https://cookidoo.com/foundation/en-US",
    },
];

impl Region {
    /// Look up a region by code, listing the available codes on failure.
    pub fn lookup(code: &str) -> Result<Region> {
        REGIONS
            .iter()
            .find(|r| r.code == code)
            .copied()
            .ok_or_else(|| {
                let available: Vec<&str> = REGIONS.iter().map(|r| r.code).collect();
                CookidoError::config(format!(
                    "unknown region '{code}'. Available: {}",
                    available.join(", ")
                ))
            })
    }

    /// Regional mobile API host.
    pub fn api_endpoint(&self) -> String {
        format!("https://{}.tmmobile.vorwerk-digital.com", self.country_code)
    }
}

/// Resolve the region code: CLI flag, then `COOKIDOO_REGION`, then config.
pub fn resolve_region(flag: Option<&str>, config: &AppConfig) -> Result<Region> {
    let code = match flag {
        Some(code) => code.to_string(),
        None => std::env::var(REGION_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| config.defaults.region.clone()),
    };
    Region::lookup(&code)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Everything needed to talk to the Cookidoo API for one run.
#[derive(Clone)]
pub struct CookidooSettings {
    pub email: String,
    pub password: String,
    pub region: Region,
    pub client_id: String,
    pub api_endpoint: Url,
}

impl std::fmt::Debug for CookidooSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookidooSettings")
            .field("email", &self.email)
            .field("region", &self.region.code)
            .field("api_endpoint", &self.api_endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// Read the named environment variables, reporting every missing one at once.
pub fn require_env(names: &[&str]) -> Result<Vec<String>> {
    let mut values = Vec::with_capacity(names.len());
    let mut missing = Vec::new();

    for name in names {
        match std::env::var(name) {
            Ok(val) if !val.is_empty() => values.push(val),
            _ => missing.push(*name),
        }
    }

    if missing.is_empty() {
        Ok(values)
    } else {
        Err(CookidoError::config(format!(
            "missing environment variables: {}",
            missing.join(", ")
        )))
    }
}

impl CookidooSettings {
    /// Build settings from the environment and config for `region`.
    pub fn from_env(config: &AppConfig, region: Region) -> Result<Self> {
        let values = require_env(&[
            config.cookidoo.username_env.as_str(),
            config.cookidoo.password_env.as_str(),
        ])?;
        let [email, password]: [String; 2] = values
            .try_into()
            .map_err(|_| CookidoError::config("credential lookup returned wrong arity"))?;
        Self::new(config, region, email, password)
    }

    pub fn new(config: &AppConfig, region: Region, email: String, password: String) -> Result<Self> {
        let raw = config
            .cookidoo
            .api_endpoint
            .clone()
            .unwrap_or_else(|| region.api_endpoint());
        let api_endpoint = Url::parse(&raw)
            .map_err(|e| CookidoError::config(format!("invalid api endpoint '{raw}': {e}")))?;

        Ok(Self {
            email,
            password,
            region,
            client_id: config.cookidoo.client_id.clone(),
            api_endpoint,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.cookido/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CookidoError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.cookido/cookido.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CookidoError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CookidoError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CookidoError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CookidoError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CookidoError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the Gemini API key from the configured env var.
pub fn gemini_api_key(config: &AppConfig) -> Result<String> {
    let var_name = config.gemini.api_key_env.as_str();
    let mut values = require_env(&[var_name])?;
    Ok(values.remove(0))
}
