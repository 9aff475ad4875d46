//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use cookido_core::debug::inspect_collections;
use cookido_core::exporter::{export_file_name, export_recipes};
use cookido_core::importer::{ImportConfig, run_import};
use cookido_core::llm::GeminiClient;
use cookido_core::organizer::{OrganizeConfig, run_organize};
use cookido_core::progress::ProgressReporter;
use cookido_gateway::CookidooClient;
use cookido_shared::{
    AppConfig, CookidooSettings, Region, init_config, load_config, require_env, resolve_region,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Cookido Agent: organize saved Cookidoo recipes into seasonal collections.
#[derive(Parser)]
#[command(
    name = "cookido",
    version,
    about = "Export, classify, and reorganize Cookidoo recipe collections.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Export every saved recipe id to a timestamped JSON file.
    Export {
        /// Cookidoo region (es, de, fr, it, uk, us). Overrides COOKIDOO_REGION.
        #[arg(long)]
        region: Option<String>,

        /// Output file (defaults to cookidoo-export-<timestamp>.json).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Classify exported recipes and file them into Season > Dish Type collections.
    Import {
        /// Export file written by `cookido export`.
        export_file: PathBuf,

        /// Classify but do not modify Cookidoo.
        #[arg(long)]
        dry_run: bool,

        /// Cookidoo region (es, de, fr, it, uk, us). Overrides COOKIDOO_REGION.
        #[arg(long)]
        region: Option<String>,
    },

    /// Flatten Season > Dish Type collections into English ones and drop
    /// managed suggestions from custom collections.
    Organize {
        /// Export file holding the managed suggestions list.
        export_file: PathBuf,

        /// Preview changes without modifying Cookidoo.
        #[arg(long)]
        dry_run: bool,

        /// Cookidoo region (es, de, fr, it, uk, us). Overrides COOKIDOO_REGION.
        #[arg(long)]
        region: Option<String>,
    },

    /// List custom collections and check them against the legacy name pattern.
    DebugCollections {
        /// Cookidoo region (es, de, fr, it, uk, us). Overrides COOKIDOO_REGION.
        #[arg(long)]
        region: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "cookido=info",
        1 => "cookido=debug",
        _ => "cookido=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Export { region, out } => cmd_export(region.as_deref(), out).await,
        Command::Import {
            export_file,
            dry_run,
            region,
        } => cmd_import(&export_file, dry_run, region.as_deref()).await,
        Command::Organize {
            export_file,
            dry_run,
            region,
        } => cmd_organize(&export_file, dry_run, region.as_deref()).await,
        Command::DebugCollections { region } => cmd_debug_collections(region.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

/// Config plus the region resolved from flag, env, and config.
fn load_with_region(region: Option<&str>) -> Result<(AppConfig, Region)> {
    let config = load_config()?;
    let region = resolve_region(region, &config)?;
    Ok((config, region))
}

fn cookidoo_client(config: &AppConfig, region: Region) -> Result<CookidooClient> {
    let settings = CookidooSettings::from_env(config, region)?;
    info!(region = region.code, email = %settings.email, "using Cookidoo account");
    Ok(CookidooClient::new(settings)?)
}

fn ensure_export_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(eyre!("export file not found: {}", path.display()));
    }
    Ok(())
}

fn rate_limit(config: &AppConfig) -> Duration {
    Duration::from_millis(config.defaults.rate_limit_ms)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_export(region: Option<&str>, out: Option<PathBuf>) -> Result<()> {
    let (config, region) = load_with_region(region)?;
    let client = cookidoo_client(&config, region)?;

    let reporter = CliProgress::new();
    let export = export_recipes(&client, region.language, &reporter).await;
    reporter.finish();
    let export = export?;

    let path = out.unwrap_or_else(|| PathBuf::from(export_file_name(chrono::Local::now())));
    export.write(&path)?;

    println!(
        "Exported {} recipes to {}",
        export.all_recipes.len(),
        path.display()
    );
    Ok(())
}

async fn cmd_import(export_file: &Path, dry_run: bool, region: Option<&str>) -> Result<()> {
    let (config, region) = load_with_region(region)?;

    // Report every missing variable in one go.
    let values = require_env(&[
        config.cookidoo.username_env.as_str(),
        config.cookidoo.password_env.as_str(),
        config.gemini.api_key_env.as_str(),
    ])?;
    let [email, password, api_key]: [String; 3] = values
        .try_into()
        .map_err(|_| eyre!("credential lookup returned wrong arity"))?;
    ensure_export_exists(export_file)?;

    let client = CookidooClient::new(CookidooSettings::new(&config, region, email, password)?)?;
    let llm = GeminiClient::new(api_key, config.gemini.model.clone())?;

    let import_config = ImportConfig {
        export_file: export_file.to_path_buf(),
        state_file: PathBuf::from(&config.state.import_file),
        dry_run,
        rate_limit: rate_limit(&config),
    };

    let reporter = CliProgress::new();
    let result = run_import(&import_config, &client, &llm, &reporter).await;
    reporter.finish();
    let result = result?;

    if result.total_recipes == 0 {
        println!("No recipes to import");
        return Ok(());
    }

    println!();
    println!("  Recipes in export: {}", result.total_recipes);
    println!("  Fetched:           {}", result.fetched);
    println!("  Classified:        {}", result.classified);
    match &result.dry_run {
        Some(summary) => {
            println!();
            println!("{summary}");
        }
        None => {
            println!("  Created/updated {} collections", result.collections_updated);
            println!("  Assigned {} recipes total", result.assigned);
        }
    }
    println!();
    println!(
        "Import complete! ({:.1}s)",
        result.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn cmd_organize(export_file: &Path, dry_run: bool, region: Option<&str>) -> Result<()> {
    let (config, region) = load_with_region(region)?;
    let client = cookidoo_client(&config, region)?;
    ensure_export_exists(export_file)?;

    let organize_config = OrganizeConfig {
        export_file: export_file.to_path_buf(),
        state_file: PathBuf::from(&config.state.organize_file),
        dry_run,
        rate_limit: rate_limit(&config),
    };

    let reporter = CliProgress::new();
    let result = run_organize(&organize_config, &client, &reporter).await;
    reporter.finish();
    let result = result?;

    println!();
    println!("{}", result.summary);
    println!();
    println!(
        "Organization complete! ({:.1}s)",
        result.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn cmd_debug_collections(region: Option<&str>) -> Result<()> {
    let (config, region) = load_with_region(region)?;
    let client = cookidoo_client(&config, region)?;

    let report = inspect_collections(&client).await?;
    println!("{report}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn step(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {label}"));
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
