mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use photobasket_core::domain::BasketState;
use photobasket_core::Library;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// photobasket: selection sets over a photo catalog
#[derive(Parser)]
#[command(name = "pbasket", version, about)]
struct Cli {
    /// Path to the catalog database
    #[arg(long, env = "PHOTOBASKET_CATALOG", default_value_t = default_catalog_path())]
    catalog: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, inspect and remove baskets
    Basket {
        #[command(subcommand)]
        action: BasketAction,
    },
    /// Add, remove or toggle images in a basket
    Select {
        /// add, remove or toggle
        state: BasketState,
        /// Basket ID
        basket: i64,
        /// Image IDs
        #[arg(required = true)]
        images: Vec<i64>,
    },
    /// Register and list images
    Images {
        #[command(subcommand)]
        action: ImagesAction,
    },
}

#[derive(Subcommand)]
enum BasketAction {
    /// Create a new basket
    Create {
        name: String,
        /// Owning user (omit for a shared basket)
        #[arg(long)]
        user: Option<i64>,
    },
    /// Delete a basket and all of its entries
    Rm { id: i64 },
    /// Show a basket and the images in it
    Show { id: i64 },
    /// List baskets visible to a user, or all baskets
    Ls {
        #[arg(long)]
        user: Option<i64>,
    },
    /// Show (creating if needed) a user's default basket
    Default { user: i64 },
    /// Rename a basket
    Rename { id: i64, name: String },
    /// Remove every image from a basket
    Clear { id: i64 },
}

#[derive(Subcommand)]
enum ImagesAction {
    /// Register an image file that lives in a folder
    Add {
        folder: PathBuf,
        file: String,
        /// File size in bytes
        #[arg(long, default_value_t = 0)]
        size: u64,
    },
    /// List all images with their thumbnail URLs
    Ls,
}

fn default_catalog_path() -> String {
    dirs_path().to_string_lossy().to_string()
}

fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".photobasket")
        .join("catalog.db")
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("PHOTOBASKET_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let catalog_path = PathBuf::from(&cli.catalog);
    debug!(catalog = %catalog_path.display(), "opening library");
    let mut library = Library::open(&catalog_path)?;

    match cli.command {
        Commands::Basket { action } => match action {
            BasketAction::Create { name, user } => commands::basket::create(&library, &name, user)?,
            BasketAction::Rm { id } => commands::basket::rm(&mut library, id)?,
            BasketAction::Show { id } => commands::basket::show(&library, id)?,
            BasketAction::Ls { user } => commands::basket::ls(&library, user)?,
            BasketAction::Default { user } => commands::basket::default(&library, user)?,
            BasketAction::Rename { id, name } => commands::basket::rename(&library, id, &name)?,
            BasketAction::Clear { id } => commands::basket::clear(&mut library, id)?,
        },
        Commands::Select {
            state,
            basket,
            images,
        } => commands::select::run(&mut library, basket, state, &images)?,
        Commands::Images { action } => match action {
            ImagesAction::Add { folder, file, size } => {
                commands::images::add(&library, &folder, &file, size)?
            }
            ImagesAction::Ls => commands::images::ls(&library)?,
        },
    }

    Ok(())
}
