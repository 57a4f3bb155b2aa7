//! Cartwire CLI - data file tools.
//!
//! # Usage
//!
//! ```bash
//! # Check both data files and report dangling product references
//! cw-cli inspect
//!
//! # Create an empty cart
//! cw-cli carts create
//!
//! # Show a cart with its product details
//! cw-cli carts show c1
//!
//! # Seed the product catalog
//! cw-cli products seed --file seed/products.yaml
//! ```
//!
//! File locations come from `CARTWIRE_CARTS_PATH` / `CARTWIRE_PRODUCTS_PATH`
//! (or `.env`) unless `--carts` / `--products` is given. Commands that write
//! should be run while the storefront is stopped; the server does not reload
//! files it already holds in memory.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::{CliError, DataPaths};

#[derive(Parser)]
#[command(name = "cw-cli")]
#[command(author, version, about = "Cartwire CLI tools")]
struct Cli {
    /// Cart file (overrides `CARTWIRE_CARTS_PATH`)
    #[arg(long, global = true)]
    carts: Option<PathBuf>,

    /// Product file (overrides `CARTWIRE_PRODUCTS_PATH`)
    #[arg(long, global = true)]
    products: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load both data files and report what they contain
    Inspect,
    /// Manage carts
    Carts {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Create a new empty cart
    Create,
    /// Show one cart
    Show {
        /// Cart id (e.g. c1)
        id: String,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Seed products from a YAML file
    Seed {
        /// Path to the YAML seed file
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let paths = DataPaths::resolve(cli.carts, cli.products)?;

    match cli.command {
        Commands::Inspect => commands::inspect::run(&paths).await?,
        Commands::Carts { action } => match action {
            CartAction::Create => commands::carts::create(&paths).await?,
            CartAction::Show { id } => commands::carts::show(&paths, &id).await?,
        },
        Commands::Products { action } => match action {
            ProductAction::Seed { file } => commands::seed::products(&paths, &file).await?,
        },
    }
    Ok(())
}
