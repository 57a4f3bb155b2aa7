//! Seed the product catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - title: Pineapple
//!     code: PA-1
//!     price: "3.99"
//!     stock: 20
//!     category: fruit
//! ```
//!
//! Products whose code already exists are skipped, so a seed file can be
//! applied more than once.

use std::path::Path;

use cartwire_core::NewProduct;
use cartwire_storefront::store::{ProductStore, StoreError};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::{CliError, DataPaths};

/// Top-level shape of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<NewProduct>,
}

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<(String, String)>,
}

/// Parse a seed file.
///
/// # Errors
///
/// Returns [`CliError::Read`] or [`CliError::Yaml`].
pub async fn load_file(path: &Path) -> Result<SeedFile, CliError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_yaml::from_str(&content).map_err(|source| CliError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Create every product in `file`, skipping codes that already exist.
///
/// Validation failures are collected per product; a storage failure aborts
/// the run.
///
/// # Errors
///
/// Returns the first storage error.
pub async fn seed_products(store: &ProductStore, file: SeedFile) -> Result<SeedResult, CliError> {
    let mut result = SeedResult::default();

    for input in file.products {
        let code = input.code.clone();
        match store.create_product(input).await {
            Ok(product) => {
                info!(product_id = %product.id, code = %product.code, "Product inserted");
                result.inserted += 1;
            }
            Err(StoreError::DuplicateCode(_)) => result.skipped += 1,
            Err(e) if e.is_validation() => result.errors.push((code, e.to_string())),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(result)
}

/// `cw-cli products seed` entry point.
///
/// # Errors
///
/// Returns an error if the seed file is invalid or the catalog cannot be
/// loaded or written.
pub async fn products(paths: &DataPaths, file_path: &Path) -> Result<(), CliError> {
    info!(path = %file_path.display(), "Loading products from file");
    let file = load_file(file_path).await?;
    info!(products = file.products.len(), "Parsed seed file");

    let (_, store) = paths.open().await?;
    let result = seed_products(&store, file).await?;

    info!("Seeding complete!");
    info!("  Products inserted: {}", result.inserted);
    info!("  Products skipped (code already exists): {}", result.skipped);

    if !result.errors.is_empty() {
        warn!("  Errors: {}", result.errors.len());
        for (code, err) in &result.errors {
            error!("    - {code}: {err}");
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const SEED: &str = r#"
products:
  - title: Pineapple
    code: PA-1
    price: "3.99"
    stock: 20
    category: fruit
  - title: Mango
    code: MG-1
    price: 2.5
  - title: ""
    code: BAD
    price: "1.00"
"#;

    #[tokio::test]
    async fn test_seed_inserts_then_skips() {
        let dir = TempDir::new().unwrap();
        let seed_path = dir.path().join("seed.yaml");
        std::fs::write(&seed_path, SEED).unwrap();
        let store = ProductStore::new(dir.path().join("products.json"));

        let first = seed_products(&store, load_file(&seed_path).await.unwrap())
            .await
            .unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.skipped, 0);
        assert_eq!(first.errors.len(), 1);
        assert_eq!(first.errors[0].0, "BAD");

        let second = seed_products(&store, load_file(&seed_path).await.unwrap())
            .await
            .unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);

        let mango = store.get_product("p2").await.unwrap();
        assert_eq!(mango.price, rust_decimal::Decimal::new(25, 1));
        assert!(mango.status);
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_reported() {
        let dir = TempDir::new().unwrap();
        let seed_path = dir.path().join("seed.yaml");
        std::fs::write(&seed_path, "products: nope").unwrap();

        let err = load_file(&seed_path).await.unwrap_err();
        assert!(matches!(err, CliError::Yaml { .. }));
    }
}
