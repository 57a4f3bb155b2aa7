//! Cart management commands.

use tracing::info;

use super::{CliError, DataPaths};

/// Create an empty cart and report its id.
///
/// # Errors
///
/// Returns an error if the data files cannot be loaded or written.
pub async fn create(paths: &DataPaths) -> Result<(), CliError> {
    let (carts, _) = paths.open().await?;
    let cart = carts.create_cart().await?;
    info!(cart_id = %cart.id, path = %carts.path().display(), "Cart created");
    Ok(())
}

/// Print one cart as JSON.
///
/// # Errors
///
/// Returns [`CliError::NotFound`] if no cart has this id.
pub async fn show(paths: &DataPaths, cart_id: &str) -> Result<(), CliError> {
    let (carts, products) = paths.open().await?;
    let cart = carts
        .get_cart(cart_id)
        .await
        .ok_or_else(|| CliError::NotFound(format!("cart {}", cart_id.trim())))?;

    info!("{}", serde_json::to_string_pretty(&cart)?);
    for line in &cart.products {
        match products.get_product(&line.product_id).await {
            Some(product) => info!(
                "  {} x {} ({}) @ {}",
                line.quantity, product.title, product.code, product.price
            ),
            None => info!("  {} x {} (unknown product)", line.quantity, line.product_id),
        }
    }
    Ok(())
}
