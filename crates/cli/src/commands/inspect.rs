//! Data file health check.

use std::collections::BTreeSet;

use cartwire_core::{Cart, ProductId};
use tracing::{info, warn};

use super::{CliError, DataPaths};

/// Summary of both data files.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub products: usize,
    pub carts: usize,
    pub items: u64,
    /// Product ids referenced by carts but missing from the catalog.
    pub dangling: BTreeSet<ProductId>,
}

impl Report {
    /// Build a report from loaded carts and the set of known product ids.
    #[must_use]
    pub fn build(carts: &[Cart], known: &BTreeSet<ProductId>) -> Self {
        let dangling = carts
            .iter()
            .flat_map(|c| c.products.iter())
            .map(|line| &line.product_id)
            .filter(|id| !known.contains(*id))
            .cloned()
            .collect();

        Self {
            products: known.len(),
            carts: carts.len(),
            items: carts.iter().map(Cart::item_count).sum(),
            dangling,
        }
    }
}

/// Load both files and log a summary.
///
/// # Errors
///
/// Returns an error if either file fails to load.
pub async fn run(paths: &DataPaths) -> Result<(), CliError> {
    let (carts, products) = paths.open().await?;
    let known: BTreeSet<ProductId> = products
        .list_products()
        .await
        .into_iter()
        .map(|p| p.id)
        .collect();
    let report = Report::build(&carts.list_carts().await, &known);

    info!(path = %paths.products.display(), count = report.products, "Products");
    info!(path = %paths.carts.display(), count = report.carts, items = report.items, "Carts");
    for id in &report.dangling {
        warn!(product_id = %id, "Cart references unknown product");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use cartwire_core::CartId;

    use super::*;

    #[test]
    fn test_report_counts_items_and_dangling_refs() {
        let mut cart = Cart::new(CartId::new("c1"));
        cart.add_product(ProductId::new("p1"), 2).ok();
        cart.add_product(ProductId::new("p9"), 1).ok();
        let known: BTreeSet<_> = [ProductId::new("p1")].into_iter().collect();

        let report = Report::build(&[cart], &known);
        assert_eq!(report.products, 1);
        assert_eq!(report.carts, 1);
        assert_eq!(report.items, 3);
        assert_eq!(report.dangling.into_iter().collect::<Vec<_>>(), [ProductId::new("p9")]);
    }
}
