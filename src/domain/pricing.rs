use std::collections::HashMap;

use uuid::Uuid;

use super::cart::CartLine;

/// Catalog fields a cart line is priced and displayed with.
/// `price` is in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEntry {
    Resolved { line: CartLine, product: CatalogItem },
    /// The line points at a product that no longer exists.
    Orphan(CartLine),
}

impl CartEntry {
    pub fn product_id(&self) -> Uuid {
        match self {
            CartEntry::Resolved { line, .. } | CartEntry::Orphan(line) => line.product_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub quantity: i32,
    pub subtotal: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartSummary {
    pub total_items: i64,
    pub total_cost: i64,
    pub lines: Vec<PricedLine>,
    pub orphans: Vec<CartLine>,
}

/// Joins lines against a catalog snapshot, keeping line order.
pub fn resolve_lines(lines: &[CartLine], catalog: &HashMap<Uuid, CatalogItem>) -> Vec<CartEntry> {
    lines
        .iter()
        .map(|line| match catalog.get(&line.product_id) {
            Some(product) => CartEntry::Resolved {
                line: *line,
                product: product.clone(),
            },
            None => CartEntry::Orphan(*line),
        })
        .collect()
}

pub fn line_subtotal(quantity: i32, price: i64) -> i64 {
    price.saturating_mul(i64::from(quantity))
}

/// Totals cover resolved lines only; orphans are reported separately.
pub fn price_entries(entries: Vec<CartEntry>) -> CartSummary {
    let mut summary = CartSummary::default();
    for entry in entries {
        match entry {
            CartEntry::Resolved { line, product } => {
                let subtotal = line_subtotal(line.quantity, product.price);
                summary.total_items = summary.total_items.saturating_add(i64::from(line.quantity));
                summary.total_cost = summary.total_cost.saturating_add(subtotal);
                summary.lines.push(PricedLine {
                    product_id: product.id,
                    name: product.name,
                    image: product.image,
                    price: product.price,
                    quantity: line.quantity,
                    subtotal,
                });
            }
            CartEntry::Orphan(line) => summary.orphans.push(line),
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64) -> CatalogItem {
        CatalogItem {
            id: Uuid::new_v4(),
            name: "item".into(),
            image: "https://img.example/item.png".into(),
            price,
            stock: 10,
        }
    }

    fn line(product_id: Uuid, quantity: i32) -> CartLine {
        CartLine {
            product_id,
            quantity,
        }
    }

    #[test]
    fn totals_sum_resolved_lines() {
        let a = item(100);
        let b = item(50);
        let lines = [line(a.id, 2), line(b.id, 1)];
        let catalog = HashMap::from([(a.id, a.clone()), (b.id, b.clone())]);

        let summary = price_entries(resolve_lines(&lines, &catalog));
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_cost, 250);
        assert_eq!(summary.lines[0].subtotal, 200);
        assert_eq!(summary.lines[1].subtotal, 50);
        assert!(summary.orphans.is_empty());
    }

    #[test]
    fn deleted_product_becomes_orphan_and_is_not_counted() {
        let a = item(100);
        let gone = Uuid::new_v4();
        let lines = [line(a.id, 1), line(gone, 4)];
        let catalog = HashMap::from([(a.id, a.clone())]);

        let entries = resolve_lines(&lines, &catalog);
        assert!(matches!(entries[1], CartEntry::Orphan(l) if l.product_id == gone));
        assert_eq!(entries[1].product_id(), gone);

        let summary = price_entries(entries);
        assert_eq!(summary.total_items, 1);
        assert_eq!(summary.total_cost, 100);
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.orphans, vec![line(gone, 4)]);
    }

    #[test]
    fn empty_cart_prices_to_zero() {
        let summary = price_entries(Vec::new());
        assert_eq!(summary, CartSummary::default());
    }

    #[test]
    fn subtotal_saturates_instead_of_overflowing() {
        assert_eq!(line_subtotal(i32::MAX, i64::MAX), i64::MAX);
    }
}
