use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Product {0} already exists in cart")]
    DuplicateLine(Uuid),

    #[error("quantity must be between 1 and {max}, got {0}", max = i32::MAX)]
    InvalidQuantity(i64),
}

/// The single write a cart operation needs persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    Inserted(CartLine),
    Updated(CartLine),
    Removed(Uuid),
    Unchanged,
}

/// One buyer's cart. Lines are unique per product and always hold a
/// quantity of at least one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    owner: Uuid,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(owner: Uuid) -> Self {
        Self {
            owner,
            lines: Vec::new(),
        }
    }

    /// Rebuilds a cart from stored lines. Rows that violate the line
    /// invariants (non-positive quantity, repeated product) are skipped.
    pub fn from_lines(owner: Uuid, stored: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new(owner);
        for line in stored {
            if line.quantity >= 1 && cart.line(line.product_id).is_none() {
                cart.lines.push(line);
            }
        }
        cart
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Appends a new line. A product that is already in the cart is
    /// rejected rather than merged.
    pub fn add_line(&mut self, product_id: Uuid, quantity: i64) -> Result<LineChange, CartError> {
        let quantity = checked_quantity(quantity)?;
        if self.line(product_id).is_some() {
            return Err(CartError::DuplicateLine(product_id));
        }
        let line = CartLine {
            product_id,
            quantity,
        };
        self.lines.push(line);
        Ok(LineChange::Inserted(line))
    }

    pub fn remove_line(&mut self, product_id: Uuid) -> LineChange {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before {
            LineChange::Unchanged
        } else {
            LineChange::Removed(product_id)
        }
    }

    /// Upserts the line; a quantity of zero or less removes it instead.
    pub fn set_quantity(
        &mut self,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<LineChange, CartError> {
        if quantity <= 0 {
            return Ok(self.remove_line(product_id));
        }
        let quantity = checked_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            if line.quantity == quantity {
                return Ok(LineChange::Unchanged);
            }
            line.quantity = quantity;
            return Ok(LineChange::Updated(*line));
        }

        let line = CartLine {
            product_id,
            quantity,
        };
        self.lines.push(line);
        Ok(LineChange::Inserted(line))
    }
}

fn checked_quantity(quantity: i64) -> Result<i32, CartError> {
    if quantity < 1 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    i32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        Cart::new(Uuid::new_v4())
    }

    #[test]
    fn add_then_remove_leaves_no_line() {
        let mut cart = cart();
        let p = Uuid::new_v4();
        cart.add_line(p, 3).unwrap();
        assert_eq!(cart.remove_line(p), LineChange::Removed(p));
        assert!(cart.line(p).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn duplicate_add_is_rejected_and_keeps_quantity() {
        let mut cart = cart();
        let p = Uuid::new_v4();
        cart.add_line(p, 2).unwrap();
        assert_eq!(cart.add_line(p, 5), Err(CartError::DuplicateLine(p)));
        assert_eq!(cart.line(p).unwrap().quantity, 2);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn add_rejects_non_positive_and_oversized_quantities() {
        let mut cart = cart();
        let p = Uuid::new_v4();
        assert_eq!(cart.add_line(p, 0), Err(CartError::InvalidQuantity(0)));
        assert_eq!(cart.add_line(p, -4), Err(CartError::InvalidQuantity(-4)));
        let huge = i64::from(i32::MAX) + 1;
        assert_eq!(cart.add_line(p, huge), Err(CartError::InvalidQuantity(huge)));
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_zero_matches_remove() {
        let p = Uuid::new_v4();
        let mut by_remove = cart();
        by_remove.add_line(p, 4).unwrap();
        let mut by_zero = by_remove.clone();

        by_remove.remove_line(p);
        assert_eq!(by_zero.set_quantity(p, 0), Ok(LineChange::Removed(p)));
        assert_eq!(by_zero.lines(), by_remove.lines());

        // absent line stays absent
        assert_eq!(by_zero.set_quantity(p, -1), Ok(LineChange::Unchanged));
    }

    #[test]
    fn set_quantity_updates_or_inserts() {
        let mut cart = cart();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        cart.add_line(a, 1).unwrap();

        assert_eq!(
            cart.set_quantity(a, 7),
            Ok(LineChange::Updated(CartLine {
                product_id: a,
                quantity: 7
            }))
        );
        assert_eq!(cart.set_quantity(a, 7), Ok(LineChange::Unchanged));
        assert_eq!(
            cart.set_quantity(b, 2),
            Ok(LineChange::Inserted(CartLine {
                product_id: b,
                quantity: 2
            }))
        );
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut cart = cart();
        assert_eq!(cart.remove_line(Uuid::new_v4()), LineChange::Unchanged);
    }

    #[test]
    fn from_lines_drops_invalid_rows() {
        let p = Uuid::new_v4();
        let q = Uuid::new_v4();
        let cart = Cart::from_lines(
            Uuid::new_v4(),
            [
                CartLine { product_id: p, quantity: 2 },
                CartLine { product_id: p, quantity: 9 },
                CartLine { product_id: q, quantity: 0 },
            ],
        );
        assert_eq!(cart.lines(), &[CartLine { product_id: p, quantity: 2 }]);
    }
}
