use rust_decimal::Decimal;
use serde::Serialize;

use super::AdjustableLines;
use crate::errors::ServiceError;

/// A product line in a cart that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: i32,
    pub product_name: String,
    pub category_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The order being assembled. Empty until the first line is added; committing turns it
/// back into an empty cart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderCart {
    lines: Vec<CartLine>,
}

impl OrderCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn contains(&self, product_id: i32) -> bool {
        self.lines.iter().any(|line| line.product_id == product_id)
    }

    /// Appends a line. A product can only appear once; further changes go through
    /// [`AdjustableLines`].
    pub fn push(&mut self, line: CartLine) -> Result<(), ServiceError> {
        if self.contains(line.product_id) {
            return Err(ServiceError::ValidationError(format!(
                "'{}' ({}) is already in the order, change its quantity instead",
                line.product_name, line.category_name
            )));
        }
        self.lines.push(line);
        Ok(())
    }

    pub fn remove(&mut self, product_id: i32) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| line.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Lines that would actually be ordered.
    pub fn positive_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|line| line.quantity > 0)
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl AdjustableLines for OrderCart {
    fn quantity_of(&self, product_id: i32) -> Option<i32> {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    // nothing leaves stock before commit
    fn withdrawn(&self, _product_id: i32) -> i32 {
        0
    }

    fn store_quantity(&mut self, product_id: i32, quantity: i32) {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            line.quantity = quantity;
        }
    }
}
