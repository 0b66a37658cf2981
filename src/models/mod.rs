//! In-memory order states and request shapes that never touch the database on their own.

pub mod assignment;
pub mod cart;
pub mod order_edit;

pub use assignment::AssignmentSelector;
pub use cart::{CartLine, OrderCart};
pub use order_edit::{EditLine, OrderEdit};

use crate::errors::ServiceError;

/// Quantity editing shared by a cart being built and a committed order being re-edited.
///
/// Implementors only describe where their lines live; the stock rules are the same for both:
/// a quantity never drops below zero, and an increase must fit in live stock once the units
/// the line has already withdrawn are taken into account. Decreases are always accepted.
/// A rejected change leaves the line untouched.
pub trait AdjustableLines {
    /// Current quantity of the line for `product_id`, if there is one.
    fn quantity_of(&self, product_id: i32) -> Option<i32>;

    /// Units of `product_id` this line has already taken out of stock.
    fn withdrawn(&self, product_id: i32) -> i32;

    /// Overwrites the quantity of an existing line.
    fn store_quantity(&mut self, product_id: i32, quantity: i32);

    /// Sets an absolute quantity, returning the stored value.
    fn set_quantity(
        &mut self,
        product_id: i32,
        new_quantity: i32,
        live_stock: i32,
    ) -> Result<i32, ServiceError> {
        let current = self.quantity_of(product_id).ok_or_else(|| {
            ServiceError::NotFound(format!("No line for product {}", product_id))
        })?;

        if new_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity cannot go below zero".to_string(),
            ));
        }

        if new_quantity > current && new_quantity - self.withdrawn(product_id) > live_stock {
            return Err(ServiceError::InsufficientStock(format!(
                "Product {} has {} units available, {} requested",
                product_id,
                live_stock + self.withdrawn(product_id),
                new_quantity
            )));
        }

        self.store_quantity(product_id, new_quantity);
        Ok(new_quantity)
    }

    /// Nudges a quantity by `delta` (usually +1 or -1).
    fn adjust_quantity(
        &mut self,
        product_id: i32,
        delta: i32,
        live_stock: i32,
    ) -> Result<i32, ServiceError> {
        let current = self.quantity_of(product_id).ok_or_else(|| {
            ServiceError::NotFound(format!("No line for product {}", product_id))
        })?;
        self.set_quantity(product_id, current.saturating_add(delta), live_stock)
    }
}
