use rust_decimal::Decimal;
use serde::Serialize;

use super::AdjustableLines;
use crate::repositories::lookup::OrderLineRow;

/// A line of a committed order opened for editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditLine {
    pub product_id: i32,
    pub product_name: String,
    pub category_name: String,
    /// Quantity stored in `order_details` when the edit was opened
    pub persisted_quantity: i32,
    pub quantity: i32,
    pub price: Decimal,
}

impl EditLine {
    /// Change relative to what is already persisted; stock moves by the negative of this.
    pub fn delta(&self) -> i32 {
        self.quantity - self.persisted_quantity
    }
}

impl From<OrderLineRow> for EditLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            category_name: row.category_name,
            persisted_quantity: row.amount,
            quantity: row.amount,
            price: row.price,
        }
    }
}

/// A committed order re-entered for quantity changes.
#[derive(Debug, Clone, Serialize)]
pub struct OrderEdit {
    pub order_id: i32,
    lines: Vec<EditLine>,
}

impl OrderEdit {
    pub fn new(order_id: i32, lines: Vec<EditLine>) -> Self {
        Self { order_id, lines }
    }

    pub fn lines(&self) -> &[EditLine] {
        &self.lines
    }

    /// Lines whose quantity differs from the persisted one.
    pub fn touched(&self) -> impl Iterator<Item = &EditLine> {
        self.lines.iter().filter(|line| line.delta() != 0)
    }
}

impl AdjustableLines for OrderEdit {
    fn quantity_of(&self, product_id: i32) -> Option<i32> {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    fn withdrawn(&self, product_id: i32) -> i32 {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.persisted_quantity)
            .unwrap_or(0)
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
