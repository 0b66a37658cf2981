//! Printable artifacts: order summaries and report listings rendered as plain text, then
//! turned into PDF by [`pdf`].

pub mod pdf;

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;

use crate::repositories::lookup::OrderLineRow;
use crate::services::reports::StockLevel;

/// One itemized line of an order summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    /// Unit price
    pub price: Decimal,
}

impl From<OrderLineRow> for SummaryLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.amount,
            price: row.price,
        }
    }
}

/// The printable summary of a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub order_id: i32,
    pub lines: Vec<SummaryLine>,
}

impl OrderSummary {
    pub fn new(order_id: i32, lines: Vec<SummaryLine>) -> Self {
        Self { order_id, lines }
    }

    /// Sum of quantity times unit price over every line.
    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(|line| line.price * Decimal::from(line.quantity))
            .sum()
    }

    pub fn render_text(&self, currency: &str) -> String {
        let mut text = format!("Order ID: {}\n\nOrder items:\n", self.order_id);
        for line in &self.lines {
            let _ = writeln!(text, "Product ID: {}", line.product_id);
            let _ = writeln!(text, "Product: {}", line.product_name);
            let _ = writeln!(text, "Quantity: {}", line.quantity);
            let _ = writeln!(text, "Price: {:.2} {}", line.price, currency);
            text.push('\n');
        }
        let _ = writeln!(text, "Total: {:.2} {}", self.total(), currency);
        text
    }

    pub fn render_pdf(&self, currency: &str) -> Result<Vec<u8>, pdf::PdfError> {
        pdf::render_text_pdf(&self.render_text(currency))
    }
}

/// Plain-text listing of stock on hand.
pub fn render_stock_report(levels: &[StockLevel]) -> String {
    let mut text = String::from("Stock on hand\n\n");
    for level in levels {
        let _ = writeln!(text, "{:>6}  {:<40} {:>8}", level.id, level.name, level.amount);
    }
    text
}
