pub mod cart;
pub mod categories;
pub mod common;
pub mod orders;
pub mod products;
pub mod reports;
