pub mod category;
pub mod category_assignment;
pub mod image;
pub mod order;
pub mod order_detail;
pub mod parent_category;
pub mod product;
