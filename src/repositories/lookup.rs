//! Name-to-key resolution.
//!
//! Every helper is generic over [`ConnectionTrait`] so the same query runs on the pool or
//! inside a workflow transaction. `Ok(None)` is a lookup miss and callers have to handle it;
//! `Err` is reserved for unexpected database failures.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::Serialize;

use crate::entities::{
    category, category_assignment, image, order, order_detail, parent_category, product,
};

/// Separator used by the human-readable assignment label.
pub const ASSIGNMENT_SEPARATOR: &str = " - ";

/// A category assignment with both tag names resolved.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct AssignmentRow {
    pub id: i32,
    pub category_id: i32,
    pub category_name: String,
    pub parent_category_id: i32,
    pub parent_category_name: String,
}

impl AssignmentRow {
    /// `"<category> - <parent category>"`
    pub fn display(&self) -> String {
        format!(
            "{}{}{}",
            self.category_name, ASSIGNMENT_SEPARATOR, self.parent_category_name
        )
    }
}

/// One persisted order line joined with its product and taxonomy names.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct OrderLineRow {
    pub product_id: i32,
    pub product_name: String,
    pub category_name: String,
    pub parent_category_name: String,
    pub amount: i32,
    pub price: Decimal,
}

/// An order header with the number of lines it holds.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct OrderOverview {
    pub id: i32,
    pub order_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub line_count: i64,
}

pub async fn category_id_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<i32>, DbErr> {
    category::Entity::find()
        .select_only()
        .column(category::Column::Id)
        .filter(category::Column::Name.eq(name))
        .into_tuple::<i32>()
        .one(db)
        .await
}

pub async fn parent_category_id_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<i32>, DbErr> {
    parent_category::Entity::find()
        .select_only()
        .column(parent_category::Column::Id)
        .filter(parent_category::Column::Name.eq(name))
        .into_tuple::<i32>()
        .one(db)
        .await
}

pub async fn product_id_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<i32>, DbErr> {
    product::Entity::find()
        .select_only()
        .column(product::Column::Id)
        .filter(product::Column::Name.eq(name))
        .into_tuple::<i32>()
        .one(db)
        .await
}

/// Image payload of the first product (lowest id) whose name matches the SQL `LIKE` pattern.
pub async fn image_by_product_name<C: ConnectionTrait>(
    db: &C,
    pattern: &str,
) -> Result<Option<Vec<u8>>, DbErr> {
    image::Entity::find()
        .select_only()
        .column(image::Column::Data)
        .join(JoinType::InnerJoin, image::Relation::Products.def())
        .filter(product::Column::Name.like(pattern))
        .order_by_asc(product::Column::Id)
        .into_tuple::<Vec<u8>>()
        .one(db)
        .await
}

pub async fn price_by_product_id<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
) -> Result<Option<Decimal>, DbErr> {
    product::Entity::find_by_id(product_id)
        .select_only()
        .column(product::Column::Price)
        .into_tuple::<Decimal>()
        .one(db)
        .await
}

/// Units currently on hand.
pub async fn stock_by_product_id<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
) -> Result<Option<i32>, DbErr> {
    product::Entity::find_by_id(product_id)
        .select_only()
        .column(product::Column::Amount)
        .into_tuple::<i32>()
        .one(db)
        .await
}

/// Quantity recorded for a product on a committed order.
pub async fn ordered_quantity<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    product_id: i32,
) -> Result<Option<i32>, DbErr> {
    order_detail::Entity::find_by_id((order_id, product_id))
        .select_only()
        .column(order_detail::Column::Amount)
        .into_tuple::<i32>()
        .one(db)
        .await
}

pub async fn assignment_id_by_names<C: ConnectionTrait>(
    db: &C,
    category_name: &str,
    parent_name: &str,
) -> Result<Option<i32>, DbErr> {
    category_assignment::Entity::find()
        .select_only()
        .column(category_assignment::Column::Id)
        .join(
            JoinType::InnerJoin,
            category_assignment::Relation::Category.def(),
        )
        .join(
            JoinType::InnerJoin,
            category_assignment::Relation::ParentCategory.def(),
        )
        .filter(category::Column::Name.eq(category_name))
        .filter(parent_category::Column::Name.eq(parent_name))
        .into_tuple::<i32>()
        .one(db)
        .await
}

fn assignment_rows_query() -> sea_orm::Select<category_assignment::Entity> {
    category_assignment::Entity::find()
        .select_only()
        .column(category_assignment::Column::Id)
        .column(category_assignment::Column::CategoryId)
        .column(category_assignment::Column::ParentCategoryId)
        .column_as(category::Column::Name, "category_name")
        .column_as(parent_category::Column::Name, "parent_category_name")
        .join(
            JoinType::InnerJoin,
            category_assignment::Relation::Category.def(),
        )
        .join(
            JoinType::InnerJoin,
            category_assignment::Relation::ParentCategory.def(),
        )
}

pub async fn assignment_row<C: ConnectionTrait>(
    db: &C,
    assignment_id: i32,
) -> Result<Option<AssignmentRow>, DbErr> {
    assignment_rows_query()
        .filter(category_assignment::Column::Id.eq(assignment_id))
        .into_model::<AssignmentRow>()
        .one(db)
        .await
}

/// All assignments ordered by category name, then parent category name.
pub async fn assignment_rows<C: ConnectionTrait>(db: &C) -> Result<Vec<AssignmentRow>, DbErr> {
    assignment_rows_query()
        .order_by_asc(category::Column::Name)
        .order_by_asc(parent_category::Column::Name)
        .into_model::<AssignmentRow>()
        .all(db)
        .await
}

/// Lines of a committed order, ordered by product id.
pub async fn order_detail_rows<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
) -> Result<Vec<OrderLineRow>, DbErr> {
    order_detail::Entity::find()
        .select_only()
        .column(order_detail::Column::ProductId)
        .column(order_detail::Column::Amount)
        .column(order_detail::Column::Price)
        .column_as(product::Column::Name, "product_name")
        .column_as(category::Column::Name, "category_name")
        .column_as(parent_category::Column::Name, "parent_category_name")
        .join(JoinType::InnerJoin, order_detail::Relation::Product.def())
        .join(
            JoinType::InnerJoin,
            product::Relation::CategoryAssignment.def(),
        )
        .join(
            JoinType::InnerJoin,
            category_assignment::Relation::Category.def(),
        )
        .join(
            JoinType::InnerJoin,
            category_assignment::Relation::ParentCategory.def(),
        )
        .filter(order_detail::Column::OrderId.eq(order_id))
        .order_by_asc(order_detail::Column::ProductId)
        .into_model::<OrderLineRow>()
        .all(db)
        .await
}

/// Every order with its line count, newest first.
pub async fn order_overviews<C: ConnectionTrait>(db: &C) -> Result<Vec<OrderOverview>, DbErr> {
    order::Entity::find()
        .select_only()
        .column(order::Column::Id)
        .column(order::Column::OrderDate)
        .column(order::Column::CreatedAt)
        .column_as(
            Expr::col((order_detail::Entity, order_detail::Column::ProductId)).count(),
            "line_count",
        )
        .join(JoinType::LeftJoin, order::Relation::OrderDetails.def())
        .group_by(order::Column::Id)
        .group_by(order::Column::OrderDate)
        .group_by(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .into_model::<OrderOverview>()
        .all(db)
        .await
}
