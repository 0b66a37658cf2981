use crate::{
    db::DbPool,
    entities::{category, category_assignment, order, order_detail, product},
    errors::ServiceError,
    export::{OrderSummary, SummaryLine},
    repositories::lookup::{self, AssignmentRow, OrderOverview},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct StockLevel {
    pub id: i32,
    pub name: String,
    pub amount: i32,
}

/// A product line sold on a given day.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct SaleRow {
    pub order_id: i32,
    pub order_date: NaiveDate,
    pub product_name: String,
    pub amount: i32,
    pub category_name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct CategoryCount {
    pub category_name: String,
    pub product_count: i64,
}

/// Read-only aggregates over the catalog and order history.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Units on hand per product, by product id.
    #[instrument(skip(self))]
    pub async fn stock_levels(&self) -> Result<Vec<StockLevel>, ServiceError> {
        let rows = product::Entity::find()
            .select_only()
            .column(product::Column::Id)
            .column(product::Column::Name)
            .column(product::Column::Amount)
            .order_by_asc(product::Column::Id)
            .into_model::<StockLevel>()
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Every order line placed on `date`.
    #[instrument(skip(self))]
    pub async fn sales_on(&self, date: NaiveDate) -> Result<Vec<SaleRow>, ServiceError> {
        let rows = order::Entity::find()
            .select_only()
            .column_as(order::Column::Id, "order_id")
            .column(order::Column::OrderDate)
            .column_as(product::Column::Name, "product_name")
            .column(order_detail::Column::Amount)
            .column_as(category::Column::Name, "category_name")
            .column(order_detail::Column::Price)
            .join(JoinType::InnerJoin, order::Relation::OrderDetails.def())
            .join(JoinType::InnerJoin, order_detail::Relation::Product.def())
            .join(
                JoinType::InnerJoin,
                product::Relation::CategoryAssignment.def(),
            )
            .join(
                JoinType::InnerJoin,
                category_assignment::Relation::Category.def(),
            )
            .filter(order::Column::OrderDate.eq(date))
            .order_by_asc(order::Column::Id)
            .order_by_asc(product::Column::Id)
            .into_model::<SaleRow>()
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Category/parent category pairs ordered by category name.
    #[instrument(skip(self))]
    pub async fn assignment_pairs(&self) -> Result<Vec<AssignmentRow>, ServiceError> {
        Ok(lookup::assignment_rows(&*self.db).await?)
    }

    /// Number of products under each category, categories without products included.
    #[instrument(skip(self))]
    pub async fn products_per_category(&self) -> Result<Vec<CategoryCount>, ServiceError> {
        let rows = category::Entity::find()
            .select_only()
            .column_as(category::Column::Name, "category_name")
            .column_as(
                Expr::col((product::Entity, product::Column::Id)).count(),
                "product_count",
            )
            .join(
                JoinType::LeftJoin,
                category::Relation::CategoryAssignments.def(),
            )
            .join(
                JoinType::LeftJoin,
                category_assignment::Relation::Products.def(),
            )
            .group_by(category::Column::Name)
            .order_by_asc(category::Column::Name)
            .into_model::<CategoryCount>()
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Line count per order, newest first.
    #[instrument(skip(self))]
    pub async fn order_line_counts(&self) -> Result<Vec<OrderOverview>, ServiceError> {
        Ok(lookup::order_overviews(&*self.db).await?)
    }

    /// Printable summary of a committed order.
    #[instrument(skip(self))]
    pub async fn order_summary(&self, order_id: i32) -> Result<OrderSummary, ServiceError> {
        let db = &*self.db;
        if order::Entity::find_by_id(order_id).one(db).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }

        let lines = lookup::order_detail_rows(db, order_id)
            .await?
            .into_iter()
            .map(SummaryLine::from)
            .collect();
        Ok(OrderSummary::new(order_id, lines))
    }
}
