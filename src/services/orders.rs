use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{order, order_detail, product},
    errors::ServiceError,
    export::{OrderSummary, SummaryLine},
    models::{AdjustableLines, CartLine, OrderCart, OrderEdit},
    repositories::lookup::{self, OrderLineRow, OrderOverview},
};
use chrono::NaiveDate;
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use super::record_outcome;

/// Behavior switches for the order workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderSettings {
    /// Re-check every line against stock inside the commit transaction. Off by default:
    /// stock is only checked while the cart is being built.
    pub revalidate_stock_on_commit: bool,
    /// Put ordered quantities back on the shelf when an order is deleted. Off by default.
    pub restock_on_order_delete: bool,
}

impl From<&AppConfig> for OrderSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            revalidate_stock_on_commit: cfg.revalidate_stock_on_commit,
            restock_on_order_delete: cfg.restock_on_order_delete,
        }
    }
}

/// Returned by a successful commit; doubles as the printable summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReceipt {
    pub order_id: i32,
    pub order_date: NaiveDate,
    pub lines: Vec<CartLine>,
    pub total: Decimal,
}

impl OrderReceipt {
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::new(
            self.order_id,
            self.lines
                .iter()
                .map(|line| SummaryLine {
                    product_id: line.product_id,
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
        )
    }
}

/// A committed order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub order: order::Model,
    pub lines: Vec<OrderLineRow>,
}

/// Order placement and stock reconciliation.
///
/// Carts and edits live in memory ([`OrderCart`], [`OrderEdit`]); this service reads live
/// stock for them and persists them. Stock moves at commit time by the ordered quantity and
/// on edit by the change in quantity.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    settings: OrderSettings,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, settings: OrderSettings) -> Self {
        Self { db, settings }
    }

    /// Puts a product in the cart with an initial quantity checked against stock.
    #[instrument(skip(self, cart))]
    pub async fn add_to_cart(
        &self,
        cart: &mut OrderCart,
        product_id: i32,
        quantity: i32,
    ) -> Result<CartLine, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Initial quantity must be at least 1".to_string(),
            ));
        }

        let db = &*self.db;
        let found = product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        let assignment = lookup::assignment_row(db, found.category_assignment_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Category assignment {} not found",
                    found.category_assignment_id
                ))
            })?;

        let line = CartLine {
            product_id,
            product_name: found.name,
            category_name: assignment.category_name,
            quantity,
            unit_price: found.price,
        };

        if quantity > found.amount {
            return Err(ServiceError::InsufficientStock(format!(
                "'{}' has {} units in stock, {} requested",
                line.product_name, found.amount, quantity
            )));
        }

        cart.push(line.clone())?;
        debug!(product_id, quantity, "Added to cart");
        Ok(line)
    }

    /// Nudges a cart or edit line by `delta` against live stock.
    #[instrument(skip(self, lines))]
    pub async fn adjust_line<L: AdjustableLines>(
        &self,
        lines: &mut L,
        product_id: i32,
        delta: i32,
    ) -> Result<i32, ServiceError> {
        let stock = self.live_stock(product_id).await?;
        lines.adjust_quantity(product_id, delta, stock)
    }

    /// Sets an absolute quantity on a cart or edit line against live stock.
    #[instrument(skip(self, lines))]
    pub async fn set_line<L: AdjustableLines>(
        &self,
        lines: &mut L,
        product_id: i32,
        quantity: i32,
    ) -> Result<i32, ServiceError> {
        let stock = self.live_stock(product_id).await?;
        lines.set_quantity(product_id, quantity, stock)
    }

    pub fn remove_from_cart(
        &self,
        cart: &mut OrderCart,
        product_id: i32,
    ) -> Result<CartLine, ServiceError> {
        cart.remove(product_id).ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} is not in the order", product_id))
        })
    }

    async fn live_stock(&self, product_id: i32) -> Result<i32, ServiceError> {
        lookup::stock_by_product_id(&*self.db, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Persists the cart as one order.
    ///
    /// Lines with quantity zero are skipped. For each remaining line the current stock is
    /// re-read and overwritten with `stock - quantity`, and an `order_details` row is inserted
    /// unless one already exists for the pair. Everything happens in one transaction; the cart
    /// is cleared only after the commit succeeds.
    #[instrument(skip(self, cart), fields(lines = cart.lines().len()))]
    pub async fn commit(&self, cart: &mut OrderCart) -> Result<OrderReceipt, ServiceError> {
        let started = Instant::now();
        let result: Result<OrderReceipt, ServiceError> = async {
            let lines: Vec<CartLine> = cart.positive_lines().cloned().collect();
            if lines.is_empty() {
                return Err(ServiceError::ValidationError(
                    "The order has no items with a positive quantity".to_string(),
                ));
            }

            let txn = self.db.begin().await?;

            let placed = order::ActiveModel::placed_now().insert(&txn).await?;

            for line in &lines {
                let current = lookup::stock_by_product_id(&txn, line.product_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Product {} disappeared before commit",
                            line.product_id
                        ))
                    })?;

                if self.settings.revalidate_stock_on_commit && line.quantity > current {
                    return Err(ServiceError::InsufficientStock(format!(
                        "'{}' has {} units in stock, {} ordered",
                        line.product_name, current, line.quantity
                    )));
                }

                product::Entity::update_many()
                    .col_expr(product::Column::Amount, Expr::value(current - line.quantity))
                    .filter(product::Column::Id.eq(line.product_id))
                    .exec(&txn)
                    .await?;

                if lookup::ordered_quantity(&txn, placed.id, line.product_id)
                    .await?
                    .is_none()
                {
                    order_detail::ActiveModel {
                        order_id: Set(placed.id),
                        product_id: Set(line.product_id),
                        amount: Set(line.quantity),
                        price: Set(line.unit_price),
                    }
                    .insert(&txn)
                    .await?;
                }
            }

            txn.commit().await?;

            let total = lines.iter().map(CartLine::line_total).sum();
            info!(order_id = placed.id, lines = lines.len(), %total, "Order committed");

            Ok(OrderReceipt {
                order_id: placed.id,
                order_date: placed.order_date,
                lines,
                total,
            })
        }
        .await;

        histogram!("stockroom.orders.commit_duration", started.elapsed());
        let receipt = record_outcome("commit_order", result)?;
        counter!("stockroom.orders.committed", 1);
        cart.clear();
        Ok(receipt)
    }

    /// Lists orders after deleting the ones left without any line.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderOverview>, ServiceError> {
        let txn = self.db.begin().await?;
        let collected = delete_empty_orders(&txn).await?;
        let orders = lookup::order_overviews(&txn).await?;
        txn.commit().await?;

        if collected > 0 {
            info!(collected, "Removed orders without lines");
        }
        Ok(orders)
    }

    /// Deletes every order that has no `order_details` row, returning how many went.
    #[instrument(skip(self))]
    pub async fn collect_empty_orders(&self) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;
        let collected = delete_empty_orders(&txn).await?;
        txn.commit().await?;
        Ok(collected)
    }

    #[instrument(skip(self))]
    pub async fn order_details(&self, order_id: i32) -> Result<OrderView, ServiceError> {
        let db = &*self.db;
        let found = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let lines = lookup::order_detail_rows(db, order_id).await?;

        Ok(OrderView {
            order: found,
            lines,
        })
    }

    /// Opens a committed order for quantity changes.
    #[instrument(skip(self))]
    pub async fn load_edit(&self, order_id: i32) -> Result<OrderEdit, ServiceError> {
        let view = self.order_details(order_id).await?;
        Ok(OrderEdit::new(
            order_id,
            view.lines.into_iter().map(Into::into).collect(),
        ))
    }

    /// Writes back every line whose quantity changed and moves stock by the opposite of
    /// the change. Returns how many lines were written.
    #[instrument(skip(self, edit), fields(order_id = edit.order_id))]
    pub async fn save_edit(&self, edit: &OrderEdit) -> Result<usize, ServiceError> {
        let result: Result<usize, ServiceError> = async {
            let txn = self.db.begin().await?;

            if order::Entity::find_by_id(edit.order_id)
                .one(&txn)
                .await?
                .is_none()
            {
                return Err(ServiceError::NotFound(format!(
                    "Order {} not found",
                    edit.order_id
                )));
            }

            let mut written = 0;
            for line in edit.touched() {
                let persisted = lookup::ordered_quantity(&txn, edit.order_id, line.product_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Product {} is not on order {}",
                            line.product_id, edit.order_id
                        ))
                    })?;
                let delta = line.quantity - persisted;
                if delta == 0 {
                    continue;
                }

                if self.settings.revalidate_stock_on_commit && delta > 0 {
                    let stock = lookup::stock_by_product_id(&txn, line.product_id)
                        .await?
                        .unwrap_or(0);
                    if delta > stock {
                        return Err(ServiceError::InsufficientStock(format!(
                            "'{}' has {} units in stock, {} more requested",
                            line.product_name, stock, delta
                        )));
                    }
                }

                order_detail::ActiveModel {
                    order_id: Set(edit.order_id),
                    product_id: Set(line.product_id),
                    amount: Set(line.quantity),
                    price: Set(line.price),
                }
                .update(&txn)
                .await?;

                product::Entity::update_many()
                    .col_expr(
                        product::Column::Amount,
                        Expr::col(product::Column::Amount).sub(delta),
                    )
                    .filter(product::Column::Id.eq(line.product_id))
                    .exec(&txn)
                    .await?;

                written += 1;
            }

            txn.commit().await?;

            info!(order_id = edit.order_id, written, "Order edit saved");
            Ok(written)
        }
        .await;

        record_outcome("save_order_edit", result)
    }

    /// Deletes an order; its lines go with it through the foreign key.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: i32) -> Result<(), ServiceError> {
        let result: Result<(), ServiceError> = async {
            let txn = self.db.begin().await?;

            if order::Entity::find_by_id(order_id)
                .one(&txn)
                .await?
                .is_none()
            {
                return Err(ServiceError::NotFound(format!(
                    "Order {} not found",
                    order_id
                )));
            }

            if self.settings.restock_on_order_delete {
                let details = order_detail::Entity::find()
                    .filter(order_detail::Column::OrderId.eq(order_id))
                    .all(&txn)
                    .await?;
                for detail in details {
                    product::Entity::update_many()
                        .col_expr(
                            product::Column::Amount,
                            Expr::col(product::Column::Amount).add(detail.amount),
                        )
                        .filter(product::Column::Id.eq(detail.product_id))
                        .exec(&txn)
                        .await?;
                }
            }

            order::Entity::delete_by_id(order_id).exec(&txn).await?;
            txn.commit().await?;

            info!(
                order_id,
                restocked = self.settings.restock_on_order_delete,
                "Order deleted"
            );
            Ok(())
        }
        .await;

        record_outcome("delete_order", result)
    }
}

async fn delete_empty_orders<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let deleted = order::Entity::delete_many()
        .filter(
            order::Column::Id.not_in_subquery(
                Query::select()
                    .column(order_detail::Column::OrderId)
                    .from(order_detail::Entity)
                    .to_owned(),
            ),
        )
        .exec(db)
        .await?;
    Ok(deleted.rows_affected)
}
