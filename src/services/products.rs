use crate::{
    db::DbPool,
    entities::{category, category_assignment, image, order_detail, parent_category, product},
    errors::ServiceError,
    models::AssignmentSelector,
    repositories::lookup::{self, AssignmentRow, ASSIGNMENT_SEPARATOR},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

use super::record_outcome;

const PRICE_DECIMALS: u32 = 2;

/// Input for a new catalog product.
#[derive(Debug, Clone, Validate)]
pub struct NewProduct {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub description: String,
    #[validate(range(min = 0))]
    pub amount: i32,
    #[validate(custom = "valid_price")]
    pub price: Decimal,
    pub image: Vec<u8>,
    pub assignment: AssignmentSelector,
}

/// Full replacement of a product's fields. The image is only swapped when one is given.
#[derive(Debug, Clone, Validate)]
pub struct ProductUpdate {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub description: String,
    #[validate(range(min = 0))]
    pub amount: i32,
    #[validate(custom = "valid_price")]
    pub price: Decimal,
    pub image: Option<Vec<u8>>,
    pub assignment: AssignmentSelector,
}

/// Product as shown in an edit form, image included as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetail {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub amount: i32,
    pub price: Decimal,
    pub assignment: AssignmentRow,
    pub image_base64: String,
}

/// Catalog listing row.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct ProductListing {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub amount: i32,
    pub price: Decimal,
    pub category_assignment_id: i32,
    pub category_name: String,
    pub parent_category_name: String,
}

impl ProductListing {
    pub fn assignment_label(&self) -> String {
        format!(
            "{}{}{}",
            self.category_name, ASSIGNMENT_SEPARATOR, self.parent_category_name
        )
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Prices are non-negative amounts in whole cents.
fn valid_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("negative_price");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    if price.normalize().scale() > PRICE_DECIMALS {
        let mut err = ValidationError::new("price_precision");
        err.message = Some("Price has at most two decimal places".into());
        return Err(err);
    }
    Ok(())
}

/// Product management: every product owns exactly one image row.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
    max_image_bytes: usize,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>, max_image_bytes: usize) -> Self {
        Self {
            db,
            max_image_bytes,
        }
    }

    fn check_image(&self, image: &[u8]) -> Result<(), ServiceError> {
        if image.is_empty() {
            return Err(ServiceError::ValidationError(
                "Product image must not be empty".to_string(),
            ));
        }
        if image.len() > self.max_image_bytes {
            return Err(ServiceError::ValidationError(format!(
                "Product image is {} bytes, the limit is {}",
                image.len(),
                self.max_image_bytes
            )));
        }
        Ok(())
    }

    /// Inserts the image first, then the product pointing at it.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<product::Model, ServiceError> {
        let result: Result<product::Model, ServiceError> = async {
            input.validate()?;
            self.check_image(&input.image)?;
            let name = input.name.trim().to_string();

            let txn = self.db.begin().await?;

            if lookup::product_id_by_name(&txn, &name).await?.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "Product '{}' already exists",
                    name
                )));
            }

            let assignment_id = input.assignment.resolve(&txn).await?;

            let image_id = image::ActiveModel {
                data: Set(input.image),
                ..Default::default()
            }
            .insert(&txn)
            .await?
            .id;

            let created = product::ActiveModel {
                name: Set(name),
                image_id: Set(image_id),
                category_assignment_id: Set(assignment_id),
                description: Set(input.description.trim().to_string()),
                amount: Set(input.amount),
                price: Set(input.price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            txn.commit().await?;

            info!(product_id = created.id, image_id, "Product created");
            Ok(created)
        }
        .await;

        record_outcome("create_product", result)
    }

    /// Rewrites every field. A supplied image becomes a new row and the previous one is
    /// deleted; without one the current image stays.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update_product(
        &self,
        product_id: i32,
        input: ProductUpdate,
    ) -> Result<product::Model, ServiceError> {
        let result: Result<product::Model, ServiceError> = async {
            input.validate()?;
            if let Some(image) = &input.image {
                self.check_image(image)?;
            }
            let name = input.name.trim().to_string();

            let txn = self.db.begin().await?;

            let existing = product::Entity::find_by_id(product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", product_id))
                })?;

            if let Some(other) = lookup::product_id_by_name(&txn, &name).await? {
                if other != product_id {
                    return Err(ServiceError::Conflict(format!(
                        "Product '{}' already exists",
                        name
                    )));
                }
            }

            let assignment_id = input.assignment.resolve(&txn).await?;
            let previous_image_id = existing.image_id;

            let mut active: product::ActiveModel = existing.into();
            active.name = Set(name);
            active.description = Set(input.description.trim().to_string());
            active.amount = Set(input.amount);
            active.price = Set(input.price);
            active.category_assignment_id = Set(assignment_id);

            let replaced_image = match input.image {
                Some(data) => {
                    let new_image = image::ActiveModel {
                        data: Set(data),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                    active.image_id = Set(new_image.id);
                    true
                }
                None => false,
            };

            let updated = active.update(&txn).await?;

            if replaced_image {
                image::Entity::delete_by_id(previous_image_id)
                    .exec(&txn)
                    .await?;
            }

            txn.commit().await?;

            info!(product_id, replaced_image, "Product updated");
            Ok(updated)
        }
        .await;

        record_outcome("update_product", result)
    }

    /// Deletes the product and its image. Products that appear on any order are kept.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: i32) -> Result<(), ServiceError> {
        let result: Result<(), ServiceError> = async {
            let txn = self.db.begin().await?;

            let existing = product::Entity::find_by_id(product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", product_id))
                })?;

            let order_lines = order_detail::Entity::find()
                .filter(order_detail::Column::ProductId.eq(product_id))
                .count(&txn)
                .await?;
            if order_lines > 0 {
                return Err(ServiceError::Conflict(format!(
                    "Product '{}' appears on {} order line(s)",
                    existing.name, order_lines
                )));
            }

            product::Entity::delete_by_id(product_id).exec(&txn).await?;
            image::Entity::delete_by_id(existing.image_id)
                .exec(&txn)
                .await?;

            txn.commit().await?;

            info!(product_id, image_id = existing.image_id, "Product deleted");
            Ok(())
        }
        .await;

        record_outcome("delete_product", result)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: i32) -> Result<ProductDetail, ServiceError> {
        let db = &*self.db;

        let (found, image) = product::Entity::find_by_id(product_id)
            .find_also_related(image::Entity)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let assignment = lookup::assignment_row(db, found.category_assignment_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Product {} points at missing assignment {}",
                    product_id, found.category_assignment_id
                ))
            })?;

        Ok(ProductDetail {
            id: found.id,
            name: found.name,
            description: found.description,
            amount: found.amount,
            price: found.price,
            assignment,
            image_base64: image.map(|img| STANDARD.encode(img.data)).unwrap_or_default(),
        })
    }

    /// Catalog ordered by product name.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductListing>, ServiceError> {
        let rows = product::Entity::find()
            .select_only()
            .column(product::Column::Id)
            .column(product::Column::Name)
            .column(product::Column::Description)
            .column(product::Column::Amount)
            .column(product::Column::Price)
            .column(product::Column::CategoryAssignmentId)
            .column_as(category::Column::Name, "category_name")
            .column_as(parent_category::Column::Name, "parent_category_name")
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
            .order_by_asc(product::Column::Name)
            .into_model::<ProductListing>()
            .all(&*self.db)
            .await?;

        Ok(rows)
    }

    /// Raw image bytes of a product.
    #[instrument(skip(self))]
    pub async fn product_image(&self, product_id: i32) -> Result<Vec<u8>, ServiceError> {
        let (_, image) = product::Entity::find_by_id(product_id)
            .find_also_related(image::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        image.map(|img| img.data).ok_or_else(|| {
            ServiceError::NotFound(format!("Image of product {} not found", product_id))
        })
    }

    /// Image of the first product whose name matches a SQL `LIKE` pattern.
    #[instrument(skip(self))]
    pub async fn image_by_name(&self, pattern: &str) -> Result<Vec<u8>, ServiceError> {
        lookup::image_by_product_name(&*self.db, pattern)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No product matches '{}'", pattern)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_product() -> NewProduct {
        NewProduct {
            name: "Kibble A".into(),
            description: "Chicken kibble".into(),
            amount: 10,
            price: dec!(5.00),
            image: vec![1, 2, 3],
            assignment: AssignmentSelector::names("Dry Food", "Chicken"),
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(new_product().validate().is_ok());
    }

    #[test]
    fn blank_and_negative_fields_are_reported() {
        let mut input = new_product();
        input.name = "   ".into();
        input.amount = -1;
        input.price = dec!(-0.01);

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("amount"));
        assert!(fields.contains_key("price"));
        assert!(!fields.contains_key("description"));
    }

    #[test]
    fn zero_price_is_allowed() {
        let mut input = new_product();
        input.price = dec!(0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn price_is_limited_to_cents() {
        let mut input = new_product();
        input.price = dec!(1.005);
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));

        // trailing zeros do not count
        input.price = dec!(1.500);
        assert!(input.validate().is_ok());
    }
}
