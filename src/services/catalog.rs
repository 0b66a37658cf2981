use crate::{
    db::DbPool,
    entities::{category, category_assignment, parent_category, product},
    errors::ServiceError,
    repositories::lookup::{self, AssignmentRow, ASSIGNMENT_SEPARATOR},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{normalize_name, record_outcome};

/// Ids captured when an assignment is opened for renaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentEdit {
    pub assignment_id: i32,
    pub category_id: i32,
    pub parent_category_id: i32,
    pub category_name: String,
    pub parent_category_name: String,
}

/// What a successful assignment delete removed besides the join row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssignmentRemoval {
    pub assignment_id: i32,
    pub category_removed: bool,
    pub parent_category_removed: bool,
}

/// Category taxonomy management.
///
/// Categories and parent categories only exist through the assignments pairing them:
/// adding an assignment creates whatever tag is missing, and deleting the last assignment
/// that references a tag deletes the tag too.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Pairs a category with a new parent category.
    ///
    /// The category is reused when it exists and created otherwise. Parent category names are
    /// globally unique, so an existing parent name is rejected even under another category.
    /// Nothing is persisted unless the whole pairing succeeds.
    #[instrument(skip(self))]
    pub async fn add_assignment(
        &self,
        category_name: &str,
        parent_name: &str,
    ) -> Result<AssignmentRow, ServiceError> {
        let result: Result<AssignmentRow, ServiceError> = async {
            let category_name = tag_name(category_name, "Category name")?;
            let parent_name = tag_name(parent_name, "Parent category name")?;

            let txn = self.db.begin().await?;

            let category_id = match lookup::category_id_by_name(&txn, &category_name).await? {
                Some(id) => id,
                None => {
                    category::ActiveModel {
                        name: Set(category_name.clone()),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?
                    .id
                }
            };

            if lookup::parent_category_id_by_name(&txn, &parent_name)
                .await?
                .is_some()
            {
                return Err(ServiceError::Conflict(format!(
                    "Parent category '{}' already exists",
                    parent_name
                )));
            }

            let parent_category_id = parent_category::ActiveModel {
                name: Set(parent_name.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?
            .id;

            if pair_exists(&txn, category_id, parent_category_id).await? {
                return Err(ServiceError::Conflict(format!(
                    "'{}{}{}' is already assigned",
                    category_name, ASSIGNMENT_SEPARATOR, parent_name
                )));
            }

            let assignment = category_assignment::ActiveModel {
                category_id: Set(category_id),
                parent_category_id: Set(parent_category_id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            txn.commit().await?;

            info!(
                assignment_id = assignment.id,
                category_id, parent_category_id, "Category assignment created"
            );

            Ok(AssignmentRow {
                id: assignment.id,
                category_id,
                category_name,
                parent_category_id,
                parent_category_name: parent_name,
            })
        }
        .await;

        record_outcome("add_assignment", result)
    }

    /// Captures the ids of an assignment so later renames target the same rows.
    #[instrument(skip(self))]
    pub async fn open_edit(&self, assignment_id: i32) -> Result<AssignmentEdit, ServiceError> {
        let row = lookup::assignment_row(&*self.db, assignment_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category assignment {} not found", assignment_id))
            })?;

        Ok(AssignmentEdit {
            assignment_id: row.id,
            category_id: row.category_id,
            parent_category_id: row.parent_category_id,
            category_name: row.category_name,
            parent_category_name: row.parent_category_name,
        })
    }

    /// Renames the category and/or parent category captured in `edit`, in place.
    ///
    /// `None` or a blank value leaves that side unchanged. Renaming a category affects every
    /// assignment sharing it.
    #[instrument(skip(self))]
    pub async fn rename_assignment(
        &self,
        edit: &AssignmentEdit,
        new_category: Option<&str>,
        new_parent: Option<&str>,
    ) -> Result<AssignmentRow, ServiceError> {
        let result: Result<AssignmentRow, ServiceError> = async {
            let new_category = changed_name(new_category, "Category name")?;
            let new_parent = changed_name(new_parent, "Parent category name")?;

            let txn = self.db.begin().await?;

            if let Some(name) = new_category {
                match lookup::category_id_by_name(&txn, &name).await? {
                    Some(id) if id == edit.category_id => {}
                    Some(_) => {
                        return Err(ServiceError::Conflict(format!(
                            "Category '{}' already exists",
                            name
                        )))
                    }
                    None => {
                        let updated = category::Entity::update_many()
                            .col_expr(category::Column::Name, name.clone().into())
                            .filter(category::Column::Id.eq(edit.category_id))
                            .exec(&txn)
                            .await?;
                        if updated.rows_affected == 0 {
                            return Err(ServiceError::NotFound(format!(
                                "Category {} not found",
                                edit.category_id
                            )));
                        }
                    }
                }
            }

            if let Some(name) = new_parent {
                match lookup::parent_category_id_by_name(&txn, &name).await? {
                    Some(id) if id == edit.parent_category_id => {}
                    Some(_) => {
                        return Err(ServiceError::Conflict(format!(
                            "Parent category '{}' already exists",
                            name
                        )))
                    }
                    None => {
                        let updated = parent_category::Entity::update_many()
                            .col_expr(parent_category::Column::Name, name.clone().into())
                            .filter(parent_category::Column::Id.eq(edit.parent_category_id))
                            .exec(&txn)
                            .await?;
                        if updated.rows_affected == 0 {
                            return Err(ServiceError::NotFound(format!(
                                "Parent category {} not found",
                                edit.parent_category_id
                            )));
                        }
                    }
                }
            }

            let row = lookup::assignment_row(&txn, edit.assignment_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Category assignment {} not found",
                        edit.assignment_id
                    ))
                })?;

            txn.commit().await?;

            info!(assignment_id = edit.assignment_id, "Category assignment renamed");
            Ok(row)
        }
        .await;

        record_outcome("rename_assignment", result)
    }

    /// Deletes the pairing and garbage-collects whichever tag is no longer paired with
    /// anything. Refused while a product still uses the assignment.
    #[instrument(skip(self))]
    pub async fn delete_assignment(
        &self,
        category_name: &str,
        parent_name: &str,
    ) -> Result<AssignmentRemoval, ServiceError> {
        let result: Result<AssignmentRemoval, ServiceError> = async {
            let category_name = category_name.trim();
            let parent_name = parent_name.trim();

            let txn = self.db.begin().await?;

            let category_id = lookup::category_id_by_name(&txn, category_name)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category '{}' not found", category_name))
                })?;
            let parent_category_id = lookup::parent_category_id_by_name(&txn, parent_name)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Parent category '{}' not found", parent_name))
                })?;

            let assignment = category_assignment::Entity::find()
                .filter(category_assignment::Column::CategoryId.eq(category_id))
                .filter(category_assignment::Column::ParentCategoryId.eq(parent_category_id))
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Category assignment '{}{}{}' not found",
                        category_name, ASSIGNMENT_SEPARATOR, parent_name
                    ))
                })?;

            let products_using = product::Entity::find()
                .filter(product::Column::CategoryAssignmentId.eq(assignment.id))
                .count(&txn)
                .await?;
            if products_using > 0 {
                return Err(ServiceError::Conflict(format!(
                    "{} product(s) still use '{}{}{}'",
                    products_using, category_name, ASSIGNMENT_SEPARATOR, parent_name
                )));
            }

            category_assignment::Entity::delete_by_id(assignment.id)
                .exec(&txn)
                .await?;

            let category_removed = if category_assignment::Entity::find()
                .filter(category_assignment::Column::CategoryId.eq(category_id))
                .count(&txn)
                .await?
                == 0
            {
                category::Entity::delete_by_id(category_id).exec(&txn).await?;
                true
            } else {
                false
            };

            let parent_category_removed = if category_assignment::Entity::find()
                .filter(category_assignment::Column::ParentCategoryId.eq(parent_category_id))
                .count(&txn)
                .await?
                == 0
            {
                parent_category::Entity::delete_by_id(parent_category_id)
                    .exec(&txn)
                    .await?;
                true
            } else {
                false
            };

            txn.commit().await?;

            info!(
                assignment_id = assignment.id,
                category_removed, parent_category_removed, "Category assignment deleted"
            );

            Ok(AssignmentRemoval {
                assignment_id: assignment.id,
                category_removed,
                parent_category_removed,
            })
        }
        .await;

        record_outcome("delete_assignment", result)
    }

    /// Every assignment ordered by category name.
    #[instrument(skip(self))]
    pub async fn list_assignments(&self) -> Result<Vec<AssignmentRow>, ServiceError> {
        Ok(lookup::assignment_rows(&*self.db).await?)
    }
}

async fn pair_exists<C: ConnectionTrait>(
    db: &C,
    category_id: i32,
    parent_category_id: i32,
) -> Result<bool, ServiceError> {
    let count = category_assignment::Entity::find()
        .filter(category_assignment::Column::CategoryId.eq(category_id))
        .filter(category_assignment::Column::ParentCategoryId.eq(parent_category_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Tag names may not contain the label separator, otherwise labels stop round-tripping.
fn tag_name(value: &str, field: &str) -> Result<String, ServiceError> {
    let name = normalize_name(value, field)?;
    if name.contains(ASSIGNMENT_SEPARATOR) {
        return Err(ServiceError::ValidationError(format!(
            "{} must not contain '{}'",
            field, ASSIGNMENT_SEPARATOR
        )));
    }
    Ok(name)
}

fn changed_name(value: Option<&str>, field: &str) -> Result<Option<String>, ServiceError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => tag_name(name, field).map(Some),
    }
}
