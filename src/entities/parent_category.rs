use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Second tag dimension applied next to a category ("chicken flavor" next to "dry food").
/// Not nested under a category despite the name.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parent_categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::category_assignment::Entity")]
    CategoryAssignments,
}

impl Related<super::category_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CategoryAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
