use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::ServiceError;
use crate::repositories::lookup::{self, ASSIGNMENT_SEPARATOR};

/// Identifies a category assignment without relying on a formatted label.
///
/// `Label` accepts the legacy `"Category - Parent"` text and is only resolvable when the
/// separator occurs exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssignmentSelector {
    Id { id: i32 },
    Names { category: String, parent: String },
    Label(String),
}

impl AssignmentSelector {
    pub fn names(category: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::Names {
            category: category.into(),
            parent: parent.into(),
        }
    }

    /// Resolves the selector to a `category_assignments.id`.
    pub async fn resolve<C: ConnectionTrait>(&self, db: &C) -> Result<i32, ServiceError> {
        let (category, parent) = match self {
            Self::Id { id } => {
                return lookup::assignment_row(db, *id)
                    .await?
                    .map(|row| row.id)
                    .ok_or_else(|| ServiceError::NotFound(format!("Category assignment {}", id)))
            }
            Self::Names { category, parent } => {
                (category.trim().to_string(), parent.trim().to_string())
            }
            Self::Label(label) => split_label(label)?,
        };

        lookup::assignment_id_by_names(db, &category, &parent)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Category assignment {}{}{}",
                    category, ASSIGNMENT_SEPARATOR, parent
                ))
            })
    }
}

fn split_label(label: &str) -> Result<(String, String), ServiceError> {
    let parts: Vec<&str> = label.split(ASSIGNMENT_SEPARATOR).collect();
    match parts.as_slice() {
        [category, parent] if !category.trim().is_empty() && !parent.trim().is_empty() => {
            Ok((category.trim().to_string(), parent.trim().to_string()))
        }
        _ => Err(ServiceError::ValidationError(format!(
            "'{}' is not a '<category>{}<parent category>' label",
            label, ASSIGNMENT_SEPARATOR
        ))),
    }
}

impl FromStr for AssignmentSelector {
    type Err = ServiceError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let (category, parent) = split_label(label)?;
        Ok(Self::Names { category, parent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_legacy_label() {
        let selector: AssignmentSelector = "Dry Food - Chicken".parse().unwrap();
        assert_eq!(selector, AssignmentSelector::names("Dry Food", "Chicken"));
    }

    #[test]
    fn rejects_ambiguous_or_partial_labels() {
        assert_matches!(
            "Dry - Food - Chicken".parse::<AssignmentSelector>(),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            "Dry Food".parse::<AssignmentSelector>(),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            " - Chicken".parse::<AssignmentSelector>(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn deserializes_every_shape() {
        let by_id: AssignmentSelector = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(by_id, AssignmentSelector::Id { id: 4 });

        let by_names: AssignmentSelector =
            serde_json::from_str(r#"{"category": "Dry Food", "parent": "Chicken"}"#).unwrap();
        assert_eq!(by_names, AssignmentSelector::names("Dry Food", "Chicken"));

        let by_label: AssignmentSelector = serde_json::from_str(r#""Dry Food - Chicken""#).unwrap();
        assert_eq!(
            by_label,
            AssignmentSelector::Label("Dry Food - Chicken".to_string())
        );
    }
}
