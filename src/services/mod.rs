//! Workflow services. Each multi-statement operation runs in one transaction that is
//! committed at the end and rolled back when dropped on an error path.

pub mod catalog;
pub mod orders;
pub mod products;
pub mod reports;

pub use catalog::CatalogService;
pub use orders::{OrderService, OrderSettings};
pub use products::ProductService;
pub use reports::ReportService;

use metrics::counter;
use tracing::{error, warn};

use crate::errors::{ErrorKind, ServiceError};

/// Logs and counts the outcome of a write operation.
///
/// Validation and lookup-miss failures are expected and only warned about; unexpected
/// failures are logged as errors with the operation name.
pub(crate) fn record_outcome<T>(
    operation: &'static str,
    result: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    match &result {
        Ok(_) => counter!("stockroom.operation.committed", 1, "operation" => operation),
        Err(e) => {
            match e.kind() {
                ErrorKind::Unexpected => {
                    error!(operation, error = %e, "Operation failed unexpectedly")
                }
                ErrorKind::Validation | ErrorKind::LookupMiss => {
                    warn!(operation, error = %e, "Operation rejected")
                }
            }
            counter!("stockroom.operation.rolled_back", 1, "operation" => operation);
        }
    }
    result
}

/// Trims a taxonomy or product name and rejects blank input.
pub(crate) fn normalize_name(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}
