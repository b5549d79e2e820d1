use thiserror::Error;

/// Reasons a query cannot be paged through a query buffer.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("ORDER BY column is not in the select clause: {0}")]
    OrderByNotSelected(String),

    #[error("ORDER BY column is not in the table definition: {0}")]
    OrderByNotInDdl(String),

    #[error("ORDER BY column type differs between select and table definition: {0}")]
    OrderByTypeMismatch(String),
}
