use serde::{Deserialize, Serialize};

use crate::engine::types::LogicalType;

/// One column of the compiled select clause, in row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectColumn {
    pub name: String,
    pub return_type: LogicalType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullsOrder {
    First,
    Last,
}

/// One column of the compiled ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByColumn {
    pub name: String,
    pub direction: SortDirection,
    pub nulls: NullsOrder,
}

impl OrderByColumn {
    pub fn asc(name: &str) -> Self {
        Self {
            name: name.to_string(),
            direction: SortDirection::Asc,
            nulls: NullsOrder::First,
        }
    }

    pub fn desc(name: &str) -> Self {
        Self {
            name: name.to_string(),
            direction: SortDirection::Desc,
            nulls: NullsOrder::First,
        }
    }

    pub fn with_nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = nulls;
        self
    }
}

/// One field of the table definition the query was compiled against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdlField {
    pub name: String,
    pub position: usize,
    pub field_type: LogicalType,
}

/// Per-qbuf options supplied at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QBufOptions {
    pub expire_after_ms: Option<u64>,
}

/// Everything the SQL compiler hands over when a paged query needs a
/// buffer: the select clause, the ORDER BY clause, the table definition
/// it resolves against, and how many subquery chunks to expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub table: String,
    pub n_subqueries: u32,
    pub select: Vec<SelectColumn>,
    pub order_by: Vec<OrderByColumn>,
    pub ddl: Vec<DdlField>,
    pub options: QBufOptions,
}

impl QuerySpec {
    /// Human-readable name used in logs only; refs stay opaque.
    pub fn display_name(&self) -> String {
        let select_cols: Vec<&str> = self.select.iter().map(|c| c.name.as_str()).collect();
        let order_cols: Vec<&str> = self.order_by.iter().map(|c| c.name.as_str()).collect();
        format!(
            "{}_{}_{}__{}",
            self.table,
            select_cols.join("-"),
            order_cols.join("-"),
            chrono::Utc::now().timestamp_millis()
        )
    }
}
