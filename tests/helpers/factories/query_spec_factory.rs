use crate::engine::schema::{
    DdlField, OrderByColumn, QBufOptions, QuerySpec, SelectColumn,
};
use crate::engine::types::LogicalType;

/// Builds `QuerySpec`s for tests. The DDL mirrors the select clause
/// unless overridden, which is what the compiler produces for plain
/// projections.
pub struct QuerySpecFactory {
    table: String,
    n_subqueries: u32,
    select: Vec<SelectColumn>,
    order_by: Vec<OrderByColumn>,
    ddl: Option<Vec<DdlField>>,
    expire_after_ms: Option<u64>,
}

impl QuerySpecFactory {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            n_subqueries: 1,
            select: vec![SelectColumn {
                name: "x".to_string(),
                return_type: LogicalType::Integer,
            }],
            order_by: Vec::new(),
            ddl: None,
            expire_after_ms: None,
        }
    }

    pub fn with_columns(mut self, columns: &[(&str, &str)]) -> Self {
        self.select = columns
            .iter()
            .map(|(name, ty)| SelectColumn {
                name: name.to_string(),
                return_type: LogicalType::from(*ty),
            })
            .collect();
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderByColumn>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_chunks(mut self, n_subqueries: u32) -> Self {
        self.n_subqueries = n_subqueries;
        self
    }

    pub fn with_ddl(mut self, ddl: Vec<DdlField>) -> Self {
        self.ddl = Some(ddl);
        self
    }

    pub fn with_expire_after_ms(mut self, ms: u64) -> Self {
        self.expire_after_ms = Some(ms);
        self
    }

    pub fn create(self) -> QuerySpec {
        let ddl = self.ddl.unwrap_or_else(|| {
            self.select
                .iter()
                .enumerate()
                .map(|(position, col)| DdlField {
                    name: col.name.clone(),
                    position,
                    field_type: col.return_type,
                })
                .collect()
        });
        QuerySpec {
            table: self.table,
            n_subqueries: self.n_subqueries,
            select: self.select,
            order_by: self.order_by,
            ddl,
            options: QBufOptions {
                expire_after_ms: self.expire_after_ms,
            },
        }
    }
}
