use crate::engine::schema::errors::SchemaError;
use crate::engine::schema::types::{NullsOrder, QuerySpec, SortDirection};
use crate::engine::types::LogicalType;

/// One resolved ORDER BY key column: a position into the select-shaped
/// row plus how to transform the value for byte-comparable sorting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderByKeyPart {
    pub position: usize,
    pub direction: SortDirection,
    pub nulls: NullsOrder,
}

/// The schema a qbuf keeps for its life: the select columns (names,
/// positions, types) and the resolved ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySchema {
    pub column_names: Vec<String>,
    pub column_types: Vec<LogicalType>,
    pub order_by_key: Vec<OrderByKeyPart>,
}

impl QuerySchema {
    /// Resolve ORDER BY columns against the select clause and the table
    /// definition. Chunks arrive select-shaped, so the sort position
    /// indexes into the select row; the DDL must agree on the column and
    /// its type or the query is not pageable.
    pub fn resolve(spec: &QuerySpec) -> Result<Self, SchemaError> {
        let mut order_by_key = Vec::with_capacity(spec.order_by.len());

        for ob in &spec.order_by {
            let position = spec
                .select
                .iter()
                .position(|c| c.name == ob.name)
                .ok_or_else(|| SchemaError::OrderByNotSelected(ob.name.clone()))?;

            let ddl_field = spec
                .ddl
                .iter()
                .find(|f| f.name == ob.name)
                .ok_or_else(|| SchemaError::OrderByNotInDdl(ob.name.clone()))?;

            let select_type = spec.select[position].return_type;
            if ddl_field.field_type != select_type {
                return Err(SchemaError::OrderByTypeMismatch(ob.name.clone()));
            }

            order_by_key.push(OrderByKeyPart {
                position,
                direction: ob.direction,
                nulls: ob.nulls,
            });
        }

        Ok(Self {
            column_names: spec.select.iter().map(|c| c.name.clone()).collect(),
            column_types: spec.select.iter().map(|c| c.return_type).collect(),
            order_by_key,
        })
    }
}
