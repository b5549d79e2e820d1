use crate::engine::qbuf::Row;
use crate::engine::types::ScalarValue;

/// Shorthand builders for chunk rows.
pub struct RowFactory;

impl RowFactory {
    pub fn ints(values: &[i64]) -> Vec<Row> {
        values.iter().map(|v| vec![ScalarValue::Int64(*v)]).collect()
    }

    pub fn opt_ints(values: &[Option<i64>]) -> Vec<Row> {
        values
            .iter()
            .map(|v| {
                vec![v.map(ScalarValue::Int64).unwrap_or(ScalarValue::Null)]
            })
            .collect()
    }

    pub fn int_pairs(values: &[(i64, i64)]) -> Vec<Row> {
        values
            .iter()
            .map(|(a, b)| vec![ScalarValue::Int64(*a), ScalarValue::Int64(*b)])
            .collect()
    }

    /// Rows from a JSON array of arrays, for mixed-type fixtures.
    pub fn from_json(rows: &serde_json::Value) -> Vec<Row> {
        rows.as_array()
            .expect("fixture must be an array of rows")
            .iter()
            .map(|row| {
                row.as_array()
                    .expect("each row must be an array")
                    .iter()
                    .map(|cell| ScalarValue::from(cell.clone()))
                    .collect()
            })
            .collect()
    }
}
