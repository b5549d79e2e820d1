pub mod errors;
pub mod resolve;
pub mod types;

pub use resolve::{OrderByKeyPart, QuerySchema};
pub use types::{
    DdlField, NullsOrder, OrderByColumn, QBufOptions, QuerySpec, SelectColumn, SortDirection,
};
