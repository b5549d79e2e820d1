pub mod manager_factory;
pub mod query_spec_factory;
pub mod row_factory;

pub use manager_factory::QBufManagerFactory;
pub use query_spec_factory::QuerySpecFactory;
pub use row_factory::RowFactory;
