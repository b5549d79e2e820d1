pub mod composite;
pub mod row;
pub mod sort_key;
