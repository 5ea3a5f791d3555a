pub mod types;
pub mod store;
pub mod view;
