mod category_service;
mod tree_service;

pub use category_service::CategoryService;
pub use tree_service::{TreeOptions, TreeService};
