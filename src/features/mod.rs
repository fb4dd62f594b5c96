pub mod categories;
pub mod paths;
pub mod posts;
