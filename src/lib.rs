//! Hierarchical categories and posts with materialized paths.
//!
//! Categories form a forest; each stores `full_path` (its ancestors' slugs and
//! its own, joined by `/`) and `depth`. Posts store their category's path plus
//! their own slug. The services keep those columns consistent on every write:
//!
//! - [`CategoryService`] and [`PostService`] run slug allocation, path
//!   resolution and, for categories, descendant propagation in one unit of work
//! - [`TreeService`] assembles nested views with a fixed number of reads
//! - [`PathMaintenanceService`] verifies or rebuilds every stored path
//!
//! Persistence goes through [`TreeStore`]; [`PgTreeStore`] is the PostgreSQL
//! backend and [`MemoryTreeStore`] an in-process one.

pub mod core;
pub mod features;
pub mod modules;
pub mod shared;

pub use crate::core::config::{Config, PostsConfig, TableNames};
pub use crate::core::error::{AppError, Result};
pub use crate::features::categories::dtos::{CreateCategoryDto, UpdateCategoryDto};
pub use crate::features::categories::models::{Category, CategoryTreeNode};
pub use crate::features::categories::services::{CategoryService, TreeOptions, TreeService};
pub use crate::features::paths::services::{
    DescendantPropagator, PathIssue, PathMaintenanceService, PathReport, PathResolver,
    PropagationStats,
};
pub use crate::features::posts::dtos::{CreatePostDto, UpdatePostDto};
pub use crate::features::posts::models::Post;
pub use crate::features::posts::services::PostService;
pub use crate::modules::storage::{
    MemoryTreeStore, PgTreeStore, SharedTreeStore, TreeStore, TreeUnitOfWork,
};
