//! Persistence seam for the category tree.
//!
//! A [`TreeStore`] hands out [`TreeUnitOfWork`]s. Everything done through one
//! unit of work is a single transaction: `commit` makes it visible, dropping the
//! unit of work discards it. Writes here are plain row writes; slug allocation,
//! path resolution and propagation are driven by the services.

mod memory_store;
mod postgres_store;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::models::Category;
use crate::features::posts::models::Post;

pub use memory_store::MemoryTreeStore;
pub use postgres_store::PgTreeStore;

/// Category selections. Results are always ordered by `(sort_order, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    ChildrenOf(Uuid),
    /// The root itself plus every category whose `full_path` starts with `root_path/`
    Subtree { root_id: Uuid, root_path: String },
    FullPath(String),
}

/// Post selections. Results are always ordered by `(published_at, title)` with
/// unpublished posts last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    InCategories {
        category_ids: Vec<Uuid>,
        include_unpublished: bool,
    },
    FullPath(String),
}

impl PostFilter {
    /// Every post directly owned by `category_id`, published or not
    pub fn owned_by(category_id: Uuid) -> Self {
        PostFilter::InCategories {
            category_ids: vec![category_id],
            include_unpublished: true,
        }
    }
}

/// Set of entities within which a slug must be unique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    /// Categories sharing a parent (`None` is the root set)
    CategorySiblings { parent_category_id: Option<Uuid> },
    /// Posts sharing a category (`None` is the uncategorized set)
    CategoryPosts { category_id: Option<Uuid> },
}

/// Neighbour lookup by `sort_order` within one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacent {
    Next,
    Previous,
}

#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Start a transaction
    async fn begin(&self) -> Result<Box<dyn TreeUnitOfWork>>;
}

pub type SharedTreeStore = Arc<dyn TreeStore>;

#[async_trait]
pub trait TreeUnitOfWork: Send {
    // ==================== Categories ====================

    async fn find_category(&mut self, id: Uuid) -> Result<Option<Category>>;

    async fn query_categories(&mut self, filter: &CategoryFilter) -> Result<Vec<Category>>;

    async fn count_child_categories(&mut self, id: Uuid) -> Result<i64>;

    async fn insert_category(&mut self, category: &Category) -> Result<()>;

    /// Persist all columns of an existing row
    async fn save_category(&mut self, category: &Category) -> Result<()>;

    async fn delete_category(&mut self, id: Uuid) -> Result<bool>;

    // ==================== Posts ====================

    async fn find_post(&mut self, id: Uuid) -> Result<Option<Post>>;

    async fn query_posts(&mut self, filter: &PostFilter) -> Result<Vec<Post>>;

    async fn adjacent_post(
        &mut self,
        category_id: Option<Uuid>,
        sort_order: i32,
        direction: Adjacent,
    ) -> Result<Option<Post>>;

    async fn insert_post(&mut self, post: &Post) -> Result<()>;

    async fn save_post(&mut self, post: &Post) -> Result<()>;

    async fn delete_post(&mut self, id: Uuid) -> Result<bool>;

    // ==================== Slugs ====================

    /// Slugs already used in `scope`, ignoring the row `exclude_id`
    async fn slugs_in_scope(
        &mut self,
        scope: SlugScope,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<String>>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
