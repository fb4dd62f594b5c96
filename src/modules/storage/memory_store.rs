use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Adjacent, CategoryFilter, PostFilter, SlugScope, TreeStore, TreeUnitOfWork};
use crate::core::error::{AppError, Result};
use crate::features::categories::models::Category;
use crate::features::posts::models::Post;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    categories: HashMap<Uuid, Category>,
    posts: HashMap<Uuid, Post>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<MemoryState>,
    queries: AtomicUsize,
    failing_writes: Mutex<HashSet<Uuid>>,
    failing_commits: AtomicBool,
}

/// In-process store. Each unit of work edits a private copy of the committed
/// state and swaps it in on commit, so a dropped unit of work leaves no trace.
/// Overlapping writers are last-commit-wins.
///
/// Enforces the sibling slug unique constraints of the SQL schema, counts read
/// statements and can be told to fail writes for given rows or every commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryTreeStore {
    inner: Arc<Inner>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read statements issued since creation or the last reset
    pub fn query_count(&self) -> usize {
        self.inner.queries.load(Ordering::SeqCst)
    }

    pub fn reset_query_count(&self) {
        self.inner.queries.store(0, Ordering::SeqCst);
    }

    /// Make every later write touching row `id` fail
    pub fn fail_writes_for(&self, id: Uuid) {
        if let Ok(mut failing) = self.inner.failing_writes.lock() {
            failing.insert(id);
        }
    }

    pub fn clear_write_failures(&self) {
        if let Ok(mut failing) = self.inner.failing_writes.lock() {
            failing.clear();
        }
        self.inner.failing_commits.store(false, Ordering::SeqCst);
    }

    /// Make every later commit fail, leaving the committed state untouched
    pub fn fail_commits(&self) {
        self.inner.failing_commits.store(true, Ordering::SeqCst);
    }

    /// Committed category, bypassing the query counter
    pub fn committed_category(&self, id: Uuid) -> Option<Category> {
        self.lock_state()
            .ok()
            .and_then(|state| state.categories.get(&id).cloned())
    }

    /// Committed post, bypassing the query counter
    pub fn committed_post(&self, id: Uuid) -> Option<Post> {
        self.lock_state()
            .ok()
            .and_then(|state| state.posts.get(&id).cloned())
    }

    /// Write a committed category row as-is, skipping constraints
    pub fn put_category(&self, category: Category) {
        if let Ok(mut state) = self.lock_state() {
            state.categories.insert(category.id, category);
        }
    }

    /// Write a committed post row as-is, skipping constraints
    pub fn put_post(&self, post: Post) {
        if let Ok(mut state) = self.lock_state() {
            state.posts.insert(post.id, post);
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.inner
            .state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TreeStore for MemoryTreeStore {
    async fn begin(&self) -> Result<Box<dyn TreeUnitOfWork>> {
        let working = self.lock_state()?.clone();
        Ok(Box::new(MemoryUnitOfWork {
            working,
            store: self.clone(),
        }))
    }
}

struct MemoryUnitOfWork {
    working: MemoryState,
    store: MemoryTreeStore,
}

impl MemoryUnitOfWork {
    fn count_query(&self) {
        self.store.inner.queries.fetch_add(1, Ordering::SeqCst);
    }

    fn check_writable(&self, id: Uuid) -> Result<()> {
        let failing = self
            .store
            .inner
            .failing_writes
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))?;
        if failing.contains(&id) {
            return Err(AppError::Storage(format!("write rejected for row {}", id)));
        }
        Ok(())
    }

    fn check_category_unique(&self, category: &Category) -> Result<()> {
        let clash = self.working.categories.values().any(|other| {
            other.id != category.id
                && other.parent_category_id == category.parent_category_id
                && other.slug == category.slug
        });
        if clash {
            return Err(AppError::Storage(format!(
                "duplicate key value violates unique constraint \"categories_parent_slug_unique\" (slug '{}')",
                category.slug
            )));
        }
        Ok(())
    }

    fn check_post_unique(&self, post: &Post) -> Result<()> {
        let clash = self.working.posts.values().any(|other| {
            other.id != post.id && other.category_id == post.category_id && other.slug == post.slug
        });
        if clash {
            return Err(AppError::Storage(format!(
                "duplicate key value violates unique constraint \"posts_category_slug_unique\" (slug '{}')",
                post.slug
            )));
        }
        Ok(())
    }
}

fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(|a, b| a.sibling_order(b).then_with(|| a.id.cmp(&b.id)));
}

fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| a.listing_order(b).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl TreeUnitOfWork for MemoryUnitOfWork {
    async fn find_category(&mut self, id: Uuid) -> Result<Option<Category>> {
        self.count_query();
        Ok(self.working.categories.get(&id).cloned())
    }

    async fn query_categories(&mut self, filter: &CategoryFilter) -> Result<Vec<Category>> {
        self.count_query();
        let descendant_prefix = match filter {
            CategoryFilter::Subtree { root_path, .. } => Some(format!("{}/", root_path)),
            _ => None,
        };

        let mut categories: Vec<Category> = self
            .working
            .categories
            .values()
            .filter(|c| match filter {
                CategoryFilter::All => true,
                CategoryFilter::ChildrenOf(parent_id) => c.parent_category_id == Some(*parent_id),
                CategoryFilter::Subtree { root_id, .. } => {
                    c.id == *root_id
                        || descendant_prefix
                            .as_deref()
                            .is_some_and(|prefix| c.full_path.starts_with(prefix))
                }
                CategoryFilter::FullPath(path) => c.full_path == *path,
            })
            .cloned()
            .collect();
        sort_categories(&mut categories);

        Ok(categories)
    }

    async fn count_child_categories(&mut self, id: Uuid) -> Result<i64> {
        self.count_query();
        let count = self
            .working
            .categories
            .values()
            .filter(|c| c.parent_category_id == Some(id))
            .count();
        Ok(count as i64)
    }

    async fn insert_category(&mut self, category: &Category) -> Result<()> {
        self.check_writable(category.id)?;
        if self.working.categories.contains_key(&category.id) {
            return Err(AppError::Storage(format!(
                "duplicate key value violates unique constraint \"categories_pkey\" ({})",
                category.id
            )));
        }
        self.check_category_unique(category)?;
        self.working
            .categories
            .insert(category.id, category.clone());
        Ok(())
    }

    async fn save_category(&mut self, category: &Category) -> Result<()> {
        self.check_writable(category.id)?;
        if !self.working.categories.contains_key(&category.id) {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                category.id
            )));
        }
        self.check_category_unique(category)?;
        self.working
            .categories
            .insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(&mut self, id: Uuid) -> Result<bool> {
        self.check_writable(id)?;
        if self
            .working
            .categories
            .values()
            .any(|c| c.parent_category_id == Some(id))
        {
            return Err(AppError::Storage(format!(
                "update or delete on table \"categories\" violates foreign key constraint (category {})",
                id
            )));
        }
        Ok(self.working.categories.remove(&id).is_some())
    }

    async fn find_post(&mut self, id: Uuid) -> Result<Option<Post>> {
        self.count_query();
        Ok(self.working.posts.get(&id).cloned())
    }

    async fn query_posts(&mut self, filter: &PostFilter) -> Result<Vec<Post>> {
        self.count_query();
        let mut posts: Vec<Post> = self
            .working
            .posts
            .values()
            .filter(|p| match filter {
                PostFilter::All => true,
                PostFilter::InCategories {
                    category_ids,
                    include_unpublished,
                } => {
                    p.category_id.is_some_and(|id| category_ids.contains(&id))
                        && (*include_unpublished || p.is_published())
                }
                PostFilter::FullPath(path) => p.full_path == *path,
            })
            .cloned()
            .collect();
        sort_posts(&mut posts);

        Ok(posts)
    }

    async fn adjacent_post(
        &mut self,
        category_id: Option<Uuid>,
        sort_order: i32,
        direction: Adjacent,
    ) -> Result<Option<Post>> {
        self.count_query();
        let candidates = self
            .working
            .posts
            .values()
            .filter(|p| p.category_id == category_id);

        let post = match direction {
            Adjacent::Next => candidates
                .filter(|p| p.sort_order > sort_order)
                .min_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id))),
            Adjacent::Previous => candidates
                .filter(|p| p.sort_order < sort_order)
                .max_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id))),
        };

        Ok(post.cloned())
    }

    async fn insert_post(&mut self, post: &Post) -> Result<()> {
        self.check_writable(post.id)?;
        if self.working.posts.contains_key(&post.id) {
            return Err(AppError::Storage(format!(
                "duplicate key value violates unique constraint \"posts_pkey\" ({})",
                post.id
            )));
        }
        self.check_post_unique(post)?;
        self.working.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn save_post(&mut self, post: &Post) -> Result<()> {
        self.check_writable(post.id)?;
        if !self.working.posts.contains_key(&post.id) {
            return Err(AppError::NotFound(format!("Post {} not found", post.id)));
        }
        self.check_post_unique(post)?;
        self.working.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn delete_post(&mut self, id: Uuid) -> Result<bool> {
        self.check_writable(id)?;
        Ok(self.working.posts.remove(&id).is_some())
    }

    async fn slugs_in_scope(
        &mut self,
        scope: SlugScope,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<String>> {
        self.count_query();
        let slugs = match scope {
            SlugScope::CategorySiblings { parent_category_id } => self
                .working
                .categories
                .values()
                .filter(|c| c.parent_category_id == parent_category_id)
                .filter(|c| Some(c.id) != exclude_id)
                .map(|c| c.slug.clone())
                .collect(),
            SlugScope::CategoryPosts { category_id } => self
                .working
                .posts
                .values()
                .filter(|p| p.category_id == category_id)
                .filter(|p| Some(p.id) != exclude_id)
                .map(|p| p.slug.clone())
                .collect(),
        };

        Ok(slugs)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUnitOfWork { working, store } = *self;
        if store.inner.failing_commits.load(Ordering::SeqCst) {
            return Err(AppError::Storage("commit rejected".to_string()));
        }
        *store.lock_state()? = working;
        Ok(())
    }
}
