use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::Category;
use crate::features::paths::services::path_resolver::{PathResolver, ResolvedPath};
use crate::modules::storage::{CategoryFilter, PostFilter, SharedTreeStore, TreeUnitOfWork};

/// Rows rewritten by one propagation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    pub categories_updated: usize,
    pub posts_updated: usize,
}

impl PropagationStats {
    pub fn absorb(&mut self, other: PropagationStats) {
        self.categories_updated += other.categories_updated;
        self.posts_updated += other.posts_updated;
    }
}

/// Pushes a category's settled path down to its whole subtree and to every post
/// owned inside it.
pub struct DescendantPropagator {
    store: SharedTreeStore,
}

impl DescendantPropagator {
    pub fn new(store: SharedTreeStore) -> Self {
        Self { store }
    }

    /// Propagate the stored path of `category_id` in a transaction of its own
    pub async fn propagate(&self, category_id: Uuid) -> Result<PropagationStats> {
        let mut uow = self.store.begin().await?;
        let category = uow
            .find_category(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", category_id)))?;

        let stats = Self::propagate_in(uow.as_mut(), &category).await?;
        uow.commit()
            .await
            .map_err(|e| AppError::propagation_failed(category_id, e))?;

        Ok(stats)
    }

    /// Propagate inside an open unit of work. `category` must already carry its
    /// new `full_path`/`depth` and have been saved in `uow`.
    ///
    /// Any failure is reported as `PropagationFailed`; the caller must drop `uow`
    /// so nothing of the partial walk is committed.
    pub async fn propagate_in(
        uow: &mut dyn TreeUnitOfWork,
        category: &Category,
    ) -> Result<PropagationStats> {
        let stats = Self::walk(uow, category).await.map_err(|e| {
            tracing::error!(
                "Path propagation below '{}' ({}) failed: {}",
                category.full_path,
                category.id,
                e
            );
            AppError::propagation_failed(category.id, e)
        })?;

        tracing::info!(
            "Propagated path '{}' to {} categories and {} posts",
            category.full_path,
            stats.categories_updated,
            stats.posts_updated
        );
        Ok(stats)
    }

    /// Pre-order walk with an explicit stack: a node is rewritten and its posts
    /// refreshed before any of its children, and a child's subtree is finished
    /// before its next sibling.
    async fn walk(uow: &mut dyn TreeUnitOfWork, root: &Category) -> Result<PropagationStats> {
        let mut stats = PropagationStats::default();
        let mut settled: HashMap<Uuid, ResolvedPath> = HashMap::new();
        let mut seen: HashSet<Uuid> = HashSet::from([root.id]);

        stats.posts_updated += Self::refresh_posts(uow, root).await?;
        settled.insert(root.id, ResolvedPath::of(root));

        let mut stack = Self::children_of(uow, root.id).await?;
        while let Some(mut child) = stack.pop() {
            if !seen.insert(child.id) {
                return Err(AppError::Internal(format!(
                    "Category {} appears twice below {}, parent links form a cycle",
                    child.id, root.id
                )));
            }

            let parent_path = child
                .parent_category_id
                .and_then(|parent_id| settled.get(&parent_id))
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Parent of category {} was not settled before it",
                        child.id
                    ))
                })?;
            let resolved = parent_path.child(&child.slug);

            tracing::debug!(
                "Rewriting category {} path '{}' -> '{}'",
                child.id,
                child.full_path,
                resolved.full_path
            );
            settled.insert(child.id, resolved.clone());
            resolved.assign_to(&mut child);
            child.updated_at = Utc::now();
            uow.save_category(&child).await?;
            stats.categories_updated += 1;

            stats.posts_updated += Self::refresh_posts(uow, &child).await?;

            stack.extend(Self::children_of(uow, child.id).await?);
        }

        Ok(stats)
    }

    /// Direct children, reversed so popping yields sibling order
    async fn children_of(uow: &mut dyn TreeUnitOfWork, parent_id: Uuid) -> Result<Vec<Category>> {
        let mut children = uow
            .query_categories(&CategoryFilter::ChildrenOf(parent_id))
            .await?;
        children.reverse();
        Ok(children)
    }

    /// Rewrite the path of every post directly owned by `category`
    pub(crate) async fn refresh_posts(
        uow: &mut dyn TreeUnitOfWork,
        category: &Category,
    ) -> Result<usize> {
        let posts = uow.query_posts(&PostFilter::owned_by(category.id)).await?;
        let count = posts.len();

        for mut post in posts {
            post.full_path = PathResolver::post_path_under(Some(category), &post.slug);
            post.updated_at = Utc::now();
            uow.save_post(&post).await?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::{MemoryTreeStore, TreeStore};
    use crate::shared::test_helpers::{category_row, child_row, post_row};
    use std::sync::Arc;

    /// tech > programming > web, with a post under each; paths already stale
    fn seed_stale_tree(store: &MemoryTreeStore) -> (Category, Category, Category) {
        let mut tech = category_row("Tech", None, "tech", 0);
        let programming = child_row("Programming", &tech, "programming");
        let web = child_row("Web", &programming, "web");
        store.put_category(programming.clone());
        store.put_category(web.clone());

        store.put_post(post_row("Intro", Some(tech.id), "tech/intro"));
        store.put_post(post_row("Basics", Some(programming.id), "tech/programming/basics"));
        store.put_post(post_row("Trends", Some(web.id), "tech/programming/web/trends"));

        tech.slug = "technology".to_string();
        tech.full_path = "technology".to_string();
        store.put_category(tech.clone());
        (tech, programming, web)
    }

    #[tokio::test]
    async fn test_propagate_rewrites_subtree_and_posts() {
        let store = MemoryTreeStore::new();
        let (tech, programming, web) = seed_stale_tree(&store);
        let propagator = DescendantPropagator::new(Arc::new(store.clone()));

        let stats = propagator.propagate(tech.id).await.unwrap();

        assert_eq!(stats.categories_updated, 2);
        assert_eq!(stats.posts_updated, 3);
        assert_eq!(
            store.committed_category(programming.id).unwrap().full_path,
            "technology/programming"
        );
        let web = store.committed_category(web.id).unwrap();
        assert_eq!(web.full_path, "technology/programming/web");
        assert_eq!(web.depth, 2);

        let mut uow = store.begin().await.unwrap();
        let mut paths: Vec<String> = uow
            .query_posts(&PostFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.full_path)
            .collect();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "technology/intro",
                "technology/programming/basics",
                "technology/programming/web/trends",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_whole_subtree() {
        let store = MemoryTreeStore::new();
        let (tech, programming, web) = seed_stale_tree(&store);
        store.fail_writes_for(web.id);
        let propagator = DescendantPropagator::new(Arc::new(store.clone()));

        let err = propagator.propagate(tech.id).await.unwrap_err();

        match err {
            AppError::PropagationFailed {
                category_id,
                source,
            } => {
                assert_eq!(category_id, tech.id);
                assert!(matches!(*source, AppError::Storage(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // programming was rewritten before web failed, but nothing was committed
        assert_eq!(
            store.committed_category(programming.id).unwrap().full_path,
            "tech/programming"
        );

        store.clear_write_failures();
        propagator.propagate(tech.id).await.unwrap();
        assert_eq!(
            store.committed_category(web.id).unwrap().full_path,
            "technology/programming/web"
        );
    }

    #[tokio::test]
    async fn test_cycle_aborts_instead_of_looping() {
        let store = MemoryTreeStore::new();
        let a = category_row("A", None, "a", 0);
        let mut b = child_row("B", &a, "b");
        let mut a_looped = a.clone();
        a_looped.parent_category_id = Some(b.id);
        b.parent_category_id = Some(a.id);
        store.put_category(a_looped);
        store.put_category(b);

        let propagator = DescendantPropagator::new(Arc::new(store.clone()));
        let err = propagator.propagate(a.id).await.unwrap_err();

        assert!(matches!(err, AppError::PropagationFailed { .. }));
    }
}
