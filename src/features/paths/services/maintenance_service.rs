use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::models::Category;
use crate::features::paths::services::path_resolver::{PathResolver, ResolvedPath};
use crate::features::paths::services::propagation_service::{
    DescendantPropagator, PropagationStats,
};
use crate::modules::storage::{CategoryFilter, PostFilter, SharedTreeStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathIssue {
    CategoryPath {
        id: Uuid,
        stored_path: String,
        stored_depth: i32,
        expected_path: String,
        expected_depth: i32,
    },
    PostPath {
        id: Uuid,
        stored_path: String,
        expected_path: String,
    },
    /// Two siblings share a slug; rebuilding paths cannot fix this
    DuplicateCategorySlug {
        parent_category_id: Option<Uuid>,
        slug: String,
    },
    DuplicatePostSlug {
        category_id: Option<Uuid>,
        slug: String,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PathReport {
    pub categories_checked: usize,
    pub posts_checked: usize,
    pub issues: Vec<PathIssue>,
}

impl PathReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues that `rebuild_all` can repair
    pub fn has_path_issues(&self) -> bool {
        self.issues.iter().any(|issue| {
            matches!(
                issue,
                PathIssue::CategoryPath { .. } | PathIssue::PostPath { .. }
            )
        })
    }
}

/// Whole-table checks and repairs of stored paths
pub struct PathMaintenanceService {
    store: SharedTreeStore,
}

impl PathMaintenanceService {
    pub fn new(store: SharedTreeStore) -> Self {
        Self { store }
    }

    /// Compare every stored path against its parent's stored path. Read-only.
    pub async fn verify(&self) -> Result<PathReport> {
        let mut uow = self.store.begin().await?;
        let categories = uow.query_categories(&CategoryFilter::All).await?;
        let posts = uow.query_posts(&PostFilter::All).await?;
        uow.commit().await?;

        let by_id: HashMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();
        let mut report = PathReport {
            categories_checked: categories.len(),
            posts_checked: posts.len(),
            issues: Vec::new(),
        };

        let mut sibling_slugs: HashSet<(Option<Uuid>, &str)> = HashSet::new();
        for category in &categories {
            let parent = category
                .parent_category_id
                .and_then(|id| by_id.get(&id).copied());
            let expected = PathResolver::category_path_under(parent, &category.slug);
            if ResolvedPath::of(category) != expected {
                report.issues.push(PathIssue::CategoryPath {
                    id: category.id,
                    stored_path: category.full_path.clone(),
                    stored_depth: category.depth,
                    expected_path: expected.full_path,
                    expected_depth: expected.depth,
                });
            }
            if !sibling_slugs.insert((category.parent_category_id, category.slug.as_str())) {
                report.issues.push(PathIssue::DuplicateCategorySlug {
                    parent_category_id: category.parent_category_id,
                    slug: category.slug.clone(),
                });
            }
        }

        let mut post_slugs: HashSet<(Option<Uuid>, &str)> = HashSet::new();
        for post in &posts {
            let category = post.category_id.and_then(|id| by_id.get(&id).copied());
            let expected = PathResolver::post_path_under(category, &post.slug);
            if post.full_path != expected {
                report.issues.push(PathIssue::PostPath {
                    id: post.id,
                    stored_path: post.full_path.clone(),
                    expected_path: expected,
                });
            }
            if !post_slugs.insert((post.category_id, post.slug.as_str())) {
                report.issues.push(PathIssue::DuplicatePostSlug {
                    category_id: post.category_id,
                    slug: post.slug.clone(),
                });
            }
        }

        if report.is_consistent() {
            tracing::info!(
                "Verified {} categories and {} posts, all paths consistent",
                report.categories_checked,
                report.posts_checked
            );
        } else {
            tracing::warn!(
                "Found {} path issues across {} categories and {} posts",
                report.issues.len(),
                report.categories_checked,
                report.posts_checked
            );
        }

        Ok(report)
    }

    /// Recompute every stored path in one transaction.
    ///
    /// Categories without a parent, or whose parent no longer exists, are treated
    /// as roots; each root subtree is then propagated. Posts outside any existing
    /// category get their bare slug as path.
    pub async fn rebuild_all(&self) -> Result<PropagationStats> {
        let mut uow = self.store.begin().await?;
        let categories = uow.query_categories(&CategoryFilter::All).await?;
        let ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
        let mut stats = PropagationStats::default();

        let roots: Vec<Category> = categories
            .iter()
            .filter(|c| c.parent_category_id.is_none_or(|id| !ids.contains(&id)))
            .cloned()
            .collect();

        let mut reached = 0;
        for mut root in roots {
            let resolved = ResolvedPath::root(&root.slug);
            if ResolvedPath::of(&root) != resolved {
                resolved.assign_to(&mut root);
                root.updated_at = Utc::now();
                uow.save_category(&root).await?;
                stats.categories_updated += 1;
            }

            let subtree = DescendantPropagator::propagate_in(uow.as_mut(), &root).await?;
            reached += 1 + subtree.categories_updated;
            stats.absorb(subtree);
        }

        if reached < categories.len() {
            tracing::warn!(
                "{} categories are not reachable from any root (cyclic parent links), left untouched",
                categories.len() - reached
            );
        }

        for mut post in uow.query_posts(&PostFilter::All).await? {
            let owned = post.category_id.is_some_and(|id| ids.contains(&id));
            if owned || post.full_path == post.slug {
                continue;
            }
            post.full_path = post.slug.clone();
            post.updated_at = Utc::now();
            uow.save_post(&post).await?;
            stats.posts_updated += 1;
        }

        uow.commit().await?;
        tracing::info!(
            "Rebuilt paths for {} categories and {} posts",
            stats.categories_updated,
            stats.posts_updated
        );

        Ok(stats)
    }
}
