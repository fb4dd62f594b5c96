use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::models::Category;
use crate::features::posts::models::Post;
use crate::modules::storage::TreeUnitOfWork;
use crate::shared::constants::PATH_SEPARATOR;

/// Stored `full_path` and `depth` of a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub full_path: String,
    pub depth: i32,
}

impl ResolvedPath {
    pub fn root(slug: &str) -> Self {
        Self {
            full_path: slug.to_string(),
            depth: 0,
        }
    }

    pub fn of(category: &Category) -> Self {
        Self {
            full_path: category.full_path.clone(),
            depth: category.depth,
        }
    }

    /// Path of a direct child with slug `slug`
    pub fn child(&self, slug: &str) -> Self {
        Self {
            full_path: format!("{}{}{}", self.full_path, PATH_SEPARATOR, slug),
            depth: self.depth + 1,
        }
    }

    pub fn assign_to(self, category: &mut Category) {
        category.full_path = self.full_path;
        category.depth = self.depth;
    }
}

/// Derives materialized paths from the parent chain.
pub struct PathResolver;

impl PathResolver {
    /// Path and depth of a category with slug `slug` placed under `parent`
    pub fn category_path_under(parent: Option<&Category>, slug: &str) -> ResolvedPath {
        match parent {
            Some(parent) => ResolvedPath::of(parent).child(slug),
            None => ResolvedPath::root(slug),
        }
    }

    /// Path of a post with slug `slug` owned by `category`
    pub fn post_path_under(category: Option<&Category>, slug: &str) -> String {
        match category {
            Some(category) => format!("{}{}{}", category.full_path, PATH_SEPARATOR, slug),
            None => slug.to_string(),
        }
    }

    /// Resolve a category path from its pending `parent_category_id` and `slug`.
    ///
    /// The parent is re-read inside `uow` so a parent rewritten earlier in the same
    /// transaction is seen with its new path. A parent id that no longer exists is
    /// treated as no parent.
    pub async fn resolve_category(
        uow: &mut dyn TreeUnitOfWork,
        parent_category_id: Option<Uuid>,
        slug: &str,
    ) -> Result<ResolvedPath> {
        let parent = match parent_category_id {
            Some(parent_id) => {
                let parent = uow.find_category(parent_id).await?;
                if parent.is_none() {
                    tracing::warn!(
                        "Parent category {} not found, resolving '{}' as a root path",
                        parent_id,
                        slug
                    );
                }
                parent
            }
            None => None,
        };

        Ok(Self::category_path_under(parent.as_ref(), slug))
    }

    /// Resolve a post path from its pending `category_id` and `slug`
    pub async fn resolve_post(
        uow: &mut dyn TreeUnitOfWork,
        category_id: Option<Uuid>,
        slug: &str,
    ) -> Result<String> {
        let category = match category_id {
            Some(category_id) => {
                let category = uow.find_category(category_id).await?;
                if category.is_none() {
                    tracing::warn!(
                        "Category {} not found, resolving post '{}' as a root path",
                        category_id,
                        slug
                    );
                }
                category
            }
            None => None,
        };

        Ok(Self::post_path_under(category.as_ref(), slug))
    }

    /// Recompute and assign `full_path`/`depth` on `category`. Returns whether anything changed.
    pub async fn apply_to_category(
        uow: &mut dyn TreeUnitOfWork,
        category: &mut Category,
    ) -> Result<bool> {
        let resolved =
            Self::resolve_category(uow, category.parent_category_id, &category.slug).await?;
        let changed = ResolvedPath::of(category) != resolved;
        resolved.assign_to(category);
        Ok(changed)
    }

    /// Recompute and assign `full_path` on `post`. Returns whether it changed.
    pub async fn apply_to_post(uow: &mut dyn TreeUnitOfWork, post: &mut Post) -> Result<bool> {
        let full_path = Self::resolve_post(uow, post.category_id, &post.slug).await?;
        let changed = post.full_path != full_path;
        post.full_path = full_path;
        Ok(changed)
    }
}
