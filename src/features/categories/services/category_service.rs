use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{CreateCategoryDto, UpdateCategoryDto};
use crate::features::categories::models::Category;
use crate::features::paths::services::{DescendantPropagator, PathResolver};
use crate::modules::storage::{
    CategoryFilter, PostFilter, SharedTreeStore, SlugScope, TreeUnitOfWork,
};
use crate::shared::slug::allocate_in_scope;

/// Service for category operations.
///
/// Every write runs as one unit of work: slug allocation, path resolution, the
/// row write and any propagation commit together or not at all.
pub struct CategoryService {
    store: SharedTreeStore,
}

impl CategoryService {
    pub fn new(store: SharedTreeStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, dto: CreateCategoryDto) -> Result<Category> {
        dto.validate()?;

        let mut uow = self.store.begin().await?;
        if let Some(parent_id) = dto.parent_category_id {
            Self::require_category(uow.as_mut(), parent_id, "Parent category").await?;
        }

        let slug = allocate_in_scope(
            uow.as_mut(),
            dto.slug.as_deref().unwrap_or(&dto.name),
            SlugScope::CategorySiblings {
                parent_category_id: dto.parent_category_id,
            },
            None,
        )
        .await?;
        let resolved =
            PathResolver::resolve_category(uow.as_mut(), dto.parent_category_id, &slug).await?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::now_v7(),
            parent_category_id: dto.parent_category_id,
            name: dto.name,
            slug,
            description: dto.description,
            sort_order: dto.sort_order,
            full_path: resolved.full_path,
            depth: resolved.depth,
            metadata: dto.metadata,
            featured_image: dto.featured_image,
            seo_title: dto.seo_title,
            seo_description: dto.seo_description,
            tags: dto.tags,
            created_at: now,
            updated_at: now,
        };

        uow.insert_category(&category).await?;
        uow.commit().await?;

        tracing::info!(
            "Created category '{}' ({}) at '{}'",
            category.name,
            category.id,
            category.full_path
        );
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, dto: UpdateCategoryDto) -> Result<Category> {
        dto.validate()?;

        let mut uow = self.store.begin().await?;
        let mut category = Self::require_category(uow.as_mut(), id, "Category").await?;
        let previous_slug = category.slug.clone();
        let previous_parent = category.parent_category_id;

        let parent_category_id = dto.parent_category_id.unwrap_or(previous_parent);
        let parent_changed = parent_category_id != previous_parent;
        if parent_changed {
            if let Some(parent_id) = parent_category_id {
                Self::ensure_not_below(uow.as_mut(), id, parent_id).await?;
            }
        }

        if let Some(name) = dto.name {
            category.name = name;
        }
        if let Some(sort_order) = dto.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(description) = dto.description {
            category.description = description;
        }
        if let Some(metadata) = dto.metadata {
            category.metadata = metadata;
        }
        if let Some(featured_image) = dto.featured_image {
            category.featured_image = featured_image;
        }
        if let Some(seo_title) = dto.seo_title {
            category.seo_title = seo_title;
        }
        if let Some(seo_description) = dto.seo_description {
            category.seo_description = seo_description;
        }
        if let Some(tags) = dto.tags {
            category.tags = tags;
        }

        let requested_slug = dto.slug.filter(|slug| *slug != previous_slug);
        if requested_slug.is_some() || parent_changed {
            // Keeps the current slug unless it collides in the (new) sibling scope
            let candidate = requested_slug.unwrap_or_else(|| previous_slug.clone());
            category.slug = allocate_in_scope(
                uow.as_mut(),
                &candidate,
                SlugScope::CategorySiblings { parent_category_id },
                Some(id),
            )
            .await?;
        }
        category.parent_category_id = parent_category_id;

        PathResolver::apply_to_category(uow.as_mut(), &mut category).await?;
        category.updated_at = Utc::now();
        uow.save_category(&category).await?;

        let propagated = category.slug != previous_slug || parent_changed;
        if propagated {
            DescendantPropagator::propagate_in(uow.as_mut(), &category).await?;
        }
        uow.commit().await.map_err(|e| {
            if propagated {
                AppError::propagation_failed(id, e)
            } else {
                e
            }
        })?;

        tracing::info!(
            "Updated category '{}' ({}) at '{}'",
            category.name,
            category.id,
            category.full_path
        );
        Ok(category)
    }

    /// Delete a leaf category. Its posts are kept and moved to the uncategorized set.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut uow = self.store.begin().await?;
        let category = Self::require_category(uow.as_mut(), id, "Category").await?;

        let child_count = uow.count_child_categories(id).await?;
        if child_count > 0 {
            tracing::warn!(
                "Refusing to delete category '{}' ({}) with {} subcategories",
                category.full_path,
                id,
                child_count
            );
            return Err(AppError::HasChildren {
                category_id: id,
                child_count,
            });
        }

        let posts = uow.query_posts(&PostFilter::owned_by(id)).await?;
        let detached = posts.len();
        for mut post in posts {
            post.slug = allocate_in_scope(
                uow.as_mut(),
                &post.slug,
                SlugScope::CategoryPosts { category_id: None },
                Some(post.id),
            )
            .await?;
            post.category_id = None;
            PathResolver::apply_to_post(uow.as_mut(), &mut post).await?;
            post.updated_at = Utc::now();
            uow.save_post(&post).await?;
        }

        uow.delete_category(id).await?;
        uow.commit().await?;

        tracing::info!(
            "Deleted category '{}' ({}), {} posts moved to uncategorized",
            category.full_path,
            id,
            detached
        );
        Ok(())
    }

    pub async fn find(&self, id: Uuid) -> Result<Category> {
        let mut uow = self.store.begin().await?;
        let category = Self::require_category(uow.as_mut(), id, "Category").await?;
        uow.commit().await?;
        Ok(category)
    }

    pub async fn find_by_path(&self, full_path: &str) -> Result<Category> {
        let mut uow = self.store.begin().await?;
        let category = uow
            .query_categories(&CategoryFilter::FullPath(full_path.to_string()))
            .await?
            .into_iter()
            .next();
        uow.commit().await?;

        category.ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", full_path)))
    }

    async fn require_category(
        uow: &mut dyn TreeUnitOfWork,
        id: Uuid,
        label: &str,
    ) -> Result<Category> {
        uow.find_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", label, id)))
    }

    /// Walk up from `new_parent_id` and reject the move if it reaches `id`
    async fn ensure_not_below(
        uow: &mut dyn TreeUnitOfWork,
        id: Uuid,
        new_parent_id: Uuid,
    ) -> Result<()> {
        let mut visited = HashSet::new();
        let mut cursor = Some(new_parent_id);

        while let Some(current) = cursor {
            if current == id {
                return Err(AppError::Validation(format!(
                    "Category {} cannot be moved below itself or one of its descendants",
                    id
                )));
            }
            if !visited.insert(current) {
                break;
            }
            let ancestor = Self::require_category(uow, current, "Parent category").await?;
            cursor = ancestor.parent_category_id;
        }

        Ok(())
    }
}
