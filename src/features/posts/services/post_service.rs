use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::paths::services::PathResolver;
use crate::features::posts::dtos::{CreatePostDto, UpdatePostDto};
use crate::features::posts::models::Post;
use crate::modules::storage::{Adjacent, PostFilter, SharedTreeStore, SlugScope, TreeUnitOfWork};
use crate::shared::slug::allocate_in_scope;

/// Service for post operations
pub struct PostService {
    store: SharedTreeStore,
}

impl PostService {
    pub fn new(store: SharedTreeStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, dto: CreatePostDto) -> Result<Post> {
        dto.validate()?;

        let mut uow = self.store.begin().await?;
        Self::ensure_category_exists(uow.as_mut(), dto.category_id).await?;

        let slug = allocate_in_scope(
            uow.as_mut(),
            dto.slug.as_deref().unwrap_or(&dto.title),
            SlugScope::CategoryPosts {
                category_id: dto.category_id,
            },
            None,
        )
        .await?;
        let full_path = PathResolver::resolve_post(uow.as_mut(), dto.category_id, &slug).await?;

        let now = Utc::now();
        let post = Post {
            id: Uuid::now_v7(),
            category_id: dto.category_id,
            author_id: dto.author_id,
            title: dto.title,
            subtitle: dto.subtitle,
            slug,
            full_path,
            sort_order: dto.sort_order,
            body: dto.body,
            published_at: dto.published_at,
            metadata: dto.metadata,
            featured_image: dto.featured_image,
            seo_title: dto.seo_title,
            seo_description: dto.seo_description,
            tags: dto.tags,
            created_at: now,
            updated_at: now,
        };

        uow.insert_post(&post).await?;
        uow.commit().await?;

        tracing::info!("Created post '{}' ({}) at '{}'", post.title, post.id, post.full_path);
        Ok(post)
    }

    pub async fn update(&self, id: Uuid, dto: UpdatePostDto) -> Result<Post> {
        dto.validate()?;

        let mut uow = self.store.begin().await?;
        let mut post = Self::require_post(uow.as_mut(), id).await?;
        let previous_slug = post.slug.clone();

        let category_id = dto.category_id.unwrap_or(post.category_id);
        let category_changed = category_id != post.category_id;
        if category_changed {
            Self::ensure_category_exists(uow.as_mut(), category_id).await?;
        }

        if let Some(title) = dto.title {
            post.title = title;
        }
        if let Some(subtitle) = dto.subtitle {
            post.subtitle = subtitle;
        }
        if let Some(author_id) = dto.author_id {
            post.author_id = author_id;
        }
        if let Some(sort_order) = dto.sort_order {
            post.sort_order = sort_order;
        }
        if let Some(body) = dto.body {
            post.body = body;
        }
        if let Some(published_at) = dto.published_at {
            post.published_at = published_at;
        }
        if let Some(metadata) = dto.metadata {
            post.metadata = metadata;
        }
        if let Some(featured_image) = dto.featured_image {
            post.featured_image = featured_image;
        }
        if let Some(seo_title) = dto.seo_title {
            post.seo_title = seo_title;
        }
        if let Some(seo_description) = dto.seo_description {
            post.seo_description = seo_description;
        }
        if let Some(tags) = dto.tags {
            post.tags = tags;
        }

        let requested_slug = dto.slug.filter(|slug| *slug != previous_slug);
        if requested_slug.is_some() || category_changed {
            let candidate = requested_slug.unwrap_or_else(|| previous_slug.clone());
            post.slug = allocate_in_scope(
                uow.as_mut(),
                &candidate,
                SlugScope::CategoryPosts { category_id },
                Some(id),
            )
            .await?;
        }
        post.category_id = category_id;

        if post.slug != previous_slug || category_changed {
            PathResolver::apply_to_post(uow.as_mut(), &mut post).await?;
        }
        post.updated_at = Utc::now();
        uow.save_post(&post).await?;
        uow.commit().await?;

        tracing::info!("Updated post '{}' ({}) at '{}'", post.title, post.id, post.full_path);
        Ok(post)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut uow = self.store.begin().await?;
        if !uow.delete_post(id).await? {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }
        uow.commit().await?;

        tracing::info!("Deleted post {}", id);
        Ok(())
    }

    pub async fn find(&self, id: Uuid) -> Result<Post> {
        let mut uow = self.store.begin().await?;
        let post = Self::require_post(uow.as_mut(), id).await?;
        uow.commit().await?;
        Ok(post)
    }

    pub async fn find_by_path(&self, full_path: &str) -> Result<Post> {
        let mut uow = self.store.begin().await?;
        let post = uow
            .query_posts(&PostFilter::FullPath(full_path.to_string()))
            .await?
            .into_iter()
            .next();
        uow.commit().await?;

        post.ok_or_else(|| AppError::NotFound(format!("Post '{}' not found", full_path)))
    }

    /// Nearest post in the same category with a greater `sort_order`
    pub async fn next(&self, post: &Post) -> Result<Option<Post>> {
        self.adjacent(post, Adjacent::Next).await
    }

    /// Nearest post in the same category with a smaller `sort_order`
    pub async fn previous(&self, post: &Post) -> Result<Option<Post>> {
        self.adjacent(post, Adjacent::Previous).await
    }

    async fn adjacent(&self, post: &Post, direction: Adjacent) -> Result<Option<Post>> {
        let mut uow = self.store.begin().await?;
        let neighbour = uow
            .adjacent_post(post.category_id, post.sort_order, direction)
            .await?;
        uow.commit().await?;
        Ok(neighbour)
    }

    async fn require_post(uow: &mut dyn TreeUnitOfWork, id: Uuid) -> Result<Post> {
        uow.find_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    async fn ensure_category_exists(
        uow: &mut dyn TreeUnitOfWork,
        category_id: Option<Uuid>,
    ) -> Result<()> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        match uow.find_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!(
                "Category {} not found",
                category_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::dtos::CreateCategoryDto;
    use crate::features::categories::services::CategoryService;
    use crate::modules::storage::MemoryTreeStore;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    struct Fixture {
        store: MemoryTreeStore,
        categories: CategoryService,
        posts: PostService,
    }

    fn fixture() -> Fixture {
        let store = MemoryTreeStore::new();
        let shared: SharedTreeStore = Arc::new(store.clone());
        Fixture {
            categories: CategoryService::new(shared.clone()),
            posts: PostService::new(shared),
            store,
        }
    }

    fn ordered(title: &str, category_id: Uuid, sort_order: i32) -> CreatePostDto {
        let mut dto = CreatePostDto::titled(title).in_category(category_id);
        dto.sort_order = sort_order;
        dto
    }

    #[tokio::test]
    async fn test_create_builds_path_from_category() {
        let f = fixture();
        let tech = f.categories.create(CreateCategoryDto::named("Tech")).await.unwrap();

        let post = f
            .posts
            .create(CreatePostDto::titled("Tech Overview").in_category(tech.id))
            .await
            .unwrap();
        let loose = f.posts.create(CreatePostDto::titled("Loose Notes")).await.unwrap();

        assert_eq!(post.slug, "tech-overview");
        assert_eq!(post.full_path, "tech/tech-overview");
        assert_eq!(loose.full_path, "loose-notes");
        assert_eq!(post.url("https://blog.example.com"), "https://blog.example.com/tech/tech-overview");
    }

    #[tokio::test]
    async fn test_slug_unique_within_category_only() {
        let f = fixture();
        let tech = f.categories.create(CreateCategoryDto::named("Tech")).await.unwrap();
        let science = f.categories.create(CreateCategoryDto::named("Science")).await.unwrap();

        let first = f
            .posts
            .create(CreatePostDto::titled("Hello").in_category(tech.id))
            .await
            .unwrap();
        let second = f
            .posts
            .create(CreatePostDto::titled("Hello").in_category(tech.id))
            .await
            .unwrap();
        let other = f
            .posts
            .create(CreatePostDto::titled("Hello").in_category(science.id))
            .await
            .unwrap();

        assert_eq!(first.slug, "hello");
        assert_eq!(second.slug, "hello-1");
        assert_eq!(other.slug, "hello");
    }

    #[tokio::test]
    async fn test_create_in_missing_category_fails() {
        let f = fixture();
        let err = f
            .posts
            .create(CreatePostDto::titled("Hello").in_category(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_move_recomputes_path_and_resolves_collision() {
        let f = fixture();
        let tech = f.categories.create(CreateCategoryDto::named("Tech")).await.unwrap();
        let science = f.categories.create(CreateCategoryDto::named("Science")).await.unwrap();
        f.posts
            .create(CreatePostDto::titled("Hello").in_category(science.id))
            .await
            .unwrap();
        let post = f
            .posts
            .create(CreatePostDto::titled("Hello").in_category(tech.id))
            .await
            .unwrap();

        let moved = f
            .posts
            .update(
                post.id,
                UpdatePostDto {
                    category_id: Some(Some(science.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.slug, "hello-1");
        assert_eq!(moved.full_path, "science/hello-1");

        let detached = f
            .posts
            .update(
                post.id,
                UpdatePostDto {
                    category_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detached.full_path, "hello-1");
    }

    #[tokio::test]
    async fn test_update_clears_subtitle_and_keeps_tags() {
        let f = fixture();
        let mut dto = CreatePostDto::titled("Hello");
        dto.subtitle = Some("A first post".to_string());
        dto.tags = vec!["intro".to_string(), "rust".to_string()];
        let post = f.posts.create(dto).await.unwrap();

        let patch: UpdatePostDto =
            serde_json::from_str(r#"{"subtitle": null, "sort_order": 3}"#).unwrap();
        let updated = f.posts.update(post.id, patch).await.unwrap();

        assert_eq!(updated.subtitle, None);
        assert_eq!(updated.sort_order, 3);
        assert_eq!(updated.tags, vec!["intro", "rust"]);
    }

    #[tokio::test]
    async fn test_title_change_keeps_slug() {
        let f = fixture();
        let post = f.posts.create(CreatePostDto::titled("Hello")).await.unwrap();

        let updated = f
            .posts
            .update(
                post.id,
                UpdatePostDto {
                    title: Some("Goodbye".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Goodbye");
        assert_eq!(updated.slug, "hello");
        assert_eq!(updated.full_path, "hello");
    }

    #[tokio::test]
    async fn test_explicit_slug_change_updates_path() {
        let f = fixture();
        let tech = f.categories.create(CreateCategoryDto::named("Tech")).await.unwrap();
        let post = f
            .posts
            .create(CreatePostDto::titled("Hello").in_category(tech.id))
            .await
            .unwrap();

        let updated = f
            .posts
            .update(
                post.id,
                UpdatePostDto {
                    slug: Some("hello-world".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_path, "tech/hello-world");
        assert_eq!(f.posts.find_by_path("tech/hello-world").await.unwrap().id, post.id);
    }

    #[tokio::test]
    async fn test_next_and_previous_by_sort_order() {
        let f = fixture();
        let tech = f.categories.create(CreateCategoryDto::named("Tech")).await.unwrap();
        let other = f.categories.create(CreateCategoryDto::named("Other")).await.unwrap();
        let first = f.posts.create(ordered("First", tech.id, 1)).await.unwrap();
        let third = f.posts.create(ordered("Third", tech.id, 3)).await.unwrap();
        let second = f.posts.create(ordered("Second", tech.id, 2)).await.unwrap();
        f.posts.create(ordered("Elsewhere", other.id, 2)).await.unwrap();

        assert_eq!(f.posts.next(&first).await.unwrap().map(|p| p.id), Some(second.id));
        assert_eq!(f.posts.next(&second).await.unwrap().map(|p| p.id), Some(third.id));
        assert_eq!(f.posts.next(&third).await.unwrap(), None);
        assert_eq!(f.posts.previous(&third).await.unwrap().map(|p| p.id), Some(second.id));
        assert_eq!(f.posts.previous(&first).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_publish_and_unpublish() {
        let f = fixture();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut dto = CreatePostDto::titled("Scheduled");
        dto.published_at = Some(at - Duration::days(1));
        let post = f.posts.create(dto).await.unwrap();
        assert!(post.is_published());

        let draft = f
            .posts
            .update(
                post.id,
                UpdatePostDto {
                    published_at: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!draft.is_published());
        assert!(!f.store.committed_post(post.id).unwrap().is_published());
    }

    #[tokio::test]
    async fn test_delete() {
        let f = fixture();
        let post = f.posts.create(CreatePostDto::titled("Hello")).await.unwrap();

        f.posts.delete(post.id).await.unwrap();

        assert!(f.store.committed_post(post.id).is_none());
        assert!(matches!(f.posts.delete(post.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(f.posts.find(post.id).await, Err(AppError::NotFound(_))));
    }
}
