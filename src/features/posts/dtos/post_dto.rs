use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request DTO for creating a post
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreatePostDto {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(max = 255, message = "Subtitle must not exceed 255 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    /// Derived from `title` when absent
    #[validate(
        length(min = 1, max = 255, message = "Slug must be 1-255 characters"),
        regex(
            path = "*crate::shared::validation::SLUG_REGEX",
            message = "Slug must be lowercase letters and digits separated by single hyphens"
        )
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default)]
    pub body: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    #[validate(length(max = 2048, message = "Featured image must not exceed 2048 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,

    #[validate(length(max = 255, message = "SEO title must not exceed 255 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreatePostDto {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn in_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Request DTO for updating a post. Absent fields are left unchanged,
/// `null` clears an optional field.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePostDto {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 255, message = "Subtitle must not exceed 255 characters"))]
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub subtitle: Option<Option<String>>,

    #[validate(
        length(min = 1, max = 255, message = "Slug must be 1-255 characters"),
        regex(
            path = "*crate::shared::validation::SLUG_REGEX",
            message = "Slug must be lowercase letters and digits separated by single hyphens"
        )
    )]
    pub slug: Option<String>,

    /// `Some(None)` moves the post to the uncategorized set
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub category_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub author_id: Option<Option<Uuid>>,

    pub sort_order: Option<i32>,

    pub body: Option<String>,

    /// `Some(None)` unpublishes the post
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub published_at: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub metadata: Option<Option<serde_json::Value>>,

    #[validate(length(max = 2048, message = "Featured image must not exceed 2048 characters"))]
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub featured_image: Option<Option<String>>,

    #[validate(length(max = 255, message = "SEO title must not exceed 255 characters"))]
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub seo_title: Option<Option<String>>,

    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub seo_description: Option<Option<String>>,

    /// Replaces the whole tag list
    pub tags: Option<Vec<String>>,
}
