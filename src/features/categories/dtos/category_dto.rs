use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request DTO for creating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateCategoryDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Derived from `name` when absent
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
    pub parent_category_id: Option<Uuid>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

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

impl CreateCategoryDto {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn under(mut self, parent_category_id: Uuid) -> Self {
        self.parent_category_id = Some(parent_category_id);
        self
    }
}

/// Request DTO for updating a category. Absent fields are left unchanged,
/// `null` clears an optional field.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(
        length(min = 1, max = 255, message = "Slug must be 1-255 characters"),
        regex(
            path = "*crate::shared::validation::SLUG_REGEX",
            message = "Slug must be lowercase letters and digits separated by single hyphens"
        )
    )]
    pub slug: Option<String>,

    /// `Some(None)` moves the category to the root set
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub parent_category_id: Option<Option<Uuid>>,

    pub sort_order: Option<i32>,

    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    pub description: Option<Option<String>>,

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_empty_name() {
        let dto = CreateCategoryDto::named("");
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_create_rejects_non_canonical_slug() {
        let mut dto = CreateCategoryDto::named("Tech");
        dto.slug = Some("Tech Stuff".to_string());
        assert!(dto.validate().is_err());

        dto.slug = Some("tech-stuff".to_string());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_update_parent_patch_semantics() {
        let detach: UpdateCategoryDto =
            serde_json::from_str(r#"{"parent_category_id": null}"#).unwrap();
        assert_eq!(detach.parent_category_id, Some(None));

        let rename: UpdateCategoryDto = serde_json::from_str(r#"{"name": "Renamed"}"#).unwrap();
        assert_eq!(rename.parent_category_id, None);
        assert!(rename.validate().is_ok());
    }

    #[test]
    fn test_update_clears_optional_fields_with_null() {
        let dto: UpdateCategoryDto = serde_json::from_str(
            r#"{"description": null, "metadata": null, "featured_image": null,
                "seo_title": null, "seo_description": "Kept"}"#,
        )
        .unwrap();

        assert_eq!(dto.description, Some(None));
        assert_eq!(dto.metadata, Some(None));
        assert_eq!(dto.featured_image, Some(None));
        assert_eq!(dto.seo_title, Some(None));
        assert_eq!(dto.seo_description, Some(Some("Kept".to_string())));
        assert_eq!(dto.tags, None);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_update_validates_nested_optional_fields() {
        let dto = UpdateCategoryDto {
            seo_title: Some(Some("x".repeat(256))),
            ..Default::default()
        };
        assert!(dto.validate().is_err());
    }
}
