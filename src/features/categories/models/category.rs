use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::constants::PATH_SEPARATOR;

/// Database model for category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub parent_category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sort_order: i32,
    /// Slugs of all ancestors and this category joined by `/`
    pub full_path: String,
    /// 0 for root categories
    pub depth: i32,
    pub metadata: Option<serde_json::Value>,
    pub featured_image: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    /// Opaque labels, stored and returned unchanged
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Canonical sibling ordering: `sort_order`, then `name`
    pub fn sibling_order(&self, other: &Category) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then_with(|| self.name.cmp(&other.name))
    }

    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}{}{}",
            base_url.trim_end_matches(PATH_SEPARATOR),
            PATH_SEPARATOR,
            self.full_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, sort_order: i32, full_path: &str) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::now_v7(),
            parent_category_id: None,
            name: name.to_string(),
            slug: full_path.rsplit('/').next().unwrap_or_default().to_string(),
            description: None,
            sort_order,
            full_path: full_path.to_string(),
            depth: full_path.matches('/').count() as i32,
            metadata: None,
            featured_image: None,
            seo_title: None,
            seo_description: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sibling_order_breaks_ties_by_name() {
        let mut categories = vec![
            category("Zebra", 3, "zebra"),
            category("Beta", 1, "beta"),
            category("Apple", 1, "apple"),
            category("Charlie", 2, "charlie"),
        ];
        categories.sort_by(|a, b| a.sibling_order(b));

        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Beta", "Charlie", "Zebra"]);
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let programming = category("Programming", 0, "tech/programming");
        assert_eq!(
            programming.url("https://blog.example.com/"),
            "https://blog.example.com/tech/programming"
        );
    }
}
