use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::constants::PATH_SEPARATOR;

/// Database model for post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    /// Owning category's `full_path` plus this slug, or the bare slug
    pub full_path: String,
    pub sort_order: i32,
    pub body: String,
    /// `None` while the post is unpublished
    pub published_at: Option<DateTime<Utc>>,
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

impl Post {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Listing order: `published_at` ascending with unpublished posts last, then `title`
    pub fn listing_order(&self, other: &Post) -> Ordering {
        let by_published = match (self.published_at, other.published_at) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_published.then_with(|| self.title.cmp(&other.title))
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
    use chrono::Duration;

    fn post(title: &str, published_at: Option<DateTime<Utc>>) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::now_v7(),
            category_id: None,
            author_id: None,
            title: title.to_string(),
            subtitle: None,
            slug: title.to_lowercase(),
            full_path: title.to_lowercase(),
            sort_order: 0,
            body: String::new(),
            published_at,
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
    fn test_listing_order_puts_unpublished_last() {
        let yesterday = Utc::now() - Duration::days(1);
        let today = Utc::now();
        let mut posts = vec![
            post("Draft", None),
            post("Later", Some(today)),
            post("Beta", Some(yesterday)),
            post("Alpha", Some(yesterday)),
        ];
        posts.sort_by(|a, b| a.listing_order(b));

        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Later", "Draft"]);
    }

    #[test]
    fn test_url_for_uncategorized_post() {
        let post = post("Hello", None);
        assert_eq!(post.url("http://localhost"), "http://localhost/hello");
    }
}
