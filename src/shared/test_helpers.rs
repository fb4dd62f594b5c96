//! Row builders for unit tests. Rows are returned as-is; nothing here touches a store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::features::categories::models::Category;
use crate::features::posts::models::Post;
use crate::shared::constants::PATH_SEPARATOR;

fn last_segment(full_path: &str) -> String {
    full_path
        .rsplit(PATH_SEPARATOR)
        .next()
        .unwrap_or(full_path)
        .to_string()
}

/// Category whose slug is the last segment of `full_path`
pub fn category_row(
    name: &str,
    parent_category_id: Option<Uuid>,
    full_path: &str,
    depth: i32,
) -> Category {
    let now = Utc::now();
    Category {
        id: Uuid::now_v7(),
        parent_category_id,
        name: name.to_string(),
        slug: last_segment(full_path),
        description: None,
        sort_order: 0,
        full_path: full_path.to_string(),
        depth,
        metadata: None,
        featured_image: None,
        seo_title: None,
        seo_description: None,
        tags: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Category placed under `parent` with a path consistent with the parent's stored path
pub fn child_row(name: &str, parent: &Category, slug: &str) -> Category {
    let full_path = format!("{}{}{}", parent.full_path, PATH_SEPARATOR, slug);
    category_row(name, Some(parent.id), &full_path, parent.depth + 1)
}

/// Unpublished post whose slug is the last segment of `full_path`
pub fn post_row(title: &str, category_id: Option<Uuid>, full_path: &str) -> Post {
    let now = Utc::now();
    Post {
        id: Uuid::now_v7(),
        category_id,
        author_id: None,
        title: title.to_string(),
        subtitle: None,
        slug: last_segment(full_path),
        full_path: full_path.to_string(),
        sort_order: 0,
        body: String::new(),
        published_at: None,
        metadata: None,
        featured_image: None,
        seo_title: None,
        seo_description: None,
        tags: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn published(mut post: Post, at: DateTime<Utc>) -> Post {
    post.published_at = Some(at);
    post
}
