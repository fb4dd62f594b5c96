use serde::Serialize;

use crate::features::categories::models::Category;
use crate::features::posts::models::Post;

/// Category decorated with its ordered children and, when requested, its posts.
/// Built per read, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTreeNode {
    #[serde(flatten)]
    pub category: Category,
    /// Empty for leaf categories
    pub children: Vec<CategoryTreeNode>,
    /// `None` when posts were not requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<Post>>,
}

impl CategoryTreeNode {
    /// Number of categories in this subtree, including this node
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|c| c.count()).sum::<usize>()
    }

    /// Depth-first search by category slug path
    pub fn find(&self, full_path: &str) -> Option<&CategoryTreeNode> {
        if self.category.full_path == full_path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(full_path))
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children
            .iter()
            .map(|c| c.category.name.as_str())
            .collect()
    }
}
