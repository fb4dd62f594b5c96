use std::collections::HashMap;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CategoryTreeNode};
use crate::features::posts::models::Post;
use crate::modules::storage::{CategoryFilter, PostFilter, SharedTreeStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeOptions {
    pub include_posts: bool,
    /// Only meaningful together with `include_posts`
    pub include_unpublished_posts: bool,
}

impl TreeOptions {
    pub fn with_posts() -> Self {
        Self {
            include_posts: true,
            include_unpublished_posts: false,
        }
    }

    pub fn with_all_posts() -> Self {
        Self {
            include_posts: true,
            include_unpublished_posts: true,
        }
    }
}

/// Assembles nested category views from bulk reads
pub struct TreeService {
    store: SharedTreeStore,
}

impl TreeService {
    pub fn new(store: SharedTreeStore) -> Self {
        Self { store }
    }

    /// Build the forest below `root_id`, or of every root category when `None`.
    ///
    /// Issues at most three reads (root, categories, posts) whatever the size or
    /// depth of the tree.
    pub async fn build_tree(
        &self,
        root_id: Option<Uuid>,
        options: TreeOptions,
    ) -> Result<Vec<CategoryTreeNode>> {
        let mut uow = self.store.begin().await?;

        let filter = match root_id {
            Some(id) => {
                let root = uow
                    .find_category(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
                CategoryFilter::Subtree {
                    root_id: root.id,
                    root_path: root.full_path,
                }
            }
            None => CategoryFilter::All,
        };
        let mut categories = uow.query_categories(&filter).await?;
        categories.sort_by(|a, b| a.sibling_order(b).then_with(|| a.id.cmp(&b.id)));

        let posts = if options.include_posts && !categories.is_empty() {
            let posts = uow
                .query_posts(&PostFilter::InCategories {
                    category_ids: categories.iter().map(|c| c.id).collect(),
                    include_unpublished: options.include_unpublished_posts,
                })
                .await?;
            Some(posts)
        } else {
            None
        };
        uow.commit().await?;

        let category_count = categories.len();
        let forest = TreeAssembler::new(categories, posts).assemble(root_id);
        tracing::debug!(
            "Assembled {} root nodes from {} categories",
            forest.len(),
            category_count
        );

        Ok(forest)
    }
}

/// Partitions a flat, ordered category set by parent id
struct TreeAssembler {
    children: HashMap<Option<Uuid>, Vec<Category>>,
    posts: Option<HashMap<Uuid, Vec<Post>>>,
}

impl TreeAssembler {
    fn new(categories: Vec<Category>, posts: Option<Vec<Post>>) -> Self {
        let mut children: HashMap<Option<Uuid>, Vec<Category>> = HashMap::new();
        for category in categories {
            children
                .entry(category.parent_category_id)
                .or_default()
                .push(category);
        }

        let posts = posts.map(|mut posts| {
            posts.sort_by(|a, b| a.listing_order(b).then_with(|| a.id.cmp(&b.id)));
            let mut by_category: HashMap<Uuid, Vec<Post>> = HashMap::new();
            for post in posts {
                if let Some(category_id) = post.category_id {
                    by_category.entry(category_id).or_default().push(post);
                }
            }
            by_category
        });

        Self { children, posts }
    }

    fn assemble(mut self, root_id: Option<Uuid>) -> Vec<CategoryTreeNode> {
        let roots = match root_id {
            Some(id) => self.take_root(id).into_iter().collect(),
            None => self.children.remove(&None).unwrap_or_default(),
        };

        roots.into_iter().map(|root| self.node(root)).collect()
    }

    /// Pull the requested root out of whichever sibling list it was grouped in
    fn take_root(&mut self, id: Uuid) -> Option<Category> {
        self.children.values_mut().find_map(|siblings| {
            let index = siblings.iter().position(|c| c.id == id)?;
            Some(siblings.remove(index))
        })
    }

    /// Recursion depth equals tree depth. Each child list is taken once, so
    /// corrupt parent links cannot make it loop.
    fn node(&mut self, category: Category) -> CategoryTreeNode {
        let children = self
            .children
            .remove(&Some(category.id))
            .unwrap_or_default()
            .into_iter()
            .map(|child| self.node(child))
            .collect();
        let posts = self
            .posts
            .as_mut()
            .map(|posts| posts.remove(&category.id).unwrap_or_default());

        CategoryTreeNode {
            category,
            children,
            posts,
        }
    }
}
