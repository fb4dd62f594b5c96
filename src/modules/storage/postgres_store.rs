use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Adjacent, CategoryFilter, PostFilter, SlugScope, TreeStore, TreeUnitOfWork};
use crate::core::config::TableNames;
use crate::core::error::{AppError, Result};
use crate::features::categories::models::Category;
use crate::features::posts::models::Post;

const CATEGORY_COLUMNS: &str = "id, parent_category_id, name, slug, description, sort_order, \
     full_path, depth, metadata, featured_image, seo_title, seo_description, tags, created_at, \
     updated_at";

const POST_COLUMNS: &str = "id, category_id, author_id, title, subtitle, slug, full_path, \
     sort_order, body, published_at, metadata, featured_image, seo_title, seo_description, tags, \
     created_at, updated_at";

const CATEGORY_ORDER: &str = "ORDER BY sort_order ASC, name ASC, id ASC";

const POST_ORDER: &str = "ORDER BY published_at ASC NULLS LAST, title ASC, id ASC";

/// PostgreSQL store. Table names come from configuration and are validated as
/// identifiers there, so they are interpolated into the statements.
#[derive(Debug, Clone)]
pub struct PgTreeStore {
    pool: PgPool,
    tables: TableNames,
}

impl PgTreeStore {
    pub fn new(pool: PgPool, tables: TableNames) -> Self {
        Self { pool, tables }
    }
}

#[async_trait]
impl TreeStore for PgTreeStore {
    async fn begin(&self) -> Result<Box<dyn TreeUnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(Box::new(PgUnitOfWork {
            tx,
            tables: self.tables.clone(),
        }))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    tables: TableNames,
}

/// Escape `%`, `_` and `\` so `value` matches literally inside a LIKE pattern
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn database_error(context: &str, e: sqlx::Error) -> AppError {
    tracing::error!("Failed to {}: {:?}", context, e);
    AppError::Database(e)
}

#[async_trait]
impl TreeUnitOfWork for PgUnitOfWork {
    async fn find_category(&mut self, id: Uuid) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            CATEGORY_COLUMNS, self.tables.categories
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| database_error("find category", e))
    }

    async fn query_categories(&mut self, filter: &CategoryFilter) -> Result<Vec<Category>> {
        let table = &self.tables.categories;
        let result = match filter {
            CategoryFilter::All => {
                let sql = format!("SELECT {} FROM {} {}", CATEGORY_COLUMNS, table, CATEGORY_ORDER);
                sqlx::query_as::<_, Category>(&sql)
                    .fetch_all(&mut *self.tx)
                    .await
            }
            CategoryFilter::ChildrenOf(parent_id) => {
                let sql = format!(
                    "SELECT {} FROM {} WHERE parent_category_id = $1 {}",
                    CATEGORY_COLUMNS, table, CATEGORY_ORDER
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(*parent_id)
                    .fetch_all(&mut *self.tx)
                    .await
            }
            CategoryFilter::Subtree { root_id, root_path } => {
                let sql = format!(
                    "SELECT {} FROM {} WHERE id = $1 OR full_path LIKE $2 ESCAPE '\\' {}",
                    CATEGORY_COLUMNS, table, CATEGORY_ORDER
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(*root_id)
                    .bind(format!("{}/%", escape_like(root_path)))
                    .fetch_all(&mut *self.tx)
                    .await
            }
            CategoryFilter::FullPath(path) => {
                let sql = format!(
                    "SELECT {} FROM {} WHERE full_path = $1 {}",
                    CATEGORY_COLUMNS, table, CATEGORY_ORDER
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(path)
                    .fetch_all(&mut *self.tx)
                    .await
            }
        };

        result.map_err(|e| database_error("query categories", e))
    }

    async fn count_child_categories(&mut self, id: Uuid) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE parent_category_id = $1",
            self.tables.categories
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| database_error("count child categories", e))
    }

    async fn insert_category(&mut self, category: &Category) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            self.tables.categories, CATEGORY_COLUMNS
        );
        sqlx::query(&sql)
            .bind(category.id)
            .bind(category.parent_category_id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(category.sort_order)
            .bind(&category.full_path)
            .bind(category.depth)
            .bind(&category.metadata)
            .bind(&category.featured_image)
            .bind(&category.seo_title)
            .bind(&category.seo_description)
            .bind(&category.tags)
            .bind(category.created_at)
            .bind(category.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| database_error("insert category", e))?;

        Ok(())
    }

    async fn save_category(&mut self, category: &Category) -> Result<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET parent_category_id = $2, name = $3, slug = $4, description = $5,
                sort_order = $6, full_path = $7, depth = $8, metadata = $9,
                featured_image = $10, seo_title = $11, seo_description = $12,
                tags = $13, updated_at = $14
            WHERE id = $1
            "#,
            self.tables.categories
        );
        let result = sqlx::query(&sql)
            .bind(category.id)
            .bind(category.parent_category_id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(category.sort_order)
            .bind(&category.full_path)
            .bind(category.depth)
            .bind(&category.metadata)
            .bind(&category.featured_image)
            .bind(&category.seo_title)
            .bind(&category.seo_description)
            .bind(&category.tags)
            .bind(category.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| database_error("save category", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                category.id
            )));
        }
        Ok(())
    }

    async fn delete_category(&mut self, id: Uuid) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.tables.categories);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| database_error("delete category", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_post(&mut self, id: Uuid) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            POST_COLUMNS, self.tables.posts
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| database_error("find post", e))
    }

    async fn query_posts(&mut self, filter: &PostFilter) -> Result<Vec<Post>> {
        let table = &self.tables.posts;
        let result = match filter {
            PostFilter::All => {
                let sql = format!("SELECT {} FROM {} {}", POST_COLUMNS, table, POST_ORDER);
                sqlx::query_as::<_, Post>(&sql)
                    .fetch_all(&mut *self.tx)
                    .await
            }
            PostFilter::InCategories {
                category_ids,
                include_unpublished,
            } => {
                let sql = format!(
                    "SELECT {} FROM {} WHERE category_id = ANY($1) AND ($2 OR published_at IS NOT NULL) {}",
                    POST_COLUMNS, table, POST_ORDER
                );
                sqlx::query_as::<_, Post>(&sql)
                    .bind(category_ids.as_slice())
                    .bind(*include_unpublished)
                    .fetch_all(&mut *self.tx)
                    .await
            }
            PostFilter::FullPath(path) => {
                let sql = format!(
                    "SELECT {} FROM {} WHERE full_path = $1 {}",
                    POST_COLUMNS, table, POST_ORDER
                );
                sqlx::query_as::<_, Post>(&sql)
                    .bind(path)
                    .fetch_all(&mut *self.tx)
                    .await
            }
        };

        result.map_err(|e| database_error("query posts", e))
    }

    async fn adjacent_post(
        &mut self,
        category_id: Option<Uuid>,
        sort_order: i32,
        direction: Adjacent,
    ) -> Result<Option<Post>> {
        let (comparison, order) = match direction {
            Adjacent::Next => (">", "ASC"),
            Adjacent::Previous => ("<", "DESC"),
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE category_id IS NOT DISTINCT FROM $1 AND sort_order {} $2 \
             ORDER BY sort_order {}, id {} LIMIT 1",
            POST_COLUMNS, self.tables.posts, comparison, order, order
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(category_id)
            .bind(sort_order)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| database_error("find adjacent post", e))
    }

    async fn insert_post(&mut self, post: &Post) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
            self.tables.posts, POST_COLUMNS
        );
        sqlx::query(&sql)
            .bind(post.id)
            .bind(post.category_id)
            .bind(post.author_id)
            .bind(&post.title)
            .bind(&post.subtitle)
            .bind(&post.slug)
            .bind(&post.full_path)
            .bind(post.sort_order)
            .bind(&post.body)
            .bind(post.published_at)
            .bind(&post.metadata)
            .bind(&post.featured_image)
            .bind(&post.seo_title)
            .bind(&post.seo_description)
            .bind(&post.tags)
            .bind(post.created_at)
            .bind(post.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| database_error("insert post", e))?;

        Ok(())
    }

    async fn save_post(&mut self, post: &Post) -> Result<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET category_id = $2, author_id = $3, title = $4, subtitle = $5, slug = $6,
                full_path = $7, sort_order = $8, body = $9, published_at = $10,
                metadata = $11, featured_image = $12, seo_title = $13,
                seo_description = $14, tags = $15, updated_at = $16
            WHERE id = $1
            "#,
            self.tables.posts
        );
        let result = sqlx::query(&sql)
            .bind(post.id)
            .bind(post.category_id)
            .bind(post.author_id)
            .bind(&post.title)
            .bind(&post.subtitle)
            .bind(&post.slug)
            .bind(&post.full_path)
            .bind(post.sort_order)
            .bind(&post.body)
            .bind(post.published_at)
            .bind(&post.metadata)
            .bind(&post.featured_image)
            .bind(&post.seo_title)
            .bind(&post.seo_description)
            .bind(&post.tags)
            .bind(post.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| database_error("save post", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", post.id)));
        }
        Ok(())
    }

    async fn delete_post(&mut self, id: Uuid) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.tables.posts);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| database_error("delete post", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn slugs_in_scope(
        &mut self,
        scope: SlugScope,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<String>> {
        let (table, scope_column, scope_id) = match scope {
            SlugScope::CategorySiblings { parent_category_id } => (
                &self.tables.categories,
                "parent_category_id",
                parent_category_id,
            ),
            SlugScope::CategoryPosts { category_id } => {
                (&self.tables.posts, "category_id", category_id)
            }
        };
        let sql = format!(
            "SELECT slug FROM {} WHERE {} IS NOT DISTINCT FROM $1 AND ($2::uuid IS NULL OR id <> $2)",
            table, scope_column
        );
        sqlx::query_scalar::<_, String>(&sql)
            .bind(scope_id)
            .bind(exclude_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| database_error("load slugs in scope", e))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit transaction: {:?}", e);
            AppError::Database(e)
        })
    }
}
