use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure reported by a non-sqlx storage backend
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(
        "Cannot delete category {category_id} with {child_count} subcategories. Move or delete subcategories first."
    )]
    HasChildren { category_id: Uuid, child_count: i64 },

    #[error("Path propagation failed for category {category_id}: {source}")]
    PropagationFailed {
        category_id: Uuid,
        #[source]
        source: Box<AppError>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl AppError {
    /// Wraps a storage failure raised while cascading paths below `category_id`
    pub fn propagation_failed(category_id: Uuid, source: AppError) -> Self {
        match source {
            // Nested propagation keeps the outermost category
            AppError::PropagationFailed { source, .. } => AppError::PropagationFailed {
                category_id,
                source,
            },
            other => AppError::PropagationFailed {
                category_id,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
