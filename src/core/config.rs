use std::env;

use crate::shared::validation::TABLE_NAME_REGEX;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub posts: PostsConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Table names used by the SQL store. Injected as opaque identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub categories: String,
    pub posts: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            categories: PostsConfig::DEFAULT_CATEGORIES_TABLE.to_string(),
            posts: PostsConfig::DEFAULT_POSTS_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostsConfig {
    /// Base URL prefixed to `full_path` when building public URLs
    pub app_url: String,
    pub tables: TableNames,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            database: DatabaseConfig::from_env()?,
            posts: PostsConfig::from_env()?,
        })
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl PostsConfig {
    const DEFAULT_APP_URL: &'static str = "http://localhost";
    const DEFAULT_CATEGORIES_TABLE: &'static str = "categories";
    const DEFAULT_POSTS_TABLE: &'static str = "posts";

    pub fn from_env() -> Result<Self, String> {
        let app_url = env::var("APP_URL").unwrap_or_else(|_| Self::DEFAULT_APP_URL.to_string());

        let categories = env::var("POSTS_TABLE_CATEGORIES")
            .unwrap_or_else(|_| Self::DEFAULT_CATEGORIES_TABLE.to_string());
        let posts = env::var("POSTS_TABLE_POSTS")
            .unwrap_or_else(|_| Self::DEFAULT_POSTS_TABLE.to_string());

        Self::new(app_url, TableNames { categories, posts })
    }

    pub fn new(app_url: String, tables: TableNames) -> Result<Self, String> {
        for (var, name) in [
            ("POSTS_TABLE_CATEGORIES", &tables.categories),
            ("POSTS_TABLE_POSTS", &tables.posts),
        ] {
            if !TABLE_NAME_REGEX.is_match(name) {
                return Err(format!("{} must be a valid SQL identifier, got '{}'", var, name));
            }
        }

        if tables.categories == tables.posts {
            return Err("POSTS_TABLE_CATEGORIES and POSTS_TABLE_POSTS must differ".to_string());
        }

        Ok(Self {
            app_url: app_url.trim_end_matches('/').to_string(),
            tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posts_config_accepts_schema_qualified_tables() {
        let config = PostsConfig::new(
            "https://blog.example.com/".to_string(),
            TableNames {
                categories: "cms.categories".to_string(),
                posts: "cms.posts".to_string(),
            },
        )
        .unwrap();

        assert_eq!(config.app_url, "https://blog.example.com");
        assert_eq!(config.tables.categories, "cms.categories");
    }

    #[test]
    fn test_posts_config_rejects_injected_table_name() {
        let result = PostsConfig::new(
            "http://localhost".to_string(),
            TableNames {
                categories: "categories; DROP TABLE posts".to_string(),
                posts: "posts".to_string(),
            },
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_posts_config_rejects_shared_table() {
        let result = PostsConfig::new(
            "http://localhost".to_string(),
            TableNames {
                categories: "content".to_string(),
                posts: "content".to_string(),
            },
        );

        assert!(result.is_err());
    }
}
