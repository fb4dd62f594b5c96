use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for canonical slugs
    /// Must be lowercase alphanumeric with single hyphens between segments
    /// - Valid: "web-development", "php8", "a"
    /// - Invalid: "-tech", "tech-", "tech--news", "Tech", "tech_news", "tech/news"
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    /// Regex for injected table names, optionally schema-qualified
    /// - Valid: "categories", "cms.posts", "_blog_posts"
    /// - Invalid: "1posts", "posts;--", "cms.", "my table"
    pub static ref TABLE_NAME_REGEX: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap();

    /// Punctuation dropped from a lowercased name before separators are collapsed
    pub static ref SLUG_STRIP_REGEX: Regex = Regex::new(r"[^a-z0-9\s_-]+").unwrap();

    /// Whitespace, underscore and hyphen runs, collapsed to a single hyphen
    pub static ref SLUG_SEPARATOR_REGEX: Regex = Regex::new(r"[\s_-]+").unwrap();
}
