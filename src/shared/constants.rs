// =============================================================================
// SLUG ALLOCATION
// =============================================================================

/// Longest slug the schema stores (`slug VARCHAR(255)`)
pub const MAX_SLUG_LEN: usize = 255;

/// Numbered suffixes (`-1`, `-2`, ...) tried before falling back to a random one
pub const MAX_NUMBERED_SLUG_ATTEMPTS: u32 = 100;

/// Hex characters in the random fallback suffix
pub const RANDOM_SLUG_SUFFIX_LEN: usize = 4;

/// Random suffix attempts before widening to a full random token
pub const MAX_RANDOM_SLUG_ATTEMPTS: u32 = 10;

/// Hex characters in a slug generated for a name without usable characters
pub const RANDOM_SLUG_LEN: usize = 8;

// =============================================================================
// PATHS
// =============================================================================

/// Separator between slugs in a materialized path
pub const PATH_SEPARATOR: char = '/';
