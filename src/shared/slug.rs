use std::collections::HashSet;

use uuid::Uuid;

use crate::core::error::Result;
use crate::modules::storage::{SlugScope, TreeUnitOfWork};
use crate::shared::constants::{
    MAX_NUMBERED_SLUG_ATTEMPTS, MAX_RANDOM_SLUG_ATTEMPTS, MAX_SLUG_LEN, RANDOM_SLUG_LEN,
    RANDOM_SLUG_SUFFIX_LEN,
};
use crate::shared::validation::{SLUG_SEPARATOR_REGEX, SLUG_STRIP_REGEX};

/// ASCII spelling of Latin-1 letters
fn fold_latin1(c: char) -> Option<&'static str> {
    let folded = match c {
        'À'..='Å' | 'à'..='å' => "a",
        'Æ' | 'æ' => "ae",
        'Ç' | 'ç' => "c",
        'È'..='Ë' | 'è'..='ë' => "e",
        'Ì'..='Ï' | 'ì'..='ï' => "i",
        'Ð' | 'ð' => "d",
        'Ñ' | 'ñ' => "n",
        'Ò'..='Ö' | 'Ø' | 'ò'..='ö' | 'ø' => "o",
        'Ù'..='Ü' | 'ù'..='ü' => "u",
        'Ý' | 'ý' | 'ÿ' => "y",
        'Þ' | 'þ' => "th",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

/// Normalize a display name into a URL-safe slug.
///
/// Accented Latin letters are folded to ASCII, other punctuation is dropped and
/// whitespace/underscore/hyphen runs become a single `-`. The result is capped at
/// `MAX_SLUG_LEN` and may be empty when nothing usable is left.
pub fn slugify(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.chars() {
        match fold_latin1(c) {
            Some(ascii) => folded.push_str(ascii),
            None => folded.push(c),
        }
    }

    let lowered = folded.to_lowercase();
    let stripped = SLUG_STRIP_REGEX.replace_all(&lowered, "");
    let separated = SLUG_SEPARATOR_REGEX.replace_all(&stripped, "-");

    truncate_slug(separated.trim_matches('-'), MAX_SLUG_LEN).to_string()
}

/// Cut `slug` to at most `max_len` bytes without leaving a trailing `-`
fn truncate_slug(slug: &str, max_len: usize) -> &str {
    if slug.len() <= max_len {
        return slug;
    }

    let mut end = max_len;
    while !slug.is_char_boundary(end) {
        end -= 1;
    }
    slug[..end].trim_end_matches('-')
}

/// `base-suffix`, with `base` shortened so the whole fits in `MAX_SLUG_LEN`
fn with_suffix(base: &str, suffix: &str) -> String {
    let room = MAX_SLUG_LEN.saturating_sub(suffix.len() + 1);
    format!("{}-{}", truncate_slug(base, room), suffix)
}

fn random_token(len: usize) -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(len);
    token
}

fn random_unused(prefix: Option<&str>, taken: &HashSet<String>) -> String {
    let with_prefix = |token: String| match prefix {
        Some(base) => with_suffix(base, &token),
        None => token,
    };
    let token_len = if prefix.is_some() {
        RANDOM_SLUG_SUFFIX_LEN
    } else {
        RANDOM_SLUG_LEN
    };

    for _ in 0..MAX_RANDOM_SLUG_ATTEMPTS {
        let candidate = with_prefix(random_token(token_len));
        if !taken.contains(&candidate) {
            return candidate;
        }
    }

    with_prefix(Uuid::new_v4().simple().to_string())
}

/// Pick a slug for `candidate_name` that is not in `taken`.
///
/// Tries the normalized base, then `base-1` .. `base-100`, then `base-<random>`.
/// `base` is shortened as needed so every candidate fits in `MAX_SLUG_LEN`.
/// Names without usable characters get a random slug.
pub fn allocate_unique_slug(candidate_name: &str, taken: &HashSet<String>) -> String {
    let base = slugify(candidate_name);
    if base.is_empty() {
        tracing::warn!(
            "Name '{}' has no slug characters, using a random slug",
            candidate_name
        );
        return random_unused(None, taken);
    }

    if !taken.contains(&base) {
        return base;
    }

    for counter in 1..=MAX_NUMBERED_SLUG_ATTEMPTS {
        let candidate = with_suffix(&base, &counter.to_string());
        if !taken.contains(&candidate) {
            return candidate;
        }
    }

    tracing::warn!(
        "Slug '{}' still taken after {} numbered attempts, using a random suffix",
        base,
        MAX_NUMBERED_SLUG_ATTEMPTS
    );
    random_unused(Some(&base), taken)
}

/// Allocate a slug unique within `scope`, ignoring the entity `exclude_id`
/// (the entity being updated). One read of the scope's slugs.
pub async fn allocate_in_scope(
    uow: &mut dyn TreeUnitOfWork,
    candidate_name: &str,
    scope: SlugScope,
    exclude_id: Option<Uuid>,
) -> Result<String> {
    let taken: HashSet<String> = uow
        .slugs_in_scope(scope, exclude_id)
        .await?
        .into_iter()
        .collect();

    Ok(allocate_unique_slug(candidate_name, &taken))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::validation::SLUG_REGEX;
    use fake::faker::lorem::en::Words;
    use fake::Fake;

    fn taken(slugs: &[&str]) -> HashSet<String> {
        slugs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_slugify_basic_names() {
        assert_eq!(slugify("Tech"), "tech");
        assert_eq!(slugify("Web Development"), "web-development");
        assert_eq!(slugify("PHP Frameworks"), "php-frameworks");
        assert_eq!(slugify("Technology Guide"), "technology-guide");
    }

    #[test]
    fn test_slugify_collapses_separators_and_trims() {
        assert_eq!(slugify("  Hello   World  "), "hello-world");
        assert_eq!(slugify("snake_case--name"), "snake-case-name");
        assert_eq!(slugify("-leading and trailing-"), "leading-and-trailing");
    }

    #[test]
    fn test_slugify_drops_punctuation() {
        assert_eq!(slugify("Don't Stop"), "dont-stop");
        assert_eq!(slugify("C++ & Rust!"), "c-rust");
        assert_eq!(slugify("a/b"), "ab");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_slugify_empty_results() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_random_names_are_canonical() {
        for _ in 0..50 {
            let words: Vec<String> = Words(1..5).fake();
            let slug = slugify(&words.join(" "));
            assert!(SLUG_REGEX.is_match(&slug), "not canonical: {}", slug);
        }
    }

    #[test]
    fn test_allocate_returns_base_when_free() {
        assert_eq!(allocate_unique_slug("Tech", &taken(&["science"])), "tech");
    }

    #[test]
    fn test_allocate_appends_counter_on_collision() {
        assert_eq!(allocate_unique_slug("Tech", &taken(&["tech"])), "tech-1");
        assert_eq!(
            allocate_unique_slug("Tech", &taken(&["tech", "tech-1", "tech-2"])),
            "tech-3"
        );
    }

    #[test]
    fn test_allocate_falls_back_to_random_suffix_after_cap() {
        let mut used = taken(&["tech"]);
        for n in 1..=MAX_NUMBERED_SLUG_ATTEMPTS {
            used.insert(format!("tech-{}", n));
        }

        let slug = allocate_unique_slug("Tech", &used);

        assert!(!used.contains(&slug));
        assert_ne!(slug, format!("tech-{}", MAX_NUMBERED_SLUG_ATTEMPTS + 1));
        let suffix = slug.strip_prefix("tech-").unwrap();
        assert_eq!(suffix.len(), RANDOM_SLUG_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_slugify_caps_fold_expanded_names() {
        let slug = slugify(&"ß".repeat(200));

        assert_eq!(slug.len(), MAX_SLUG_LEN);
        assert!(SLUG_REGEX.is_match(&slug));
    }

    #[test]
    fn test_slugify_cut_does_not_end_on_separator() {
        // "ab-" repeated puts a hyphen at byte 255
        let slug = slugify(&"ab ".repeat(100));

        assert_eq!(slug.len(), MAX_SLUG_LEN - 1);
        assert!(SLUG_REGEX.is_match(&slug));
    }

    #[test]
    fn test_allocate_counter_fits_for_longest_name() {
        let name = "a".repeat(MAX_SLUG_LEN);

        let slug = allocate_unique_slug(&name, &taken(&[name.as_str()]));

        assert_eq!(slug, format!("{}-1", "a".repeat(MAX_SLUG_LEN - 2)));
        assert_eq!(slug.len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_allocate_random_suffix_fits_for_longest_name() {
        let name = "a".repeat(MAX_SLUG_LEN);
        let mut used = taken(&[name.as_str()]);
        for n in 1..=MAX_NUMBERED_SLUG_ATTEMPTS {
            let suffix = n.to_string();
            used.insert(format!(
                "{}-{}",
                "a".repeat(MAX_SLUG_LEN - suffix.len() - 1),
                suffix
            ));
        }

        let slug = allocate_unique_slug(&name, &used);

        assert!(!used.contains(&slug));
        assert_eq!(slug.len(), MAX_SLUG_LEN);
        assert!(SLUG_REGEX.is_match(&slug));
    }

    #[test]
    fn test_allocate_random_slug_for_unusable_name() {
        let slug = allocate_unique_slug("   ", &HashSet::new());

        assert_eq!(slug.len(), RANDOM_SLUG_LEN);
        assert!(SLUG_REGEX.is_match(&slug));
    }
}
