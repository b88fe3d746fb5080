//! Slug derivation and count-based uniqueness resolution.
//!
//! A slug is the lowercase, hyphen-separated ASCII form of a store name.
//! When other records already use the same base, the slug gets a numeric
//! suffix derived from how many records match `^(base)(-[0-9]+)?$`
//! (case-insensitive): zero matches keep `base`, N matches give `base-(N+1)`.
//!
//! The count rule alone is not safe under concurrent creates. Backends pair it
//! with a reservation step (unique index + retry, or a write lock) so the
//! final slug is always unique.

use regex::{Regex, RegexBuilder};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::defaults::SLUG_FALLBACK;
use crate::error::{Error, Result};

/// Fold a string to a diacritic-free form.
///
/// Uses NFKD decomposition and drops combining marks, then maps the handful
/// of Latin letters that have no decomposition.
pub fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            'ß' => out.push_str("ss"),
            'æ' | 'Æ' => out.push_str("ae"),
            'œ' | 'Œ' => out.push_str("oe"),
            'þ' | 'Þ' => out.push_str("th"),
            'ø' | 'Ø' => out.push('o'),
            'ł' | 'Ł' => out.push('l'),
            'đ' | 'Đ' | 'ð' | 'Ð' => out.push('d'),
            'ı' => out.push('i'),
            _ => out.push(c),
        }
    }
    out
}

/// Derive the URL-safe token for a name.
///
/// Non-alphanumeric runs collapse to a single hyphen, apostrophes vanish,
/// `&` reads as "and", and leading/trailing hyphens are trimmed. Returns an
/// empty string when nothing survives.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in transliterate(name).chars() {
        match c {
            '\'' | '\u{2019}' => {}
            '&' => {
                pending_hyphen = true;
                push_word(&mut slug, "and", &mut pending_hyphen);
                pending_hyphen = true;
            }
            c if c.is_ascii_alphanumeric() => {
                let mut buf = [0u8; 4];
                let lower = c.to_ascii_lowercase().encode_utf8(&mut buf);
                push_word(&mut slug, lower, &mut pending_hyphen);
            }
            _ => pending_hyphen = true,
        }
    }

    slug
}

fn push_word(slug: &mut String, word: &str, pending: &mut bool) {
    if *pending && !slug.is_empty() {
        slug.push('-');
    }
    *pending = false;
    slug.push_str(word);
}

/// Slug base for a name, falling back to a generic base when empty.
pub fn base_slug(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}

/// Regex source matching a base and any numeric suffix of it.
///
/// Callers apply it case-insensitively (`~*` in PostgreSQL).
pub fn slug_pattern(base: &str) -> String {
    format!("^({})(-[0-9]+)?$", regex::escape(base))
}

/// Apply the count-derived suffix: `base` for zero conflicts, otherwise
/// `base-(conflicts + 1)`.
pub fn suffixed_slug(base: &str, conflicts: usize) -> String {
    if conflicts == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, conflicts + 1)
    }
}

/// Compiled case-insensitive matcher for one slug base.
#[derive(Debug, Clone)]
pub struct SlugMatcher {
    regex: Regex,
}

impl SlugMatcher {
    pub fn new(base: &str) -> Result<Self> {
        let regex = RegexBuilder::new(&slug_pattern(base))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Internal(format!("invalid slug pattern: {}", e)))?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, slug: &str) -> bool {
        self.regex.is_match(slug)
    }

    /// Count how many of `existing` conflict with this base.
    pub fn count_conflicts<I, S>(&self, existing: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        existing
            .into_iter()
            .filter(|s| self.is_match(s.as_ref()))
            .count()
    }
}

/// Resolve a unique slug for `name` against the slugs already in use.
pub fn resolve_slug<I, S>(name: &str, existing: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let base = base_slug(name);
    let conflicts = SlugMatcher::new(&base)?.count_conflicts(existing);
    Ok(suffixed_slug(&base, conflicts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Cafe Luna"), "cafe-luna");
    }

    #[test]
    fn test_slugify_strips_diacritics() {
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("Straße Ærø"), "strasse-aero");
        assert_eq!(slugify("Łódź"), "lodz");
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify("  --Hello__World!!  "), "hello-world");
        assert_eq!(slugify("a   b"), "a-b");
    }

    #[test]
    fn test_slugify_apostrophes_and_ampersand() {
        assert_eq!(slugify("Tom & Jerry's"), "tom-and-jerrys");
        assert_eq!(slugify("&Co"), "and-co");
    }

    #[test]
    fn test_slugify_non_latin_is_empty() {
        assert_eq!(slugify("東京"), "");
        assert_eq!(base_slug("東京"), "store");
        assert_eq!(base_slug("!!!"), "store");
    }

    #[test]
    fn test_suffixed_slug() {
        assert_eq!(suffixed_slug("cafe-luna", 0), "cafe-luna");
        assert_eq!(suffixed_slug("cafe-luna", 1), "cafe-luna-2");
        assert_eq!(suffixed_slug("cafe-luna", 2), "cafe-luna-3");
    }

    #[test]
    fn test_matcher_matches_base_and_numeric_suffixes() {
        let m = SlugMatcher::new("cafe-luna").unwrap();
        assert!(m.is_match("cafe-luna"));
        assert!(m.is_match("cafe-luna-2"));
        assert!(m.is_match("CAFE-LUNA-17"));
        assert!(!m.is_match("cafe-luna-bar"));
        assert!(!m.is_match("cafe-luna-"));
        assert!(!m.is_match("the-cafe-luna"));
    }

    #[test]
    fn test_resolve_sequence() {
        let mut taken: Vec<String> = Vec::new();
        for expected in ["cafe-luna", "cafe-luna-2", "cafe-luna-3"] {
            let slug = resolve_slug("Cafe Luna", &taken).unwrap();
            assert_eq!(slug, expected);
            taken.push(slug);
        }
    }

    #[test]
    fn test_resolve_ignores_unrelated_slugs() {
        let taken = vec!["cafe", "cafe-luna-bar", "luna"];
        assert_eq!(resolve_slug("Cafe Luna", taken).unwrap(), "cafe-luna");
    }

    #[test]
    fn test_slug_pattern_shape() {
        assert_eq!(slug_pattern("abc"), "^(abc)(-[0-9]+)?$");
    }
}
