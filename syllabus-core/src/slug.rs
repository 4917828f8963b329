//! URL slug generation with per-scope uniqueness.
//!
//! A slug is derived from display text by [`normalize`], then disambiguated
//! against the sibling rows of its [`SlugScope`] by appending `-1`, `-2`, ...
//! until a free value is found.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::catalog::assets::AssetKind;
use crate::error::Result;

/// The set of rows a slug must be unique within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    Categories,
    Subcategories { category_id: i64 },
    Courses { subcategory_id: i64 },
    CourseAssets { kind: AssetKind, course_id: i64 },
}

impl SlugScope {
    pub fn table(&self) -> &'static str {
        match self {
            SlugScope::Categories => "categories",
            SlugScope::Subcategories { .. } => "subcategories",
            SlugScope::Courses { .. } => "courses",
            SlugScope::CourseAssets { kind, .. } => kind.table(),
        }
    }

    /// Parent column and id restricting the scope, if any.
    pub fn parent(&self) -> Option<(&'static str, i64)> {
        match *self {
            SlugScope::Categories => None,
            SlugScope::Subcategories { category_id } => {
                Some(("category_id", category_id))
            }
            SlugScope::Courses { subcategory_id } => {
                Some(("subcategory_id", subcategory_id))
            }
            SlugScope::CourseAssets { course_id, .. } => {
                Some(("course_id", course_id))
            }
        }
    }

    /// Width of the scope's `slug` column.
    pub fn max_len(&self) -> usize {
        match self {
            SlugScope::Categories | SlugScope::Subcategories { .. } => 140,
            SlugScope::Courses { .. } | SlugScope::CourseAssets { .. } => 200,
        }
    }

    /// Used when the source text normalizes to nothing.
    pub fn fallback_noun(&self) -> &'static str {
        match self {
            SlugScope::Categories => "category",
            SlugScope::Subcategories { .. } => "subcategory",
            SlugScope::Courses { .. } => "course",
            SlugScope::CourseAssets { kind, .. } => kind.singular(),
        }
    }
}

/// Storage seam for slug lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlugLookup: Send {
    /// Slugs in `scope` equal to `base` or shaped like `base-<n>`, ignoring
    /// the row `exclude_id`.
    async fn taken_slugs(
        &mut self,
        scope: SlugScope,
        base: &str,
        exclude_id: Option<i64>,
    ) -> Result<HashSet<String>>;
}

/// Lowercase, ASCII-folded, hyphen-separated form of `text`.
///
/// The result only contains `[a-z0-9-]`, never starts or ends with `-` and
/// never contains `--`. It may be empty.
pub fn normalize(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    let push = |slug: &mut String, ch: char, pending_dash: &mut bool| {
        if *pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        *pending_dash = false;
        slug.push(ch);
    };

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            push(&mut slug, ch, &mut pending_dash);
        } else if let Some(folded) = fold(ch) {
            for ascii in folded.chars() {
                push(&mut slug, ascii, &mut pending_dash);
            }
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn fold(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'ĥ' | 'ħ' => "h",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'ĵ' => "j",
        'ķ' => "k",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'ś' | 'ŝ' | 'ş' | 'š' | 'ș' => "s",
        'ţ' | 'ť' | 'ŧ' | 'ț' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'ŵ' => "w",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'þ' => "th",
        _ => return None,
    };
    Some(folded)
}

/// Room kept for a `-<n>` suffix once a base collides.
const SUFFIX_ROOM: usize = 8;

/// Cut a normalized slug to at most `max` bytes without leaving a trailing `-`.
pub fn truncate(slug: &str, max: usize) -> &str {
    // Normalized slugs are ASCII, so any byte index is a char boundary.
    let cut = slug.get(..max.min(slug.len())).unwrap_or(slug);
    cut.trim_end_matches('-')
}

/// First of `base`, `base-1`, `base-2`, ... not present in `taken`.
pub fn next_free(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Produce a slug for `desired` that is unused within `scope`.
///
/// `exclude_id` is the row being updated, so keeping its current slug never
/// picks up a suffix. The result always fits [`SlugScope::max_len`]: a base
/// that collides is shortened first so the suffix fits too.
pub async fn resolve_slug<L>(
    lookup: &mut L,
    scope: SlugScope,
    desired: &str,
    exclude_id: Option<i64>,
) -> Result<String>
where
    L: SlugLookup + ?Sized,
{
    let normalized = normalize(desired);
    let max = scope.max_len();
    let base = match truncate(&normalized, max) {
        "" => scope.fallback_noun(),
        base => base,
    };

    let taken = lookup.taken_slugs(scope, base, exclude_id).await?;
    if !taken.contains(base) {
        return Ok(base.to_string());
    }

    let stem = truncate(base, max - SUFFIX_ROOM);
    if stem == base {
        return Ok(next_free(base, &taken));
    }
    let taken = lookup.taken_slugs(scope, stem, exclude_id).await?;
    Ok(next_free(stem, &taken))
}

/// Pick the text a row's slug should be derived from on update.
///
/// An explicit non-blank slug wins. An explicit `null` or blank slug, or a
/// changed title without any slug key, regenerates from the title. `None`
/// means the stored slug stays as it is.
pub fn update_source<'a>(
    explicit: Option<Option<&'a str>>,
    new_title: Option<&'a str>,
    current_title: &'a str,
) -> Option<&'a str> {
    match explicit {
        Some(Some(slug)) if !slug.trim().is_empty() => Some(slug),
        Some(_) => Some(new_title.unwrap_or(current_title)),
        None => new_title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::{always, eq};

    #[test]
    fn normalize_produces_clean_tokens() {
        assert_eq!(normalize("Web Development"), "web-development");
        assert_eq!(normalize("  --Rust & Go!!  "), "rust-go");
        assert_eq!(normalize("Crème Brûlée 101"), "creme-brulee-101");
        assert_eq!(normalize("Straße_Łódź"), "strasse-lodz");
        assert_eq!(normalize("C++ / C#"), "c-c");
        assert_eq!(normalize("ÆON"), "aeon");
        assert_eq!(normalize("日本語"), "");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn normalize_output_is_url_safe() {
        for input in [
            "Hello,   World",
            "a--b",
            "-leading",
            "trailing-",
            "Mixed CASE 42",
            "tabs\tand\nnewlines",
            "émoji 🚀 launch",
        ] {
            let slug = normalize(input);
            assert!(
                slug.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "{slug}"
            );
            assert!(!slug.starts_with('-') && !slug.ends_with('-'), "{slug}");
            assert!(!slug.contains("--"), "{slug}");
        }
    }

    #[test]
    fn next_free_appends_the_first_unused_suffix() {
        let mut taken = HashSet::new();
        assert_eq!(next_free("intro", &taken), "intro");

        for n in 0..5 {
            let slug = if n == 0 {
                "intro".to_string()
            } else {
                format!("intro-{n}")
            };
            taken.insert(slug);
        }
        assert_eq!(next_free("intro", &taken), "intro-5");

        taken.remove("intro-2");
        assert_eq!(next_free("intro", &taken), "intro-2");
    }

    #[test]
    fn truncate_drops_a_dangling_hyphen() {
        assert_eq!(truncate("intro-to-rust", 9), "intro-to");
        assert_eq!(truncate("intro-to-rust", 8), "intro-to");
        assert_eq!(truncate("intro", 140), "intro");
    }

    #[tokio::test]
    async fn folded_text_is_capped_to_the_column() {
        let mut lookup = MockSlugLookup::new();
        lookup
            .expect_taken_slugs()
            .returning(|_, _, _| Ok(HashSet::new()));

        // Each 'ß' folds to two characters.
        let name = "ß".repeat(120);
        let slug = resolve_slug(&mut lookup, SlugScope::Categories, &name, None)
            .await
            .expect("resolve");
        assert_eq!(slug.len(), 140);
        assert!(slug.chars().all(|c| c == 's'));
    }

    #[tokio::test]
    async fn colliding_full_width_slug_makes_room_for_suffix() {
        let long = "a".repeat(140);
        let stem = "a".repeat(132);

        let mut lookup = MockSlugLookup::new();
        let taken = long.clone();
        lookup
            .expect_taken_slugs()
            .with(always(), eq(long.clone()), eq(None))
            .times(1)
            .returning(move |_, _, _| Ok([taken.clone()].into_iter().collect()));
        let stem_taken = stem.clone();
        lookup
            .expect_taken_slugs()
            .with(always(), eq(stem.clone()), eq(None))
            .times(1)
            .returning(move |_, _, _| Ok([stem_taken.clone()].into_iter().collect()));

        let slug = resolve_slug(&mut lookup, SlugScope::Categories, &long, None)
            .await
            .expect("resolve");
        assert_eq!(slug, format!("{stem}-1"));
        assert!(slug.len() <= SlugScope::Categories.max_len());
    }

    #[test]
    fn update_source_rules() {
        assert_eq!(update_source(None, None, "Old"), None);
        assert_eq!(update_source(None, Some("New"), "Old"), Some("New"));
        assert_eq!(
            update_source(Some(Some("custom")), Some("New"), "Old"),
            Some("custom")
        );
        assert_eq!(update_source(Some(None), None, "Old"), Some("Old"));
        assert_eq!(update_source(Some(Some("  ")), Some("New"), "Old"), Some("New"));
    }

    #[tokio::test]
    async fn resolve_uses_scope_and_exclusion() {
        let mut lookup = MockSlugLookup::new();
        lookup
            .expect_taken_slugs()
            .with(
                eq(SlugScope::Subcategories { category_id: 7 }),
                eq("web-development"),
                eq(Some(3)),
            )
            .times(1)
            .returning(|_, _, _| {
                Ok(["web-development".to_string(), "web-development-1".to_string()]
                    .into_iter()
                    .collect())
            });

        let slug = resolve_slug(
            &mut lookup,
            SlugScope::Subcategories { category_id: 7 },
            "Web Development",
            Some(3),
        )
        .await
        .expect("resolve");
        assert_eq!(slug, "web-development-2");
    }

    #[tokio::test]
    async fn own_slug_is_kept_when_excluded() {
        let mut lookup = MockSlugLookup::new();
        lookup
            .expect_taken_slugs()
            .with(always(), eq("rust-basics"), eq(Some(11)))
            .returning(|_, _, _| Ok(HashSet::new()));

        let slug = resolve_slug(
            &mut lookup,
            SlugScope::Courses { subcategory_id: 2 },
            "rust-basics",
            Some(11),
        )
        .await
        .expect("resolve");
        assert_eq!(slug, "rust-basics");
    }

    #[tokio::test]
    async fn empty_text_falls_back_to_noun() {
        let mut lookup = MockSlugLookup::new();
        lookup
            .expect_taken_slugs()
            .with(always(), eq("video"), eq(None))
            .returning(|_, _, _| Ok(["video".to_string()].into_iter().collect()));

        let scope = SlugScope::CourseAssets {
            kind: AssetKind::Video,
            course_id: 1,
        };
        let slug = resolve_slug(&mut lookup, scope, "???", None)
            .await
            .expect("resolve");
        assert_eq!(slug, "video-1");
    }
}
