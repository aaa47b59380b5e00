use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_SLUG_LEN: usize = 100;
pub const SLUG_FALLBACK: &str = "untitled";

/// Filesystem-safe slug from free text.
///
/// The output only ever contains `[a-z0-9-]`, so it can be used as a
/// directory name without path traversal.
pub fn slugify(title: &str, max_len: usize) -> String {
    let max_len = max_len.max(1);
    let ascii: String = title
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let mut slug = String::with_capacity(ascii.len());
    let mut pending_sep = false;
    for c in ascii.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }

    slug.truncate(max_len);
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        SLUG_FALLBACK[..max_len.min(SLUG_FALLBACK.len())].to_string()
    } else {
        slug.to_string()
    }
}
