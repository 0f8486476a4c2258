//! Naming helpers for turning untrusted media metadata into file names.
//!
//! Titles and uploader names come straight from the remote service and end up
//! as paths on disk, so everything that names a file goes through here.

/// Characters that are not allowed in file names on Windows.
pub const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Name used when nothing usable is left after sanitizing.
pub const FALLBACK_NAME: &str = "track";

/// Separator between artist and title in a display name.
pub const ARTIST_TITLE_SEPARATOR: &str = " - ";

/// Make a name safe to use as a file name.
///
/// Replaces each forbidden character with `_` and trims surrounding whitespace
/// and dots. Returns [`FALLBACK_NAME`] if the result is empty.
///
/// ```
/// use harvest::naming::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
/// assert_eq!(sanitize_filename("   "), "track");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let cleaned = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Split an `"Artist - Title"` base name.
///
/// Splits at the first `" - "` only, so `"A - B - C"` gives `("A", "B - C")`.
/// Both halves are trimmed and empty halves become `None`. Without a separator
/// the whole (trimmed) name is the title.
pub fn split_artist_title(base_name: &str) -> (Option<String>, Option<String>) {
    let base = base_name.trim();
    match base.split_once(ARTIST_TITLE_SEPARATOR) {
        Some((artist, title)) => (non_empty(artist), non_empty(title)),
        None => (None, non_empty(base)),
    }
}

/// Build the sanitized `"Artist - Title"` base name for a download.
///
/// Falls back to the title alone when there is no artist, and to
/// [`FALLBACK_NAME`] when there is neither.
pub fn display_name(artist: &str, title: &str) -> String {
    let raw = if !artist.is_empty() {
        format!("{}{}{}", artist, ARTIST_TITLE_SEPARATOR, title)
    } else if !title.is_empty() {
        title.to_string()
    } else {
        FALLBACK_NAME.to_string()
    };
    sanitize_filename(&raw)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
