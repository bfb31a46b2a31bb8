//! Path and file name utilities.
//!
//! Extension checks used by the watcher and transcoder, plus the two
//! sanitizing passes applied to every outgoing file name before a backend
//! sees it.

use std::path::Path;

/// Characters that can reorder how a file name is displayed.
const BIDI_CONTROL_CHARACTERS: &[char] = &[
    '\u{061C}', '\u{200E}', '\u{200F}', '\u{202A}', '\u{202B}', '\u{202C}', '\u{202D}',
    '\u{202E}', '\u{2066}', '\u{2067}', '\u{2068}', '\u{2069}',
];

/// Lowercased extension of `path`, without the dot.
pub fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if `path` has one of `extensions` (case-insensitive).
///
/// An empty list matches every path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use droplift_common::paths::has_extension;
///
/// let exts = vec!["png".to_string(), "MOV".to_string()];
/// assert!(has_extension(Path::new("shot.PNG"), &exts));
/// assert!(has_extension(Path::new("clip.mov"), &exts));
/// assert!(!has_extension(Path::new("notes.txt"), &exts));
/// assert!(has_extension(Path::new("notes.txt"), &[]));
/// ```
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    match extension_lowercase(path) {
        Some(ext) => extensions.iter().any(|e| e.to_lowercase() == ext),
        None => false,
    }
}

/// Check if the final component of `path` starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// File name of `path` as a `String` (lossy).
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Strip bidirectional control characters from `name`.
///
/// # Examples
///
/// ```
/// use droplift_common::paths::remove_bidi_control_characters;
///
/// // "exe.png" would display as "gnp.exe" without stripping.
/// assert_eq!(remove_bidi_control_characters("\u{202E}gnp.exe"), "gnp.exe");
/// ```
pub fn remove_bidi_control_characters(name: &str) -> String {
    name.chars()
        .filter(|c| !BIDI_CONTROL_CHARACTERS.contains(c))
        .collect()
}

/// Replace characters that are not allowed in file names with `replacement`.
///
/// Uses the Windows rules on every platform so names are portable.
///
/// # Examples
///
/// ```
/// use droplift_common::paths::replace_reserved_characters;
///
/// assert_eq!(replace_reserved_characters("a:b?c.png", "_"), "a_b_c.png");
/// ```
pub fn replace_reserved_characters(name: &str, replacement: &str) -> String {
    sanitize_filename::sanitize_with_options(
        name,
        sanitize_filename::Options {
            truncate: false,
            windows: true,
            replacement,
        },
    )
}
