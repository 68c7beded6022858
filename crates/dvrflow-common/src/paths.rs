//! Path utilities for source recordings.
//!
//! Recordings are referenced by their path on the capture host, which is not
//! necessarily a valid local path, so these helpers work on plain strings.

/// Container extensions stripped from recording basenames.
const CONTAINER_EXTENSIONS: &[&str] = &["ts", "m2ts", "mts", "mpg", "mpeg", "mkv", "mp4"];

/// Final component of a `/`-separated path.
///
/// # Examples
///
/// ```
/// use dvrflow_common::paths::basename;
///
/// assert_eq!(basename("/data/recordings/show.ts"), "show.ts");
/// assert_eq!(basename("show.ts"), "show.ts");
/// ```
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Strip a single known container extension, case-insensitively.
///
/// # Examples
///
/// ```
/// use dvrflow_common::paths::strip_container_extension;
///
/// assert_eq!(strip_container_extension("Movie.TS"), "Movie");
/// assert_eq!(strip_container_extension("notes.txt"), "notes.txt");
/// ```
pub fn strip_container_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && CONTAINER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) =>
        {
            stem
        }
        _ => name,
    }
}
