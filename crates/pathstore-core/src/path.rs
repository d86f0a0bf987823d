//! Key and filename helpers
//!
//! Keys double as virtual file paths: zero or more `/`-delimited segments
//! followed by a leaf name. Everything here is a pure string transform.

/// Directory portion of a key, up to and including the final `/`
///
/// Returns an empty string when the key has no `/`.
pub fn key_to_path(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..=idx],
        None => "",
    }
}

/// Leaf portion of a key, after the final `/`
///
/// A key ending in `/` has an empty name.
pub fn key_to_name(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

/// Split a filename into its base and lower-cased extension
///
/// Only the segment after the last `.` counts as the extension. A trailing
/// dot is dropped from the base and yields an empty extension.
pub fn split_filename_and_extension(filename: &str) -> (String, String) {
    match filename.rfind('.') {
        None => (filename.to_string(), String::new()),
        Some(idx) if idx + 1 == filename.len() => (filename[..idx].to_string(), String::new()),
        Some(idx) => (
            filename[..idx].to_string(),
            filename[idx + 1..].to_lowercase(),
        ),
    }
}

/// Regex source matching keys at or below a path prefix
///
/// The prefix is embedded literally. A prefix ending in `/` matches any key
/// that starts with it. A prefix without the trailing `/` also matches the
/// key equal to the prefix itself, but not siblings sharing the same
/// leading characters (`/a/b` matches `/a/b` and `/a/b/c`, not `/a/bc`).
pub fn path_prefix_pattern(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        format!("^{}", regex::escape(prefix))
    } else {
        format!("^{}(?:/|$)", regex::escape(prefix))
    }
}

/// Replace the leading `current` prefix of `key` with `next`
///
/// Returns `None` if the key does not start with `current`.
pub fn replace_prefix(key: &str, current: &str, next: &str) -> Option<String> {
    key.strip_prefix(current)
        .map(|rest| format!("{}{}", next, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_key_to_path() {
        assert_eq!(key_to_path(""), "");
        assert_eq!(key_to_path("plain"), "");
        assert_eq!(key_to_path("/docs/report"), "/docs/");
        assert_eq!(key_to_path("docs/a/b"), "docs/a/");
        assert_eq!(key_to_path("/folder/"), "/folder/");
        assert_eq!(key_to_path("/"), "/");
    }

    #[test]
    fn test_key_to_name() {
        assert_eq!(key_to_name(""), "");
        assert_eq!(key_to_name("plain"), "plain");
        assert_eq!(key_to_name("/docs/report"), "report");
        assert_eq!(key_to_name("/folder/"), "");
    }

    #[test]
    fn test_path_and_name_rejoin() {
        for key in ["/a", "/a/b/c.txt", "a/b", "/x/", "//double", "no-slash"] {
            if key.contains('/') {
                assert_eq!(format!("{}{}", key_to_path(key), key_to_name(key)), key);
            } else {
                assert_eq!(key_to_name(key), key);
            }
        }
    }

    #[test]
    fn test_split_filename_and_extension() {
        assert_eq!(
            split_filename_and_extension("dog.txt.bak"),
            ("dog.txt".to_string(), "bak".to_string())
        );
        assert_eq!(
            split_filename_and_extension("README"),
            ("README".to_string(), String::new())
        );
        assert_eq!(
            split_filename_and_extension("trailing."),
            ("trailing".to_string(), String::new())
        );
        assert_eq!(
            split_filename_and_extension("Photo.JPG"),
            ("Photo".to_string(), "jpg".to_string())
        );
    }

    #[test]
    fn test_split_filename_round_trip() {
        for (base, ext) in [("notes", "MD"), ("a", "b"), ("report-2024", "Pdf")] {
            let (b, e) = split_filename_and_extension(&format!("{}.{}", base, ext));
            assert_eq!(b, base);
            assert_eq!(e, ext.to_lowercase());
        }
    }

    #[test]
    fn test_path_prefix_pattern_without_slash() {
        let re = Regex::new(&path_prefix_pattern("/a/b")).unwrap();
        assert!(re.is_match("/a/b"));
        assert!(re.is_match("/a/b/c"));
        assert!(re.is_match("/a/b/d/e"));
        assert!(!re.is_match("/a/bc"));
        assert!(!re.is_match("/x/a/b"));
    }

    #[test]
    fn test_path_prefix_pattern_escapes_literals() {
        let re = Regex::new(&path_prefix_pattern("/v1.0/")).unwrap();
        assert!(re.is_match("/v1.0/file"));
        assert!(!re.is_match("/v1x0/file"));
        assert!(!re.is_match("/v1.0"));
    }

    #[test]
    fn test_replace_prefix() {
        assert_eq!(
            replace_prefix("/a/b/c", "/a/b", "/a/z"),
            Some("/a/z/c".to_string())
        );
        assert_eq!(replace_prefix("/q", "/a/b", "/a/z"), None);
    }
}
