//! Working-set selection: a directory listing filtered by a filename glob.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};

/// Translates a shell-style wildcard into an anchored regular expression:
/// `*` matches any run of characters, `?` a single character, everything
/// else is literal.
pub fn glob_to_regex(glob: &str) -> String {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            _ => pattern.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    pattern
}

/// Collects the regular files in the pattern's parent directory whose names
/// match its filename glob.
///
/// The result is de-duplicated and lexicographically ordered, so repeated
/// selection against an unchanged directory is reproducible. Directories and
/// other non-regular entries are silently skipped. An unreadable directory
/// or an empty result is `NoMatchingImages`.
pub fn select_images(full_pattern: &str) -> Result<BTreeSet<String>> {
    let no_match = || Error::NoMatchingImages(full_pattern.to_string());
    let pattern_path = Path::new(full_pattern);
    let glob = pattern_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let dir = match pattern_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // The translated pattern is fully escaped, so compilation only fails on
    // pathological input; treat that the same as matching nothing.
    let matcher = match Regex::new(&glob_to_regex(glob)) {
        Ok(matcher) => matcher,
        Err(_) => return Err(no_match()),
    };

    let mut images = BTreeSet::new();
    for entry in fs::read_dir(dir).map_err(|_| no_match())? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        let is_file = entry
            .file_type()
            .map(|file_type| file_type.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if matcher.is_match(&name) {
            images.insert(name);
        }
    }
    if images.is_empty() {
        return Err(no_match());
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("*.jpg", "^.*\\.jpg$"; "star")]
    #[test_case("IMG_????.jpg", "^IMG_....\\.jpg$"; "question marks")]
    #[test_case("a+b", "^a\\+b$"; "regex metacharacters escaped")]
    fn translates_globs(glob: &str, expected: &str) {
        assert_eq!(glob_to_regex(glob), expected);
    }

    fn populated_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.jpg", "c.png", "a.jpeg"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        // A directory whose name matches the glob must still be skipped.
        fs::create_dir(dir.path().join("d.jpg")).unwrap();
        dir
    }

    fn pattern(dir: &tempfile::TempDir, glob: &str) -> String {
        dir.path().join(glob).display().to_string()
    }

    #[test]
    fn selects_matching_regular_files_in_lexicographic_order() {
        let dir = populated_dir();
        let images = select_images(&pattern(&dir, "*.jpg")).unwrap();
        let names: Vec<&str> = images.iter().map(|name| name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.jpg"]);
    }

    #[test]
    fn question_mark_matches_exactly_one_character() {
        let dir = populated_dir();
        let images = select_images(&pattern(&dir, "?.jpg")).unwrap();
        assert_eq!(images.len(), 2);
        assert!(!images.contains("a.jpeg"));
    }

    #[test]
    fn selection_is_idempotent() {
        let dir = populated_dir();
        let first = select_images(&pattern(&dir, "*.jpg")).unwrap();
        let second = select_images(&pattern(&dir, "*.jpg")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_result_is_no_matching_images() {
        let dir = populated_dir();
        assert!(matches!(
            select_images(&pattern(&dir, "*.tif")),
            Err(Error::NoMatchingImages(_))
        ));
    }

    #[test]
    fn unreadable_directory_is_no_matching_images() {
        assert!(matches!(
            select_images("/definitely/not/a/dir/*.jpg"),
            Err(Error::NoMatchingImages(_))
        ));
    }
}
