use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// `seat-adjuster` -> `SeatAdjuster`, `SeatService` -> `Seatservice`.
pub fn to_camel_case(kebab: &str) -> String {
    kebab
        .to_lowercase()
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Keeps the rightmost characters of `input` so that the result has at most
/// `length` characters, marking the cut with a leading `...`.
pub fn create_truncated_string(input: &str, length: usize) -> String {
    let count = input.chars().count();
    if count < length {
        return input.to_string();
    }
    let keep = length.saturating_sub(3);
    let tail: String = input.chars().skip(count - keep).collect();
    format!("...{tail}")
}

/// Replaces every occurrence of `text` in the file at `path`.
pub fn replace_in_file(path: &Path, text: &str, replacement: &str) -> Result<()> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    fs::write(path, contents.replace(text, replacement)).map_err(|e| Error::io(path, e))
}

pub fn is_uri(path: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\w+)://(\w+)").expect("valid regex"))
        .is_match(path)
}

/// Looks `name` up in `extra_dirs` first, then on `PATH`.
pub fn find_executable(name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
    let path_dirs = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect::<Vec<_>>())
        .unwrap_or_default();

    extra_dirs
        .iter()
        .chain(path_dirs.iter())
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Final path component as a string, or an empty string.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

/// Removes `path` recursively if it exists.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// Moves `from` to `to`, falling back to copy + delete across filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| Error::io(from, e))?;
    fs::remove_file(from).map_err(|e| Error::io(from, e))
}

/// Files directly inside `dir` whose name ends with `suffix`, sorted.
pub fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(suffix));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_of_kebab_and_plain_names() {
        assert_eq!(to_camel_case("seat-adjuster"), "SeatAdjuster");
        assert_eq!(to_camel_case("Seats"), "Seats");
        assert_eq!(to_camel_case("SeatService"), "Seatservice");
    }

    #[test]
    fn truncation_keeps_the_tail() {
        assert_eq!(create_truncated_string("short", 10), "short");
        assert_eq!(create_truncated_string("0123456789", 8), "...56789");
    }

    #[test]
    fn uri_detection() {
        assert!(is_uri("https://example.com/a.proto"));
        assert!(is_uri("file://host/a.proto"));
        assert!(!is_uri("./app/seats.proto"));
        assert!(!is_uri("/abs/seats.proto"));
    }
}
