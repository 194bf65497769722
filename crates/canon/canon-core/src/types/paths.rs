//! Project-relative path normalization.

/// Normalize a project-relative path: convert backslashes to forward slashes,
/// strip leading `./`, collapse `//` to `/` and remove trailing slashes.
pub fn normalize_path(path: &str) -> String {
    let mut result = path.trim().replace('\\', "/");
    while result.contains("//") {
        result = result.replace("//", "/");
    }
    while let Some(stripped) = result.strip_prefix("./") {
        result = stripped.to_string();
    }
    while result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}

/// Returns why `path` is not an acceptable project-relative path, if it isn't.
pub fn relative_path_problem(path: &str) -> Option<&'static str> {
    if path.is_empty() {
        return Some("path is empty");
    }
    if path.starts_with('/') || path.chars().nth(1) == Some(':') {
        return Some("path must be relative to the project root");
    }
    if path.split('/').any(|segment| segment == "..") {
        return Some("path escapes the project root");
    }
    None
}

/// Parent directory of a normalized path with a trailing slash, or `None`
/// for files at the project root.
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..=idx])
}
