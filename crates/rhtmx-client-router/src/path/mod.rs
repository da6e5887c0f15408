/// Path utilities for validation and normalization
///
/// All functions are **pure**: given same input, always produce same output with no side effects.
use std::borrow::Cow;

/// Validates if a path is in canonical form
///
/// # Rules
///
/// - Must start with `/`
/// - Must not contain `//`
/// - Must not end with `/` (except root `/`)
/// - Must not be empty
///
/// # Examples
///
/// ```
/// use rhtmx_client_router::path::is_valid_path;
///
/// assert!(is_valid_path("/"));
/// assert!(is_valid_path("/users/123"));
///
/// assert!(!is_valid_path(""));
/// assert!(!is_valid_path("about")); // Missing leading /
/// assert!(!is_valid_path("/about/")); // Trailing /
/// assert!(!is_valid_path("/about//page")); // Double //
/// ```
pub fn is_valid_path(path: &str) -> bool {
    if path.is_empty() || !path.starts_with('/') {
        return false;
    }

    if path.contains("//") {
        return false;
    }

    if path == "/" {
        return true;
    }

    !path.ends_with('/')
}

/// Normalize a path to canonical form
///
/// Returns `Cow::Borrowed` when the input is already canonical.
///
/// Rules, in order:
///
/// - Empty or bare `/` input: `/`
/// - Repeated separators collapse: `/path//to` → `/path/to`
/// - Missing leading separator is inserted: `users` → `/users`
/// - Trailing separator is stripped: `/path/` → `/path`
///
/// `normalize_path(normalize_path(p)) == normalize_path(p)` for every `p`.
///
/// # Examples
///
/// ```
/// use rhtmx_client_router::path::normalize_path;
/// use std::borrow::Cow;
///
/// let path = normalize_path("/about");
/// assert!(matches!(path, Cow::Borrowed("/about")));
///
/// assert_eq!(normalize_path("/about/"), "/about");
/// assert_eq!(normalize_path("users//123"), "/users/123");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_valid_path(path) {
        return Cow::Borrowed(path);
    }

    let normalized = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", normalized))
    }
}

/// Resolves a child template against its parent's full path
///
/// ```
/// use rhtmx_client_router::path::join_paths;
///
/// assert_eq!(join_paths("", "users"), "/users");
/// assert_eq!(join_paths("/", "users"), "/users");
/// assert_eq!(join_paths("/users", ":id/"), "/users/:id");
/// assert_eq!(join_paths("/users", ""), "/users");
/// ```
pub fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{}/{}", prefix, path)).into_owned()
}
