//! Asset path helpers.
//!
//! Asset paths are `/`-separated strings relative to the project root, the
//! form the host uses for every asset regardless of platform.

/// Join a child name onto an asset path.
pub fn join_asset(base: &str, child: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", base, child)
    }
}

/// The asset path of the folder containing `path`, if any.
pub fn asset_parent(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

/// The last segment of an asset path.
pub fn asset_file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Check if `path` is `dir` itself or lies beneath it.
///
/// The comparison is on whole segments, so `Foo.1.0` does not contain
/// `Foo.1.0.1/lib`.
pub fn is_asset_under(path: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    match path.strip_prefix(dir) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Convert a `\`-separated path into asset form.
pub fn to_asset_path(path: &str) -> String {
    path.replace('\\', "/")
}
