//! Typed errors for configuration loading, path resolution and cleanup.
//!
//! Plumbing code uses `anyhow`; these enums exist where callers need to
//! branch on the failure kind.

use std::path::PathBuf;

/// Failures while reading `nuget.config`.
///
/// All of them mean "feature not configured": the session logs and stays inert.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {path:?} is missing or unreadable: {reason}")]
    ConfigMissing { path: PathBuf, reason: String },

    #[error("config file {path:?} does not contain a \"{key}\" entry")]
    KeyMissing { path: PathBuf, key: String },

    #[error("repository path \"{path}\" does not look like Packages/<folder>/<subpath>")]
    InvalidRepositoryPath { path: String },
}

/// Failures while mapping the repository path onto a host package.
///
/// Cloneable so a shared in-flight resolution can hand the same error to
/// every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("listing host packages failed: {0}")]
    RegistryQueryFailed(String),

    #[error("no host package is installed at a path ending with \"{folder_name}\"")]
    PackageNotFound { folder_name: String },

    #[error("several host packages end with \"{folder_name}\": {}", candidates.join(", "))]
    AmbiguousPackage {
        folder_name: String,
        candidates: Vec<String>,
    },

    #[error(
        "folder name \"{folder_name}\" appears {occurrences} times in \"{repository_path}\", expected exactly once"
    )]
    FolderNameNotUnique {
        folder_name: String,
        repository_path: String,
        occurrences: usize,
    },
}

/// A cleanup step that could not run because the tree had an unexpected shape.
///
/// These never abort a package: the step is skipped and recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CleanupIssue {
    #[error("{step}: {reason} ({path})")]
    MalformedTree {
        step: &'static str,
        path: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_package_lists_candidates() {
        let err = ResolveError::AmbiguousPackage {
            folder_name: "Core".into(),
            candidates: vec!["com.a.core".into(), "com.b.core".into()],
        };
        assert_eq!(
            err.to_string(),
            "several host packages end with \"Core\": com.a.core, com.b.core"
        );
    }

    #[test]
    fn test_key_missing_message() {
        let err = ConfigError::KeyMissing {
            path: PathBuf::from("/p/nuget.config"),
            key: "repositoryPath".into(),
        };
        assert!(err.to_string().contains("\"repositoryPath\""));
    }
}
