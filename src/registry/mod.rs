//! Host package registry abstraction.
//!
//! The host tracks its own packages independently of the NuGet manifest.
//! The only question asked of it is "which installed host packages exist and
//! where do they live on disk".

mod embedded;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

pub use embedded::{EmbeddedPackageRegistry, PACKAGE_MANIFEST_FILE};

/// Options for a package listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// Do not contact remote registries
    pub offline: bool,
    /// Include packages pulled in as dependencies of other packages
    pub include_transitive: bool,
}

impl ListQuery {
    /// The query used to find the package holding the NuGet repository.
    pub const fn installed_direct() -> Self {
        Self {
            offline: true,
            include_transitive: false,
        }
    }
}

/// A package as known to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPackage {
    /// Canonical name, e.g. `com.acme.core`
    pub name: String,
    /// Where the package's files live on disk
    pub resolved_path: PathBuf,
}

/// Trait for host package registries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// List installed host packages.
    async fn list_packages(&self, query: ListQuery) -> Result<Vec<HostPackage>>;
}
