//! Installed NuGet package identities
//!
//! This module provides the value type naming an installed package and the
//! reader for the `packages.config` manifest that lists them.

mod manifest;

use std::fmt;

pub use manifest::{PACKAGES_CONFIG_FILE, parse_package_manifest};

/// An installed package as recorded by the NuGet installer.
///
/// Two identities are equal iff both id and version are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    pub id: String,
    pub version: String,
}

impl PackageIdentity {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// The on-disk folder name: `{id}.{version}`.
    pub fn formatted_name(&self) -> String {
        format!("{}.{}", self.id, self.version)
    }

    /// The `.nupkg` archive the installer leaves inside the package folder.
    pub fn nupkg_file_name(&self) -> String {
        format!("{}.nupkg", self.formatted_name())
    }

    /// The `.nuspec` file that occasionally escapes the archive.
    pub fn nuspec_file_name(&self) -> String {
        format!("{}.nuspec", self.id)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}
