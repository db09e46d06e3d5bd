use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{HostPackage, ListQuery, PackageRegistry};
use crate::runtime::Runtime;

/// The host package manifest inside every package folder.
pub const PACKAGE_MANIFEST_FILE: &str = "package.json";

/// Folder holding the project's embedded packages.
const EMBEDDED_DIR: &str = "Packages";

/// Folder where the host caches packages fetched from registries.
const PACKAGE_CACHE_DIR: &str = "Library/PackageCache";

#[derive(Deserialize, Debug)]
struct PackageManifest {
    name: String,
}

/// Registry backed by the package folders of a project on disk.
///
/// Lists every `Packages/*/package.json`; with `include_transitive` it also
/// lists the host's package cache. Never touches the network, so `offline`
/// is always satisfied.
pub struct EmbeddedPackageRegistry<R: Runtime> {
    runtime: Arc<R>,
    project_root: PathBuf,
}

impl<R: Runtime> EmbeddedPackageRegistry<R> {
    pub fn new(runtime: Arc<R>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            project_root: project_root.into(),
        }
    }

    fn scan(&self, dir: &Path) -> Result<Vec<HostPackage>> {
        let mut packages = Vec::new();
        for entry in self.runtime.read_dir(dir)? {
            if !self.runtime.is_dir(&entry) {
                continue;
            }
            let manifest_path = entry.join(PACKAGE_MANIFEST_FILE);
            if !self.runtime.exists(&manifest_path) {
                continue;
            }
            match self.read_manifest(&manifest_path) {
                Ok(manifest) => packages.push(HostPackage {
                    name: manifest.name,
                    resolved_path: entry,
                }),
                Err(e) => debug!("Skipping {:?}: {:#}", entry, e),
            }
        }
        Ok(packages)
    }

    fn read_manifest(&self, path: &Path) -> Result<PackageManifest> {
        let content = self.runtime.read_to_string(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid package manifest {:?}", path))
    }
}

#[async_trait]
impl<R: Runtime> PackageRegistry for EmbeddedPackageRegistry<R> {
    #[tracing::instrument(skip(self))]
    async fn list_packages(&self, query: ListQuery) -> Result<Vec<HostPackage>> {
        let embedded_dir = self.project_root.join(EMBEDDED_DIR);
        if !self.runtime.is_dir(&embedded_dir) {
            anyhow::bail!("{:?} is not a directory", embedded_dir);
        }

        let mut packages = self.scan(&embedded_dir)?;

        if query.include_transitive {
            let cache_dir = self.project_root.join(PACKAGE_CACHE_DIR);
            if self.runtime.is_dir(&cache_dir) {
                packages.extend(self.scan(&cache_dir)?);
            }
        }

        debug!("Host registry lists {} package(s)", packages.len());
        Ok(packages)
    }
}
