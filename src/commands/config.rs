use anyhow::Result;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    asset::FsAssetDatabase,
    reconcile::ReconcileSession,
    registry::{EmbeddedPackageRegistry, ListQuery, PackageRegistry},
    runtime::Runtime,
};

/// A session over a project on disk.
pub type ProjectSession<R> = ReconcileSession<FsAssetDatabase<R>, EmbeddedPackageRegistry<R>, R>;

pub struct Config<R: Runtime> {
    pub runtime: Arc<R>,
    pub project_root: PathBuf,
}

impl<R: Runtime + 'static> Config<R> {
    /// Defaults the project root to the current directory.
    pub fn new(runtime: R, project_root: Option<PathBuf>) -> Result<Self> {
        let project_root = match project_root {
            Some(path) => path,
            None => runtime.current_dir()?,
        };
        debug!("Using project root: {:?}", project_root);

        Ok(Self {
            runtime: Arc::new(runtime),
            project_root,
        })
    }

    /// Build a session whose asset database knows every embedded package.
    pub async fn session(&self) -> Result<ProjectSession<R>> {
        let registry = Arc::new(EmbeddedPackageRegistry::new(
            Arc::clone(&self.runtime),
            &self.project_root,
        ));

        // Resolution reports the failure properly; here it only means no mounts
        let packages = match registry.list_packages(ListQuery::installed_direct()).await {
            Ok(packages) => packages,
            Err(e) => {
                debug!("No embedded packages to mount: {:#}", e);
                Vec::new()
            }
        };

        let assets = FsAssetDatabase::new(Arc::clone(&self.runtime), &self.project_root)
            .with_packages(&packages);

        Ok(ReconcileSession::new(
            Arc::clone(&self.runtime),
            assets,
            registry,
            &self.project_root,
        ))
    }
}
