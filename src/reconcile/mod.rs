//! Reconciling package folders after the host reports changed assets.
//!
//! A [`ReconcileSession`] holds everything that used to be process-wide:
//! the repository config, the resolved repository path and the package
//! manifest. Each batch:
//! 1. lazily loads the config and resolves the repository path (once)
//! 2. reloads the manifest, since installs happen between batches
//! 3. maps changed paths to the packages owning them
//! 4. cleans each affected package once
//! 5. commits the asset database once

mod changes;

use anyhow::Result;
use log::{debug, error, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::asset::AssetDatabase;
use crate::cleanup::{CleanupReport, PackageCleaner};
use crate::config::{ConfigLocator, RepositoryConfig};
use crate::error::ResolveError;
use crate::package::PackageIdentity;
use crate::registry::PackageRegistry;
use crate::resolver::{HostPathResolver, ResolutionFuture, ResolutionSlot, ResolvedRepo};
use crate::runtime::Runtime;

pub use changes::{ChangeBatch, affected_packages, package_asset_path};

/// What happened to a batch.
#[derive(Debug)]
pub enum BatchOutcome {
    /// No usable `nuget.config`; the feature is off
    Disabled,
    /// Nothing was cleaned and nothing committed
    Aborted(String),
    Completed(BatchSummary),
}

/// Per-package results of a completed batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub cleaned: Vec<(PackageIdentity, CleanupReport)>,
    pub failed: Vec<(PackageIdentity, String)>,
    /// Whether the asset database was committed
    pub committed: bool,
}

impl BatchSummary {
    /// Packages the batch dispatched to cleanup, in order.
    pub fn packages(&self) -> impl Iterator<Item = &PackageIdentity> {
        self.cleaned
            .iter()
            .map(|(pkg, _)| pkg)
            .chain(self.failed.iter().map(|(pkg, _)| pkg))
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Disabled => write!(f, "No repositoryPath configured, nothing to do."),
            BatchOutcome::Aborted(reason) => write!(f, "Aborted: {}", reason),
            BatchOutcome::Completed(summary)
                if summary.cleaned.is_empty() && summary.failed.is_empty() =>
            {
                write!(f, "No installed packages affected.")
            }
            BatchOutcome::Completed(summary) => {
                write!(
                    f,
                    "Cleaned {} package(s), {} failed.",
                    summary.cleaned.len(),
                    summary.failed.len()
                )
            }
        }
    }
}

/// Explicitly scoped state for reconciling one project.
pub struct ReconcileSession<A, P, R>
where
    A: AssetDatabase,
    P: PackageRegistry + 'static,
    R: Runtime,
{
    runtime: Arc<R>,
    assets: A,
    registry: Arc<P>,
    project_root: PathBuf,
    repository: Mutex<Option<RepositoryConfig>>,
    resolution: ResolutionSlot,
    manifest: Mutex<Vec<PackageIdentity>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A, P, R> ReconcileSession<A, P, R>
where
    A: AssetDatabase,
    P: PackageRegistry + 'static,
    R: Runtime,
{
    pub fn new(
        runtime: Arc<R>,
        assets: A,
        registry: Arc<P>,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runtime,
            assets,
            registry,
            project_root: project_root.into(),
            repository: Mutex::new(None),
            resolution: ResolutionSlot::new(),
            manifest: Mutex::new(Vec::new()),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    /// The loaded repository config, if any.
    pub fn repository_config(&self) -> Option<RepositoryConfig> {
        lock(&self.repository).clone()
    }

    /// The resolved repository, once resolution has succeeded.
    pub fn resolved(&self) -> Option<ResolvedRepo> {
        self.resolution.resolved()
    }

    /// The manifest as of the last batch.
    pub fn manifest(&self) -> Vec<PackageIdentity> {
        lock(&self.manifest).clone()
    }

    /// Drop the cached config and resolution; the next batch starts over.
    pub fn reset(&self) {
        *lock(&self.repository) = None;
        self.resolution.reset();
        lock(&self.manifest).clear();
    }

    fn locator(&self) -> ConfigLocator<'_, R> {
        ConfigLocator::new(self.runtime.as_ref(), &self.project_root)
    }

    /// Load the config if needed. `None` means unconfigured.
    fn ensure_config(&self) -> Option<RepositoryConfig> {
        let mut repository = lock(&self.repository);
        if repository.is_none() {
            *repository = self.locator().load_repository_config().ok();
        }
        repository.clone()
    }

    /// Resolve the repository root, joining any resolution in flight.
    ///
    /// `Ok(None)` when the project is not configured.
    pub async fn ensure_resolved(&self) -> Result<Option<ResolvedRepo>, ResolveError> {
        let Some(config) = self.ensure_config() else {
            return Ok(None);
        };

        let registry = Arc::clone(&self.registry);
        let start = move || -> ResolutionFuture {
            Box::pin(async move {
                HostPathResolver::new(registry).resolve(&config).await
            })
        };
        self.resolution.get_or_resolve(start).await.map(Some)
    }

    /// Re-read `packages.config`.
    pub fn reload_manifest(&self) -> Result<Vec<PackageIdentity>> {
        let packages = self.locator().load_package_manifest()?;
        *lock(&self.manifest) = packages.clone();
        Ok(packages)
    }

    /// Resolve and reload the manifest, or say why the batch cannot run.
    async fn prepare(&self) -> Result<(ResolvedRepo, Vec<PackageIdentity>), BatchOutcome> {
        let resolved = match self.ensure_resolved().await {
            Ok(Some(resolved)) => resolved,
            Ok(None) => return Err(BatchOutcome::Disabled),
            Err(e) => {
                warn!("Repository resolution failed: {}", e);
                return Err(BatchOutcome::Aborted(e.to_string()));
            }
        };

        match self.reload_manifest() {
            Ok(packages) => Ok((resolved, packages)),
            Err(e) => {
                warn!("Cannot read package manifest: {:#}", e);
                Err(BatchOutcome::Aborted(format!("{:#}", e)))
            }
        }
    }

    /// Handle one batch of asset change notifications.
    #[tracing::instrument(skip(self, batch))]
    pub async fn on_files_changed(&self, batch: &ChangeBatch) -> BatchOutcome {
        for path in &batch.imported {
            debug!("Reimported asset: {}", path);
        }
        for path in &batch.deleted {
            debug!("Deleted asset: {}", path);
        }
        for (to, from) in batch.moved.iter().zip(&batch.moved_from) {
            debug!("Moved asset: {} from: {}", to, from);
        }

        let (resolved, packages) = match self.prepare().await {
            Ok(prepared) => prepared,
            Err(outcome) => return outcome,
        };

        let affected = affected_packages(&batch.imported, &resolved.asset_path, &packages);
        debug!("{} package(s) affected by this batch", affected.len());
        BatchOutcome::Completed(self.clean_packages(&resolved.asset_path, &affected))
    }

    /// Clean every manifest package, or only those whose id is in `ids`.
    #[tracing::instrument(skip(self))]
    pub async fn clean_all(&self, ids: &[String]) -> BatchOutcome {
        let (resolved, packages) = match self.prepare().await {
            Ok(prepared) => prepared,
            Err(outcome) => return outcome,
        };

        let mut selected: Vec<PackageIdentity> = Vec::new();
        for pkg in packages {
            if (ids.is_empty() || ids.contains(&pkg.id)) && !selected.contains(&pkg) {
                selected.push(pkg);
            }
        }
        for id in ids {
            if !selected.iter().any(|pkg| &pkg.id == id) {
                warn!("{} is not listed in the package manifest", id);
            }
        }

        BatchOutcome::Completed(self.clean_packages(&resolved.asset_path, &selected))
    }

    /// Clean each package independently, then commit once.
    ///
    /// The commit happens even when no package was affected.
    fn clean_packages(&self, repo_root: &str, packages: &[PackageIdentity]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let cleaner = PackageCleaner::new(&self.assets);
        for pkg in packages {
            let package_root = package_asset_path(repo_root, pkg);
            match cleaner.clean(&package_root, pkg) {
                Ok(report) => summary.cleaned.push((pkg.clone(), report)),
                Err(e) => {
                    error!("Cleaning {} failed: {:#}", pkg, e);
                    summary.failed.push((pkg.clone(), format!("{:#}", e)));
                }
            }
        }

        match self.assets.refresh() {
            Ok(()) => summary.committed = true,
            Err(e) => error!("Committing the asset database failed: {:#}", e),
        }
        info!(
            "Reconciled {} package(s) under {}",
            packages.len(),
            repo_root
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MockAssetDatabase;
    use crate::registry::{HostPackage, MockPackageRegistry};
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    const ROOT: &str = "Packages/com.uniblazor.core/Plugins";

    const NUGET_CONFIG: &str = r#"<configuration><config><add key="repositoryPath" value="./Packages/UniBlazorCore/Plugins" /></config></configuration>"#;

    const PACKAGES_CONFIG: &str =
        r#"<packages><package id="A" version="1.0" /><package id="B" version="2.0" /></packages>"#;

    fn runtime(nuget_config: Option<&'static str>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/project/nuget.config")))
            .returning(move |_| nuget_config.is_some());
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from("/project/nuget.config")))
            .returning(move |_| Ok(nuget_config.unwrap_or_default().to_string()));
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/project/packages.config")))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from("/project/packages.config")))
            .returning(|_| Ok(PACKAGES_CONFIG.to_string()));
        runtime
    }

    fn registry(times: usize) -> MockPackageRegistry {
        let mut registry = MockPackageRegistry::new();
        registry.expect_list_packages().times(times).returning(|_| {
            Ok(vec![HostPackage {
                name: "com.uniblazor.core".into(),
                resolved_path: PathBuf::from("/project/Packages/UniBlazorCore"),
            }])
        });
        registry
    }

    /// Asset database where every package folder is empty.
    fn quiet_assets() -> MockAssetDatabase {
        let mut assets = empty_folders();
        assets.expect_delete_asset().returning(|_| Ok(false));
        assets
    }

    fn empty_folders() -> MockAssetDatabase {
        let mut assets = MockAssetDatabase::new();
        assets.expect_is_valid_folder().returning(|_| false);
        assets.expect_find_assets().returning(|_, _| Ok(vec![]));
        assets
    }

    fn session(
        runtime: MockRuntime,
        assets: MockAssetDatabase,
        registry: MockPackageRegistry,
    ) -> ReconcileSession<MockAssetDatabase, MockPackageRegistry, MockRuntime> {
        ReconcileSession::new(
            Arc::new(runtime),
            assets,
            Arc::new(registry),
            "/project",
        )
    }

    #[tokio::test]
    async fn test_batch_cleans_each_package_once_and_commits_once() {
        let deletes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&deletes);
        let mut assets = empty_folders();
        assets.expect_delete_asset().returning(move |path| {
            seen.lock().unwrap().push(path.to_string());
            Ok(false)
        });
        assets.expect_refresh().times(1).returning(|| Ok(()));

        let session = session(runtime(Some(NUGET_CONFIG)), assets, registry(1));
        let batch = ChangeBatch::imported([
            format!("{}/A.1.0/lib/netstandard2.0/A.dll", ROOT),
            format!("{}/A.1.0/Icon.png", ROOT),
            format!("{}/B.2.0/lib/netstandard2.0/B.dll", ROOT),
        ]);

        let BatchOutcome::Completed(summary) = session.on_files_changed(&batch).await else {
            panic!("expected a completed batch");
        };

        let cleaned: Vec<_> = summary.packages().cloned().collect();
        assert_eq!(
            cleaned,
            vec![
                PackageIdentity::new("A", "1.0"),
                PackageIdentity::new("B", "2.0")
            ]
        );
        assert!(summary.committed);

        // Each package went through the flat removals exactly once
        let deletes = deletes.lock().unwrap();
        for pkg in ["A.1.0", "B.2.0"] {
            let build = format!("{}/{}/build", ROOT, pkg);
            assert_eq!(deletes.iter().filter(|p| **p == build).count(), 1);
        }
    }

    #[tokio::test]
    async fn test_resolution_happens_once_across_batches() {
        let mut assets = quiet_assets();
        assets.expect_refresh().times(2).returning(|| Ok(()));

        let session = session(runtime(Some(NUGET_CONFIG)), assets, registry(1));
        let batch = ChangeBatch::imported([format!("{}/A.1.0/a.dll", ROOT)]);

        let first = session.on_files_changed(&batch).await;
        let second = session.on_files_changed(&batch).await;
        assert!(matches!(first, BatchOutcome::Completed(_)));
        assert!(matches!(second, BatchOutcome::Completed(_)));
        assert_eq!(session.resolved().unwrap().asset_path, ROOT);
    }

    #[tokio::test]
    async fn test_unconfigured_project_is_disabled() {
        let mut assets = MockAssetDatabase::new();
        assets.expect_refresh().never();
        assets.expect_delete_asset().never();

        let session = session(runtime(None), assets, registry(0));
        let batch = ChangeBatch::imported(["Packages/UniBlazorCore/Plugins/A.1.0/a.dll"]);

        let outcome = session.on_files_changed(&batch).await;
        assert!(matches!(outcome, BatchOutcome::Disabled));
        assert!(session.repository_config().is_none());
    }

    #[tokio::test]
    async fn test_resolution_failure_aborts_without_commit() {
        let mut assets = MockAssetDatabase::new();
        assets.expect_refresh().never();
        assets.expect_delete_asset().never();

        let mut registry = MockPackageRegistry::new();
        registry
            .expect_list_packages()
            .times(2)
            .returning(|_| Ok(vec![]));

        let session = session(runtime(Some(NUGET_CONFIG)), assets, registry);
        let batch = ChangeBatch::imported([format!("{}/A.1.0/a.dll", ROOT)]);

        let BatchOutcome::Aborted(reason) = session.on_files_changed(&batch).await else {
            panic!("expected an aborted batch");
        };
        assert!(reason.contains("UniBlazorCore"));

        // The next batch tries again
        let outcome = session.on_files_changed(&batch).await;
        assert!(matches!(outcome, BatchOutcome::Aborted(_)));
    }

    #[tokio::test]
    async fn test_unrelated_paths_still_commit() {
        let mut assets = MockAssetDatabase::new();
        assets.expect_refresh().times(1).returning(|| Ok(()));
        assets.expect_delete_asset().never();

        let session = session(runtime(Some(NUGET_CONFIG)), assets, registry(1));
        let batch = ChangeBatch::imported(["Assets/Scripts/Player.cs"]);

        let BatchOutcome::Completed(summary) = session.on_files_changed(&batch).await else {
            panic!("expected a completed batch");
        };
        assert_eq!(summary.packages().count(), 0);
        assert!(summary.committed);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_package_does_not_stop_the_batch() {
        let mut assets = empty_folders();
        let broken = format!("{}/A.1.0/", ROOT);
        assets.expect_delete_asset().returning(move |path| {
            if path.starts_with(&broken) {
                Err(anyhow::anyhow!("permission denied"))
            } else {
                Ok(false)
            }
        });
        assets.expect_refresh().times(1).returning(|| Ok(()));

        let session = session(runtime(Some(NUGET_CONFIG)), assets, registry(1));
        let batch = ChangeBatch::imported([
            format!("{}/A.1.0/a.dll", ROOT),
            format!("{}/B.2.0/b.dll", ROOT),
        ]);

        let BatchOutcome::Completed(summary) = session.on_files_changed(&batch).await else {
            panic!("expected a completed batch");
        };
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, PackageIdentity::new("A", "1.0"));
        assert!(summary.failed[0].1.contains("permission denied"));
        assert_eq!(summary.cleaned.len(), 1);
        assert_eq!(summary.cleaned[0].0, PackageIdentity::new("B", "2.0"));
        assert!(summary.committed);
    }

    #[tokio::test]
    async fn test_clean_all_filters_by_id() {
        let mut assets = quiet_assets();
        assets.expect_refresh().times(1).returning(|| Ok(()));

        let session = session(runtime(Some(NUGET_CONFIG)), assets, registry(1));
        let BatchOutcome::Completed(summary) = session.clean_all(&["B".to_string()]).await else {
            panic!("expected a completed batch");
        };

        let cleaned: Vec<_> = summary.packages().cloned().collect();
        assert_eq!(cleaned, vec![PackageIdentity::new("B", "2.0")]);
        assert_eq!(session.manifest().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_forces_new_resolution() {
        let mut assets = quiet_assets();
        assets.expect_refresh().returning(|| Ok(()));

        let session = session(runtime(Some(NUGET_CONFIG)), assets, registry(2));

        session.ensure_resolved().await.unwrap();
        session.reset();
        assert!(session.resolved().is_none());
        assert!(session.repository_config().is_none());
        session.ensure_resolved().await.unwrap();
    }
}
