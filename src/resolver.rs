//! Mapping the configured repository path onto the host's view of it.
//!
//! The installer writes to `Packages/<folder>/...` on disk, but the host
//! addresses embedded packages by canonical name: `Packages/<name>/...`.
//! Resolution asks the host registry which package lives in `<folder>` and
//! substitutes its name into the repository path.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use log::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::RepositoryConfig;
use crate::error::ResolveError;
use crate::registry::{HostPackage, ListQuery, PackageRegistry};

/// The repository root as the host addresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepo {
    /// The host package holding the repository
    pub package: HostPackage,
    /// e.g. `Packages/com.uniblazor.core/Plugins`
    pub asset_path: String,
}

/// Queries the host registry for the package holding the repository.
pub struct HostPathResolver<P: PackageRegistry> {
    registry: Arc<P>,
}

impl<P: PackageRegistry> HostPathResolver<P> {
    pub fn new(registry: Arc<P>) -> Self {
        Self { registry }
    }

    /// Find the host package whose install path ends with `folder_name`.
    ///
    /// Issues exactly one registry query. Exactly one package must match.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_repo_asset_path(
        &self,
        folder_name: &str,
    ) -> Result<HostPackage, ResolveError> {
        let packages = self
            .registry
            .list_packages(ListQuery::installed_direct())
            .await
            .map_err(|e| {
                error!("Listing host packages failed: {:#}", e);
                ResolveError::RegistryQueryFailed(format!("{:#}", e))
            })?;

        let mut matches: Vec<HostPackage> = packages
            .into_iter()
            .filter(|pkg| path_ends_with(pkg, folder_name))
            .collect();

        match matches.len() {
            0 => {
                error!("No host package found at folder {}", folder_name);
                Err(ResolveError::PackageNotFound {
                    folder_name: folder_name.to_string(),
                })
            }
            1 => Ok(matches.remove(0)),
            _ => Err(ResolveError::AmbiguousPackage {
                folder_name: folder_name.to_string(),
                candidates: matches.into_iter().map(|pkg| pkg.name).collect(),
            }),
        }
    }

    /// Resolve the repository root of `config` into host asset form.
    pub async fn resolve(&self, config: &RepositoryConfig) -> Result<ResolvedRepo, ResolveError> {
        let package = self
            .resolve_repo_asset_path(&config.package_folder_name)
            .await?;
        let asset_path = substitute_folder_name(
            &config.repository_path,
            &config.package_folder_name,
            &package.name,
        )?;
        debug!("Repository resolves to {}", asset_path);
        Ok(ResolvedRepo {
            package,
            asset_path,
        })
    }
}

/// Suffix match on the install path; segment boundaries are not enforced.
fn path_ends_with(pkg: &HostPackage, folder_name: &str) -> bool {
    let path = pkg.resolved_path.to_string_lossy();
    path.trim_end_matches(['/', '\\']).ends_with(folder_name)
}

/// Replace the `folder_name` segment of `repository_path` with `host_name`.
///
/// The folder name must occupy exactly one segment of the path.
pub fn substitute_folder_name(
    repository_path: &str,
    folder_name: &str,
    host_name: &str,
) -> Result<String, ResolveError> {
    let occurrences = repository_path
        .split('/')
        .filter(|segment| *segment == folder_name)
        .count();
    if occurrences != 1 {
        return Err(ResolveError::FolderNameNotUnique {
            folder_name: folder_name.to_string(),
            repository_path: repository_path.to_string(),
            occurrences,
        });
    }

    Ok(repository_path
        .split('/')
        .map(|segment| {
            if segment == folder_name {
                host_name
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/"))
}

pub type ResolutionFuture = BoxFuture<'static, Result<ResolvedRepo, ResolveError>>;

enum SlotState {
    Idle,
    Pending(Shared<ResolutionFuture>),
    Ready(ResolvedRepo),
}

/// Single-flight cache for the resolved repository.
///
/// While a resolution is in flight, later callers await the same shared
/// future instead of issuing another registry query. Success is cached for
/// the lifetime of the slot; failure leaves the slot idle so the next caller
/// starts a fresh attempt.
pub struct ResolutionSlot {
    state: Mutex<SlotState>,
}

impl Default for ResolutionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached resolution, if one has completed.
    pub fn resolved(&self) -> Option<ResolvedRepo> {
        match &*self.lock() {
            SlotState::Ready(repo) => Some(repo.clone()),
            _ => None,
        }
    }

    /// Whether a resolution is currently in flight.
    pub fn is_pending(&self) -> bool {
        matches!(&*self.lock(), SlotState::Pending(_))
    }

    /// Forget any cached or in-flight resolution.
    pub fn reset(&self) {
        *self.lock() = SlotState::Idle;
    }

    /// Return the cached resolution, join the in-flight one, or start one
    /// with `start`.
    pub async fn get_or_resolve<F>(&self, start: F) -> Result<ResolvedRepo, ResolveError>
    where
        F: FnOnce() -> ResolutionFuture,
    {
        let pending = {
            let mut state = self.lock();
            match &*state {
                SlotState::Ready(repo) => return Ok(repo.clone()),
                SlotState::Pending(fut) => {
                    debug!("Joining in-flight repository resolution");
                    fut.clone()
                }
                SlotState::Idle => {
                    let fut = start().shared();
                    *state = SlotState::Pending(fut.clone());
                    fut
                }
            }
        };

        let result = pending.clone().await;

        let mut state = self.lock();
        if let SlotState::Pending(current) = &*state
            && current.ptr_eq(&pending)
        {
            *state = match &result {
                Ok(repo) => SlotState::Ready(repo.clone()),
                Err(_) => SlotState::Idle,
            };
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MockPackageRegistry;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn host_package(name: &str, path: &str) -> HostPackage {
        HostPackage {
            name: name.into(),
            resolved_path: PathBuf::from(path),
        }
    }

    fn registry_returning(packages: Vec<HostPackage>) -> Arc<MockPackageRegistry> {
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_list_packages()
            .withf(|query| query.offline && !query.include_transitive)
            .times(1)
            .returning(move |_| Ok(packages.clone()));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_resolve_repo_asset_path_single_match() {
        let registry = registry_returning(vec![
            host_package(
                "com.unity.ugui",
                "/project/Library/PackageCache/com.unity.ugui",
            ),
            host_package("com.uniblazor.core", "/project/Packages/UniBlazorCore"),
        ]);

        let resolver = HostPathResolver::new(registry);
        let pkg = resolver
            .resolve_repo_asset_path("UniBlazorCore")
            .await
            .unwrap();

        assert_eq!(pkg.name, "com.uniblazor.core");
    }

    #[tokio::test]
    async fn test_resolve_repo_asset_path_not_found() {
        let registry = registry_returning(vec![host_package(
            "com.unity.ugui",
            "/project/Library/PackageCache/com.unity.ugui",
        )]);

        let resolver = HostPathResolver::new(registry);
        let err = resolver
            .resolve_repo_asset_path("UniBlazorCore")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::PackageNotFound {
                folder_name: "UniBlazorCore".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_repo_asset_path_ambiguous_suffix() {
        let registry = registry_returning(vec![
            host_package("com.a.core", "/project/Packages/Core"),
            host_package("com.b.core", "/project/Packages/UniBlazorCore"),
        ]);

        let resolver = HostPathResolver::new(registry);
        let err = resolver.resolve_repo_asset_path("Core").await.unwrap_err();

        let ResolveError::AmbiguousPackage { candidates, .. } = err else {
            panic!("expected an ambiguous package error");
        };
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_repo_asset_path_query_failure() {
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_list_packages()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("registry offline")));

        let resolver = HostPathResolver::new(Arc::new(registry));
        let err = resolver
            .resolve_repo_asset_path("UniBlazorCore")
            .await
            .unwrap_err();

        let ResolveError::RegistryQueryFailed(msg) = err else {
            panic!("expected a registry query failure");
        };
        assert!(msg.contains("registry offline"));
    }

    #[tokio::test]
    async fn test_resolve_substitutes_host_name() {
        let registry = registry_returning(vec![host_package(
            "com.uniblazor.core",
            "/project/Packages/UniBlazorCore/",
        )]);
        let config = RepositoryConfig::from_repository_path("./Packages/UniBlazorCore/Plugins")
            .unwrap();

        let resolver = HostPathResolver::new(registry);
        let resolved = resolver.resolve(&config).await.unwrap();

        assert_eq!(resolved.asset_path, "Packages/com.uniblazor.core/Plugins");
    }

    #[test]
    fn test_substitute_folder_name() {
        assert_eq!(
            substitute_folder_name("Packages/Foo/Plugins", "Foo", "com.foo").unwrap(),
            "Packages/com.foo/Plugins"
        );
        // Substring of another segment is not an occurrence
        assert_eq!(
            substitute_folder_name("Packages/Pack/Plugins", "Pack", "com.pack").unwrap(),
            "Packages/com.pack/Plugins"
        );
    }

    #[test]
    fn test_substitute_folder_name_not_unique() {
        let err = substitute_folder_name("Packages/Foo/Foo", "Foo", "com.foo").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::FolderNameNotUnique { occurrences: 2, .. }
        ));

        let err = substitute_folder_name("Packages/Bar/Plugins", "Foo", "com.foo").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::FolderNameNotUnique { occurrences: 0, .. }
        ));
    }

    /// Registry that blocks until released, counting queries.
    struct GatedRegistry {
        calls: AtomicUsize,
        gate: Notify,
        fail: bool,
    }

    #[async_trait]
    impl PackageRegistry for GatedRegistry {
        async fn list_packages(&self, _query: ListQuery) -> Result<Vec<HostPackage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            if self.fail {
                anyhow::bail!("query failed");
            }
            Ok(vec![host_package("com.foo", "/project/Packages/Foo")])
        }
    }

    fn start_resolution(registry: &Arc<GatedRegistry>) -> impl FnOnce() -> ResolutionFuture {
        let registry = Arc::clone(registry);
        move || {
            Box::pin(async move {
                let config = RepositoryConfig::from_repository_path("Packages/Foo/Plugins")
                    .expect("valid path");
                HostPathResolver::new(registry).resolve(&config).await
            })
        }
    }

    #[tokio::test]
    async fn test_slot_joins_in_flight_resolution() {
        let registry = Arc::new(GatedRegistry {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
            fail: false,
        });
        let slot = ResolutionSlot::new();

        let first = slot.get_or_resolve(start_resolution(&registry));
        let second = slot.get_or_resolve(start_resolution(&registry));
        let release = async {
            tokio::task::yield_now().await;
            assert!(slot.is_pending());
            registry.gate.notify_one();
        };

        let (a, b, ()) = tokio::join!(first, second, release);

        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().asset_path, "Packages/com.foo/Plugins");
        assert_eq!(b.unwrap().asset_path, "Packages/com.foo/Plugins");
        assert!(slot.resolved().is_some());

        // Cached: no further query
        let again = slot.get_or_resolve(start_resolution(&registry)).await;
        assert!(again.is_ok());
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slot_failure_allows_retry() {
        let registry = Arc::new(GatedRegistry {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
            fail: true,
        });
        let slot = ResolutionSlot::new();

        // Store a permit so the query completes immediately
        registry.gate.notify_one();
        let result = slot.get_or_resolve(start_resolution(&registry)).await;
        assert!(matches!(result, Err(ResolveError::RegistryQueryFailed(_))));
        assert!(!slot.is_pending());
        assert!(slot.resolved().is_none());

        registry.gate.notify_one();
        let _ = slot.get_or_resolve(start_resolution(&registry)).await;
        assert_eq!(registry.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_slot_reset() {
        let slot = ResolutionSlot::new();
        slot.reset();
        assert!(slot.resolved().is_none());
        assert!(!slot.is_pending());
    }
}
