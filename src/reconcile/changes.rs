use crate::package::PackageIdentity;
use crate::runtime::{is_asset_under, join_asset, path::to_asset_path};

/// One batch of asset change notifications from the host.
///
/// Only `imported` drives cleanup; the other lists are accepted for
/// completeness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub imported: Vec<String>,
    pub deleted: Vec<String>,
    pub moved: Vec<String>,
    pub moved_from: Vec<String>,
}

impl ChangeBatch {
    /// A batch holding only imported paths.
    pub fn imported<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            imported: paths
                .into_iter()
                .map(|p| to_asset_path(p.as_ref()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.imported.is_empty()
            && self.deleted.is_empty()
            && self.moved.is_empty()
            && self.moved_from.is_empty()
    }
}

/// The asset path of a package folder under the resolved repository root.
pub fn package_asset_path(repo_root: &str, package: &PackageIdentity) -> String {
    join_asset(repo_root, &package.formatted_name())
}

/// Map changed paths to the packages owning them.
///
/// Each path belongs to the first listed package whose folder contains it.
/// The result holds each package once, in order of first appearance; paths
/// outside every package folder are ignored.
pub fn affected_packages(
    changed: &[String],
    repo_root: &str,
    packages: &[PackageIdentity],
) -> Vec<PackageIdentity> {
    let folders: Vec<(String, &PackageIdentity)> = packages
        .iter()
        .map(|pkg| (package_asset_path(repo_root, pkg), pkg))
        .collect();

    let mut affected: Vec<PackageIdentity> = Vec::new();
    for path in changed {
        let owner = folders
            .iter()
            .find(|(folder, _)| is_asset_under(path, folder))
            .map(|(_, pkg)| *pkg);

        if let Some(pkg) = owner
            && !affected.contains(pkg)
        {
            affected.push(pkg.clone());
        }
    }
    affected
}
