//! Normalizing an installed NuGet package folder for the host.
//!
//! NuGet packages ship build scripts, docs, reference assemblies, one folder
//! per target framework, rulesets for every severity profile and satellite
//! assemblies per locale. The host imports every file it finds and rejects
//! duplicate assembly names, so each package is pruned down to one framework
//! folder, one ruleset and no localized resources.
//!
//! The steps:
//! - flat removals of well-known top-level children
//! - `lib`: keep a single `netstandard*` folder
//! - `analyzers/dotnet`: drop VB analyzers, keep one ruleset, report C# analyzers
//! - localization: drop every folder holding a `*.resources.dll`
//!
//! Every step is a no-op when its target is absent, so cleaning an already
//! cleaned package changes nothing.

mod analyzers;
mod lib_folders;
mod localization;

use anyhow::Result;
use log::{debug, info};

use crate::asset::AssetDatabase;
use crate::error::CleanupIssue;
use crate::package::PackageIdentity;
use crate::runtime::join_asset;

pub use analyzers::{RULESET_DEFAULT, RULESET_EXTENSION, RULESET_HOST_NAME};
pub use lib_folders::{DOWNGRADE_SUFFIX, FRAMEWORK_PREFIX, select_framework_folder};
pub use localization::{LOCALIZATION_MARKER, LOCALIZED_ASSEMBLY_SUFFIX};

/// Top-level children removed from every package.
pub const FLAT_REMOVALS: &[&str] = &[
    "build",
    "src",
    // no support for per-platform runtime assemblies
    "runtimes",
    "docs",
    "documentation",
    "editorconfig",
    // compile-time reference assemblies collide with the lib ones
    "ref",
    "tools",
    "package",
    "_rels",
    "Icon.png",
    "useSharedDesignerContext.txt",
];

/// What a cleanup pass did to one package.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Asset paths deleted, in deletion order
    pub removed: Vec<String>,
    /// `(from, to)` asset paths
    pub renamed: Vec<(String, String)>,
    /// The `lib` framework folder that was kept
    pub selected_framework: Option<String>,
    /// Analyzer assemblies that must be moved into the main asset tree by hand
    pub pending_relocation: Vec<String>,
    /// Steps skipped because the tree had an unexpected shape
    pub issues: Vec<CleanupIssue>,
}

impl CleanupReport {
    /// Whether the pass left the tree untouched.
    pub fn is_unchanged(&self) -> bool {
        self.removed.is_empty() && self.renamed.is_empty()
    }
}

/// Applies the pruning rules to one package folder.
pub struct PackageCleaner<'a, A: AssetDatabase> {
    assets: &'a A,
}

impl<'a, A: AssetDatabase> PackageCleaner<'a, A> {
    pub fn new(assets: &'a A) -> Self {
        Self { assets }
    }

    /// Clean the package whose folder is `package_root`.
    #[tracing::instrument(skip(self))]
    pub fn clean(&self, package_root: &str, package: &PackageIdentity) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        self.remove_flat(package_root, package, &mut report)?;
        self.clean_lib(package_root, &mut report)?;
        self.clean_analyzers(package_root, &mut report)?;
        self.remove_localizations(package_root, &mut report)?;

        if report.is_unchanged() {
            debug!("{} is already clean", package);
        } else {
            info!(
                "Cleaned {}: {} removed, {} renamed",
                package,
                report.removed.len(),
                report.renamed.len()
            );
        }
        Ok(report)
    }

    fn remove_flat(
        &self,
        package_root: &str,
        package: &PackageIdentity,
        report: &mut CleanupReport,
    ) -> Result<()> {
        let archives = [package.nupkg_file_name(), package.nuspec_file_name()];
        let names = FLAT_REMOVALS
            .iter()
            .copied()
            .chain(archives.iter().map(String::as_str));

        for name in names {
            self.delete(&join_asset(package_root, name), report)?;
        }
        Ok(())
    }

    /// Delete `path` if present, recording it.
    fn delete(&self, path: &str, report: &mut CleanupReport) -> Result<bool> {
        let deleted = self.assets.delete_asset(path)?;
        if deleted {
            report.removed.push(path.to_string());
        }
        Ok(deleted)
    }
}
