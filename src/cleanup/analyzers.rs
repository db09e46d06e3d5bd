use anyhow::Result;
use log::{debug, info, warn};

use super::{CleanupReport, PackageCleaner};
use crate::asset::AssetDatabase;
use crate::runtime::{asset_file_name, asset_parent, join_asset};

/// The only ruleset kept from analyzer packages.
pub const RULESET_DEFAULT: &str = "AllRulesDefault.ruleset";

/// The ruleset name the host looks for.
pub const RULESET_HOST_NAME: &str = "Default";

pub const RULESET_EXTENSION: &str = "ruleset";

impl<A: AssetDatabase> PackageCleaner<'_, A> {
    /// Prune `analyzers/dotnet` and the package's rulesets.
    ///
    /// Laid out after Microsoft.CodeAnalysis.Analyzers; packages without
    /// `analyzers/dotnet` are left alone.
    pub(super) fn clean_analyzers(
        &self,
        package_root: &str,
        report: &mut CleanupReport,
    ) -> Result<()> {
        let analyzer_path = join_asset(package_root, "analyzers/dotnet");
        if !self.assets.is_valid_folder(&analyzer_path) {
            return Ok(());
        }

        // Only C# analyzers are kept
        self.delete(&join_asset(&analyzer_path, "vb"), report)?;

        self.clean_rulesets(&join_asset(package_root, "rulesets"), report)?;
        self.collect_analyzer_assemblies(&analyzer_path, report)
    }

    /// Keep the default ruleset, renamed to what the host expects.
    fn clean_rulesets(&self, rulesets_path: &str, report: &mut CleanupReport) -> Result<()> {
        let rulesets = self.assets.find_assets("", rulesets_path)?;
        let host_file_name = format!("{}.{}", RULESET_HOST_NAME, RULESET_EXTENSION);

        let Some(default) = rulesets
            .iter()
            .find(|path| asset_file_name(path).ends_with(RULESET_DEFAULT))
            .cloned()
        else {
            info!(
                "No {} in {}, leaving rulesets as they are",
                RULESET_DEFAULT, rulesets_path
            );
            return Ok(());
        };

        for path in &rulesets {
            // An earlier pass already renamed this one
            if *path == default || asset_file_name(path) == host_file_name {
                continue;
            }
            self.delete(path, report)?;
        }

        // A stale host ruleset next to a fresh default is replaced by it
        let target = match asset_parent(&default) {
            Some(parent) => join_asset(parent, &host_file_name),
            None => host_file_name.clone(),
        };
        if self.delete(&target, report)? {
            debug!("Replacing stale {}", target);
        }

        let renamed = self.assets.rename_asset(&default, RULESET_HOST_NAME)?;
        report.renamed.push((default, renamed));
        Ok(())
    }

    /// C# analyzer assemblies have to live in the main asset tree; moving
    /// them is left to the user.
    fn collect_analyzer_assemblies(
        &self,
        analyzer_path: &str,
        report: &mut CleanupReport,
    ) -> Result<()> {
        for assembly in self.assets.find_assets("", &join_asset(analyzer_path, "cs"))? {
            warn!("{} needs to be moved inside Assets!", assembly);
            report.pending_relocation.push(assembly);
        }
        Ok(())
    }
}
