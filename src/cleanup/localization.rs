use anyhow::Result;
use log::{debug, warn};

use super::{CleanupReport, PackageCleaner};
use crate::asset::AssetDatabase;
use crate::runtime::asset_parent;

/// Name fragment searched for; the host search cannot match on extension.
pub const LOCALIZATION_MARKER: &str = ".resources";

/// Satellite assemblies end with this.
pub const LOCALIZED_ASSEMBLY_SUFFIX: &str = ".resources.dll";

impl<A: AssetDatabase> PackageCleaner<'_, A> {
    /// Delete every folder holding a satellite assembly.
    ///
    /// The host refuses several assemblies sharing a name, so all locale
    /// folders go and only the neutral assembly one level up stays.
    pub(super) fn remove_localizations(
        &self,
        package_root: &str,
        report: &mut CleanupReport,
    ) -> Result<()> {
        let mut folders: Vec<String> = Vec::new();
        for path in self.assets.find_assets(LOCALIZATION_MARKER, package_root)? {
            if !path.ends_with(LOCALIZED_ASSEMBLY_SUFFIX) {
                continue;
            }
            match asset_parent(&path) {
                Some(parent) if parent != package_root.trim_end_matches('/') => {
                    if !folders.iter().any(|f| f == parent) {
                        folders.push(parent.to_string());
                    }
                }
                _ => warn!("Not removing the package root for {}", path),
            }
        }

        for folder in folders {
            if self.delete(&folder, report)? {
                debug!("Removed localized folder {}", folder);
            }
        }
        Ok(())
    }
}
