use anyhow::Result;
use log::{debug, error};

use super::{CleanupReport, PackageCleaner};
use crate::asset::AssetDatabase;
use crate::error::CleanupIssue;
use crate::runtime::{asset_file_name, join_asset};

/// Target framework folders the host can load.
pub const FRAMEWORK_PREFIX: &str = "netstandard";

/// Newest candidate suffix that is passed over when an older one exists.
pub const DOWNGRADE_SUFFIX: &str = "2.1";

/// Pick the framework folder to keep among `lib` subfolder names.
///
/// Candidates are the `netstandard*` names, ordered by descending string
/// comparison (not version order: `netstandard2.9` sorts above
/// `netstandard2.10`). The greatest wins unless it ends in `2.1` and a
/// runner-up exists, in which case the runner-up is kept.
pub fn select_framework_folder<'n>(names: &[&'n str]) -> Option<&'n str> {
    let mut candidates: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| name.starts_with(FRAMEWORK_PREFIX))
        .collect();
    candidates.sort_unstable_by(|a, b| b.cmp(a));
    candidates.truncate(2);

    match candidates.as_slice() {
        [] => None,
        [first, second] if first.ends_with(DOWNGRADE_SUFFIX) => Some(*second),
        [first, ..] => Some(*first),
    }
}

impl<A: AssetDatabase> PackageCleaner<'_, A> {
    /// Keep one framework folder under `lib`, delete the others.
    pub(super) fn clean_lib(&self, package_root: &str, report: &mut CleanupReport) -> Result<()> {
        let lib_path = join_asset(package_root, "lib");
        if !self.assets.is_valid_folder(&lib_path) {
            return Ok(());
        }

        let folders = self.assets.sub_folders(&lib_path)?;
        let names: Vec<&str> = folders.iter().map(|path| asset_file_name(path)).collect();

        let Some(selected) = select_framework_folder(&names) else {
            error!("There is no netstandard folder in {}", lib_path);
            report.issues.push(CleanupIssue::MalformedTree {
                step: "lib",
                path: lib_path,
                reason: format!("no {}* framework folder", FRAMEWORK_PREFIX),
            });
            return Ok(());
        };
        debug!("Keeping {}/{}", lib_path, selected);
        let selected = selected.to_string();

        for folder in &folders {
            if asset_file_name(folder) != selected {
                self.delete(folder, report)?;
            }
        }
        report.selected_framework = Some(selected);
        Ok(())
    }
}
