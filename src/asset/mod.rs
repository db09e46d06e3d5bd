//! Host asset database abstraction.
//!
//! Cleanup never touches files directly; it asks the asset database, which
//! addresses everything by `/`-separated asset paths relative to the project
//! root (e.g. `Packages/com.acme.core/Plugins/Foo.1.0/lib`).

mod fs;

use anyhow::Result;

pub use fs::FsAssetDatabase;

/// Sidecar extension the host keeps next to every asset.
pub const META_EXTENSION: &str = "meta";

#[cfg_attr(test, mockall::automock)]
pub trait AssetDatabase: Send + Sync {
    /// Whether `path` names an existing folder.
    fn is_valid_folder(&self, path: &str) -> bool;

    /// Immediate subfolders of `path`, as full asset paths.
    fn sub_folders(&self, path: &str) -> Result<Vec<String>>;

    /// Delete a file or folder. Returns `Ok(false)` if nothing was there.
    fn delete_asset(&self, path: &str) -> Result<bool>;

    /// Rename an asset in place, keeping its extension.
    /// Returns the new asset path.
    fn rename_asset(&self, path: &str, new_name: &str) -> Result<String>;

    /// Files anywhere under `under` whose name contains `fragment`.
    fn find_assets(&self, fragment: &str, under: &str) -> Result<Vec<String>>;

    /// Commit pending changes so the host re-imports them.
    fn refresh(&self) -> Result<()>;
}
