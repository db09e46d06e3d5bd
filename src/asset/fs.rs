use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::{AssetDatabase, META_EXTENSION};
use crate::registry::HostPackage;
use crate::runtime::{Runtime, asset_file_name, asset_parent, join_asset};

const PACKAGES_PREFIX: &str = "Packages/";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ChangeStats {
    deleted: usize,
    renamed: usize,
}

/// Asset database over a project directory on disk.
///
/// `Packages/<name>/...` is looked up through the registered package mounts
/// first, since the host addresses embedded packages by canonical name
/// rather than by folder. Deleting or renaming an asset carries its `.meta`
/// sidecar along.
pub struct FsAssetDatabase<R: Runtime> {
    runtime: Arc<R>,
    project_root: PathBuf,
    mounts: HashMap<String, PathBuf>,
    stats: Mutex<ChangeStats>,
}

impl<R: Runtime> FsAssetDatabase<R> {
    pub fn new(runtime: Arc<R>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            project_root: project_root.into(),
            mounts: HashMap::new(),
            stats: Mutex::new(ChangeStats::default()),
        }
    }

    /// Register host packages so `Packages/<name>` resolves to their folders.
    pub fn with_packages<'p>(
        mut self,
        packages: impl IntoIterator<Item = &'p HostPackage>,
    ) -> Self {
        for pkg in packages {
            self.mounts
                .insert(pkg.name.clone(), pkg.resolved_path.clone());
        }
        self
    }

    /// Map an asset path to its location on disk.
    ///
    /// Asset paths never leave the project: absolute paths and `.` or `..`
    /// segments are rejected.
    pub fn resolve(&self, asset_path: &str) -> Result<PathBuf> {
        check_asset_path(asset_path)?;
        let asset_path = asset_path.trim_end_matches('/');
        if let Some(rest) = asset_path.strip_prefix(PACKAGES_PREFIX) {
            let (name, tail) = rest.split_once('/').unwrap_or((rest, ""));
            if let Some(mount) = self.mounts.get(name) {
                return Ok(join_segments(mount.clone(), tail));
            }
        }
        Ok(join_segments(self.project_root.clone(), asset_path))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(META_EXTENSION);
        path.with_file_name(name)
    }

    fn record(&self, update: impl FnOnce(&mut ChangeStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut *stats);
    }

    fn collect_files(
        &self,
        dir: &Path,
        asset_dir: &str,
        out: &mut Vec<(String, String)>,
    ) -> Result<()> {
        for entry in self.runtime.read_dir(dir)? {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let asset = join_asset(asset_dir, name);
            if self.runtime.is_dir(&entry) {
                self.collect_files(&entry, &asset, out)?;
            } else if !is_meta_file(name) {
                out.push((name.to_string(), asset));
            }
        }
        Ok(())
    }
}

fn check_asset_path(asset_path: &str) -> Result<()> {
    if asset_path.starts_with('/') || asset_path.contains('\\') {
        bail!(
            "Asset path {:?} must be relative and `/`-separated",
            asset_path
        );
    }
    if let Some(segment) = asset_path
        .split('/')
        .find(|segment| matches!(*segment, "." | "..") || segment.contains(':'))
    {
        bail!(
            "Asset path {:?} has an invalid segment {:?}",
            asset_path, segment
        );
    }
    Ok(())
}

fn join_segments(mut base: PathBuf, asset_path: &str) -> PathBuf {
    for segment in asset_path.split('/').filter(|s| !s.is_empty()) {
        base.push(segment);
    }
    base
}

fn is_meta_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == META_EXTENSION)
}

impl<R: Runtime> AssetDatabase for FsAssetDatabase<R> {
    fn is_valid_folder(&self, path: &str) -> bool {
        self.resolve(path)
            .is_ok_and(|dir| self.runtime.is_dir(&dir))
    }

    fn sub_folders(&self, path: &str) -> Result<Vec<String>> {
        let dir = self.resolve(path)?;
        if !self.runtime.is_dir(&dir) {
            return Ok(vec![]);
        }

        let mut folders = Vec::new();
        for entry in self.runtime.read_dir(&dir)? {
            if self.runtime.is_dir(&entry)
                && let Some(name) = entry.file_name().and_then(|n| n.to_str())
            {
                folders.push(join_asset(path, name));
            }
        }
        Ok(folders)
    }

    #[tracing::instrument(skip(self))]
    fn delete_asset(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        if !self.runtime.exists(&target) {
            return Ok(false);
        }

        if self.runtime.is_dir(&target) {
            self.runtime.remove_dir_all(&target)?;
        } else {
            self.runtime.remove_file(&target)?;
        }

        let meta = Self::meta_path(&target);
        if self.runtime.exists(&meta) {
            self.runtime.remove_file(&meta)?;
        }

        debug!("Deleted {}", path);
        self.record(|stats| stats.deleted += 1);
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    fn rename_asset(&self, path: &str, new_name: &str) -> Result<String> {
        if new_name.is_empty()
            || matches!(new_name, "." | "..")
            || new_name.contains(['/', '\\'])
        {
            bail!("Cannot rename {} to {:?}: not a plain name", path, new_name);
        }
        let source = self.resolve(path)?;
        if !self.runtime.exists(&source) {
            bail!("Cannot rename {}: asset does not exist", path);
        }

        let file_name = match Path::new(asset_file_name(path)).extension() {
            Some(ext) if !self.runtime.is_dir(&source) => {
                format!("{}.{}", new_name, ext.to_string_lossy())
            }
            _ => new_name.to_string(),
        };
        let target = source.with_file_name(&file_name);
        if self.runtime.exists(&target) {
            bail!("Cannot rename {}: {} already exists", path, file_name);
        }

        self.runtime
            .rename(&source, &target)
            .with_context(|| format!("Failed to rename {}", path))?;

        let meta = Self::meta_path(&source);
        if self.runtime.exists(&meta) {
            self.runtime.rename(&meta, &Self::meta_path(&target))?;
        }

        let renamed = match asset_parent(path) {
            Some(parent) => join_asset(parent, &file_name),
            None => file_name,
        };
        debug!("Renamed {} to {}", path, renamed);
        self.record(|stats| stats.renamed += 1);
        Ok(renamed)
    }

    #[tracing::instrument(skip(self))]
    fn find_assets(&self, fragment: &str, under: &str) -> Result<Vec<String>> {
        let dir = self.resolve(under)?;
        if !self.runtime.is_dir(&dir) {
            return Ok(vec![]);
        }

        let pattern = glob::Pattern::new(&format!("*{}*", glob::Pattern::escape(fragment)))
            .with_context(|| format!("Invalid asset name fragment {:?}", fragment))?;

        let mut files = Vec::new();
        self.collect_files(&dir, under.trim_end_matches('/'), &mut files)?;

        let mut found: Vec<String> = files
            .into_iter()
            .filter(|(name, _)| pattern.matches(name))
            .map(|(_, asset)| asset)
            .collect();
        found.sort();
        Ok(found)
    }

    fn refresh(&self) -> Result<()> {
        let stats = {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *stats)
        };
        info!(
            "Asset database refreshed: {} deleted, {} renamed",
            stats.deleted, stats.renamed
        );
        Ok(())
    }
}
