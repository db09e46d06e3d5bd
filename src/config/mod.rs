//! Locating and reading the installer's configuration artifacts.
//!
//! Both files live in the project root:
//! - `nuget.config` names the repository root (`repositoryPath`)
//! - `packages.config` lists the installed packages

mod nuget;

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::package::{PACKAGES_CONFIG_FILE, PackageIdentity, parse_package_manifest};
use crate::runtime::Runtime;

pub use nuget::{
    NUGET_CONFIG_FILE, REPOSITORY_PATH_KEY, RepositoryConfig, extract_package_folder_name,
    strip_relative_marker,
};

/// Reads configuration artifacts from a project root.
pub struct ConfigLocator<'a, R: Runtime> {
    runtime: &'a R,
    project_root: PathBuf,
}

impl<'a, R: Runtime> ConfigLocator<'a, R> {
    pub fn new(runtime: &'a R, project_root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn nuget_config_path(&self) -> PathBuf {
        self.project_root.join(NUGET_CONFIG_FILE)
    }

    pub fn packages_config_path(&self) -> PathBuf {
        self.project_root.join(PACKAGES_CONFIG_FILE)
    }

    /// Load the repository root from `nuget.config`.
    ///
    /// Every failure is reported as a [`ConfigError`] and logged at warn level;
    /// callers treat it as "not configured".
    #[tracing::instrument(skip(self))]
    pub fn load_repository_config(&self) -> Result<RepositoryConfig, ConfigError> {
        let result = self.read_repository_config();
        match &result {
            Ok(config) => debug!(
                "Repository path {} (package folder {})",
                config.repository_path, config.package_folder_name
            ),
            Err(e) => warn!("{}", e),
        }
        result
    }

    fn read_repository_config(&self) -> Result<RepositoryConfig, ConfigError> {
        let path = self.nuget_config_path();
        let missing = |reason: String| ConfigError::ConfigMissing {
            path: path.clone(),
            reason,
        };

        if !self.runtime.exists(&path) {
            return Err(missing("file does not exist".into()));
        }
        let content = self
            .runtime
            .read_to_string(&path)
            .map_err(|e| missing(format!("{:#}", e)))?;

        let value = nuget::find_config_value(&content, REPOSITORY_PATH_KEY)
            .map_err(missing)?
            .ok_or_else(|| ConfigError::KeyMissing {
                path: path.clone(),
                key: REPOSITORY_PATH_KEY.to_string(),
            })?;

        RepositoryConfig::from_repository_path(&value)
    }

    /// Load the installed packages from `packages.config`.
    ///
    /// A missing manifest means nothing has been installed yet.
    #[tracing::instrument(skip(self))]
    pub fn load_package_manifest(&self) -> Result<Vec<PackageIdentity>> {
        let path = self.packages_config_path();
        if !self.runtime.exists(&path) {
            debug!("No package manifest at {:?}", path);
            return Ok(vec![]);
        }

        let content = self.runtime.read_to_string(&path)?;
        let packages = parse_package_manifest(&content)
            .with_context(|| format!("Invalid package manifest {:?}", path))?;
        debug!("Loaded {} package(s) from {:?}", packages.len(), path);
        Ok(packages)
    }
}
