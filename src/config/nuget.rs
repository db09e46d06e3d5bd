//! `nuget.config` parsing and repository path conventions.

use serde::Deserialize;

use crate::error::ConfigError;

/// The installer's configuration file, next to the project's `Assets` folder.
pub const NUGET_CONFIG_FILE: &str = "nuget.config";

/// Key holding the install root inside `<config>`.
pub const REPOSITORY_PATH_KEY: &str = "repositoryPath";

/// Container segment every embedded package lives under.
const PACKAGES_SEGMENT: &str = "Packages";

#[derive(Deserialize, Debug, Default)]
struct NugetConfig {
    #[serde(default)]
    config: Option<ConfigSection>,
}

#[derive(Deserialize, Debug, Default)]
struct ConfigSection {
    #[serde(rename = "add", default)]
    entries: Vec<AddEntry>,
}

#[derive(Deserialize, Debug)]
struct AddEntry {
    #[serde(rename = "@key")]
    key: String,
    #[serde(rename = "@value")]
    value: Option<String>,
}

/// The configured install root of the NuGet installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// e.g. `Packages/UniBlazorCore/Plugins`, without a leading `./`
    pub repository_path: String,
    /// e.g. `UniBlazorCore`
    pub package_folder_name: String,
}

impl RepositoryConfig {
    /// Build from a raw `repositoryPath` value.
    pub fn from_repository_path(raw: &str) -> Result<Self, ConfigError> {
        let repository_path = strip_relative_marker(raw).to_string();
        let package_folder_name = extract_package_folder_name(&repository_path)?.to_string();
        Ok(Self {
            repository_path,
            package_folder_name,
        })
    }
}

/// Look up a `<config><add key=.. value=../></config>` value.
///
/// Returns `Ok(None)` when the document parses but the key is absent.
pub(crate) fn find_config_value(content: &str, key: &str) -> Result<Option<String>, String> {
    let config: NugetConfig = quick_xml::de::from_str(content).map_err(|e| e.to_string())?;
    Ok(config
        .config
        .unwrap_or_default()
        .entries
        .into_iter()
        .find(|entry| entry.key == key)
        .and_then(|entry| entry.value))
}

/// Strip one leading `./`, never more.
pub fn strip_relative_marker(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

/// Extract `<folder>` from `Packages/<folder>/<subpath>`.
pub fn extract_package_folder_name(repository_path: &str) -> Result<&str, ConfigError> {
    let invalid = || ConfigError::InvalidRepositoryPath {
        path: repository_path.to_string(),
    };

    let rest = repository_path
        .strip_prefix(PACKAGES_SEGMENT)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(invalid)?;
    let (folder, subpath) = rest.split_once('/').ok_or_else(invalid)?;

    if folder.is_empty() || !folder.chars().all(is_folder_char) {
        return Err(invalid());
    }
    if !subpath.chars().next().is_some_and(is_folder_char) {
        return Err(invalid());
    }

    Ok(folder)
}

fn is_folder_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}
