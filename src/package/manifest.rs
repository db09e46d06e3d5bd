use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::PackageIdentity;

/// The installer's manifest, next to the project's `Assets` folder.
pub const PACKAGES_CONFIG_FILE: &str = "packages.config";

#[derive(Deserialize, Debug, Default)]
struct PackagesConfig {
    #[serde(rename = "package", default)]
    packages: Vec<PackageEntry>,
}

#[derive(Deserialize, Debug)]
struct PackageEntry {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@version")]
    version: String,
}

/// Parse `packages.config` content into package identities.
///
/// Order is preserved and duplicates are kept; the manifest is authoritative.
/// Ids and versions name a folder, so anything that could address another
/// folder is rejected.
pub fn parse_package_manifest(content: &str) -> Result<Vec<PackageIdentity>> {
    let config: PackagesConfig =
        quick_xml::de::from_str(content).context("Failed to parse packages.config")?;

    config
        .packages
        .into_iter()
        .map(|entry| -> Result<PackageIdentity> {
            check_name_part("id", &entry.id)?;
            check_name_part("version", &entry.version)?;
            Ok(PackageIdentity::new(entry.id, entry.version))
        })
        .collect()
}

fn check_name_part(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains(['/', '\\']) || value.contains("..") {
        bail!("Invalid package {} {:?}", field, value);
    }
    Ok(())
}
