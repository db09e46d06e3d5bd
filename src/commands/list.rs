use anyhow::Result;

use super::config::Config;
use crate::asset::AssetDatabase;
use crate::reconcile::package_asset_path;
use crate::runtime::Runtime;

/// List manifest packages with their asset paths
#[tracing::instrument(skip(config))]
pub async fn list<R: Runtime + 'static>(config: Config<R>) -> Result<()> {
    let session = config.session().await?;

    let Some(resolved) = session.ensure_resolved().await? else {
        println!("No repositoryPath configured, nothing to do.");
        return Ok(());
    };

    let packages = session.reload_manifest()?;
    if packages.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    println!("Repository: {}", resolved.asset_path);
    for pkg in &packages {
        let path = package_asset_path(&resolved.asset_path, pkg);
        if session.assets().is_valid_folder(&path) {
            println!("  {}  {}", pkg, path);
        } else {
            println!("  {}  {} (missing)", pkg, path);
        }
    }
    Ok(())
}
