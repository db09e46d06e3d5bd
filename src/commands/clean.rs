use anyhow::Result;
use log::debug;

use super::config::Config;
use super::print_outcome;
use crate::runtime::Runtime;

/// Clean every package in the manifest, or only the given ids.
#[tracing::instrument(skip(config))]
pub async fn clean<R: Runtime + 'static>(config: Config<R>, ids: Vec<String>) -> Result<()> {
    debug!("Cleaning packages under {:?}", config.project_root);
    let session = config.session().await?;
    let outcome = session.clean_all(&ids).await;
    print_outcome(&outcome)
}
