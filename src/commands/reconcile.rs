use anyhow::Result;
use log::debug;

use super::config::Config;
use super::print_outcome;
use crate::reconcile::ChangeBatch;
use crate::runtime::Runtime;

/// Run one batch of change notifications against the project.
#[tracing::instrument(skip(config))]
pub async fn reconcile<R: Runtime + 'static>(config: Config<R>, batch: ChangeBatch) -> Result<()> {
    if batch.is_empty() {
        debug!("Empty change batch");
    }
    let session = config.session().await?;
    let outcome = session.on_files_changed(&batch).await;
    print_outcome(&outcome)
}
