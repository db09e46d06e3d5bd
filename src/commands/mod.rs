use anyhow::{Result, bail};

use crate::reconcile::BatchOutcome;

mod clean;
pub mod config;
mod list;
mod reconcile;

pub use clean::clean;
pub use list::list;
pub use reconcile::reconcile;

/// Print what a batch did; a failed package or an aborted batch is an error.
pub(crate) fn print_outcome(outcome: &BatchOutcome) -> Result<()> {
    match outcome {
        BatchOutcome::Disabled => {
            println!("{}", outcome);
            Ok(())
        }
        BatchOutcome::Aborted(reason) => bail!("Reconciliation aborted: {}", reason),
        BatchOutcome::Completed(summary) => {
            for (pkg, report) in &summary.cleaned {
                if report.is_unchanged() {
                    println!("{}: already clean", pkg);
                } else {
                    println!(
                        "{}: {} removed, {} renamed",
                        pkg,
                        report.removed.len(),
                        report.renamed.len()
                    );
                }
                if let Some(framework) = &report.selected_framework {
                    println!("  kept lib/{}", framework);
                }
                for assembly in &report.pending_relocation {
                    println!("  move {} inside Assets", assembly);
                }
                for issue in &report.issues {
                    println!("  skipped {}", issue);
                }
            }
            for (pkg, reason) in &summary.failed {
                println!("{}: failed: {}", pkg, reason);
            }

            println!("{}", outcome);
            if !summary.failed.is_empty() {
                bail!("{} package(s) could not be cleaned", summary.failed.len());
            }
            Ok(())
        }
    }
}
