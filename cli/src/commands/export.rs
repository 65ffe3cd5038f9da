use anyhow::Result;
use districtor::{load_project, spawn, TaskOutcome};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ExportArgs) -> Result<()> {
    let session = load_project(&args.project)?;
    let out_path = args.output.clone().unwrap_or_else(|| format!("./scenario-{}.zip", args.scenario).into());

    let task = session.prepare_export(args.scenario, &out_path)?;
    let handle = spawn(task, |outcome| {
        tracing::debug!(completed = outcome.is_completed(), "export worker finished");
    });

    match handle.join() {
        TaskOutcome::Completed(summary) => {
            println!(
                "[export] wrote {} electorates, {} meshblocks, {} log rows to {}",
                summary.electorates, summary.meshblocks, summary.log_rows, summary.path.display()
            );
            Ok(())
        }
        TaskOutcome::Canceled => anyhow::bail!("[export] canceled"),
        TaskOutcome::Failed(err) => Err(err),
    }
}
