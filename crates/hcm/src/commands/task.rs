use super::{Context, report};
use clap::Subcommand;
use hcm_cloud::retry_with_policy;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Wait for vendor tasks to finish and print their outcome
    Wait {
        #[arg(long)]
        region: String,
        /// Task (request) ids
        #[arg(required = true)]
        task_ids: Vec<String>,
    },
}

pub async fn handle(ctx: &Context, cmd: TaskCommand) -> anyhow::Result<()> {
    match cmd {
        TaskCommand::Wait { region, task_ids } => {
            let (region, task_ids) = (region.as_str(), task_ids.as_slice());
            let outcome = retry_with_policy(&ctx.kt, &ctx.retry, move || {
                ctx.tcloud.wait_tasks(&ctx.kt, region, task_ids)
            })
            .await;
            report("task wait", &outcome);

            let result = outcome?;
            if !result.is_all_success() {
                anyhow::bail!(
                    "{} of {} tasks did not succeed",
                    result.total() - result.success_cloud_ids.len(),
                    result.total()
                );
            }
            Ok(())
        }
    }
}
