//! Operation commands - install, remove and update with live progress

use crate::bridge::{Bridge, OperationResult, ProgressMonitor};
use crate::cli::args::{InstallArgs, RemoveArgs};
use crate::error::{AppResult, BridgeResult};
use crate::ui::{self, OperationProgress, UiContext};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Install a package
pub async fn install(args: InstallArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let label = format!("Installing {}", args.package);
    let result = with_progress(ctx, &label, |monitor| async move {
        bridge.install(&args.package, &monitor).await
    })
    .await?;
    report(ctx, &result)
}

/// Remove a package after confirmation
pub async fn remove(args: RemoveArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let prompt_ctx = ctx.clone().with_auto_yes(args.yes || ctx.auto_yes());
    let question = format!("Remove {}?", args.package);
    if !ui::confirm(&prompt_ctx, &question, false).await? {
        ui::step_warn(ctx, "Aborted, nothing removed (pass --yes to skip the prompt)");
        return Ok(());
    }

    let label = format!("Removing {}", args.package);
    let result = with_progress(ctx, &label, |monitor| async move {
        bridge.remove(&args.package, &monitor).await
    })
    .await?;
    report(ctx, &result)
}

/// Refresh the package lists
pub async fn update(bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let result = with_progress(ctx, "Updating package lists", |monitor| async move {
        bridge.update(&monitor).await
    })
    .await?;
    report(ctx, &result)
}

/// Run an operation with a progress display wired to its monitor
async fn with_progress<F, Fut>(ctx: &UiContext, label: &str, run: F) -> BridgeResult<OperationResult>
where
    F: FnOnce(ProgressMonitor) -> Fut,
    Fut: Future<Output = BridgeResult<OperationResult>>,
{
    let display = Arc::new(OperationProgress::new(ctx, label));
    let sink = Arc::clone(&display);
    let monitor = ProgressMonitor::new(move |event| sink.on_event(event));

    let result = run(monitor).await;
    display.finish();
    result
}

fn report(ctx: &UiContext, result: &OperationResult) -> AppResult<()> {
    info!("Operation finished: {}", result.message);
    if ctx.is_json() {
        return ui::print_json(result);
    }
    let message = if result.message.is_empty() {
        "Done"
    } else {
        result.message.as_str()
    };
    ui::outro_success(ctx, message);
    Ok(())
}
