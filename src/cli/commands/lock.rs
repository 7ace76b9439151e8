//! Lock commands - probe and wait for the package manager lock

use crate::bridge::Bridge;
use crate::cli::args::WaitArgs;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::ui::{self, TaskSpinner, UiContext};
use serde_json::json;
use std::time::Duration;

/// Report whether the lock is held
pub async fn status(bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let locked = bridge.is_locked().await?;
    if ctx.is_json() {
        return ui::print_json(&json!({ "locked": locked }));
    }
    if locked {
        ui::step_warn(ctx, "Package manager is locked by another process");
    } else {
        ui::step_ok(ctx, "Package manager is available");
    }
    Ok(())
}

/// Block until the lock is released or the timeout elapses
pub async fn wait(args: WaitArgs, bridge: &Bridge, config: &Config, ctx: &UiContext) -> AppResult<()> {
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.lock.timeout());

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start("Waiting for the package manager lock...");

    let unlocked = match bridge.wait_until_unlocked(timeout).await {
        Ok(unlocked) => unlocked,
        Err(e) => {
            spinner.stop_error("Lock probe failed");
            return Err(e.into());
        }
    };

    if !unlocked {
        spinner.stop_error("Still locked");
        return Err(AppError::LockWaitTimeout(timeout.as_secs()));
    }

    spinner.stop("Package manager is available");
    if ctx.is_json() {
        ui::print_json(&json!({ "locked": false }))?;
    }
    Ok(())
}
