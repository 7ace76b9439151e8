//! Output functions for consistent CLI formatting

use super::context::UiContext;
use crate::error::{AppResult, BridgeError};
use crate::translate::user_message;
use console::style;
use serde::Serialize;

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.is_json() {
        return;
    }
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
        println!();
    }
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.is_json() {
        return;
    }
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        println!("{} {}", style("[OK]").green(), message);
    }
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(message).ok();
    } else if !ctx.is_json() {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

/// Display a warning step
pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(message).ok();
    } else if !ctx.is_json() {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(message).ok();
    } else if !ctx.is_json() {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

/// Display a remark/hint
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else if !ctx.is_json() {
        println!("  {}", style(message).dim());
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print a bold table header and its rule
pub fn table_header(columns: &[(&str, usize)]) {
    let mut line = String::new();
    let mut width = 0;
    for (name, w) in columns {
        line.push_str(&format!("{:<w$} ", style(name).bold(), w = *w));
        width += w + 1;
    }
    println!("{}", line.trim_end());
    println!("{}", "-".repeat(width.saturating_sub(1)));
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Report a bridge error: JSON on stdout in JSON mode, a friendly line otherwise
pub fn bridge_error(ctx: &UiContext, err: &BridgeError) {
    if ctx.is_json() {
        if let Ok(json) = serde_json::to_string_pretty(err) {
            println!("{}", json);
        }
        return;
    }

    let friendly = user_message(err.clone());
    if ctx.use_fancy_output() {
        cliclack::log::error(format!("{} {}", friendly, style(err.code.as_str()).dim())).ok();
    } else {
        eprintln!("  {} {} ({})", style("[FAIL]").red(), friendly, err.code);
    }
    if let Some(ref details) = err.details {
        remark(ctx, details.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        // These should not panic
        intro(&ctx, "Test");
        outro_success(&ctx, "Done");
        step_ok(&ctx, "Step completed");
        step_warn(&ctx, "Warning");
        bridge_error(
            &ctx,
            &BridgeError::new(ErrorCode::Locked, "locked").with_details("pid 123"),
        );
    }
}
