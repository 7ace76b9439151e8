//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::progress::{ProgressEvent, ProgressStage};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    fancy: bool,
    quiet: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            fancy: ctx.use_fancy_output(),
            quiet: ctx.is_json(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.fancy {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else if !self.quiet {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if !self.quiet {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if !self.quiet {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }

    /// Clear the spinner without any message
    pub fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.clear();
        }
    }
}

/// Progress display for install/remove/update.
///
/// Renders [`ProgressEvent`]s as an indicatif bar in interactive mode and as
/// one line per stage change in CI.
pub struct OperationProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
    last_stage: Mutex<Option<ProgressStage>>,
}

impl OperationProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(100);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} {prefix}  {bar:24.cyan/dim} {pos:>3}% {msg:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(template);
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            if !ctx.is_json() {
                println!("{}...", label);
            }
            None
        };
        Self {
            bar,
            quiet: ctx.is_json(),
            last_stage: Mutex::new(None),
        }
    }

    /// Render one progress snapshot
    pub fn on_event(&self, event: &ProgressEvent) {
        if let Some(ref bar) = self.bar {
            bar.set_position(event.percentage.round() as u64);
            bar.set_message(truncate(&event.message, 60));
            return;
        }
        if self.quiet || event.complete {
            return;
        }

        let mut last = self
            .last_stage
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if event.stage.is_some() && *last != event.stage {
            *last = event.stage;
            println!("  [{:>3.0}%] {}", event.percentage, event.message);
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > max {
        let head: String = trimmed.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}
