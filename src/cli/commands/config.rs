//! Config command - show the effective configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::AppResult;
use crate::ui::{self, UiContext};

/// Execute the config command
pub fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
    ctx: &UiContext,
) -> AppResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => {
            if ctx.is_json() {
                ui::print_json(config)?;
            } else {
                let toml = toml::to_string_pretty(config)
                    .unwrap_or_else(|_| "Error serializing config".to_string());
                println!("{}", toml);
            }
        }
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
    }
    Ok(())
}
