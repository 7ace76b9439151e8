//! aptbridge - APT bridge client
//!
//! CLI entry point that dispatches to subcommands.

use aptbridge::cli::commands::{self, query};
use aptbridge::cli::{Cli, Commands};
use aptbridge::config::ConfigManager;
use aptbridge::error::{AppError, AppResult};
use aptbridge::ui::{self, UiContext};
use aptbridge::{Bridge, ProcessExecutor};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let ctx = UiContext::detect().with_format(cli.format);

    match run(cli, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&ctx, &e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(ctx: &UiContext, err: &AppError) {
    match err {
        AppError::Bridge(bridge_err) => ui::bridge_error(ctx, bridge_err),
        other => eprintln!("{} {}", style("Error:").red().bold(), other),
    }
    if let Some(hint) = err.hint() {
        if !ctx.is_json() {
            eprintln!("{} {}", style("Hint:").yellow(), hint);
        }
    }
}

async fn run(cli: Cli, ctx: &UiContext) -> AppResult<()> {
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config.general.log_format);
    debug!("Using config at {}", config_manager.path().display());

    let executor = Arc::new(ProcessExecutor::from_config(&config.bridge));
    let bridge = Bridge::from_config(executor, &config);

    match cli.command {
        Commands::Search(args) => query::search(args, &bridge, ctx).await,
        Commands::Details(args) => query::details(args, &bridge, ctx).await,
        Commands::Sections(args) => query::sections(args, &bridge, ctx).await,
        Commands::ListSection(args) => query::list_section(args, &bridge, ctx).await,
        Commands::ListInstalled(args) => query::list_installed(args, &bridge, ctx).await,
        Commands::ListUpgradable(args) => query::list_upgradable(args, &bridge, ctx).await,
        Commands::ListRepositories(args) => query::list_repositories(args, &bridge, ctx).await,
        Commands::ListStores(args) => query::list_stores(args, &bridge, ctx).await,
        Commands::ListCategories(args) => query::list_categories(args, &bridge, ctx).await,
        Commands::ListByCategory(args) => query::list_by_category(args, &bridge, ctx).await,
        Commands::Filter(args) => query::filter(args, &bridge, ctx).await,
        Commands::Dependencies(args) => query::dependencies(args, &bridge, ctx).await,
        Commands::ReverseDependencies(args) => {
            query::reverse_dependencies(args, &bridge, ctx).await
        }
        Commands::Files(args) => query::files(args, &bridge, ctx).await,
        Commands::Install(args) => commands::install(args, &bridge, ctx).await,
        Commands::Remove(args) => commands::remove(args, &bridge, ctx).await,
        Commands::Update => commands::update(&bridge, ctx).await,
        Commands::LockStatus => commands::lock_status(&bridge, ctx).await,
        Commands::WaitUnlocked(args) => commands::wait_unlocked(args, &bridge, &config, ctx).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager, ctx),
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug; RUST_LOG wins when set
fn init_logging(verbose: u8, log_format: &str) {
    let default = match verbose {
        0 => "aptbridge=warn",
        1 => "aptbridge=info",
        _ => "aptbridge=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
