//! CLI argument definitions using clap derive

use crate::bridge::PackageTab;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// aptbridge - drive APT through the bridge tool
///
/// Queries the package catalog, installs and removes packages with live
/// progress, and waits out package manager locks.
#[derive(Parser, Debug)]
#[command(name = "aptbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "APTBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    pub format: OutputFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search package names and summaries
    Search(SearchArgs),

    /// Show the full record of a package
    Details(PackageArgs),

    /// List Debian sections with package counts
    Sections(CacheArgs),

    /// List packages in a section
    ListSection(SectionArgs),

    /// List installed packages
    ListInstalled(CacheArgs),

    /// List packages with available upgrades
    ListUpgradable(CacheArgs),

    /// List configured repositories
    ListRepositories(StoreArgs),

    /// List stores, the curated views of the catalog
    ListStores(CacheArgs),

    /// List package categories with counts
    ListCategories(StoreArgs),

    /// List packages in a category
    ListByCategory(CategoryArgs),

    /// Filter packages by store, repository, tab and search text
    Filter(FilterArgs),

    /// Show direct dependencies of a package
    Dependencies(PackageArgs),

    /// Show packages depending on a package
    ReverseDependencies(PackageArgs),

    /// List files shipped by an installed package
    Files(PackageArgs),

    /// Install a package
    Install(InstallArgs),

    /// Remove a package
    Remove(RemoveArgs),

    /// Refresh the package lists
    Update,

    /// Report whether the package manager is locked
    LockStatus,

    /// Wait until the package manager lock is released
    WaitUnlocked(WaitArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Cache flag shared by every query
#[derive(Parser, Debug, Clone, Copy, Default)]
pub struct CacheArgs {
    /// Bypass the query cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the search command
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Search text
    pub query: String,

    #[command(flatten)]
    pub cache: CacheArgs,
}

/// Arguments for single-package queries
#[derive(Parser, Debug)]
pub struct PackageArgs {
    /// Package name
    pub package: String,

    #[command(flatten)]
    pub cache: CacheArgs,
}

/// Arguments for the list-section command
#[derive(Parser, Debug)]
pub struct SectionArgs {
    /// Section name (e.g. web, libs, python)
    pub section: String,

    #[command(flatten)]
    pub cache: CacheArgs,
}

/// Optional store scope of a listing
#[derive(Parser, Debug)]
pub struct StoreArgs {
    /// Store id as printed by list-stores
    #[arg(long)]
    pub store: Option<String>,

    #[command(flatten)]
    pub cache: CacheArgs,
}

/// Arguments for the list-by-category command
#[derive(Parser, Debug)]
pub struct CategoryArgs {
    /// Category id as printed by list-categories
    pub category: String,

    /// Store id as printed by list-stores
    #[arg(long)]
    pub store: Option<String>,

    #[command(flatten)]
    pub cache: CacheArgs,
}

/// Arguments for the filter command
#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// Store id as printed by list-stores
    #[arg(long)]
    pub store: Option<String>,

    /// Repository id as printed by list-repositories
    #[arg(long)]
    pub repo: Option<String>,

    /// Restrict to installed or upgradable packages
    #[arg(long)]
    pub tab: Option<TabArg>,

    /// Search text
    #[arg(long)]
    pub search: Option<String>,

    /// Maximum number of packages returned
    #[arg(long, default_value = "1000")]
    pub limit: u32,

    #[command(flatten)]
    pub cache: CacheArgs,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Package name
    pub package: String,
}

/// Arguments for the remove command
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Package name
    pub package: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the wait-unlocked command
#[derive(Parser, Debug)]
pub struct WaitArgs {
    /// Seconds to wait (default: from config)
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

/// Tab filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TabArg {
    Installed,
    Upgradable,
}

impl From<TabArg> for PackageTab {
    fn from(tab: TabArg) -> Self {
        match tab {
            TabArg::Installed => PackageTab::Installed,
            TabArg::Upgradable => PackageTab::Upgradable,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
