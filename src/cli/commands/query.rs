//! Query commands - read-only views of the package catalog

use crate::bridge::{
    Bridge, Category, Dependency, FilterResult, PackageDetails, PackageFilter, PackageSummary,
    QueryOptions, Repository, Section, Store, UpgradablePackage,
};
use crate::cli::args::{
    CacheArgs, CategoryArgs, FilterArgs, OutputFormat, PackageArgs, SearchArgs, SectionArgs,
    StoreArgs,
};
use crate::error::AppResult;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

impl From<CacheArgs> for QueryOptions {
    fn from(args: CacheArgs) -> Self {
        Self {
            no_cache: args.no_cache,
        }
    }
}

/// Search package names and summaries
pub async fn search(args: SearchArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let packages = bridge.search(&args.query, args.cache.into()).await?;
    render_packages(ctx, &packages, &format!("No packages match '{}'", args.query))
}

/// Show one package record
pub async fn details(args: PackageArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let details = bridge.details(&args.package, args.cache.into()).await?;
    render(
        ctx,
        &details,
        || print_details(ctx, &details),
        || println!("{}", details.name),
    )
}

/// List sections
pub async fn sections(args: CacheArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let sections = bridge.sections(args.into()).await?;
    render(
        ctx,
        &sections,
        || print_sections(&sections),
        || sections.iter().for_each(|s| println!("{}", s.name)),
    )
}

/// List packages in one section
pub async fn list_section(args: SectionArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let packages = bridge.list_section(&args.section, args.cache.into()).await?;
    render_packages(ctx, &packages, &format!("Section '{}' is empty", args.section))
}

/// List installed packages
pub async fn list_installed(args: CacheArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let packages = bridge.list_installed(args.into()).await?;
    render_packages(ctx, &packages, "No installed packages")
}

/// List upgradable packages
pub async fn list_upgradable(args: CacheArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let packages = bridge.list_upgradable(args.into()).await?;
    if packages.is_empty() && ctx.format() == OutputFormat::Table {
        ui::step_ok(ctx, "All packages are up to date");
        return Ok(());
    }
    render(
        ctx,
        &packages,
        || print_upgradable(&packages),
        || packages.iter().for_each(|p| println!("{}", p.name)),
    )
}

/// List configured repositories
pub async fn list_repositories(args: StoreArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let repositories = bridge
        .list_repositories(args.store.as_deref(), args.cache.into())
        .await?;
    render(
        ctx,
        &repositories,
        || print_repositories(&repositories),
        || repositories.iter().for_each(|r| println!("{}", r.id)),
    )
}

/// List stores
pub async fn list_stores(args: CacheArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let stores = bridge.list_stores(args.into()).await?;
    if stores.is_empty() && ctx.format() == OutputFormat::Table {
        ui::step_info(ctx, "No stores configured");
        return Ok(());
    }
    render(
        ctx,
        &stores,
        || print_stores(&stores),
        || stores.iter().for_each(|s| println!("{}", s.id)),
    )
}

/// List categories, optionally within one store
pub async fn list_categories(args: StoreArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let categories = bridge
        .list_categories(args.store.as_deref(), args.cache.into())
        .await?;
    render(
        ctx,
        &categories,
        || print_categories(&categories),
        || categories.iter().for_each(|c| println!("{}", c.id)),
    )
}

/// List packages in one category
pub async fn list_by_category(args: CategoryArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let packages = bridge
        .list_packages_by_category(&args.category, args.store.as_deref(), args.cache.into())
        .await?;
    render_packages(
        ctx,
        &packages,
        &format!("Category '{}' is empty", args.category.trim()),
    )
}

/// Filter packages
pub async fn filter(args: FilterArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let filter = PackageFilter {
        store: args.store,
        repository: args.repo,
        tab: args.tab.map(Into::into),
        search: args.search,
        limit: args.limit,
    };
    let result = bridge.filter_packages(&filter, args.cache.into()).await?;
    render(
        ctx,
        &result,
        || print_filter_result(ctx, &result),
        || result.packages.iter().for_each(|p| println!("{}", p.name)),
    )
}

/// Show direct dependencies
pub async fn dependencies(args: PackageArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let deps = bridge.dependencies(&args.package, args.cache.into()).await?;
    render(
        ctx,
        &deps,
        || print_dependencies(&deps),
        || deps.iter().for_each(|d| println!("{}", d.name)),
    )
}

/// Show reverse dependencies
pub async fn reverse_dependencies(
    args: PackageArgs,
    bridge: &Bridge,
    ctx: &UiContext,
) -> AppResult<()> {
    let names = bridge
        .reverse_dependencies(&args.package, args.cache.into())
        .await?;
    render_lines(ctx, &names)
}

/// List files of an installed package
pub async fn files(args: PackageArgs, bridge: &Bridge, ctx: &UiContext) -> AppResult<()> {
    let files = bridge.files(&args.package, args.cache.into()).await?;
    render_lines(ctx, &files)
}

/// Dispatch on the output format
fn render<T: Serialize + ?Sized>(
    ctx: &UiContext,
    value: &T,
    table: impl FnOnce(),
    plain: impl FnOnce(),
) -> AppResult<()> {
    match ctx.format() {
        OutputFormat::Json => ui::print_json(value)?,
        OutputFormat::Table => table(),
        OutputFormat::Plain => plain(),
    }
    Ok(())
}

fn render_packages(ctx: &UiContext, packages: &[PackageSummary], empty: &str) -> AppResult<()> {
    if packages.is_empty() && ctx.format() == OutputFormat::Table {
        ui::step_info(ctx, empty);
        return Ok(());
    }
    render(
        ctx,
        packages,
        || print_packages(packages),
        || packages.iter().for_each(|p| println!("{}", p.name)),
    )
}

fn render_lines(ctx: &UiContext, lines: &[String]) -> AppResult<()> {
    if ctx.is_json() {
        return ui::print_json(lines);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn print_packages(packages: &[PackageSummary]) {
    ui::table_header(&[("NAME", 30), ("VERSION", 20), ("SECTION", 12), ("SUMMARY", 40)]);
    for pkg in packages {
        let name = format!("{:<30}", pkg.name);
        let name = if pkg.installed {
            style(name).green().to_string()
        } else {
            name
        };
        println!(
            "{} {:<20} {:<12} {}",
            name, pkg.version, pkg.section, pkg.summary
        );
    }
    println!();
    println!("{} package(s)", packages.len());
}

fn print_details(ctx: &UiContext, details: &PackageDetails) {
    ui::intro(ctx, &details.name);
    ui::key_value(ctx, "Summary", &details.summary);
    ui::key_value(ctx, "Section", &details.section);
    ui::key_value(ctx, "Priority", &details.priority);
    ui::key_value(
        ctx,
        "Installed",
        details.installed_version.as_deref().unwrap_or("no"),
    );
    ui::key_value(
        ctx,
        "Candidate",
        details.candidate_version.as_deref().unwrap_or("none"),
    );
    ui::key_value(ctx, "Maintainer", &details.maintainer);
    if !details.homepage.is_empty() {
        ui::key_value(ctx, "Homepage", &details.homepage);
    }
    ui::key_value(ctx, "Download size", &format_size(details.size));
    ui::key_value(ctx, "Installed size", &format_size(details.installed_size));
    ui::key_value(ctx, "Dependencies", &details.dependencies.len().to_string());

    if !details.description.is_empty() {
        println!();
        for line in details.description.lines() {
            println!("  {}", line);
        }
    }
}

fn print_sections(sections: &[Section]) {
    ui::table_header(&[("SECTION", 24), ("PACKAGES", 10)]);
    for section in sections {
        println!("{:<24} {:>10}", section.name, section.count);
    }
}

fn print_upgradable(packages: &[UpgradablePackage]) {
    ui::table_header(&[("NAME", 30), ("INSTALLED", 20), ("CANDIDATE", 20)]);
    for pkg in packages {
        println!(
            "{:<30} {:<20} {}",
            pkg.name,
            pkg.installed_version,
            style(&pkg.candidate_version).green()
        );
    }
    println!();
    println!("{} upgrade(s) available", packages.len());
}

fn print_repositories(repositories: &[Repository]) {
    ui::table_header(&[("ID", 36), ("ORIGIN", 16), ("SUITE", 16), ("PACKAGES", 10)]);
    for repo in repositories {
        println!(
            "{:<36} {:<16} {:<16} {:>10}",
            repo.id, repo.origin, repo.suite, repo.package_count
        );
    }
}

fn print_stores(stores: &[Store]) {
    ui::table_header(&[("ID", 20), ("NAME", 30), ("DESCRIPTION", 40)]);
    for store in stores {
        println!("{:<20} {:<30} {}", store.id, store.name, store.description);
    }
}

fn print_categories(categories: &[Category]) {
    ui::table_header(&[("ID", 24), ("LABEL", 30), ("PACKAGES", 10)]);
    for category in categories {
        println!(
            "{:<24} {:<30} {:>10}",
            category.id, category.label, category.count
        );
    }
}

fn print_filter_result(ctx: &UiContext, result: &FilterResult) {
    if result.packages.is_empty() {
        ui::step_info(ctx, "No packages match the filters");
        return;
    }
    print_packages(&result.packages);
    if result.limited {
        ui::remark(
            ctx,
            &format!(
                "Showing {} of {} matches (raise --limit to see more)",
                result.packages.len(),
                result.total_count
            ),
        );
    }
}

fn print_dependencies(deps: &[Dependency]) {
    ui::table_header(&[("NAME", 30), ("RELATION", 8), ("VERSION", 20)]);
    for dep in deps {
        println!("{:<30} {:<8} {}", dep.name, dep.relation, dep.version);
    }
}

/// Human-readable byte count
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn cache_args_convert() {
        let opts: QueryOptions = CacheArgs { no_cache: true }.into();
        assert!(opts.no_cache);
    }
}
