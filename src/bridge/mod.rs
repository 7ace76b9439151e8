//! Bridge facade
//!
//! Composes the executor, cache, progress parser and error translator into
//! the operations a package-management front end calls:
//!
//! - queries (`search`, `details`, ...): cached, idempotent, one JSON value
//!   per invocation
//! - operations (`install`, `remove`, `update`): uncached, streaming progress,
//!   invalidating the cache entries they make stale
//!
//! Every entry point fails with a canonical [`BridgeError`].

pub mod keys;
mod models;
mod operation;
pub mod validate;

pub use models::{
    Category, CustomSection, Dependency, FilterResult, OperationResult, PackageDetails,
    PackageFilter, PackageSummary, PackageTab, Repository, Section, Store, StoreFilters,
    UpgradablePackage,
};
pub use operation::ProgressMonitor;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::{BridgeError, BridgeResult, ErrorCode, RawFailure};
use crate::executor::{BridgeCommand, CommandExecutor};
use crate::translate::{is_lock_error, translate};
use operation::{classify_line, find_terminal, OutputLine};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tunables of the facade
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Store query results in the cache
    pub cache_enabled: bool,

    /// Timeout for queries (zero = none)
    pub query_timeout: Duration,

    /// Timeout for install/remove/update (zero = none)
    pub operation_timeout: Duration,

    /// Delay between lock probes
    pub lock_poll_interval: Duration,
}

impl BridgeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_enabled: config.cache.enabled,
            query_timeout: config.bridge.query_timeout(),
            operation_timeout: config.bridge.operation_timeout(),
            lock_poll_interval: config.lock.poll_interval(),
        }
    }
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Per-call query flags
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Skip the cache lookup; the fresh result still replaces the entry
    pub no_cache: bool,
}

impl QueryOptions {
    pub fn fresh() -> Self {
        Self { no_cache: true }
    }
}

/// Client-side bridge to the package manager
pub struct Bridge {
    executor: Arc<dyn CommandExecutor>,
    cache: Mutex<CacheManager>,
    options: BridgeOptions,
}

impl Bridge {
    /// Create a bridge owning the given cache
    pub fn new(executor: Arc<dyn CommandExecutor>, cache: CacheManager, options: BridgeOptions) -> Self {
        Self {
            executor,
            cache: Mutex::new(cache),
            options,
        }
    }

    /// Create a bridge with a fresh cache configured from `config`
    pub fn from_config(executor: Arc<dyn CommandExecutor>, config: &Config) -> Self {
        Self::new(
            executor,
            CacheManager::new(config.cache.ttl_rules()),
            BridgeOptions::from_config(config),
        )
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Direct access to the cache
    pub async fn cache(&self) -> MutexGuard<'_, CacheManager> {
        self.cache.lock().await
    }

    /// Remove expired cache entries
    pub async fn prune_cache(&self) -> usize {
        self.cache.lock().await.prune()
    }

    /// Drop every cached query result
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    /// Drop cached results whose key starts with `prefix`
    pub async fn invalidate(&self, prefix: &str) -> usize {
        self.cache.lock().await.invalidate_pattern(prefix)
    }

    // Queries

    /// Search package names and summaries
    pub async fn search(&self, query: &str, opts: QueryOptions) -> BridgeResult<Vec<PackageSummary>> {
        validate::search_query(query)?;
        self.query("search", vec![query.to_string()], keys::search(query), opts)
            .await
    }

    /// Full record of one package
    pub async fn details(&self, package: &str, opts: QueryOptions) -> BridgeResult<PackageDetails> {
        validate::package_name(package)?;
        self.query("details", vec![package.to_string()], keys::details(package), opts)
            .await
    }

    /// Debian sections with package counts
    pub async fn sections(&self, opts: QueryOptions) -> BridgeResult<Vec<Section>> {
        self.query("sections", vec![], keys::SECTIONS.to_string(), opts)
            .await
    }

    /// Packages in one section
    pub async fn list_section(
        &self,
        section: &str,
        opts: QueryOptions,
    ) -> BridgeResult<Vec<PackageSummary>> {
        validate::section_name(section)?;
        self.query("list-section", vec![section.to_string()], keys::section(section), opts)
            .await
    }

    /// Installed packages
    pub async fn list_installed(&self, opts: QueryOptions) -> BridgeResult<Vec<PackageSummary>> {
        self.query("list-installed", vec![], keys::INSTALLED.to_string(), opts)
            .await
    }

    /// Installed packages with a newer candidate
    pub async fn list_upgradable(&self, opts: QueryOptions) -> BridgeResult<Vec<UpgradablePackage>> {
        self.query("list-upgradable", vec![], keys::UPGRADABLE.to_string(), opts)
            .await
    }

    /// Configured repositories, optionally only those a store draws from
    pub async fn list_repositories(
        &self,
        store: Option<&str>,
        opts: QueryOptions,
    ) -> BridgeResult<Vec<Repository>> {
        self.query(
            "list-repositories",
            store_args(store)?,
            keys::repositories(store),
            opts,
        )
        .await
    }

    /// Configured stores
    pub async fn list_stores(&self, opts: QueryOptions) -> BridgeResult<Vec<Store>> {
        self.query("list-stores", vec![], keys::STORES.to_string(), opts)
            .await
    }

    /// Categories with package counts, sorted by label
    pub async fn list_categories(
        &self,
        store: Option<&str>,
        opts: QueryOptions,
    ) -> BridgeResult<Vec<Category>> {
        self.query(
            "list-categories",
            store_args(store)?,
            keys::categories(store),
            opts,
        )
        .await
    }

    /// Packages in one category, sorted by name
    pub async fn list_packages_by_category(
        &self,
        category: &str,
        store: Option<&str>,
        opts: QueryOptions,
    ) -> BridgeResult<Vec<PackageSummary>> {
        let category = validate::category_id(category)?;
        let mut args = vec![category.to_string()];
        args.extend(store_args(store)?);
        self.query(
            "list-packages-by-category",
            args,
            keys::category(category, store),
            opts,
        )
        .await
    }

    /// Packages matching repository, tab and search filters
    pub async fn filter_packages(
        &self,
        filter: &PackageFilter,
        opts: QueryOptions,
    ) -> BridgeResult<FilterResult> {
        validate::limit(filter.limit)?;
        if let Some(ref store) = filter.store {
            validate::store_id(store)?;
        }
        if let Some(ref search) = filter.search {
            validate::search_query(search)?;
        }
        self.query("filter-packages", filter.to_args(), keys::filter(filter), opts)
            .await
    }

    /// Direct dependencies, OR-groups flattened
    pub async fn dependencies(&self, package: &str, opts: QueryOptions) -> BridgeResult<Vec<Dependency>> {
        validate::package_name(package)?;
        self.query(
            "dependencies",
            vec![package.to_string()],
            keys::dependencies(package),
            opts,
        )
        .await
    }

    /// Names of packages depending on `package`
    pub async fn reverse_dependencies(
        &self,
        package: &str,
        opts: QueryOptions,
    ) -> BridgeResult<Vec<String>> {
        validate::package_name(package)?;
        self.query(
            "reverse-dependencies",
            vec![package.to_string()],
            keys::reverse_dependencies(package),
            opts,
        )
        .await
    }

    /// Files shipped by an installed package
    pub async fn files(&self, package: &str, opts: QueryOptions) -> BridgeResult<Vec<String>> {
        validate::package_name(package)?;
        self.query("files", vec![package.to_string()], keys::files(package), opts)
            .await
    }

    // Operations

    /// Install a package
    pub async fn install(&self, package: &str, monitor: &ProgressMonitor) -> BridgeResult<OperationResult> {
        validate::package_name(package)?;
        let result = self
            .run_operation("install", vec![package.to_string()], monitor)
            .await?;
        self.invalidate_package(package).await;
        Ok(result)
    }

    /// Remove a package
    pub async fn remove(&self, package: &str, monitor: &ProgressMonitor) -> BridgeResult<OperationResult> {
        validate::removable_package(package)?;
        let result = self
            .run_operation("remove", vec![package.to_string()], monitor)
            .await?;
        self.invalidate_package(package).await;
        Ok(result)
    }

    /// Refresh the package catalog
    pub async fn update(&self, monitor: &ProgressMonitor) -> BridgeResult<OperationResult> {
        let result = self.run_operation("update", vec![], monitor).await?;
        info!("Package lists refreshed, clearing cache");
        self.cache.lock().await.clear();
        Ok(result)
    }

    // Lock handling

    /// Probe whether another process holds the package manager lock.
    ///
    /// Lock-shaped failures answer `true`; other failures propagate.
    pub async fn is_locked(&self) -> BridgeResult<bool> {
        match self.fetch::<Vec<Section>>("sections", vec![]).await {
            Ok(_) => Ok(false),
            Err(e) if is_lock_error(&e) => {
                debug!("Package manager is locked: {}", e);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Poll until the lock is free, using the configured interval.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_until_unlocked(&self, timeout: Duration) -> BridgeResult<bool> {
        self.wait_until_unlocked_with(timeout, self.options.lock_poll_interval)
            .await
    }

    /// Poll until the lock is free with an explicit interval
    pub async fn wait_until_unlocked_with(
        &self,
        timeout: Duration,
        interval: Duration,
    ) -> BridgeResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_locked().await? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!("Package manager still locked after {:?}", timeout);
                return Ok(false);
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
        }
    }

    // Internals

    async fn query<T>(
        &self,
        name: &str,
        args: Vec<String>,
        key: String,
        opts: QueryOptions,
    ) -> BridgeResult<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let use_cache = self.options.cache_enabled && !opts.no_cache;
        if use_cache {
            if let Some(hit) = self.cache.lock().await.get::<T>(&key) {
                debug!("Cache hit: {}", key);
                return Ok(hit);
            }
            debug!("Cache miss: {}", key);
        }

        let value: T = self.fetch(name, args).await?;

        if self.options.cache_enabled {
            self.cache.lock().await.set(&key, value.clone(), None);
        }
        Ok(value)
    }

    /// Run a query command and parse its stdout, bypassing the cache
    async fn fetch<T: DeserializeOwned>(&self, name: &str, args: Vec<String>) -> BridgeResult<T> {
        let command = BridgeCommand::query(name, args).with_timeout(self.options.query_timeout);
        let output = self
            .executor
            .execute(&command, None)
            .await
            .map_err(translate)?;

        serde_json::from_str(output.stdout.trim()).map_err(|e| {
            BridgeError::parse(format!("Failed to parse output of '{}'", name), e.to_string())
        })
    }

    async fn run_operation(
        &self,
        name: &str,
        args: Vec<String>,
        monitor: &ProgressMonitor,
    ) -> BridgeResult<OperationResult> {
        let command =
            BridgeCommand::operation(name, args).with_timeout(self.options.operation_timeout);

        let terminal: StdMutex<Option<Map<String, Value>>> = StdMutex::new(None);
        let on_line = |line: &str| match classify_line(line) {
            OutputLine::Progress {
                percentage,
                message,
                package,
            } => {
                monitor.report(percentage, &message, package.as_deref());
            }
            OutputLine::Result(map) => {
                let mut slot = terminal.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_some() {
                    warn!("Ignoring additional result object from '{}'", name);
                } else {
                    debug!("Result object received from '{}'", name);
                    *slot = Some(map);
                }
            }
            OutputLine::Status => {
                monitor.parse_line(line);
            }
            OutputLine::Ignored => {}
        };

        let output = match self.executor.execute(&command, Some(&on_line)).await {
            Ok(output) => output,
            Err(raw) => return Err(fail(monitor, translate(raw))),
        };

        let terminal = terminal
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .or_else(|| find_terminal(&output.stdout));

        let Some(map) = terminal else {
            return Err(fail(
                monitor,
                BridgeError::new(
                    ErrorCode::CommandFailed,
                    format!("Command '{}' completed but returned no result", name),
                ),
            ));
        };

        let result: OperationResult = match serde_json::from_value(Value::Object(map.clone())) {
            Ok(result) => result,
            Err(e) => {
                let err = BridgeError::parse(
                    format!("Invalid result from '{}'", name),
                    e.to_string(),
                );
                return Err(fail(monitor, err));
            }
        };

        if !result.success {
            let raw = if map.contains_key("error") && map.contains_key("code") {
                RawFailure::Value(Value::Object(map))
            } else if result.message.is_empty() {
                RawFailure::Message(format!("Command '{}' reported failure", name))
            } else {
                RawFailure::Message(result.message.clone())
            };
            return Err(fail(monitor, translate(raw)));
        }

        let message = Some(result.message.as_str()).filter(|m| !m.is_empty());
        monitor.complete(message);
        info!("Command '{}' succeeded", name);
        Ok(result)
    }

    async fn invalidate_package(&self, package: &str) {
        let (stale_keys, prefixes) = keys::affected_by_package_change(package);
        let mut cache = self.cache.lock().await;
        for key in &stale_keys {
            cache.delete(key);
        }
        for prefix in prefixes {
            cache.invalidate_pattern(prefix);
        }
        debug!("Invalidated cache entries affected by {}", package);
    }
}

/// `--store <id>` when a store is given
fn store_args(store: Option<&str>) -> BridgeResult<Vec<String>> {
    match store {
        Some(store) => {
            validate::store_id(store)?;
            Ok(vec!["--store".to_string(), store.to_string()])
        }
        None => Ok(vec![]),
    }
}

/// Finalize the monitor with an error and hand the error back
fn fail(monitor: &ProgressMonitor, err: BridgeError) -> BridgeError {
    monitor.error(&err.message);
    err
}
