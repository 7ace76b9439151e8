//! Integration tests for aptbridge

mod bridge_tests {
    use aptbridge::bridge::{PackageFilter, PackageTab};
    use aptbridge::error::{ProcessFailure, RawFailure};
    use aptbridge::executor::{ExecOutput, LineSink};
    use aptbridge::{
        Bridge, BridgeCommand, BridgeOptions, CacheManager, CommandExecutor, Elevation, ErrorCode,
        ProgressEvent, ProgressMonitor, QueryOptions,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Script = Box<dyn Fn(&BridgeCommand) -> Result<String, RawFailure> + Send + Sync>;

    /// Executor answering from a closure and recording every invocation
    struct ScriptedExecutor {
        script: Script,
        calls: Mutex<Vec<BridgeCommand>>,
    }

    impl ScriptedExecutor {
        fn new(
            script: impl Fn(&BridgeCommand) -> Result<String, RawFailure> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self, name: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.name == name)
                .count()
        }

        fn last(&self) -> BridgeCommand {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            command: &BridgeCommand,
            on_line: Option<LineSink<'_>>,
        ) -> Result<ExecOutput, RawFailure> {
            self.calls.lock().unwrap().push(command.clone());
            let stdout = (self.script)(command)?;
            if let Some(sink) = on_line {
                for line in stdout.lines() {
                    sink(line);
                }
            }
            Ok(ExecOutput {
                stdout,
                stderr: String::new(),
            })
        }
    }

    fn bridge(executor: &Arc<ScriptedExecutor>) -> Bridge {
        Bridge::new(
            executor.clone(),
            CacheManager::default(),
            BridgeOptions::default(),
        )
    }

    fn recording_monitor() -> (ProgressMonitor, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let monitor = ProgressMonitor::new(move |event| sink.lock().unwrap().push(event.clone()));
        (monitor, events)
    }

    const SEARCH_JSON: &str = r#"[{"name":"nginx","summary":"HTTP server","version":"1.24.0-2","installed":false,"section":"web"}]"#;

    fn lock_failure() -> RawFailure {
        RawFailure::Process(ProcessFailure {
            exit_status: Some(100),
            stderr: "E: Could not get lock /var/lib/dpkg/lock-frontend. It is held by process 4242 (apt)"
                .to_string(),
            ..ProcessFailure::default()
        })
    }

    #[tokio::test]
    async fn search_is_cached_until_bypassed() {
        let executor = ScriptedExecutor::new(|_| Ok(SEARCH_JSON.to_string()));
        let bridge = bridge(&executor);

        let first = bridge.search("nginx", QueryOptions::default()).await.unwrap();
        let second = bridge.search("nginx", QueryOptions::default()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].section, "web");
        assert_eq!(executor.calls("search"), 1);

        bridge.search("nginx", QueryOptions::fresh()).await.unwrap();
        assert_eq!(executor.calls("search"), 2);
    }

    #[tokio::test]
    async fn queries_request_optional_elevation() {
        let executor = ScriptedExecutor::new(|_| Ok(SEARCH_JSON.to_string()));
        let bridge = bridge(&executor);

        bridge.search("nginx", QueryOptions::default()).await.unwrap();
        let call = executor.last();
        assert_eq!(call.args, vec!["nginx"]);
        assert_eq!(call.elevation, Elevation::Optional);
    }

    #[tokio::test]
    async fn disabled_cache_always_executes() {
        let executor = ScriptedExecutor::new(|_| Ok(r#"[{"name":"web","count":3}]"#.to_string()));
        let options = BridgeOptions {
            cache_enabled: false,
            ..BridgeOptions::default()
        };
        let bridge = Bridge::new(executor.clone(), CacheManager::default(), options);

        bridge.sections(QueryOptions::default()).await.unwrap();
        bridge.sections(QueryOptions::default()).await.unwrap();
        assert_eq!(executor.calls("sections"), 2);
        assert_eq!(bridge.cache().await.size(), 0);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_executor() {
        let executor = ScriptedExecutor::new(|_| Ok("[]".to_string()));
        let bridge = bridge(&executor);

        let err = bridge
            .details("Bad Name", QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let err = bridge.search("   ", QueryOptions::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let (monitor, _) = recording_monitor();
        let err = bridge.remove("dpkg", &monitor).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Other("ESSENTIAL_PACKAGE".into()));
        assert_eq!(
            err.details.as_deref(),
            Some("Removing this package may break your system")
        );

        let err = bridge
            .list_packages_by_category("  ", None, QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code.as_str(), "INVALID_CATEGORY");

        let err = bridge
            .list_categories(Some("../etc"), QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_output_is_a_parse_error() {
        let executor = ScriptedExecutor::new(|_| Ok("Reading package lists...".to_string()));
        let bridge = bridge(&executor);

        let err = bridge.sections(QueryOptions::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError);
        assert!(err.details.is_some());
        assert!(!bridge.cache().await.has("sections"));
    }

    #[tokio::test]
    async fn filter_passes_flags_and_parses_result() {
        let executor = ScriptedExecutor::new(|_| {
            Ok(r#"{"packages":[],"total_count":0,"applied_filters":["tab:installed"],"limit":50,"limited":false}"#
                .to_string())
        });
        let bridge = bridge(&executor);

        let filter = PackageFilter {
            tab: Some(PackageTab::Installed),
            limit: 50,
            ..PackageFilter::default()
        };
        let result = bridge
            .filter_packages(&filter, QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(result.applied_filters, vec!["tab:installed"]);
        assert_eq!(executor.last().args, vec!["--tab", "installed", "--limit", "50"]);
    }

    #[tokio::test]
    async fn store_filter_leads_the_filter_flags() {
        let executor = ScriptedExecutor::new(|_| {
            Ok(r#"{"packages":[],"total_count":0,"applied_filters":["store=marine","search=chart"],"limit":1000,"limited":false}"#
                .to_string())
        });
        let bridge = bridge(&executor);

        let filter = PackageFilter {
            store: Some("marine".into()),
            search: Some("chart".into()),
            ..PackageFilter::default()
        };
        let result = bridge
            .filter_packages(&filter, QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(result.applied_filters, vec!["store=marine", "search=chart"]);
        assert_eq!(
            executor.last().args,
            vec!["--store", "marine", "--search", "chart", "--limit", "1000"]
        );
        assert!(bridge
            .cache()
            .await
            .has("filter:--store:marine:--search:chart:--limit:1000"));
    }

    const STORES_JSON: &str = r#"[{
        "id": "marine",
        "name": "Marine Navigation",
        "description": "Navigation and boating",
        "icon": "anchor",
        "banner": null,
        "filters": {
            "include_origins": ["Hat Labs"],
            "include_sections": [],
            "include_tags": ["field::marine"],
            "include_packages": ["signalk-server"]
        },
        "custom_sections": null
    }]"#;

    #[tokio::test]
    async fn store_catalog_queries_are_keyed_by_store() {
        let executor = ScriptedExecutor::new(|command| match command.name.as_str() {
            "list-stores" => Ok(STORES_JSON.to_string()),
            "list-categories" => Ok(
                r#"[{"id":"navigation","label":"Navigation","icon":null,"description":null,"count":3}]"#
                    .to_string(),
            ),
            "list-packages-by-category" => Ok(SEARCH_JSON.to_string()),
            "list-repositories" => Ok("[]".to_string()),
            other => panic!("unexpected command {other}"),
        });
        let bridge = bridge(&executor);

        let stores = bridge.list_stores(QueryOptions::default()).await.unwrap();
        assert_eq!(stores[0].id, "marine");
        assert_eq!(stores[0].filters.include_packages, vec!["signalk-server"]);
        assert!(stores[0].custom_sections.is_none());
        bridge.list_stores(QueryOptions::default()).await.unwrap();
        assert_eq!(executor.calls("list-stores"), 1);

        let categories = bridge
            .list_categories(Some("marine"), QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(categories[0].count, 3);
        assert_eq!(executor.last().args, vec!["--store", "marine"]);
        bridge
            .list_categories(None, QueryOptions::default())
            .await
            .unwrap();
        assert!(executor.last().args.is_empty());
        assert_eq!(executor.calls("list-categories"), 2);

        bridge
            .list_packages_by_category(" navigation ", Some("marine"), QueryOptions::default())
            .await
            .unwrap();
        let command = executor.last();
        assert_eq!(command.args, vec!["navigation", "--store", "marine"]);
        assert_eq!(command.elevation, Elevation::Optional);

        bridge
            .list_repositories(Some("marine"), QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(executor.last().args, vec!["--store", "marine"]);

        let cache = bridge.cache().await;
        assert!(cache.has("stores"));
        assert!(cache.has("categories:marine"));
        assert!(cache.has("categories:"));
        assert!(cache.has("category:navigation:marine"));
        assert!(cache.has("repositories:marine"));
    }

    #[tokio::test]
    async fn structured_stderr_is_translated() {
        let executor = ScriptedExecutor::new(|_| {
            Err(RawFailure::Process(ProcessFailure {
                exit_status: Some(1),
                stderr: r#"{"error":"Package foo not found","code":"PACKAGE_NOT_FOUND","details":"foo"}"#
                    .to_string(),
                ..ProcessFailure::default()
            }))
        });
        let bridge = bridge(&executor);

        let err = bridge.details("foo", QueryOptions::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PackageNotFound);
        assert_eq!(err.message, "Package foo not found");
        assert_eq!(err.details.as_deref(), Some("foo"));
    }

    #[tokio::test]
    async fn install_streams_progress_and_invalidates_cache() {
        let executor = ScriptedExecutor::new(|command| match command.name.as_str() {
            "list-installed" => Ok("[]".to_string()),
            "install" => Ok([
                r#"{"type":"progress","percentage":10,"message":"Downloading tree","package":"tree"}"#,
                "pmstatus:tree:50:Unpacking tree",
                r#"{"type":"result","success":true,"message":"Installed tree","package_name":"tree"}"#,
            ]
            .join("\n")),
            other => panic!("unexpected command {other}"),
        });
        let bridge = bridge(&executor);

        bridge.list_installed(QueryOptions::default()).await.unwrap();
        bridge.list_installed(QueryOptions::default()).await.unwrap();
        assert_eq!(executor.calls("list-installed"), 1);

        let (monitor, events) = recording_monitor();
        let result = bridge.install("tree", &monitor).await.unwrap();
        assert!(result.success);
        assert_eq!(result.package_name.as_deref(), Some("tree"));
        assert_eq!(executor.last().elevation, Elevation::Required);

        let events = events.lock().unwrap();
        let percentages: Vec<f64> = events.iter().map(|e| e.percentage).collect();
        assert_eq!(percentages, vec![10.0, 50.0, 100.0]);
        assert_eq!(events[1].package.as_deref(), Some("tree"));
        assert!(events.last().unwrap().complete);

        bridge.list_installed(QueryOptions::default()).await.unwrap();
        assert_eq!(executor.calls("list-installed"), 2);
    }

    #[tokio::test]
    async fn reported_failure_is_translated() {
        let executor = ScriptedExecutor::new(|_| {
            Ok(r#"{"type":"result","success":false,"error":"Could not get lock","code":"LOCKED"}"#
                .to_string())
        });
        let bridge = bridge(&executor);

        let (monitor, _) = recording_monitor();
        let err = bridge.install("tree", &monitor).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Locked);

        let state = monitor.progress();
        assert_eq!(state.error.as_deref(), Some("Could not get lock"));
        assert!(state.complete);
        assert!(!state.cancelled);
    }

    #[tokio::test]
    async fn missing_result_fails_the_operation() {
        let executor = ScriptedExecutor::new(|_| Ok("pmstatus:tree:50:Unpacking tree".to_string()));
        let bridge = bridge(&executor);

        let (monitor, _) = recording_monitor();
        let err = bridge.install("tree", &monitor).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CommandFailed);
        assert!(err.message.contains("returned no result"));
    }

    #[tokio::test]
    async fn update_accepts_pretty_printed_result_and_clears_cache() {
        let executor = ScriptedExecutor::new(|command| match command.name.as_str() {
            "search" => Ok(SEARCH_JSON.to_string()),
            _ => Ok("{\n  \"success\": true,\n  \"message\": \"Package lists updated\"\n}\n".to_string()),
        });
        let bridge = bridge(&executor);

        bridge.search("nginx", QueryOptions::default()).await.unwrap();
        let (monitor, _) = recording_monitor();
        let result = bridge.update(&monitor).await.unwrap();
        assert_eq!(result.message, "Package lists updated");
        assert_eq!(bridge.cache().await.size(), 0);

        bridge.search("nginx", QueryOptions::default()).await.unwrap();
        assert_eq!(executor.calls("search"), 2);
    }

    #[tokio::test]
    async fn lock_probe_detects_lock_and_bypasses_cache() {
        let executor = ScriptedExecutor::new(|_| Err(lock_failure()));
        let bridge = bridge(&executor);

        assert!(bridge.is_locked().await.unwrap());
        assert!(bridge.is_locked().await.unwrap());
        assert_eq!(executor.calls("sections"), 2);
    }

    #[tokio::test]
    async fn lock_probe_propagates_other_errors() {
        let executor = ScriptedExecutor::new(|_| {
            Err(RawFailure::Process(ProcessFailure {
                exit_status: Some(126),
                stderr: "Error executing command as another user: Not authorized".to_string(),
                ..ProcessFailure::default()
            }))
        });
        let bridge = bridge(&executor);

        assert!(bridge.is_locked().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_unlocked_returns_once_released() {
        let probes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&probes);
        let executor = ScriptedExecutor::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(lock_failure())
            } else {
                Ok("[]".to_string())
            }
        });
        let bridge = bridge(&executor);

        let unlocked = bridge
            .wait_until_unlocked(Duration::from_secs(60))
            .await
            .unwrap();
        assert!(unlocked);
        assert_eq!(probes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_unlocked_gives_up_at_deadline() {
        let executor = ScriptedExecutor::new(|_| Err(lock_failure()));
        let bridge = bridge(&executor);

        let unlocked = bridge
            .wait_until_unlocked_with(Duration::from_secs(5), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(!unlocked);
        // t = 0, 2, 4 and the deadline at 5
        assert_eq!(executor.calls("sections"), 4);
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Command isolated from any user config
    fn aptbridge(dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("aptbridge");
        cmd.env("APTBRIDGE_CONFIG", dir.path().join("config.toml"));
        cmd.env_remove("RUST_LOG");
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        aptbridge(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("drive APT through the bridge tool"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        aptbridge(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("aptbridge"));
    }

    #[test]
    fn config_path_follows_env() {
        let dir = TempDir::new().unwrap();
        aptbridge(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_reads_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[bridge]\nprogram = \"my-bridge\"\n",
        )
        .unwrap();

        aptbridge(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("my-bridge"))
            .stdout(predicate::str::contains("[lock]"));
    }

    #[test]
    fn invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[bridge\n").unwrap();

        aptbridge(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn invalid_package_name_fails() {
        let dir = TempDir::new().unwrap();
        aptbridge(&dir)
            .args(["details", "Bad Name"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("INVALID_INPUT"));
    }

    #[test]
    fn invalid_package_name_json() {
        let dir = TempDir::new().unwrap();
        aptbridge(&dir)
            .args(["details", "Bad Name", "--format", "json"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("\"code\": \"INVALID_INPUT\""));
    }

    #[test]
    fn essential_package_removal_refused() {
        let dir = TempDir::new().unwrap();
        aptbridge(&dir)
            .args(["remove", "--yes", "dpkg"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("ESSENTIAL_PACKAGE"));
    }

    #[test]
    fn missing_bridge_program_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[bridge]\nprogram = \"/nonexistent/aptbridge-test-tool\"\n",
        )
        .unwrap();

        aptbridge(&dir).arg("sections").assert().failure();
    }

    #[cfg(unix)]
    #[test]
    fn sections_through_fake_bridge() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("fake-bridge");
        std::fs::write(
            &tool,
            "#!/bin/sh\ncase \"$1\" in\n  sections) echo '[{\"name\":\"web\",\"count\":12}]' ;;\n  *) echo 'unknown command' >&2; exit 2 ;;\nesac\n",
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            format!("[bridge]\nprogram = \"{}\"\n", tool.display()),
        )
        .unwrap();

        aptbridge(&dir)
            .args(["sections", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"name\": \"web\""))
            .stdout(predicate::str::contains("\"count\": 12"));
    }

    #[cfg(unix)]
    #[test]
    fn list_categories_forwards_store_to_fake_bridge() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("fake-bridge");
        std::fs::write(
            &tool,
            r#"#!/bin/sh
case "$1" in
  list-categories) printf '[{"id":"%s","label":"Navigation","icon":null,"description":null,"count":2}]\n' "$2:$3" ;;
  *) echo 'unknown command' >&2; exit 2 ;;
esac
"#,
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            format!("[bridge]\nprogram = \"{}\"\n", tool.display()),
        )
        .unwrap();

        aptbridge(&dir)
            .args(["list-categories", "--store", "marine", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--store:marine"));
    }
}
