//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Contract snapshots (line formats, config defaults)
//! - Full batches over a file-backed session store
//! - Concurrency and deadline behavior on the mock gateway

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AdmissionPolicy, BatchReport, ReportLine};
    use std::time::Duration;

    #[test]
    fn test_report_line_snapshot() {
        let lines = [
            ReportLine::Progress(100),
            ReportLine::Failure("conv-9".into()),
            ReportLine::Summary(BatchReport {
                succeeded: 5,
                failed: 3,
                elapsed: Duration::from_millis(1_500),
                ..Default::default()
            }),
            ReportLine::Usage("missing text param".into()),
        ];
        let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();

        assert_eq!(
            rendered,
            vec![
                "100",
                "Failed for destination: conv-9",
                "Processed: 5/3 convs in 1sec",
                "missing text param",
            ]
        );
    }

    #[test]
    fn test_config_defaults_snapshot() {
        let config = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();

        assert_eq!(config.dispatch.concurrency, 20);
        assert_eq!(config.dispatch.deadline(), Duration::from_secs(5 * 60 * 60));
        assert_eq!(config.dispatch.progress_every, 100);
        assert_eq!(config.dispatch.admission, AdmissionPolicy::Queue);
        assert!(config.store.dirs_only);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BatchRequest, DestinationId, ReportLine};
    use dispatcher::{
        BatchCoordinator, BroadcastTask, CoordinatorConfig, DirectorySource, MemoryReporter,
        StaticSource, TaskParams,
    };
    use gateway::{FileGateway, MockConfig, MockGateway, Session, OUTBOX_FILE};
    use tempfile::tempdir;

    async fn register(gateway: &FileGateway, id: &str, recipients: &[&str]) {
        let session = Session {
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
        };
        gateway.register(&id.into(), &session).await.unwrap();
    }

    fn file_coordinator(root: &Path) -> BatchCoordinator<DirectorySource, FileGateway> {
        BatchCoordinator::new(
            Arc::new(DirectorySource::new(root)),
            Arc::new(FileGateway::new(root)),
            CoordinatorConfig::default(),
        )
    }

    /// 250 live sessions, bound 20: every destination gets exactly one entry
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_file_store_full_batch() {
        let store = tempdir().unwrap();
        let gateway = FileGateway::new(store.path());
        for i in 0..250 {
            register(&gateway, &format!("conv-{i:03}"), &["alice"]).await;
        }

        let coordinator = file_coordinator(store.path());
        let reporter = Arc::new(MemoryReporter::new());
        let report = coordinator
            .run(
                &BatchRequest::new("maintenance tonight").with_concurrency(20),
                reporter.clone(),
            )
            .await
            .unwrap();

        assert_eq!((report.succeeded, report.failed), (250, 0));
        assert_eq!(report.submitted, 250);
        assert_eq!(reporter.progress(), vec![100, 200]);

        let rendered = reporter.rendered();
        assert_eq!(rendered.len(), 3);
        assert!(rendered[2].starts_with("Processed: 250/0 convs in "));

        for i in [0, 124, 249] {
            let outbox = gateway
                .read_outbox(&format!("conv-{i:03}").into())
                .await
                .unwrap();
            assert_eq!(outbox.len(), 1);
            assert_eq!(outbox[0].payload, "maintenance tonight");
            assert_eq!(outbox[0].recipients, 1);
        }
    }

    /// 10 destinations: 5 deliver, 3 fail delivery, 2 have no session
    #[tokio::test]
    async fn test_e2e_mixed_store() {
        let store = tempdir().unwrap();
        let gateway = FileGateway::new(store.path());

        for id in ["ok-1", "ok-2", "ok-3", "ok-4", "ok-5"] {
            register(&gateway, id, &["bob"]).await;
        }
        for id in ["jam-1", "jam-2", "jam-3"] {
            register(&gateway, id, &["bob"]).await;
            // an outbox that is a directory cannot be appended to
            std::fs::create_dir(store.path().join(id).join(OUTBOX_FILE)).unwrap();
        }
        for id in ["gone-1", "gone-2"] {
            std::fs::create_dir(store.path().join(id)).unwrap();
        }

        let coordinator = file_coordinator(store.path());
        let reporter = Arc::new(MemoryReporter::new());
        let report = coordinator
            .run(&BatchRequest::new("hello").with_concurrency(3), reporter.clone())
            .await
            .unwrap();

        assert_eq!((report.succeeded, report.failed), (5, 3));
        assert_eq!(report.submitted, 8);
        assert_eq!(report.succeeded + report.failed, report.submitted - report.skipped);

        let mut failures = reporter.failures();
        failures.sort();
        assert_eq!(
            failures,
            vec![
                DestinationId::from("jam-1"),
                DestinationId::from("jam-2"),
                DestinationId::from("jam-3"),
            ]
        );
        assert!(matches!(reporter.lines().last(), Some(ReportLine::Summary(_))));
    }

    /// Sessions without recipients are skipped silently
    #[tokio::test]
    async fn test_e2e_empty_recipients_skipped() {
        let store = tempdir().unwrap();
        let gateway = FileGateway::new(store.path());
        register(&gateway, "quiet", &[]).await;
        register(&gateway, "loud", &["carol", "dave"]).await;

        let reporter = Arc::new(MemoryReporter::new());
        let report = file_coordinator(store.path())
            .run(&BatchRequest::new("ping"), reporter.clone())
            .await
            .unwrap();

        assert_eq!((report.succeeded, report.failed, report.skipped), (1, 0, 1));
        assert!(reporter.failures().is_empty());
        assert!(gateway.read_outbox(&"quiet".into()).await.unwrap().is_empty());
        assert_eq!(gateway.read_outbox(&"loud".into()).await.unwrap()[0].recipients, 2);
    }

    /// Configuration flows through the task surface into the batch
    #[tokio::test]
    async fn test_e2e_broadcast_task_from_config() {
        let store = tempdir().unwrap();
        let gateway = FileGateway::new(store.path());
        for i in 0..7 {
            register(&gateway, &format!("conv-{i}"), &["erin"]).await;
        }

        let toml = format!(
            "[store]\npath = {:?}\n\n[dispatch]\nconcurrency = 2\nprogress_every = 3\n",
            store.path().display().to_string()
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let coordinator = Arc::new(BatchCoordinator::new(
            Arc::new(DirectorySource::new(&config.store.path)),
            Arc::new(FileGateway::new(&config.store.path)),
            CoordinatorConfig::from(&config.dispatch),
        ));
        let task = BroadcastTask::new(
            coordinator,
            config.dispatch.concurrency,
            config.dispatch.deadline(),
        );

        let reporter = Arc::new(MemoryReporter::new());
        let params = TaskParams::from_pairs([("text", "from config"), ("th", "4")]);
        let report = task.execute(&params, reporter.clone()).await.unwrap();

        assert_eq!(report.succeeded, 7);
        assert_eq!(reporter.progress(), vec![3, 6]);
    }

    /// Never more units in flight than the bound
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_concurrency_bound_under_load() {
        let gateway = Arc::new(MockGateway::with_config(
            MockConfig::default().with_latency(Duration::from_millis(5)),
        ));
        let coordinator = BatchCoordinator::new(
            Arc::new(StaticSource::numbered("conv", 250)),
            gateway.clone(),
            CoordinatorConfig::default(),
        );

        let report = coordinator
            .run(
                &BatchRequest::new("hi").with_concurrency(20),
                Arc::new(MemoryReporter::new()),
            )
            .await
            .unwrap();

        assert_eq!(report.succeeded, 250);
        assert!(gateway.peak_in_flight() <= 20, "peak {}", gateway.peak_in_flight());
    }

    /// A deadline-cut batch leaves nothing behind for the next one
    #[tokio::test]
    async fn test_e2e_no_carry_over_after_deadline() {
        let gateway = Arc::new(MockGateway::with_config(
            MockConfig::default()
                .with_hang(["stuck"])
                .with_fail_delivery(["bad"]),
        ));
        let coordinator = BatchCoordinator::new(
            Arc::new(StaticSource::new(["ok", "bad", "stuck"])),
            gateway.clone(),
            CoordinatorConfig::default(),
        );
        let reporter = Arc::new(MemoryReporter::new());

        let first = coordinator
            .run(
                &BatchRequest::new("hi").with_deadline(Duration::from_millis(150)),
                reporter.clone(),
            )
            .await
            .unwrap();
        assert!(first.deadline_expired);
        assert_eq!((first.succeeded, first.failed), (1, 1));
        assert_eq!(gateway.in_flight(), 0);

        let second = coordinator
            .run(
                &BatchRequest::new("hi").with_deadline(Duration::from_millis(150)),
                reporter.clone(),
            )
            .await
            .unwrap();
        assert_eq!((second.succeeded, second.failed), (1, 1));
        assert_eq!(reporter.summaries().len(), 2);
    }
}
