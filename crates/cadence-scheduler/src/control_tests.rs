    use super::*;
    use crate::clock::{Clock, ManualClock};
    use async_trait::async_trait;
    use cadence_config::SchedulerConfig;
    use cadence_core::JobClassRegistry;
    use cadence_protocols::{
        ConcurrencyPolicy, Job, JobExecutionContext, JobExecutionError, JobFactory,
    };
    use chrono::TimeZone;
    use std::sync::Arc;

    struct NoopJob;

    #[async_trait]
    impl Job for NoopJob {
        async fn execute(&self, _ctx: &JobExecutionContext) -> Result<(), JobExecutionError> {
            Ok(())
        }
    }

    struct NoopFactory {
        info: JobClassInfo,
        policy: ConcurrencyPolicy,
    }

    impl JobFactory for NoopFactory {
        fn class_info(&self) -> &JobClassInfo {
            &self.info
        }

        fn concurrency_policy(&self) -> ConcurrencyPolicy {
            self.policy
        }

        fn description(&self) -> Option<String> {
            Some(format!("{} job", self.info.name))
        }

        fn create(&self) -> Arc<dyn Job> {
            Arc::new(NoopJob)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    async fn scheduler() -> (Arc<Scheduler>, Arc<ManualClock>) {
        let registry = Arc::new(JobClassRegistry::new());
        registry
            .register(Arc::new(NoopFactory {
                info: JobClassInfo::new("Heartbeat", "tests::Heartbeat"),
                policy: ConcurrencyPolicy::AllowConcurrent,
            }))
            .unwrap();
        registry
            .register(Arc::new(NoopFactory {
                info: JobClassInfo::new("Exclusive", "tests::Exclusive"),
                policy: ConcurrencyPolicy::DisallowConcurrent,
            }))
            .unwrap();

        let clock = Arc::new(ManualClock::new(t0()));
        let scheduler = Scheduler::builder(SchedulerConfig::default(), registry)
            .clock(clock.clone())
            .build()
            .await
            .unwrap();
        (scheduler, clock)
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let (scheduler, _clock) = scheduler().await;
        let ack = scheduler
            .create_job("heartbeat", "tests::Heartbeat", 5)
            .await
            .unwrap();
        assert_eq!(ack.message, "Job heartbeat created successfully");

        let rows = scheduler
            .get_job_with_trigger_info("heartbeat", DEFAULT_GROUP)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.job_key, "heartbeat");
        assert_eq!(row.group, "DEFAULT");
        assert_eq!(row.trigger_key, "heartbeat-trigger");
        assert_eq!(row.trigger_group, "DEFAULT");
        assert_eq!(row.repeat_interval, Some(Duration::from_secs(5)));
        assert!(row.cron_expression.is_none());
        assert_eq!(row.trigger_state, TriggerState::Waiting);
        assert_eq!(row.start_at, t0() + TimeDelta::seconds(5));
        assert_eq!(row.next_fire_time, Some(t0() + TimeDelta::seconds(5)));
        assert!(row.previous_fire_time.is_none());
        assert!(row.end_at.is_none());
        assert_eq!(row.description.as_deref(), Some("Heartbeat job"));
    }

    #[tokio::test]
    async fn test_create_conflict_leaves_store_unchanged() {
        let (scheduler, _clock) = scheduler().await;
        scheduler
            .create_job("heartbeat", "tests::Heartbeat", 5)
            .await
            .unwrap();
        let before = scheduler.list_jobs_with_trigger_info().await;

        let err = scheduler
            .create_job("heartbeat", "tests::Exclusive", 60)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Conflict(ref m) if m == "Job already exists"));
        assert_eq!(scheduler.list_jobs_with_trigger_info().await, before);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (scheduler, _clock) = scheduler().await;

        let err = scheduler
            .create_job("a", "tests::Missing", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(ref m) if m == "Invalid job class"));

        for interval in [0, -5] {
            let err = scheduler
                .create_job("a", "tests::Heartbeat", interval)
                .await
                .unwrap_err();
            assert!(matches!(err, SchedulerError::Validation(_)));
        }

        for interval in [i64::MAX, i64::MAX / 1_000] {
            let err = scheduler
                .create_job("a", "tests::Heartbeat", interval)
                .await
                .unwrap_err();
            assert!(
                matches!(err, SchedulerError::Validation(ref m) if m == "Interval is too large")
            );
        }

        let err = scheduler
            .create_job("", "tests::Heartbeat", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(_)));

        let err = scheduler
            .create_cron_job("a", "tests::Heartbeat", "61 * * * * *")
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(_)));

        assert!(scheduler.list_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_cron_job() {
        let (scheduler, _clock) = scheduler().await;
        scheduler
            .create_cron_job("nightly", "tests::Heartbeat", "0 0 2 * * *")
            .await
            .unwrap();

        let rows = scheduler
            .get_job_with_trigger_info("nightly", DEFAULT_GROUP)
            .await
            .unwrap();
        assert_eq!(rows[0].cron_expression.as_deref(), Some("0 0 2 * * *"));
        assert!(rows[0].repeat_interval.is_none());
        assert_eq!(
            rows[0].next_fire_time,
            Some(Utc.with_ymd_and_hms(2024, 6, 2, 2, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_schedule_job_in_group() {
        let (scheduler, _clock) = scheduler().await;
        let job = JobSpec::new(JobKey::new("rollup", "reports"), "tests::Exclusive")
            .with_description("Hourly rollup");
        let trigger = TriggerSpec::new(
            TriggerKey::new("rollup-hourly", "reports"),
            ScheduleVariant::Simple {
                interval: Duration::from_secs(3600),
                repeat: RepeatCount::Count(23),
            },
        )
        .starting_at(t0())
        .ending_at(t0() + TimeDelta::days(1));

        let ack = scheduler.schedule_job(job, trigger).await.unwrap();
        assert_eq!(ack.message, "Job rollup created successfully");

        let job = scheduler
            .store()
            .job(&JobKey::new("rollup", "reports"))
            .await
            .unwrap();
        assert_eq!(job.concurrency, ConcurrencyPolicy::DisallowConcurrent);
        assert_eq!(job.description.as_deref(), Some("Hourly rollup"));

        assert!(matches!(
            scheduler.get_job_with_trigger_info("rollup", DEFAULT_GROUP).await,
            Err(SchedulerError::NotFound(_))
        ));
        let rows = scheduler
            .get_job_with_trigger_info("rollup", "reports")
            .await
            .unwrap();
        assert_eq!(rows[0].end_at, Some(t0() + TimeDelta::days(1)));
        assert_eq!(
            scheduler
                .get_trigger_state("rollup-hourly", "reports")
                .await
                .unwrap(),
            TriggerState::Waiting
        );
    }

    #[tokio::test]
    async fn test_list_jobs() {
        let (scheduler, _clock) = scheduler().await;
        scheduler.create_job("b", "tests::Heartbeat", 5).await.unwrap();
        scheduler.create_job("a", "tests::Heartbeat", 5).await.unwrap();

        let jobs = scheduler.list_jobs().await;
        assert_eq!(
            jobs,
            vec![
                JobSummary {
                    name: "a".to_string(),
                    group: "DEFAULT".to_string()
                },
                JobSummary {
                    name: "b".to_string(),
                    group: "DEFAULT".to_string()
                },
            ]
        );

        let rows = scheduler.list_jobs_with_trigger_info().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].trigger_key, "a-trigger");
        assert!(scheduler.job_exists("a").await);
        assert!(!scheduler.job_exists("c").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_get_racing_delete_is_found_or_not_found() {
        let (scheduler, _clock) = scheduler().await;

        for _ in 0..200 {
            scheduler.create_job("racy", "tests::Heartbeat", 5).await.unwrap();
            let reader = {
                let scheduler = scheduler.clone();
                tokio::spawn(async move {
                    scheduler
                        .get_job_with_trigger_info("racy", DEFAULT_GROUP)
                        .await
                })
            };
            scheduler.delete_job("racy").await.unwrap();

            match reader.await.unwrap() {
                Ok(rows) => assert_eq!(rows.len(), 1),
                Err(e) => assert!(matches!(e, SchedulerError::NotFound(_))),
            }
        }
    }

    #[tokio::test]
    async fn test_delete_pause_resume_messages() {
        let (scheduler, _clock) = scheduler().await;
        scheduler.create_job("a", "tests::Heartbeat", 5).await.unwrap();

        assert_eq!(
            scheduler.pause_job("a").await.unwrap().message,
            "Job a paused successfully"
        );
        assert_eq!(
            scheduler.get_trigger_state("a-trigger", DEFAULT_GROUP).await.unwrap(),
            TriggerState::Paused
        );
        assert_eq!(
            scheduler.resume_job("a").await.unwrap().message,
            "Job a resumed successfully"
        );
        assert_eq!(
            scheduler.delete_job("a").await.unwrap().message,
            "Job a deleted successfully"
        );

        for result in [
            scheduler.delete_job("a").await,
            scheduler.pause_job("a").await,
            scheduler.resume_job("a").await,
        ] {
            assert!(matches!(result, Err(SchedulerError::NotFound(ref m)) if m == "Job not found"));
        }
        assert!(matches!(
            scheduler.get_trigger_state("a-trigger", DEFAULT_GROUP).await,
            Err(SchedulerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resume_after_long_pause_is_due_now() {
        let (scheduler, clock) = scheduler().await;
        scheduler.create_job("a", "tests::Heartbeat", 5).await.unwrap();
        scheduler.pause_job("a").await.unwrap();

        clock.advance(TimeDelta::hours(3));
        scheduler.resume_job("a").await.unwrap();

        let rows = scheduler
            .get_job_with_trigger_info("a", DEFAULT_GROUP)
            .await
            .unwrap();
        assert_eq!(rows[0].next_fire_time, Some(clock.now()));
        assert_eq!(scheduler.metrics().misfired, 1);
    }

    #[tokio::test]
    async fn test_list_available_job_classes() {
        let (scheduler, _clock) = scheduler().await;
        let classes = scheduler.list_available_job_classes();
        assert_eq!(
            classes,
            vec![
                JobClassInfo::new("Exclusive", "tests::Exclusive"),
                JobClassInfo::new("Heartbeat", "tests::Heartbeat"),
            ]
        );
    }

    #[tokio::test]
    async fn test_mutations_rejected_after_shutdown() {
        let (scheduler, _clock) = scheduler().await;
        scheduler.create_job("a", "tests::Heartbeat", 5).await.unwrap();
        scheduler.shutdown(false).await.unwrap();

        assert!(matches!(
            scheduler.create_job("b", "tests::Heartbeat", 5).await,
            Err(SchedulerError::Shutdown)
        ));
        assert!(matches!(scheduler.pause_job("a").await, Err(SchedulerError::Shutdown)));
        assert!(matches!(scheduler.delete_job("a").await, Err(SchedulerError::Shutdown)));

        // Reads keep working.
        assert_eq!(scheduler.list_jobs().await.len(), 1);
    }
