    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn simple(interval_secs: u64, repeat: RepeatCount) -> Trigger {
        Trigger::new(
            TriggerKey::named("t"),
            JobKey::named("j"),
            ScheduleVariant::Simple {
                interval: Duration::from_secs(interval_secs),
                repeat,
            },
            t0(),
        )
    }

    fn cron(expression: &str, start: DateTime<Utc>) -> Trigger {
        Trigger::new(
            TriggerKey::named("t"),
            JobKey::named("j"),
            ScheduleVariant::cron(expression),
            start,
        )
    }

    #[test]
    fn test_simple_first_fire_is_start_time() {
        let trigger = simple(10, RepeatCount::Forever);
        assert_eq!(trigger.first_fire_time(), Some(t0()));
    }

    #[test]
    fn test_simple_progression() {
        let mut trigger = simple(10, RepeatCount::Forever);
        trigger.next_fire_time = trigger.first_fire_time();

        for i in 0..3 {
            let fire = trigger.next_fire_time.unwrap();
            assert_eq!(fire, t0() + TimeDelta::seconds(10 * i));
            trigger.triggered(fire);
            assert_eq!(trigger.previous_fire_time, Some(fire));
            assert!(trigger.next_fire_time.unwrap() > fire);
        }
        assert_eq!(trigger.times_triggered, 3);
        assert_eq!(trigger.next_fire_time, Some(t0() + TimeDelta::seconds(30)));
    }

    #[test]
    fn test_simple_repeat_count_exhausts() {
        let mut trigger = simple(5, RepeatCount::Count(2));
        trigger.next_fire_time = trigger.first_fire_time();

        let mut fires = Vec::new();
        while let Some(fire) = trigger.next_fire_time {
            fires.push(fire);
            trigger.triggered(fire);
        }

        assert_eq!(
            fires,
            vec![
                t0(),
                t0() + TimeDelta::seconds(5),
                t0() + TimeDelta::seconds(10)
            ]
        );
        assert_eq!(trigger.times_triggered, 3);
        assert_eq!(trigger.previous_fire_time, Some(t0() + TimeDelta::seconds(10)));
    }

    #[test]
    fn test_simple_count_zero_fires_once() {
        let mut trigger = simple(5, RepeatCount::Count(0));
        trigger.triggered(t0());
        assert!(trigger.next_fire_time.is_none());
    }

    #[test]
    fn test_end_time_stops_schedule() {
        let mut trigger =
            simple(10, RepeatCount::Forever).with_end_time(Some(t0() + TimeDelta::seconds(15)));
        trigger.triggered(t0());
        assert_eq!(trigger.next_fire_time, Some(t0() + TimeDelta::seconds(10)));
        trigger.triggered(t0() + TimeDelta::seconds(10));
        assert!(trigger.next_fire_time.is_none());
    }

    #[test]
    fn test_first_fire_none_when_start_after_end() {
        let trigger = cron("0 0 0 1 1 *", t0() + TimeDelta::seconds(1))
            .with_end_time(Some(t0() + TimeDelta::days(30)));
        assert!(trigger.first_fire_time().is_none());
    }

    #[test]
    fn test_cron_first_fire_at_or_after_start() {
        let trigger = cron("0 * * * * *", t0());
        assert_eq!(trigger.first_fire_time(), Some(t0()));

        let trigger = cron("0 * * * * *", t0() + TimeDelta::milliseconds(500));
        assert_eq!(trigger.first_fire_time(), Some(t0() + TimeDelta::minutes(1)));
    }

    #[test]
    fn test_cron_fire_time_after_is_strict() {
        let trigger = cron("0 */5 * * * *", t0());
        assert_eq!(
            trigger.fire_time_after(t0()),
            Some(t0() + TimeDelta::minutes(5))
        );
        assert_eq!(
            trigger.fire_time_after(t0() + TimeDelta::minutes(7)),
            Some(t0() + TimeDelta::minutes(10))
        );
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let trigger = simple(0, RepeatCount::Forever);
        assert!(matches!(
            trigger.validate(),
            Err(SchedulerError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_cron() {
        let trigger = cron("every tuesday", t0());
        let err = trigger.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid cron expression"));
    }

    #[test]
    fn test_validate_rejects_end_before_start() {
        let trigger =
            simple(1, RepeatCount::Forever).with_end_time(Some(t0() - TimeDelta::seconds(1)));
        assert!(trigger.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_key() {
        let mut trigger = simple(1, RepeatCount::Forever);
        trigger.key = TriggerKey::named("");
        assert!(trigger.validate().is_err());
    }

    #[test]
    fn test_misfire_detection() {
        let mut trigger = simple(10, RepeatCount::Forever);
        trigger.next_fire_time = Some(t0());
        let threshold = Duration::from_secs(60);

        assert!(!trigger.is_misfired(t0() + TimeDelta::seconds(60), threshold));
        assert!(trigger.is_misfired(t0() + TimeDelta::seconds(61), threshold));
    }

    #[test]
    fn test_misfire_fire_once_now() {
        let mut trigger = simple(10, RepeatCount::Forever);
        trigger.triggered(t0());
        let now = t0() + TimeDelta::hours(1) + TimeDelta::seconds(3);

        trigger.apply_misfire(now, MisfirePolicy::FireOnceNow);
        assert_eq!(trigger.next_fire_time, Some(now));

        // The schedule continues from the catch-up fire, with no backlog.
        trigger.triggered(now);
        assert_eq!(trigger.next_fire_time, Some(now + TimeDelta::seconds(10)));
        assert_eq!(trigger.times_triggered, 2);
    }

    #[test]
    fn test_misfire_reschedule_next_stays_on_grid() {
        let mut trigger = simple(10, RepeatCount::Forever);
        trigger.triggered(t0());
        let now = t0() + TimeDelta::hours(1) + TimeDelta::seconds(3);

        trigger.apply_misfire(now, MisfirePolicy::RescheduleNext);
        assert_eq!(
            trigger.next_fire_time,
            Some(t0() + TimeDelta::hours(1) + TimeDelta::seconds(10))
        );
        assert_eq!(trigger.times_triggered, 1);
        assert_eq!(trigger.state, TriggerState::Waiting);
    }

    #[test]
    fn test_misfire_past_end_completes() {
        let mut trigger =
            simple(10, RepeatCount::Forever).with_end_time(Some(t0() + TimeDelta::minutes(1)));
        trigger.triggered(t0());

        trigger.apply_misfire(t0() + TimeDelta::hours(1), MisfirePolicy::RescheduleNext);
        assert!(trigger.next_fire_time.is_none());
        assert_eq!(trigger.state, TriggerState::Complete);
    }

    #[test]
    fn test_fireable_states() {
        assert!(TriggerState::Waiting.is_fireable());
        assert!(TriggerState::Error.is_fireable());
        assert!(!TriggerState::Paused.is_fireable());
        assert!(!TriggerState::Blocked.is_fireable());
        assert!(!TriggerState::Acquired.is_fireable());
        assert!(!TriggerState::Complete.is_fireable());
    }

    #[test]
    fn test_schedule_accessors() {
        let every = ScheduleVariant::every(Duration::from_secs(5));
        assert_eq!(every.repeat_interval(), Some(Duration::from_secs(5)));
        assert!(every.cron_expression().is_none());

        let cron = ScheduleVariant::cron("0 * * * * *");
        assert!(cron.repeat_interval().is_none());
        assert_eq!(cron.cron_expression(), Some("0 * * * * *"));
    }

    #[test]
    fn test_trigger_serialization() {
        let mut trigger = simple(10, RepeatCount::Count(3));
        trigger.triggered(t0());
        let json = serde_json::to_string(&trigger).unwrap();
        assert!(json.contains("\"type\":\"simple\""));
        let parsed: Trigger = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, trigger);
    }
