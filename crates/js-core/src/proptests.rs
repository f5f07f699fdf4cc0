//! Property-based tests for timeline and effort invariants
//!
//! These tests use `proptest` to check the builder and estimator against
//! randomly generated histories and windows.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use crate::effort::{DEFAULT_DEV_STATE, EffortEstimator, ReportWindow};
use crate::timeline::{StateInterval, TransitionEvent, build_intervals};
use crate::timestamp::END_OF_TIME;

/// Monday 2018-01-01 00:00 UTC.
fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0)
        .single()
        .expect("valid base timestamp")
}

/// The `day`-th weekday after `base()`, `minute` minutes past midnight.
fn weekday_at(day: i64, minute: i64) -> DateTime<Utc> {
    base() + Duration::days(day / 5 * 7 + day % 5) + Duration::minutes(minute)
}

fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..200 * 24 * 60).prop_map(|minutes| base() + Duration::minutes(minutes))
}

fn state_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("To Do"),
        Just(DEFAULT_DEV_STATE),
        Just("In Review"),
        Just("Done"),
    ]
    .prop_map(str::to_string)
}

fn event_strategy() -> impl Strategy<Value = TransitionEvent> {
    (
        state_strategy(),
        state_strategy(),
        1i64..100_000,
        proptest::option::of("[a-z]{3,8}"),
    )
        .prop_map(|(from_state, to_state, minutes, author)| TransitionEvent {
            from_state,
            to_state,
            timestamp: base() + Duration::minutes(minutes),
            author,
        })
}

fn dev_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> StateInterval {
    StateInterval {
        start,
        end,
        state: DEFAULT_DEV_STATE.to_string(),
        author: None,
    }
}

// Property 1: intervals are contiguous and cover [create_time, END_OF_TIME)
proptest! {
    #[test]
    fn prop_intervals_cover_creation_to_end_of_time(
        events in prop::collection::vec(event_strategy(), 0..20),
        current in state_strategy()
    ) {
        let intervals = build_intervals(base(), &current, &events);

        prop_assert_eq!(intervals.len(), events.len() + 1);
        prop_assert_eq!(intervals[0].start, base());
        for pair in intervals.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
            prop_assert!(pair[0].start <= pair[0].end);
        }

        let last = intervals.last().unwrap();
        prop_assert_eq!(last.end, *END_OF_TIME);
        prop_assert_eq!(&last.state, &current);
    }
}

// Property 2: rebuilding from already sorted events changes nothing
proptest! {
    #[test]
    fn prop_rebuild_from_sorted_events_is_identical(
        events in prop::collection::vec(event_strategy(), 0..20)
    ) {
        let intervals = build_intervals(base(), "Done", &events);

        let mut sorted = events.clone();
        sorted.sort_by_key(|event| event.timestamp);

        prop_assert_eq!(build_intervals(base(), "Done", &sorted), intervals);
    }
}

// Property 3: with distinct timestamps the input order is irrelevant
proptest! {
    #[test]
    fn prop_input_order_does_not_matter(
        (events, shuffled) in prop::collection::vec(event_strategy(), 0..12)
            .prop_flat_map(|events| (Just(events.clone()), Just(events).prop_shuffle()))
    ) {
        let distinct: HashSet<_> = events.iter().map(|event| event.timestamp).collect();
        prop_assume!(distinct.len() == events.len());

        prop_assert_eq!(
            build_intervals(base(), "Done", &events),
            build_intervals(base(), "Done", &shuffled)
        );
    }
}

// Property 4: widening the window never lowers the estimate.
// Spans start before noon and end after noon on weekdays; outside that
// shape the half-day rules may legitimately count a shorter span higher.
proptest! {
    #[test]
    fn prop_widening_window_never_decreases_effort(
        (dev_day, dev_len, dev_start_min, dev_end_min) in (0i64..120, 0i64..20, 0i64..720, 720i64..1440),
        (win_day, win_len, w1_min, w2_min) in (20i64..100, 0i64..20, 0i64..720, 720i64..1440),
        (lead, lead_min) in (1i64..20, 0i64..720),
        (trail, trail_min) in (1i64..20, 720i64..1440)
    ) {
        let a = weekday_at(dev_day, dev_start_min);
        let b = weekday_at(dev_day + dev_len, dev_end_min);
        let w1 = weekday_at(win_day, w1_min);
        let w2 = weekday_at(win_day + win_len, w2_min);
        let w0 = weekday_at(win_day - lead, lead_min);
        let w3 = weekday_at(win_day + win_len + trail, trail_min);
        let points = [a, b, w0, w1, w2, w3];
        let distinct: HashSet<_> = points.iter().collect();
        prop_assume!(distinct.len() == points.len());

        let estimator = EffortEstimator::default();
        let interval = dev_interval(a, b);
        let now = w3 + Duration::days(1);
        let narrow = ReportWindow::new(w1, w2).unwrap();
        let wide = ReportWindow::new(w0, w3).unwrap();

        prop_assert!(
            estimator.interval_hours(&interval, &wide, now)
                >= estimator.interval_hours(&interval, &narrow, now)
        );
    }
}

// Property 5: development entirely outside the window counts nothing
proptest! {
    #[test]
    fn prop_dev_interval_outside_window_counts_nothing(
        window_start in instant_strategy(),
        window_len in 0i64..50_000,
        gap in 1i64..50_000,
        span in 0i64..50_000,
        before in any::<bool>()
    ) {
        let window_end = window_start + Duration::minutes(window_len);
        let window = ReportWindow::new(window_start, window_end).unwrap();
        let interval = if before {
            let end = window_start - Duration::minutes(gap);
            dev_interval(end - Duration::minutes(span), end)
        } else {
            let start = window_end + Duration::minutes(gap);
            dev_interval(start, start + Duration::minutes(span))
        };

        let hours = EffortEstimator::default().interval_hours(&interval, &window, *END_OF_TIME);
        prop_assert_eq!(hours, 0);
    }
}

// Property 6: once now passes the window end it stops mattering
proptest! {
    #[test]
    fn prop_now_after_window_end_has_no_effect(
        start in instant_strategy(),
        span in 0i64..50_000,
        window_start in instant_strategy(),
        window_len in 0i64..50_000,
        extra_a in 0i64..100_000,
        extra_b in 0i64..100_000
    ) {
        let interval = dev_interval(start, start + Duration::minutes(span));
        let window_end = window_start + Duration::minutes(window_len);
        let window = ReportWindow::new(window_start, window_end).unwrap();
        let estimator = EffortEstimator::default();

        prop_assert_eq!(
            estimator.interval_hours(&interval, &window, window_end + Duration::minutes(extra_a)),
            estimator.interval_hours(&interval, &window, window_end + Duration::minutes(extra_b))
        );
    }
}

// Property 7: an interval that has not started yet counts nothing
proptest! {
    #[test]
    fn prop_now_before_interval_start_counts_nothing(
        start in instant_strategy(),
        span in 0i64..50_000,
        window_start in instant_strategy(),
        window_len in 0i64..50_000,
        lead in 1i64..50_000
    ) {
        let interval = dev_interval(start, start + Duration::minutes(span));
        let window = ReportWindow::new(
            window_start,
            window_start + Duration::minutes(window_len),
        )
        .unwrap();
        let now = start - Duration::minutes(lead);

        prop_assert_eq!(
            EffortEstimator::default().interval_hours(&interval, &window, now),
            0
        );
    }
}
