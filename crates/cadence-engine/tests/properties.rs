//! Property tests over random series, windows, and edit sequences.

use cadence_engine::{
    delete_single_occurrence, expand, expand_instances, move_series, move_single_occurrence,
    update_single_occurrence, validate, Adjustments, EvaluationContext, MasterEntry, Recurrence,
    RecurrenceEnd, Slot, Window,
};
use chrono::{Datelike, Days, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

const RECURRING: [Recurrence; 7] = [
    Recurrence::Weekly,
    Recurrence::Biweekly,
    Recurrence::Monthly,
    Recurrence::Bimonthly,
    Recurrence::Quarterly,
    Recurrence::Semiannual,
    Recurrence::Annual,
];

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn offset(days: u64) -> NaiveDate {
    base_date() + Days::new(days)
}

fn ctx() -> EvaluationContext {
    EvaluationContext::from_iana(
        Utc.with_ymd_and_hms(2024, 6, 15, 3, 0, 0).unwrap(),
        "America/Los_Angeles",
    )
    .unwrap()
}

fn series(anchor: NaiveDate, recurrence: Recurrence, auto_pay: bool) -> MasterEntry {
    MasterEntry {
        recurrence,
        is_auto_pay: auto_pay,
        ..MasterEntry::new("p", "Payment", Decimal::new(4200, 2), anchor)
    }
}

/// Reference expansion by plain stepping from the anchor.
fn naive_expand(master: &MasterEntry, window: Window) -> Vec<NaiveDate> {
    let anchor = master.anchor_date;
    let mut out = Vec::new();
    let mut k: u32 = 0;
    loop {
        let date = match master.recurrence {
            Recurrence::Weekly => anchor + Days::new(u64::from(k) * 7),
            Recurrence::Biweekly => anchor + Days::new(u64::from(k) * 14),
            other => {
                let step = match other {
                    Recurrence::Monthly => 1,
                    Recurrence::Bimonthly => 2,
                    Recurrence::Quarterly => 3,
                    Recurrence::Semiannual => 6,
                    _ => 12,
                };
                clamped_month(anchor, k * step)
            }
        };
        if date > window.end {
            break;
        }
        if let RecurrenceEnd::AfterCount { count } = master.recurrence_end {
            if k >= count {
                break;
            }
        }
        if let RecurrenceEnd::OnDate { date: until } = master.recurrence_end {
            if date > until {
                break;
            }
        }
        if date >= window.start {
            out.push(date);
        }
        k += 1;
    }
    out
}

fn clamped_month(anchor: NaiveDate, months: u32) -> NaiveDate {
    let total = anchor.month0() + months;
    let year = anchor.year() + (total / 12) as i32;
    let month = total % 12 + 1;
    let mut day = anchor.day();
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return date;
        }
        day -= 1;
    }
}

fn arb_end() -> impl Strategy<Value = RecurrenceEnd> {
    prop_oneof![
        Just(RecurrenceEnd::Never),
        (0u64..4000).prop_map(|d| RecurrenceEnd::OnDate { date: offset(d) }),
        (0u32..40).prop_map(|count| RecurrenceEnd::AfterCount { count }),
    ]
}

fn arb_series() -> impl Strategy<Value = MasterEntry> {
    (0u64..2000, 0usize..RECURRING.len(), arb_end(), any::<bool>()).prop_map(
        |(anchor, rule, end, auto_pay)| MasterEntry {
            recurrence_end: end,
            ..series(offset(anchor), RECURRING[rule], auto_pay)
        },
    )
}

#[derive(Debug, Clone)]
enum Step {
    Move { pick: usize, shift: i64 },
    Delete { pick: usize },
    DeleteRecorded { pick: usize },
    Update { pick: usize, cents: i64 },
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop_oneof![
            (any::<usize>(), -20i64..20).prop_map(|(pick, shift)| Step::Move { pick, shift }),
            any::<usize>().prop_map(|pick| Step::Delete { pick }),
            any::<usize>().prop_map(|pick| Step::DeleteRecorded { pick }),
            (any::<usize>(), 1i64..100_000).prop_map(|(pick, cents)| Step::Update { pick, cents }),
        ],
        0..8,
    )
}

/// Apply random edits to occurrences visible in a wide window, and deletes to
/// any date holding an exception.
fn apply_steps(mut master: MasterEntry, steps: &[Step]) -> MasterEntry {
    let wide = Window::new(offset(0), offset(6000));
    for step in steps {
        let visible = expand_instances(&master, wide, &ctx());
        if visible.is_empty() {
            break;
        }
        master = match *step {
            Step::Move { pick, shift } => {
                let source = visible[pick % visible.len()].date;
                let target = if shift >= 0 {
                    source + Days::new(shift.unsigned_abs())
                } else {
                    source - Days::new(shift.unsigned_abs())
                };
                move_single_occurrence(&master, source, target)
            }
            Step::Delete { pick } => {
                delete_single_occurrence(&master, visible[pick % visible.len()].date)
            }
            Step::DeleteRecorded { pick } => {
                let recorded: Vec<NaiveDate> = master.exceptions.keys().copied().collect();
                if recorded.is_empty() {
                    master.clone()
                } else {
                    delete_single_occurrence(&master, recorded[pick % recorded.len()])
                }
            }
            Step::Update { pick, cents } => update_single_occurrence(
                &master,
                visible[pick % visible.len()].date,
                &Adjustments {
                    amount: Some(Decimal::new(cents, 2)),
                    ..Default::default()
                },
            ),
        };
    }
    master
}

proptest! {
    #[test]
    fn prop_fast_forward_matches_naive(master in arb_series(), start in 0u64..6000, len in 0u64..500) {
        let window = Window::new(offset(start), offset(start + len));
        prop_assert_eq!(expand(&master, window), naive_expand(&master, window));
    }

    #[test]
    fn prop_expansion_is_idempotent(master in arb_series(), steps in arb_steps(), start in 0u64..4000, len in 0u64..400) {
        let master = apply_steps(master, &steps);
        let window = Window::new(offset(start), offset(start + len));
        prop_assert_eq!(
            expand_instances(&master, window, &ctx()),
            expand_instances(&master, window, &ctx())
        );
    }

    #[test]
    fn prop_window_monotonicity(
        master in arb_series(),
        steps in arb_steps(),
        start in 0u64..4000,
        len in 0u64..400,
        inner_start in 0u64..400,
        inner_len in 0u64..400,
    ) {
        let master = apply_steps(master, &steps);
        let outer = Window::new(offset(start), offset(start + len));
        let inner_begin = start + inner_start.min(len);
        let inner = Window::new(offset(inner_begin), offset((inner_begin + inner_len).min(start + len)));
        prop_assume!(outer.covers(&inner));

        let big = expand_instances(&master, outer, &ctx());
        for instance in expand_instances(&master, inner, &ctx()) {
            prop_assert!(big.contains(&instance), "{:?} missing from outer window", instance);
        }
    }

    #[test]
    fn prop_deletion_is_permanent(master in arb_series(), steps in arb_steps(), pick in any::<usize>(), start in 0u64..6000, len in 0u64..500) {
        let master = apply_steps(master, &steps);
        let visible = expand_instances(&master, Window::new(offset(0), offset(6000)), &ctx());
        prop_assume!(!visible.is_empty());
        let date = visible[pick % visible.len()].date;
        let deleted = delete_single_occurrence(&master, date);

        let window = Window::new(offset(start), offset(start + len));
        prop_assert!(expand_instances(&deleted, window, &ctx()).iter().all(|i| i.date != date));
        let around = Window::new(date, date);
        prop_assert!(expand_instances(&deleted, around, &ctx()).is_empty());
    }

    #[test]
    fn prop_move_round_trip(master in arb_series(), pick in any::<usize>(), shift in 1u64..30) {
        let wide = Window::new(offset(0), offset(6000));
        let visible = expand_instances(&master, wide, &ctx());
        prop_assume!(!visible.is_empty());
        let source = visible[pick % visible.len()].date;
        let target = source + Days::new(shift);
        prop_assume!(master.slot(target).is_none());

        let there = move_single_occurrence(&master, source, target);
        let back = move_single_occurrence(&there, target, source);
        prop_assert_eq!(&back, &master);

        let around = Window::new(source, source);
        prop_assert_eq!(
            expand_instances(&back, around, &ctx()),
            expand_instances(&master, around, &ctx())
        );
    }

    #[test]
    fn prop_operators_keep_pairs_consistent(master in arb_series(), steps in arb_steps()) {
        let master = apply_steps(master, &steps);
        prop_assert!(validate(&master).is_empty());
    }

    #[test]
    fn prop_move_series_clears_moves(master in arb_series(), steps in arb_steps(), anchor in 0u64..2000) {
        let master = apply_steps(master, &steps);
        let deletions: Vec<NaiveDate> = master
            .exceptions
            .iter()
            .filter(|(_, slot)| **slot == Slot::Deleted)
            .map(|(date, _)| *date)
            .collect();

        let moved = move_series(&master, offset(anchor));
        prop_assert!(moved.exceptions.values().all(|slot| !slot.is_move()));
        for date in deletions {
            prop_assert_eq!(moved.slot(date), Some(&Slot::Deleted));
        }
    }

    #[test]
    fn prop_after_count_is_exact(anchor in 0u64..2000, rule in 0usize..RECURRING.len(), count in 0u32..60) {
        let master = MasterEntry {
            recurrence_end: RecurrenceEnd::AfterCount { count },
            ..series(offset(anchor), RECURRING[rule], false)
        };
        let everything = Window::new(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2200, 1, 1).unwrap());
        prop_assert_eq!(expand(&master, everything).len(), count as usize);
    }
}

// ── Scenario tests ──────────────────────────────────────────────────────────

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn test_weekly_move_scenario() {
    let master = series(d("2024-03-04"), Recurrence::Weekly, false);
    let moved = move_single_occurrence(&master, d("2024-03-11"), d("2024-03-13"));
    let dates: Vec<NaiveDate> = expand_instances(
        &moved,
        Window::new(d("2024-03-01"), d("2024-03-31")),
        &ctx(),
    )
    .into_iter()
    .map(|i| i.date)
    .collect();
    assert_eq!(
        dates,
        vec![d("2024-03-04"), d("2024-03-13"), d("2024-03-18"), d("2024-03-25")]
    );
}

#[test]
fn test_month_clamping_scenario() {
    let master = series(d("2024-01-31"), Recurrence::Monthly, false);
    assert_eq!(
        expand(&master, Window::new(d("2024-01-01"), d("2024-04-30"))),
        vec![d("2024-01-31"), d("2024-02-29"), d("2024-03-31"), d("2024-04-30")]
    );
}

#[test]
fn test_count_bounded_unbounded_window() {
    let master = MasterEntry {
        recurrence_end: RecurrenceEnd::AfterCount { count: 3 },
        ..series(d("2024-01-31"), Recurrence::Monthly, false)
    };
    let everything = Window::new(NaiveDate::MIN, NaiveDate::MAX);
    assert_eq!(
        expand(&master, everything),
        vec![d("2024-01-31"), d("2024-02-29"), d("2024-03-31")]
    );
}
