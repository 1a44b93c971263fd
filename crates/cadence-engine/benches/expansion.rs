use cadence_engine::{
    delete_single_occurrence, expand, expand_instances, move_single_occurrence, EvaluationContext,
    MasterEntry, Recurrence, Window,
};
use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use std::hint::black_box;

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn series(recurrence: Recurrence) -> MasterEntry {
    MasterEntry {
        recurrence,
        is_auto_pay: true,
        ..MasterEntry::new("bench", "Bench", Decimal::new(1999, 2), d("2000-01-31"))
    }
}

fn bench_far_window(c: &mut Criterion) {
    let weekly = series(Recurrence::Weekly);
    let monthly = series(Recurrence::Monthly);
    let window = Window::new(d("2090-01-01"), d("2090-12-31"));

    c.bench_function("expand_weekly_far_future_year", |b| {
        b.iter(|| expand(black_box(&weekly), black_box(window)))
    });
    c.bench_function("expand_monthly_far_future_year", |b| {
        b.iter(|| expand(black_box(&monthly), black_box(window)))
    });
}

fn bench_materialize_with_exceptions(c: &mut Criterion) {
    let mut master = series(Recurrence::Weekly);
    // 2000-01-31 and 2024-01-01 are both Mondays, so `date` walks series dates.
    let mut date = d("2024-01-01");
    for i in 0..100 {
        master = if i % 2 == 0 {
            move_single_occurrence(&master, date, date + chrono::Days::new(2))
        } else {
            delete_single_occurrence(&master, date)
        };
        date = date + chrono::Days::new(7);
    }
    let ctx = EvaluationContext::utc(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    let window = Window::new(d("2024-01-01"), d("2025-12-31"));

    c.bench_function("materialize_two_years_with_exceptions", |b| {
        b.iter(|| expand_instances(black_box(&master), black_box(window), &ctx))
    });
}

criterion_group!(benches, bench_far_window, bench_materialize_with_exceptions);
criterion_main!(benches);
