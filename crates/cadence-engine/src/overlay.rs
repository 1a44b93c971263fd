//! Exception overlay: candidate dates + per-date slots → materialized instances.
//!
//! Deleted dates are dropped, moved-away dates are dropped from their natural
//! date and re-materialized on their target, and everything else picks up its
//! field overrides. Paid status is derived from an explicit
//! [`EvaluationContext`]; nothing here reads the system clock.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{CadenceError, Result};
use crate::expander::{expand, is_occurrence};
use crate::model::{instance_id, Adjustments, EntryKind, Instance, MasterEntry, Slot, Window};

// ── Evaluation context ──────────────────────────────────────────────────────

/// The instant and timezone against which autopay paid status is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    pub now: DateTime<Utc>,
    pub timezone: Tz,
}

impl EvaluationContext {
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self { now, timezone }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Tz::UTC)
    }

    /// Build a context from an IANA timezone name.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::InvalidTimezone`] if `timezone` is not a valid
    /// IANA timezone name.
    pub fn from_iana(now: DateTime<Utc>, timezone: &str) -> Result<Self> {
        let tz = timezone
            .parse::<Tz>()
            .map_err(|_| CadenceError::InvalidTimezone(format!("'{timezone}'")))?;
        Ok(Self::new(now, tz))
    }

    /// The calendar date of `now` in the context timezone.
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.timezone).date_naive()
    }
}

// ── materialize ─────────────────────────────────────────────────────────────

/// Apply `master`'s exceptions to `candidates` and produce one instance per
/// date inside `window`, ascending by date.
///
/// Candidates are normally the output of [`expand`] for the same window.
/// Besides the candidates, any occurrence moved *into* the window from a
/// genuine series date outside it is materialized as well, so a larger window
/// never disagrees with a smaller one about the dates they share.
pub fn materialize(
    master: &MasterEntry,
    window: Window,
    candidates: &[NaiveDate],
    ctx: &EvaluationContext,
) -> Vec<Instance> {
    if window.is_empty() {
        return Vec::new();
    }
    let today = ctx.today();
    let mut produced: BTreeMap<NaiveDate, Instance> = BTreeMap::new();

    for &date in candidates.iter().filter(|date| window.contains(**date)) {
        match master.slot(date) {
            Some(Slot::Deleted) => {}
            Some(Slot::MovedAway { to, adjustments }) => {
                let to = *to;
                if !window.contains(to) || produced.contains_key(&to) {
                    continue;
                }
                if let Some(instance) = land_moved(master, date, adjustments, to, today) {
                    produced.insert(to, instance);
                }
            }
            Some(Slot::MovedIn { from, adjustments }) => {
                let (resolved, origin) = match paired_origin(master, *from, date) {
                    Some(carried) => (carried.layered(adjustments), Some(*from)),
                    None => (adjustments.clone(), None),
                };
                produced
                    .entry(date)
                    .or_insert_with(|| build_instance(master, date, &resolved, origin, today));
            }
            Some(Slot::Overridden(adjustments)) => {
                produced
                    .entry(date)
                    .or_insert_with(|| build_instance(master, date, adjustments, None, today));
            }
            None => {
                produced.entry(date).or_insert_with(|| {
                    build_instance(master, date, &Adjustments::default(), None, today)
                });
            }
        }
    }

    // Landings whose origin was not among the candidates.
    for (&date, slot) in master.exceptions.range(window.start..=window.end) {
        let Slot::MovedIn { from, adjustments } = slot else {
            continue;
        };
        if produced.contains_key(&date) {
            continue;
        }
        if let Some(carried) = paired_origin(master, *from, date) {
            if is_occurrence(master, *from) {
                let resolved = carried.layered(adjustments);
                produced.insert(
                    date,
                    build_instance(master, date, &resolved, Some(*from), today),
                );
            }
        }
    }

    produced.into_values().collect()
}

/// Expand and materialize `master` over `window` in one call.
///
/// # Examples
///
/// ```
/// use cadence_engine::{expand_instances, EvaluationContext, MasterEntry, Recurrence, Window};
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use rust_decimal::Decimal;
///
/// let d = |s: &str| s.parse::<NaiveDate>().unwrap();
/// let gym = MasterEntry {
///     recurrence: Recurrence::Weekly,
///     is_auto_pay: true,
///     ..MasterEntry::new("gym", "Gym", Decimal::new(25, 0), d("2024-03-04"))
/// };
/// let ctx = EvaluationContext::utc(Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap());
/// let instances = expand_instances(&gym, Window::new(d("2024-03-01"), d("2024-03-31")), &ctx);
/// let paid: Vec<bool> = instances.iter().map(|i| i.is_paid).collect();
/// assert_eq!(paid, vec![true, true, false, false]);
/// ```
pub fn expand_instances(
    master: &MasterEntry,
    window: Window,
    ctx: &EvaluationContext,
) -> Vec<Instance> {
    let candidates = expand(master, window);
    materialize(master, window, &candidates, ctx)
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// The carried adjustments of `origin` if it holds a `MovedAway` pointing at
/// `target`.
fn paired_origin(master: &MasterEntry, origin: NaiveDate, target: NaiveDate) -> Option<&Adjustments> {
    match master.slot(origin) {
        Some(Slot::MovedAway { to, adjustments }) if *to == target => Some(adjustments),
        _ => None,
    }
}

/// Materialize the occurrence moved from `origin` onto `target`.
///
/// Returns `None` when the target date has since been deleted.
fn land_moved(
    master: &MasterEntry,
    origin: NaiveDate,
    carried: &Adjustments,
    target: NaiveDate,
    today: NaiveDate,
) -> Option<Instance> {
    let resolved = match master.slot(target) {
        Some(Slot::Deleted) => return None,
        Some(Slot::MovedIn { adjustments, .. }) | Some(Slot::Overridden(adjustments)) => {
            carried.layered(adjustments)
        }
        // The target's own occurrence left for somewhere else; its adjustments
        // belong to that occurrence, not to this one.
        Some(Slot::MovedAway { .. }) | None => carried.clone(),
    };
    Some(build_instance(master, target, &resolved, Some(origin), today))
}

fn build_instance(
    master: &MasterEntry,
    date: NaiveDate,
    adjustments: &Adjustments,
    moved_from: Option<NaiveDate>,
    today: NaiveDate,
) -> Instance {
    let category = match master.kind {
        EntryKind::Bill => adjustments
            .category
            .clone()
            .or_else(|| master.category.clone()),
        EntryKind::Income => None,
    };
    let is_paid = adjustments
        .is_paid
        .unwrap_or_else(|| derived_paid(master, date, today));

    Instance {
        id: instance_id(&master.id, date),
        master_id: master.id.clone(),
        date,
        name: adjustments
            .name
            .clone()
            .unwrap_or_else(|| master.name.clone()),
        amount: adjustments.amount.unwrap_or(master.amount),
        kind: master.kind,
        category,
        recurrence: master.recurrence,
        is_auto_pay: master.is_auto_pay,
        is_paid,
        order: adjustments.order.unwrap_or(master.order),
        moved_from,
    }
}

/// Paid status when no exception states it explicitly.
fn derived_paid(master: &MasterEntry, date: NaiveDate, today: NaiveDate) -> bool {
    if !master.recurrence.is_recurring() {
        master.is_paid
    } else if master.is_auto_pay {
        date <= today
    } else {
        false
    }
}
