//! Recurrence expansion: rule + anchor date → candidate occurrence dates.
//!
//! Candidates are computed by index rather than by repeated stepping. The k-th
//! occurrence is always `anchor + k * stride`, so month-family rules clamp each
//! occurrence independently (an anchor on the 31st lands on Feb 28/29 and
//! returns to the 31st in March) and day-family rules can jump straight to the
//! first occurrence in a window.
//!
//! Expansion only reads the rule and end condition. Exceptions are applied
//! afterwards by [`crate::overlay`].

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::model::{MasterEntry, RecurrenceEnd, Stride, Window};

/// Lazy iterator over the candidate dates of a series, ascending.
///
/// Unbounded for [`RecurrenceEnd::Never`]; callers clip it themselves.
#[derive(Debug, Clone)]
pub struct Occurrences {
    anchor: NaiveDate,
    stride: Option<Stride>,
    end: RecurrenceEnd,
    index: u64,
    done: bool,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.done {
            return None;
        }
        if let RecurrenceEnd::AfterCount { count } = self.end {
            if self.index >= u64::from(count) {
                self.done = true;
                return None;
            }
        }
        let Some(date) = nth_occurrence(self.anchor, self.stride, self.index) else {
            self.done = true;
            return None;
        };
        if let RecurrenceEnd::OnDate { date: until } = self.end {
            if date > until {
                self.done = true;
                return None;
            }
        }
        self.index += 1;
        Some(date)
    }
}

/// Candidate dates of `master` on or after `from`.
///
/// The first candidate is found arithmetically; the anchor still counts as
/// occurrence #1 for `afterCount` limits.
pub fn occurrences(master: &MasterEntry, from: NaiveDate) -> Occurrences {
    let stride = master.recurrence.stride();
    Occurrences {
        anchor: master.anchor_date,
        stride,
        end: master.recurrence_end,
        index: first_index_on_or_after(master.anchor_date, stride, from),
        done: false,
    }
}

/// Expand `master` into its candidate dates inside `window`, ascending.
///
/// # Examples
///
/// ```
/// use cadence_engine::{expand, MasterEntry, Recurrence, Window};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let d = |s: &str| s.parse::<NaiveDate>().unwrap();
/// let rent = MasterEntry {
///     recurrence: Recurrence::Monthly,
///     ..MasterEntry::new("rent", "Rent", Decimal::new(1200, 0), d("2024-01-31"))
/// };
/// let dates = expand(&rent, Window::new(d("2024-01-01"), d("2024-04-30")));
/// assert_eq!(dates, vec![d("2024-01-31"), d("2024-02-29"), d("2024-03-31"), d("2024-04-30")]);
/// ```
pub fn expand(master: &MasterEntry, window: Window) -> Vec<NaiveDate> {
    if window.is_empty() {
        return Vec::new();
    }
    let dates: Vec<NaiveDate> = occurrences(master, window.start)
        .take_while(|date| *date <= window.end)
        .collect();
    tracing::trace!(
        master_id = %master.id,
        start = %window.start,
        end = %window.end,
        count = dates.len(),
        "expanded candidates"
    );
    dates
}

/// Whether `date` is a genuine candidate of the series (rule and end
/// condition), ignoring exceptions.
pub fn is_occurrence(master: &MasterEntry, date: NaiveDate) -> bool {
    occurrences(master, date).next() == Some(date)
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// The `index`-th occurrence (0 = anchor), or `None` past the calendar's range
/// or past the single occurrence of a one-time entry.
fn nth_occurrence(anchor: NaiveDate, stride: Option<Stride>, index: u64) -> Option<NaiveDate> {
    match stride {
        None => (index == 0).then_some(anchor),
        Some(Stride::Days(days)) => {
            let offset = index.checked_mul(u64::from(days))?;
            anchor.checked_add_days(Days::new(offset))
        }
        Some(Stride::Months(months)) => {
            let offset = u32::try_from(index.checked_mul(u64::from(months))?).ok()?;
            // chrono clamps the day to the last day of the target month.
            anchor.checked_add_months(Months::new(offset))
        }
    }
}

/// Smallest index whose occurrence is on or after `from`.
fn first_index_on_or_after(anchor: NaiveDate, stride: Option<Stride>, from: NaiveDate) -> u64 {
    if from <= anchor {
        return 0;
    }
    match stride {
        // The only occurrence lies before `from`.
        None => 1,
        Some(Stride::Days(days)) => {
            let gap = (from - anchor).num_days().unsigned_abs();
            let days = u64::from(days);
            gap.div_ceil(days)
        }
        Some(Stride::Months(months)) => {
            let month_gap = i64::from(from.year() - anchor.year()) * 12
                + i64::from(from.month0())
                - i64::from(anchor.month0());
            let mut index = month_gap.unsigned_abs() / u64::from(months);
            // Occurrence `index` falls in `from`'s month or earlier; the next one
            // is in a later month, so at most one step is needed.
            if nth_occurrence(anchor, stride, index).is_some_and(|date| date < from) {
                index += 1;
            }
            index
        }
    }
}
