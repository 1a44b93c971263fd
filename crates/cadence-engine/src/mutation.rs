//! Edit operators: pure functions from a master entry and an edit request to
//! the next master entry.
//!
//! Every operator takes the current entry by reference and returns a complete
//! next-state value for the caller to persist as a full replace. An operator
//! whose precondition does not hold returns its input unchanged and logs the
//! reason at debug level; callers route by recurrence type before invoking.
//!
//! | Operator | Effect |
//! |---|---|
//! | [`move_one_time`] | re-date a one-time entry |
//! | [`move_single_occurrence`] | move one occurrence of a series, keeping the move pair consistent |
//! | [`move_series`] | re-anchor a series and drop every move pair |
//! | [`update_series`] | change baseline fields and drop one-off overrides |
//! | [`update_single_occurrence`] | record the fields of one occurrence that differ from the baseline |
//! | [`delete_single_occurrence`] | suppress one occurrence permanently |
//! | [`delete_series`] | remove the whole record |

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::expander::is_occurrence;
use crate::model::{Adjustments, EntryKind, MasterEntry, Recurrence, RecurrenceEnd, Slot};

// ── Edit requests ───────────────────────────────────────────────────────────

/// New baseline values for a whole series. Absent fields stay as they are.
///
/// `category` distinguishes an absent field (`None`, keep) from an explicit
/// JSON `null` (`Some(None)`, clear). Switching `kind` to income always
/// clears the category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesPatch {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub kind: Option<EntryKind>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,
    pub recurrence: Option<Recurrence>,
    pub recurrence_end: Option<RecurrenceEnd>,
    pub is_auto_pay: Option<bool>,
    pub is_paid: Option<bool>,
    pub order: Option<i64>,
}

impl SeriesPatch {
    fn apply_to(&self, master: &mut MasterEntry) {
        if let Some(name) = &self.name {
            master.name = name.clone();
        }
        if let Some(amount) = self.amount {
            master.amount = amount;
        }
        if let Some(kind) = self.kind {
            master.kind = kind;
        }
        if let Some(category) = &self.category {
            master.category = category.clone();
        }
        if master.kind == EntryKind::Income {
            master.category = None;
        }
        if let Some(recurrence) = self.recurrence {
            master.recurrence = recurrence;
        }
        if let Some(end) = self.recurrence_end {
            master.recurrence_end = end;
        }
        if let Some(is_auto_pay) = self.is_auto_pay {
            master.is_auto_pay = is_auto_pay;
        }
        if let Some(is_paid) = self.is_paid {
            master.is_paid = is_paid;
        }
        if let Some(order) = self.order {
            master.order = order;
        }
    }
}

// A present field deserializes to `Some`, so `null` becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Values submitted for one occurrence. Same shape as the stored
/// [`Adjustments`]; fields that match the baseline are not stored.
pub type OccurrencePatch = Adjustments;

/// A single edit, as the storage collaborator or CLI would submit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Edit {
    MoveOneTime { from: NaiveDate, to: NaiveDate },
    MoveSingleOccurrence { source: NaiveDate, target: NaiveDate },
    MoveSeries { anchor_date: NaiveDate },
    UpdateSeries { patch: SeriesPatch },
    UpdateSingleOccurrence { date: NaiveDate, patch: OccurrencePatch },
    DeleteSingleOccurrence { date: NaiveDate },
    DeleteSeries,
}

/// Apply `edit` to `master`.
///
/// Returns `None` when the edit removes the whole record.
pub fn apply_edit(master: &MasterEntry, edit: &Edit) -> Option<MasterEntry> {
    match edit {
        Edit::MoveOneTime { from, to } => Some(move_one_time(master, *from, *to)),
        Edit::MoveSingleOccurrence { source, target } => {
            Some(move_single_occurrence(master, *source, *target))
        }
        Edit::MoveSeries { anchor_date } => Some(move_series(master, *anchor_date)),
        Edit::UpdateSeries { patch } => Some(update_series(master, patch)),
        Edit::UpdateSingleOccurrence { date, patch } => {
            Some(update_single_occurrence(master, *date, patch))
        }
        Edit::DeleteSingleOccurrence { date } => Some(delete_single_occurrence(master, *date)),
        Edit::DeleteSeries => delete_series(master),
    }
}

// ── Moves ───────────────────────────────────────────────────────────────────

/// Move a one-time entry from `from` to `to` by re-anchoring it.
///
/// No-op when the entry is recurring or `from == to`.
pub fn move_one_time(master: &MasterEntry, from: NaiveDate, to: NaiveDate) -> MasterEntry {
    if master.recurrence.is_recurring() {
        tracing::debug!(master_id = %master.id, "move_one_time on a recurring entry ignored");
        return master.clone();
    }
    if from == to {
        return master.clone();
    }
    MasterEntry {
        anchor_date: to,
        ..master.clone()
    }
}

/// Move the occurrence shown on `source` to `target`.
///
/// Writes a `MovedAway` slot at the occurrence's natural date and a `MovedIn`
/// slot at `target`, carrying the occurrence's overrides with it. If `source`
/// is itself a landing (the occurrence was moved before), the pair is
/// re-pointed from the natural date to the new target and the stale landing is
/// removed; moving an occurrence back to its natural date removes the pair.
///
/// No-op when the entry is one-time, `source == target`, `source` is neither a
/// series date nor a landing, nothing is materialized at `source` (deleted or
/// moved away), another occurrence has
/// already landed on `target` (even if it was deleted there), or `target` is
/// the natural date of an occurrence that was moved elsewhere.
///
/// # Examples
///
/// ```
/// use cadence_engine::{expand_instances, move_single_occurrence, EvaluationContext,
///     MasterEntry, Recurrence, Window};
/// use chrono::{NaiveDate, Utc};
/// use rust_decimal::Decimal;
///
/// let d = |s: &str| s.parse::<NaiveDate>().unwrap();
/// let gym = MasterEntry {
///     recurrence: Recurrence::Weekly,
///     ..MasterEntry::new("gym", "Gym", Decimal::new(25, 0), d("2024-03-04"))
/// };
/// let moved = move_single_occurrence(&gym, d("2024-03-11"), d("2024-03-13"));
/// let ctx = EvaluationContext::utc(Utc::now());
/// let dates: Vec<_> = expand_instances(&moved, Window::new(d("2024-03-01"), d("2024-03-31")), &ctx)
///     .into_iter()
///     .map(|i| i.date)
///     .collect();
/// assert_eq!(dates, vec![d("2024-03-04"), d("2024-03-13"), d("2024-03-18"), d("2024-03-25")]);
/// ```
pub fn move_single_occurrence(
    master: &MasterEntry,
    source: NaiveDate,
    target: NaiveDate,
) -> MasterEntry {
    if !master.recurrence.is_recurring() {
        tracing::debug!(
            master_id = %master.id,
            "move_single_occurrence on a one-time entry ignored"
        );
        return master.clone();
    }
    if source == target {
        return master.clone();
    }

    let (origin, carried) = match master.slot(source) {
        None | Some(Slot::Overridden(_)) if !is_occurrence(master, source) => {
            tracing::debug!(
                master_id = %master.id,
                %source,
                "source is not a series date; move ignored"
            );
            return master.clone();
        }
        None => (source, Adjustments::default()),
        Some(Slot::Overridden(adjustments)) => (source, adjustments.clone()),
        Some(Slot::MovedIn { from, adjustments }) => (*from, adjustments.clone()),
        Some(Slot::Deleted) | Some(Slot::MovedAway { .. }) => {
            tracing::debug!(
                master_id = %master.id,
                %source,
                "no occurrence materialized at source; move ignored"
            );
            return master.clone();
        }
    };

    match master.slot(target) {
        Some(Slot::MovedIn { from, .. }) if *from != origin => {
            tracing::debug!(
                master_id = %master.id,
                %target,
                occupied_by = %from,
                "target already holds a moved occurrence; move ignored"
            );
            return master.clone();
        }
        Some(Slot::MovedAway { .. }) if target != origin => {
            tracing::debug!(
                master_id = %master.id,
                %target,
                "target is the origin of another move; move ignored"
            );
            return master.clone();
        }
        _ => {}
    }
    // A deleted landing still has its origin pointing at it.
    let claimed_by_other = master.exceptions.iter().any(|(date, slot)| {
        *date != origin && matches!(slot, Slot::MovedAway { to, .. } if *to == target)
    });
    if claimed_by_other {
        tracing::debug!(
            master_id = %master.id,
            %target,
            "target is claimed by another origin; move ignored"
        );
        return master.clone();
    }

    let mut next = master.clone();
    if origin != source {
        next.exceptions.remove(&source);
    }

    if target == origin {
        // Back on its natural date: the pair dissolves, overrides stay.
        if carried.is_empty() {
            next.exceptions.remove(&origin);
        } else {
            next.exceptions.insert(origin, Slot::Overridden(carried));
        }
        return next;
    }

    let origin_adjustments = match next.slot(origin) {
        Some(Slot::MovedAway { adjustments, .. }) | Some(Slot::Overridden(adjustments)) => {
            adjustments.clone()
        }
        _ => Adjustments::default(),
    };
    next.exceptions.insert(
        origin,
        Slot::MovedAway {
            to: target,
            adjustments: origin_adjustments,
        },
    );
    next.exceptions.insert(
        target,
        Slot::MovedIn {
            from: origin,
            adjustments: carried,
        },
    );
    next
}

/// Re-anchor a series on `new_anchor`.
///
/// Every move pair is dropped; overrides and deletion sentinels are kept as
/// they are, even if their dates no longer fall on the new schedule.
pub fn move_series(master: &MasterEntry, new_anchor: NaiveDate) -> MasterEntry {
    let mut next = MasterEntry {
        anchor_date: new_anchor,
        ..master.clone()
    };
    next.exceptions.retain(|_, slot| !slot.is_move());
    next
}

// ── Updates ─────────────────────────────────────────────────────────────────

/// Apply `patch` to the series baseline.
///
/// One-off overrides are discarded so every occurrence follows the new
/// baseline. Move pairs keep their dates but lose the overrides they carry;
/// deletion sentinels survive.
pub fn update_series(master: &MasterEntry, patch: &SeriesPatch) -> MasterEntry {
    let mut next = master.clone();
    patch.apply_to(&mut next);
    next.exceptions
        .retain(|_, slot| !matches!(slot, Slot::Overridden(_)));
    for slot in next.exceptions.values_mut() {
        match slot {
            Slot::MovedAway { adjustments, .. } | Slot::MovedIn { adjustments, .. } => {
                *adjustments = Adjustments::default();
            }
            Slot::Overridden(_) | Slot::Deleted => {}
        }
    }
    next
}

/// Record the values of one occurrence.
///
/// Each field supplied in `patch` is stored only if it differs from what the
/// occurrence would show without it (the master baseline, plus carried
/// overrides for a moved occurrence); a supplied value equal to that baseline
/// clears any earlier override. `is_paid` is stored verbatim. Fields not
/// supplied keep their current override.
///
/// No-op on a deleted date or on the natural date of an occurrence that was
/// moved away.
pub fn update_single_occurrence(
    master: &MasterEntry,
    date: NaiveDate,
    patch: &OccurrencePatch,
) -> MasterEntry {
    let (mut adjustments, carried, landed_from) = match master.slot(date) {
        None => (Adjustments::default(), Adjustments::default(), None),
        Some(Slot::Overridden(adjustments)) => {
            (adjustments.clone(), Adjustments::default(), None)
        }
        Some(Slot::MovedIn { from, adjustments }) => {
            let carried = match master.slot(*from) {
                Some(Slot::MovedAway { to, adjustments }) if *to == date => adjustments.clone(),
                _ => Adjustments::default(),
            };
            (adjustments.clone(), carried, Some(*from))
        }
        Some(Slot::Deleted) | Some(Slot::MovedAway { .. }) => {
            tracing::debug!(
                master_id = %master.id,
                %date,
                "no occurrence materialized at date; update ignored"
            );
            return master.clone();
        }
    };

    if let Some(name) = &patch.name {
        let baseline = carried.name.as_ref().unwrap_or(&master.name);
        adjustments.name = (name != baseline).then(|| name.clone());
    }
    if let Some(amount) = patch.amount {
        let baseline = carried.amount.unwrap_or(master.amount);
        adjustments.amount = (amount != baseline).then_some(amount);
    }
    if let Some(category) = &patch.category {
        let baseline = carried.category.as_ref().or(master.category.as_ref());
        adjustments.category = (Some(category) != baseline).then(|| category.clone());
    }
    if let Some(order) = patch.order {
        let baseline = carried.order.unwrap_or(master.order);
        adjustments.order = (order != baseline).then_some(order);
    }
    if patch.is_paid.is_some() {
        adjustments.is_paid = patch.is_paid;
    }

    let mut next = master.clone();
    match landed_from {
        Some(from) => {
            next.exceptions
                .insert(date, Slot::MovedIn { from, adjustments });
        }
        None if adjustments.is_empty() => {
            next.exceptions.remove(&date);
        }
        None => {
            next.exceptions.insert(date, Slot::Overridden(adjustments));
        }
    }
    next
}

// ── Deletes ─────────────────────────────────────────────────────────────────

/// Permanently suppress the occurrence on `date`, replacing whatever slot was
/// there.
///
/// Deleting the natural date of a moved occurrence deletes that occurrence:
/// its landing is removed along with the pair.
pub fn delete_single_occurrence(master: &MasterEntry, date: NaiveDate) -> MasterEntry {
    let mut next = master.clone();
    if let Some(Slot::MovedAway { to, .. }) = master.slot(date) {
        if matches!(master.slot(*to), Some(Slot::MovedIn { from, .. }) if *from == date) {
            next.exceptions.remove(to);
        }
    }
    next.exceptions.insert(date, Slot::Deleted);
    next
}

/// Signal removal of the whole record. The storage collaborator performs the
/// actual delete.
pub fn delete_series(master: &MasterEntry) -> Option<MasterEntry> {
    tracing::debug!(master_id = %master.id, "series deleted");
    None
}
