//! Core value types: master entries, per-date slots, windows, and instances.
//!
//! A [`MasterEntry`] is the single persisted record for a bill or income item.
//! Its exceptions are held as typed [`Slot`] values keyed by occurrence date;
//! the loosely-typed persisted shape lives in [`crate::record`] and is converted
//! at the serde boundary.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::record::MasterRecord;

// ── Entry classification ────────────────────────────────────────────────────

/// Whether an entry is money going out or coming in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Bill,
    Income,
}

/// How often an entry repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    /// A one-time entry on its anchor date.
    #[default]
    None,
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannual,
    Annual,
}

/// The distance between two consecutive occurrences of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stride {
    Days(u32),
    Months(u32),
}

impl Recurrence {
    /// The stride of this rule, or `None` for a one-time entry.
    pub fn stride(self) -> Option<Stride> {
        match self {
            Recurrence::None => None,
            Recurrence::Weekly => Some(Stride::Days(7)),
            Recurrence::Biweekly => Some(Stride::Days(14)),
            Recurrence::Monthly => Some(Stride::Months(1)),
            Recurrence::Bimonthly => Some(Stride::Months(2)),
            Recurrence::Quarterly => Some(Stride::Months(3)),
            Recurrence::Semiannual => Some(Stride::Months(6)),
            Recurrence::Annual => Some(Stride::Months(12)),
        }
    }

    pub fn is_recurring(self) -> bool {
        self != Recurrence::None
    }
}

/// When a recurring series stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecurrenceEnd {
    /// Runs forever; expansion is clipped to the requested window only.
    #[default]
    Never,
    /// Occurrences on or before `date` are included.
    OnDate { date: NaiveDate },
    /// The anchor is occurrence #1; at most `count` occurrences in total.
    AfterCount { count: u32 },
}

// ── Per-date adjustments and slots ──────────────────────────────────────────

/// Field overrides and paid status recorded for a single occurrence.
///
/// Every field is optional; `None` means "use whatever lies underneath".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,
}

impl Adjustments {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.order.is_none()
            && self.is_paid.is_none()
    }

    /// Stack `top` over `self`: each field set in `top` wins.
    pub fn layered(&self, top: &Adjustments) -> Adjustments {
        Adjustments {
            name: top.name.clone().or_else(|| self.name.clone()),
            amount: top.amount.or(self.amount),
            category: top.category.clone().or_else(|| self.category.clone()),
            order: top.order.or(self.order),
            is_paid: top.is_paid.or(self.is_paid),
        }
    }
}

/// The typed state of one exception slot.
///
/// A date with no slot is simply scheduled. Move markers are always paired:
/// `MovedAway { to: t }` at `d` goes together with `MovedIn { from: d }` at `t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// The occurrence stays on its date with some fields changed.
    Overridden(Adjustments),
    /// The occurrence was moved from this date to `to`. The adjustments are the
    /// ones the occurrence had before it left, and are carried to the target.
    MovedAway { to: NaiveDate, adjustments: Adjustments },
    /// An occurrence whose natural date is `from` now lands on this date.
    MovedIn { from: NaiveDate, adjustments: Adjustments },
    /// The occurrence on this date is permanently suppressed.
    Deleted,
}

impl Slot {
    pub fn adjustments(&self) -> Option<&Adjustments> {
        match self {
            Slot::Overridden(adjustments)
            | Slot::MovedAway { adjustments, .. }
            | Slot::MovedIn { adjustments, .. } => Some(adjustments),
            Slot::Deleted => None,
        }
    }

    /// True for either half of a move pair.
    pub fn is_move(&self) -> bool {
        matches!(self, Slot::MovedAway { .. } | Slot::MovedIn { .. })
    }
}

// ── MasterEntry ─────────────────────────────────────────────────────────────

/// The persisted description of a recurring or one-time financial item.
///
/// Engine functions take it by reference and return new values; nothing in
/// this crate mutates a caller's entry in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MasterRecord", into = "MasterRecord")]
pub struct MasterEntry {
    pub id: String,
    /// First occurrence; the base for all interval arithmetic.
    pub anchor_date: NaiveDate,
    pub name: String,
    pub amount: Decimal,
    pub kind: EntryKind,
    /// Only meaningful for bills.
    pub category: Option<String>,
    pub recurrence: Recurrence,
    pub recurrence_end: RecurrenceEnd,
    pub is_auto_pay: bool,
    /// Paid status of a one-time entry. Ignored for recurring entries.
    pub is_paid: bool,
    pub order: i64,
    pub exceptions: BTreeMap<NaiveDate, Slot>,
}

impl MasterEntry {
    /// A one-time bill with no exceptions. Use struct update syntax or the
    /// edit operators to shape it further.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Decimal,
        anchor_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            anchor_date,
            name: name.into(),
            amount,
            kind: EntryKind::Bill,
            category: None,
            recurrence: Recurrence::None,
            recurrence_end: RecurrenceEnd::Never,
            is_auto_pay: false,
            is_paid: false,
            order: 0,
            exceptions: BTreeMap::new(),
        }
    }

    pub fn slot(&self, date: NaiveDate) -> Option<&Slot> {
        self.exceptions.get(&date)
    }
}

// ── Window ──────────────────────────────────────────────────────────────────

/// An inclusive `[start, end]` date range to materialize.
///
/// A window whose end precedes its start is empty; `start == end` covers
/// exactly one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// True if every date of `other` is inside `self`.
    pub fn covers(&self, other: &Window) -> bool {
        other.is_empty() || (self.start <= other.start && other.end <= self.end)
    }
}

// ── Instance ────────────────────────────────────────────────────────────────

/// One concrete, fully resolved occurrence of a [`MasterEntry`].
///
/// Instances are projections: recomputed on every expansion and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// `"{master_id}:{date}"`, unique per master and date.
    pub id: String,
    pub master_id: String,
    pub date: NaiveDate,
    pub name: String,
    pub amount: Decimal,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub recurrence: Recurrence,
    pub is_auto_pay: bool,
    pub is_paid: bool,
    pub order: i64,
    /// Natural date of the occurrence when it was moved here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_from: Option<NaiveDate>,
}

/// Build the instance id for a master and date.
pub fn instance_id(master_id: &str, date: NaiveDate) -> String {
    format!("{master_id}:{}", date.format("%Y-%m-%d"))
}
