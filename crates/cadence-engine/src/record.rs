//! The persisted JSON shape of a master entry.
//!
//! Storage keeps exceptions as loose objects where a handful of optional keys
//! decide what the exception means (`movedTo`, `movedFrom`, `"deleted"`). This
//! module is the only place that looks at that shape: records are parsed into
//! typed [`Slot`]s on the way in and written back out unchanged in form.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};
use crate::model::{Adjustments, EntryKind, MasterEntry, Recurrence, RecurrenceEnd, Slot};

/// `movedFrom` value marking a deleted occurrence.
pub const DELETED_SENTINEL: &str = "deleted";

/// One persisted exception, exactly as storage holds it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRecord {
    #[serde(flatten)]
    pub adjustments: Adjustments,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<NaiveDate>,
    /// Either an ISO date or [`DELETED_SENTINEL`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_from: Option<String>,
}

/// One persisted master entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterRecord {
    pub id: String,
    pub anchor_date: NaiveDate,
    pub name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub recurrence_rule: Recurrence,
    #[serde(default)]
    pub recurrence_end: RecurrenceEnd,
    #[serde(default)]
    pub is_auto_pay: bool,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub exceptions: BTreeMap<NaiveDate, ExceptionRecord>,
}

// ── Parsing ─────────────────────────────────────────────────────────────────

/// Parse one persisted exception into its typed slot.
///
/// # Errors
///
/// Returns [`CadenceError::InvalidException`] if the record carries both move
/// markers, a `movedFrom` that is neither a date nor `"deleted"`, or a marker
/// pointing at its own date.
pub fn parse_slot(date: NaiveDate, record: ExceptionRecord) -> Result<Slot> {
    let invalid = |reason: String| CadenceError::InvalidException { date, reason };

    match (record.moved_to, record.moved_from) {
        (Some(_), Some(_)) => Err(invalid("carries both movedTo and movedFrom".to_string())),
        (None, Some(from)) if from == DELETED_SENTINEL => {
            if !record.adjustments.is_empty() {
                tracing::debug!(%date, "dropping overrides stored on a deleted occurrence");
            }
            Ok(Slot::Deleted)
        }
        (None, Some(from)) => {
            let from = from
                .parse::<NaiveDate>()
                .map_err(|e| invalid(format!("movedFrom '{from}': {e}")))?;
            if from == date {
                return Err(invalid("movedFrom points at its own date".to_string()));
            }
            Ok(Slot::MovedIn {
                from,
                adjustments: record.adjustments,
            })
        }
        (Some(to), None) => {
            if to == date {
                return Err(invalid("movedTo points at its own date".to_string()));
            }
            Ok(Slot::MovedAway {
                to,
                adjustments: record.adjustments,
            })
        }
        (None, None) => Ok(Slot::Overridden(record.adjustments)),
    }
}

impl From<Slot> for ExceptionRecord {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Overridden(adjustments) => ExceptionRecord {
                adjustments,
                ..Default::default()
            },
            Slot::MovedAway { to, adjustments } => ExceptionRecord {
                adjustments,
                moved_to: Some(to),
                moved_from: None,
            },
            Slot::MovedIn { from, adjustments } => ExceptionRecord {
                adjustments,
                moved_to: None,
                moved_from: Some(from.format("%Y-%m-%d").to_string()),
            },
            Slot::Deleted => ExceptionRecord {
                moved_from: Some(DELETED_SENTINEL.to_string()),
                ..Default::default()
            },
        }
    }
}

impl TryFrom<MasterRecord> for MasterEntry {
    type Error = CadenceError;

    fn try_from(record: MasterRecord) -> Result<Self> {
        if record.id.is_empty() {
            return Err(CadenceError::InvalidRecord("missing id".to_string()));
        }

        let exceptions = record
            .exceptions
            .into_iter()
            .map(|(date, exception)| parse_slot(date, exception).map(|slot| (date, slot)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(MasterEntry {
            id: record.id,
            anchor_date: record.anchor_date,
            name: record.name,
            amount: record.amount,
            kind: record.kind,
            category: record.category,
            recurrence: record.recurrence_rule,
            recurrence_end: record.recurrence_end,
            is_auto_pay: record.is_auto_pay,
            is_paid: record.is_paid,
            order: record.order,
            exceptions,
        })
    }
}

impl From<MasterEntry> for MasterRecord {
    fn from(entry: MasterEntry) -> Self {
        MasterRecord {
            id: entry.id,
            anchor_date: entry.anchor_date,
            name: entry.name,
            amount: entry.amount,
            kind: entry.kind,
            category: entry.category,
            recurrence_rule: entry.recurrence,
            recurrence_end: entry.recurrence_end,
            is_auto_pay: entry.is_auto_pay,
            is_paid: entry.is_paid,
            order: entry.order,
            exceptions: entry
                .exceptions
                .into_iter()
                .map(|(date, slot)| (date, ExceptionRecord::from(slot)))
                .collect(),
        }
    }
}

/// Parse a master entry from its persisted JSON text.
///
/// # Errors
///
/// Returns [`CadenceError::Json`] for malformed JSON or unknown enum values,
/// including exception-shape violations reported by [`parse_slot`].
///
/// # Examples
///
/// ```
/// use cadence_engine::record::parse_master;
/// use cadence_engine::Slot;
///
/// let entry = parse_master(r#"{
///     "id": "rent",
///     "anchorDate": "2024-01-31",
///     "name": "Rent",
///     "amount": 1200,
///     "recurrenceRule": "monthly",
///     "exceptions": { "2024-03-31": { "movedFrom": "deleted" } }
/// }"#).unwrap();
/// let date = "2024-03-31".parse().unwrap();
/// assert_eq!(entry.slot(date), Some(&Slot::Deleted));
/// ```
pub fn parse_master(json: &str) -> Result<MasterEntry> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize a master entry back into its persisted JSON shape.
///
/// # Errors
///
/// Returns [`CadenceError::Json`] if serialization fails.
pub fn to_json(entry: &MasterEntry) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(entry)?)
}
