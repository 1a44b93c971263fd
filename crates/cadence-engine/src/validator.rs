//! Advisory consistency checks for move pairs.
//!
//! Nothing here is needed at runtime and nothing is repaired: [`validate`]
//! reports what it finds and logs each finding at warn level.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::model::{MasterEntry, Slot};

/// One pairing inconsistency found on a master entry.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PairingIssue {
    #[error("{origin} is moved to {target}, but {target} does not point back")]
    MissingBackReference { origin: NaiveDate, target: NaiveDate },

    #[error("{target} is claimed as a move target by {origins:?}")]
    DuplicateLanding {
        target: NaiveDate,
        origins: Vec<NaiveDate>,
    },

    #[error("{target} claims to come from {origin}, but {origin} is not moved there")]
    OrphanedMoveIn { origin: NaiveDate, target: NaiveDate },
}

/// Scan `master` for broken move pairs.
///
/// A `movedTo` whose target has since been deleted is not reported: the moved
/// occurrence was deleted where it landed.
pub fn validate(master: &MasterEntry) -> Vec<PairingIssue> {
    let mut issues = Vec::new();
    let mut claims: BTreeMap<NaiveDate, Vec<NaiveDate>> = BTreeMap::new();

    for (&date, slot) in &master.exceptions {
        match slot {
            Slot::MovedAway { to, .. } => {
                claims.entry(*to).or_default().push(date);
                match master.slot(*to) {
                    Some(Slot::MovedIn { from, .. }) if *from == date => {}
                    Some(Slot::Deleted) => {}
                    _ => issues.push(PairingIssue::MissingBackReference {
                        origin: date,
                        target: *to,
                    }),
                }
            }
            Slot::MovedIn { from, .. } => match master.slot(*from) {
                Some(Slot::MovedAway { to, .. }) if *to == date => {}
                _ => issues.push(PairingIssue::OrphanedMoveIn {
                    origin: *from,
                    target: date,
                }),
            },
            Slot::Overridden(_) | Slot::Deleted => {}
        }
    }

    issues.extend(
        claims
            .into_iter()
            .filter(|(_, origins)| origins.len() > 1)
            .map(|(target, origins)| PairingIssue::DuplicateLanding { target, origins }),
    );

    for issue in &issues {
        tracing::warn!(master_id = %master.id, %issue, "move pairing inconsistency");
    }
    issues
}
