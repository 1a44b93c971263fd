//! Caller-owned memo of materialized windows.
//!
//! Expansion is referentially transparent, so results can be reused as long
//! as the master entry has not changed. The cache has no notion of change on
//! its own: the caller supplies a revision token (an updated-at stamp, an
//! etag, a counter) and a new token simply misses.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{Instance, MasterEntry, Window};
use crate::overlay::{expand_instances, EvaluationContext};

/// Everything a materialized window depends on.
///
/// Autopay paid status depends on the evaluation date, so the date of "now"
/// in the context timezone is part of the key; the exact instant is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub master_id: String,
    pub revision: String,
    pub window: Window,
    pub as_of: NaiveDate,
}

#[derive(Debug, Default, Clone)]
pub struct ExpansionCache {
    entries: HashMap<CacheKey, Vec<Instance>>,
}

impl ExpansionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instances of `master` over `window`, materializing and
    /// storing them on a miss.
    pub fn get_or_materialize(
        &mut self,
        master: &MasterEntry,
        revision: &str,
        window: Window,
        ctx: &EvaluationContext,
    ) -> &[Instance] {
        let key = CacheKey {
            master_id: master.id.clone(),
            revision: revision.to_string(),
            window,
            as_of: ctx.today(),
        };
        self.entries
            .entry(key)
            .or_insert_with(|| {
                tracing::trace!(master_id = %master.id, revision, "expansion cache miss");
                expand_instances(master, window, ctx)
            })
            .as_slice()
    }

    /// Drop every cached window of `master_id`, whatever its revision.
    pub fn invalidate(&mut self, master_id: &str) {
        self.entries.retain(|key, _| key.master_id != master_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
