//! # cadence-engine
//!
//! Deterministic scheduling for recurring bills and income.
//!
//! A small persisted record (a [`MasterEntry`]) describes a series: an anchor
//! date, a recurrence rule, an end condition, and per-date exceptions. This
//! crate turns that record into concrete occurrences for any date window, and
//! provides pure edit operators that move, update, or delete one occurrence
//! without disturbing the rest of the series.
//!
//! Nothing here performs I/O or reads the clock. The evaluation instant and
//! timezone are always passed in through an [`EvaluationContext`].
//!
//! ## Modules
//!
//! - [`expander`] — rule + anchor → candidate dates in a window
//! - [`overlay`] — candidate dates + exceptions → materialized [`Instance`]s
//! - [`mutation`] — pure edit operators producing the next [`MasterEntry`]
//! - [`validator`] — advisory move-pair consistency checks
//! - [`record`] — the persisted JSON shape and its conversion to typed slots
//! - [`cache`] — caller-owned memo of materialized windows
//! - [`model`] — core value types
//! - [`error`] — Error types

pub mod cache;
pub mod error;
pub mod expander;
pub mod model;
pub mod mutation;
pub mod overlay;
pub mod record;
pub mod validator;

pub use cache::{CacheKey, ExpansionCache};
pub use error::CadenceError;
pub use expander::{expand, is_occurrence, occurrences, Occurrences};
pub use model::{
    Adjustments, EntryKind, Instance, MasterEntry, Recurrence, RecurrenceEnd, Slot, Stride, Window,
};
pub use mutation::{
    apply_edit, delete_series, delete_single_occurrence, move_one_time, move_series,
    move_single_occurrence, update_series, update_single_occurrence, Edit, OccurrencePatch,
    SeriesPatch,
};
pub use overlay::{expand_instances, materialize, EvaluationContext};
pub use validator::{validate, PairingIssue};
