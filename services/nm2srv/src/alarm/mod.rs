//! Alarm tracking
//!
//! Active alarms arrive as a complete list (a snapshot) assembled from a
//! count followed by per-field announcements. Each completed snapshot is
//! diffed against the alarms already known:
//!
//! ```text
//!   snapshot        registry            state
//!   --------        --------            -----
//!   id in both  ->  kept            ->  ACTIVE
//!   only new    ->  inserted        ->  NEW
//!   only old    ->  removed         ->  INACTIVE
//! ```
//!
//! Matching rules then update per-object status fields and the global
//! alarm/status channels.

pub mod reconciler;
pub mod registry;
pub mod rules;
pub mod snapshot;

pub use reconciler::{AlarmReconciler, AlarmState, ReconcileSummary};
pub use registry::{Alarm, AlarmRegistry};
pub use rules::{code_list_contains, AlarmAction, AlarmRule, AlarmRuleSpec, AlarmTable};
pub use snapshot::{AlarmField, AlarmSnapshotBuilder};
