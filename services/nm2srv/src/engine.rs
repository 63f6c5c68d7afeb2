//! Per-session engine
//!
//! Owns every registry and the compiled tables. One message is walked,
//! dispatched and, if it completed an alarm snapshot, reconciled before
//! `process_message` returns.

use crate::alarm::{
    Alarm, AlarmReconciler, AlarmRegistry, AlarmSnapshotBuilder, AlarmTable, ReconcileSummary,
};
use crate::config::EngineConfig;
use crate::dispatch::{
    DispatchOutcome, HandlerContext, PathWalker, TopicDispatchTable, TopicFilter,
};
use crate::error::{Nm2Error, Result};
use crate::keyspace::KeySpace;
use crate::registry::{DeviceRegistry, OutletRegistry};
use crate::scalar::coerce;
use nm2_store::StateStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Counters for one inbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageReport {
    /// False when the topic was filtered out
    pub accepted: bool,
    /// Leaves visited
    pub paths: usize,
    /// Leaves some rule matched
    pub matched: usize,
    /// Direct rule writes
    pub written: usize,
    /// Handler calls that succeeded
    pub handled: usize,
    /// Non-scalar leaves
    pub skipped: usize,
    /// Not-found failures, expected during announcements
    pub tolerated: usize,
    pub failed: usize,
    /// Set when the message completed an alarm snapshot
    pub reconciliation: Option<ReconcileSummary>,
}

pub struct Engine {
    store: Arc<dyn StateStore>,
    keyspace: KeySpace,
    devices: DeviceRegistry,
    outlets: OutletRegistry,
    alarms: AlarmRegistry,
    snapshot: AlarmSnapshotBuilder,
    dispatch: TopicDispatchTable,
    alarm_table: AlarmTable,
    topic_filter: TopicFilter,
    walker: PathWalker,
    accept_all_topics: bool,
}

impl Engine {
    pub fn new(store: Arc<dyn StateStore>, config: &EngineConfig) -> Result<Self> {
        let dispatch = TopicDispatchTable::nm2()?;
        let alarm_table = AlarmTable::nm2()?;
        info!(
            "Engine ready: {} dispatch rules, {} alarm rules",
            dispatch.len(),
            alarm_table.len()
        );
        Ok(Self {
            store,
            keyspace: config.keyspace.clone(),
            devices: DeviceRegistry::new(config.max_sensors),
            outlets: OutletRegistry::new(config.max_outlets),
            alarms: AlarmRegistry::new(),
            snapshot: AlarmSnapshotBuilder::new(config.max_alarms),
            dispatch,
            alarm_table,
            topic_filter: TopicFilter::nm2()?,
            walker: PathWalker::default(),
            accept_all_topics: config.accept_all_topics,
        })
    }

    // ==================== Inbound ====================

    /// Handle one `(topic, payload)` message
    ///
    /// Only an unparsable payload or a store failure during reconciliation
    /// is returned as an error; per-path failures are counted in the report.
    pub fn process_message(&mut self, topic: &str, payload: &[u8]) -> Result<MessageReport> {
        if !self.accept_all_topics && !self.topic_filter.accepts(topic) {
            trace!("Ignoring topic {}", topic);
            return Ok(MessageReport::default());
        }
        let document: Value =
            serde_json::from_slice(payload).map_err(|e| Nm2Error::MalformedPayload {
                topic: topic.to_string(),
                message: e.to_string(),
            })?;
        self.process_document(topic, &document)
    }

    /// Handle an already parsed payload, bypassing the topic filter
    pub fn process_document(&mut self, topic: &str, document: &Value) -> Result<MessageReport> {
        let mut report = MessageReport {
            accepted: true,
            ..Default::default()
        };

        let walker = self.walker;
        let table = &self.dispatch;
        let mut ctx = HandlerContext {
            devices: &mut self.devices,
            outlets: &mut self.outlets,
            snapshot: &mut self.snapshot,
            store: self.store.as_ref(),
            keyspace: &self.keyspace,
        };
        let paths = walker.walk(topic, document, &mut |path, leaf| {
            dispatch_leaf(table, &mut ctx, path, leaf, &mut report)
        });
        report.paths = paths;

        if let Some(snapshot) = self.snapshot.take_complete() {
            report.reconciliation = Some(self.reconcile(snapshot)?);
        }

        debug!(
            "{}: {} paths, {} matched, {} failed",
            topic, report.paths, report.matched, report.failed
        );
        Ok(report)
    }

    /// Diff `snapshot` against the known alarms and update the store
    pub fn reconcile(&mut self, snapshot: Vec<Alarm>) -> Result<ReconcileSummary> {
        let reconciler = AlarmReconciler::new(&self.alarm_table, &self.keyspace);
        reconciler.reconcile(
            &mut self.alarms,
            &self.devices,
            self.store.as_ref(),
            snapshot,
        )
    }

    // ==================== Accessors ====================

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keyspace
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn outlets(&self) -> &OutletRegistry {
        &self.outlets
    }

    pub fn alarms(&self) -> &AlarmRegistry {
        &self.alarms
    }

    /// Subscription filters a transport should use
    pub fn subscriptions(&self) -> &'static [&'static str] {
        self.topic_filter.subscriptions()
    }
}

fn dispatch_leaf(
    table: &TopicDispatchTable,
    ctx: &mut HandlerContext<'_>,
    path: &str,
    leaf: &Value,
    report: &mut MessageReport,
) {
    let Some(value) = coerce(leaf) else {
        report.skipped += 1;
        trace!("No conversion for {}", path);
        return;
    };
    match table.dispatch(ctx, path, &value) {
        Ok(DispatchOutcome::Unmatched) => trace!("No rule for {}", path),
        Ok(DispatchOutcome::Written(_)) => {
            report.matched += 1;
            report.written += 1;
        },
        Ok(DispatchOutcome::Handled(_)) => {
            report.matched += 1;
            report.handled += 1;
        },
        Err(e) if e.is_not_found() => {
            report.matched += 1;
            report.tolerated += 1;
            debug!("{} = {} not applied: {}", path, value, e);
        },
        Err(e) => {
            report.matched += 1;
            report.failed += 1;
            warn!("{} = {} failed: {}", path, value, e);
        },
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use nm2_store::helpers::create_test_memory_store;
    use tracing_test::traced_test;

    fn engine() -> (Engine, Arc<nm2_store::MemoryStore>) {
        let store = create_test_memory_store();
        let engine = Engine::new(store.clone(), &EngineConfig::default()).unwrap();
        (engine, store)
    }

    #[test]
    fn test_filtered_topic_is_ignored() {
        let (mut engine, store) = engine();
        let report = engine.process_message("other/topic", b"{\"a\": 1}").unwrap();
        assert!(!report.accepted);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_malformed_payload() {
        let (mut engine, _) = engine();
        let err = engine
            .process_message("mbdetnrs/1.0/sensors/devices", b"{not json")
            .unwrap_err();
        assert!(matches!(err, Nm2Error::MalformedPayload { .. }));
    }

    #[test]
    fn test_identification_message() {
        let (mut engine, store) = engine();
        let report = engine
            .process_message(
                "mbdetnrs/1.0/powerDistributions/1/identification",
                br#"{"vendor": "EATON", "model": "ePDU", "serialNumber": "X1", "uuid": null}"#,
            )
            .unwrap();
        assert_eq!(report.paths, 4);
        assert_eq!(report.written, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.get("device.model").unwrap().as_deref(), Some("ePDU"));
    }

    #[test]
    fn test_unknown_device_is_tolerated() {
        let (mut engine, _) = engine();
        let report = engine
            .process_message(
                "mbdetnrs/1.0/sensors/devices/ghost/identification",
                br#"{"manufacturer": "EATON"}"#,
            )
            .unwrap();
        assert_eq!(report.tolerated, 1);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_empty_alarm_snapshot_reconciles() {
        let (mut engine, _) = engine();
        let report = engine
            .process_message(
                "mbdetnrs/1.0/alarmService/activeAlarms",
                br#"{"members@count": 0, "members": []}"#,
            )
            .unwrap();
        assert_eq!(report.reconciliation, Some(ReconcileSummary::default()));
    }

    #[test]
    #[traced_test]
    fn test_handler_failure_is_logged_and_counted() {
        let (mut engine, _) = engine();
        let report = engine
            .process_message(
                "mbdetnrs/1.0/sensors/devices",
                br#"{"members@count": 1, "members": [{"@id": "no-slash"}]}"#,
            )
            .unwrap();
        assert_eq!(report.failed, 1);
        assert!(logs_contain("expected a path ending in a key"));
    }
}
