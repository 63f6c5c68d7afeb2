//! Three-state alarm reconciliation
//!
//! States are not stored; they fall out of comparing a snapshot with the
//! registry on every pass. Object fields change only on NEW and INACTIVE,
//! while the two global channels are rebuilt from every present alarm, so
//! replaying the same snapshot leaves the store untouched.

use super::registry::{Alarm, AlarmRegistry};
use super::rules::{AlarmAction, AlarmTable};
use crate::error::{Nm2Error, Result};
use crate::keyspace::{KeySpace, KeyTarget, KeyTemplate};
use crate::registry::{DeviceRegistry, SensorKind, SensorState};
use nm2_store::StateStore;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    New,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub new: usize,
    pub active: usize,
    pub inactive: usize,
    /// Alarms no rule applies to
    pub unmatched: usize,
    /// Object writes skipped because the device or sensor is unknown
    pub tolerated: usize,
    pub failed: usize,
}

/// Ordered, de-duplicated entries for one global channel
#[derive(Debug, Default)]
struct ChannelBatch {
    entries: Vec<&'static str>,
}

impl ChannelBatch {
    fn push(&mut self, entry: &'static str) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct AlarmReconciler<'a> {
    table: &'a AlarmTable,
    keyspace: &'a KeySpace,
}

impl<'a> AlarmReconciler<'a> {
    pub fn new(table: &'a AlarmTable, keyspace: &'a KeySpace) -> Self {
        Self { table, keyspace }
    }

    /// Diff `snapshot` against `known`, apply the matching rules and commit
    /// the global channels
    pub fn reconcile(
        &self,
        known: &mut AlarmRegistry,
        devices: &DeviceRegistry,
        store: &dyn StateStore,
        snapshot: Vec<Alarm>,
    ) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        let mut seen = HashSet::with_capacity(snapshot.len());
        let mut present = Vec::with_capacity(snapshot.len());
        for alarm in snapshot {
            if alarm.id.trim().is_empty() {
                summary.failed += 1;
                warn!("Alarm without id (code {} on {}) ignored", alarm.code, alarm.topic);
                continue;
            }
            if !seen.insert(alarm.id.clone()) {
                warn!("Duplicate alarm id {} in snapshot, ignored", alarm.id);
                continue;
            }
            match known.find(&alarm.id) {
                Some(existing) => present.push((existing.clone(), AlarmState::Active)),
                None => present.push((alarm, AlarmState::New)),
            }
        }

        // Nothing below may return early until the channels are committed
        let gone = known.drain_absent(|alarm| seen.contains(&alarm.id));

        present.retain(|(alarm, state)| {
            if *state != AlarmState::New {
                return true;
            }
            match known.add(alarm.clone()) {
                Ok(()) => true,
                Err(e) => {
                    summary.failed += 1;
                    warn!("Alarm {} not tracked: {}", alarm.id, e);
                    false
                },
            }
        });

        let mut alarms = ChannelBatch::default();
        let mut status = ChannelBatch::default();
        let processed = present
            .iter()
            .map(|(alarm, state)| (alarm, *state))
            .chain(gone.iter().map(|alarm| (alarm, AlarmState::Inactive)));

        for (alarm, state) in processed {
            match state {
                AlarmState::New => summary.new += 1,
                AlarmState::Active => summary.active += 1,
                AlarmState::Inactive => summary.inactive += 1,
            }
            self.apply(alarm, state, devices, store, &mut alarms, &mut status, &mut summary);
        }

        self.commit(store, &alarms, &status)?;

        if summary.new > 0 || summary.inactive > 0 {
            info!(
                "Alarms: {} new, {} active, {} cleared",
                summary.new, summary.active, summary.inactive
            );
        } else {
            debug!("Alarms unchanged: {} active", summary.active);
        }
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        alarm: &Alarm,
        state: AlarmState,
        devices: &DeviceRegistry,
        store: &dyn StateStore,
        alarms: &mut ChannelBatch,
        status: &mut ChannelBatch,
        summary: &mut ReconcileSummary,
    ) {
        let mut matched = false;
        for (rule, params) in self.table.matching(&alarm.code, &alarm.topic) {
            matched = true;
            for action in rule.actions() {
                match (*action, state) {
                    (
                        AlarmAction::Object {
                            template,
                            raised,
                            cleared,
                        },
                        AlarmState::New | AlarmState::Inactive,
                    ) => {
                        let value = if state == AlarmState::New {
                            raised
                        } else {
                            cleared
                        };
                        match self.write_object(template, value, &params, devices, store) {
                            Ok(()) => {},
                            Err(e) if e.is_not_found() => {
                                summary.tolerated += 1;
                                debug!("Alarm {} object skipped: {}", alarm.id, e);
                            },
                            Err(e) => {
                                summary.failed += 1;
                                warn!("Alarm {} object update failed: {}", alarm.id, e);
                            },
                        }
                    },
                    (AlarmAction::Alarm(text), AlarmState::New | AlarmState::Active) => {
                        alarms.push(text)
                    },
                    (AlarmAction::Status(flag), AlarmState::New | AlarmState::Active) => {
                        status.push(flag)
                    },
                    _ => {},
                }
            }
        }
        if !matched {
            summary.unmatched += 1;
            debug!("No rule for alarm {} code {} on {}", alarm.id, alarm.code, alarm.topic);
        }
    }

    fn write_object(
        &self,
        template: KeyTemplate,
        value: &str,
        params: &[String],
        devices: &DeviceRegistry,
        store: &dyn StateStore,
    ) -> Result<()> {
        let target = match template {
            KeyTemplate::Device(_) => {
                expect_params(params, 1)?;
                KeyTarget::Device(devices.find_index_by_key(&params[0])?)
            },
            KeyTemplate::Sensor(_) => {
                expect_params(params, 3)?;
                let kind: SensorKind = params[1].parse()?;
                let (position, index) = devices.resolve_sensor(&params[0], kind, &params[2])?;
                if devices.get_sensor_state(position, kind, index)? == SensorState::Disabled {
                    debug!("Sensor {}/{} disabled, status left alone", kind, params[2]);
                    return Ok(());
                }
                KeyTarget::Sensor {
                    position,
                    kind,
                    index,
                }
            },
            KeyTemplate::Fixed(_) | KeyTemplate::Outlet(_) => KeyTarget::Global,
        };
        let key = template.render(self.keyspace, target)?;
        store.set(&key, value)?;
        debug!("Alarm object {} = {}", key, value);
        Ok(())
    }

    fn commit(
        &self,
        store: &dyn StateStore,
        alarms: &ChannelBatch,
        status: &ChannelBatch,
    ) -> Result<()> {
        if alarms.is_empty() {
            store.del(&self.keyspace.alarm_key)?;
        } else {
            let text = alarms
                .entries
                .iter()
                .map(|entry| format!("[{}]", entry))
                .collect::<Vec<_>>()
                .join(" ");
            store.set(&self.keyspace.alarm_key, &text)?;
        }

        let mut flags: Vec<&str> = status.entries.clone();
        if !alarms.is_empty() {
            flags.push("ALARM");
        }
        if flags.is_empty() {
            store.del(&self.keyspace.status_key)?;
        } else {
            store.set(&self.keyspace.status_key, &flags.join(" "))?;
        }
        Ok(())
    }
}

fn expect_params(params: &[String], expected: usize) -> Result<()> {
    if params.len() != expected {
        return Err(Nm2Error::InvalidParams {
            expected,
            got: params.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::registry::Position;
    use nm2_store::MemoryStore;

    const T1_TOPIC: &str = "mbdetnrs/1.0/sensors/devices/dev-a/channels/temperatures/T1";

    fn devices() -> DeviceRegistry {
        let mut devices = DeviceRegistry::default();
        devices.add_device(Position::End, "dev-a").unwrap();
        devices
            .add_sensors("dev-a", SensorKind::Temperature, 1)
            .unwrap();
        devices
            .init_sensor("dev-a", SensorKind::Temperature, 0, "T1")
            .unwrap();
        devices
    }

    #[test]
    fn test_three_snapshot_lifecycle() {
        let table = AlarmTable::nm2().unwrap();
        let keyspace = KeySpace::default();
        let reconciler = AlarmReconciler::new(&table, &keyspace);
        let devices = devices();
        let store = MemoryStore::new();
        let mut known = AlarmRegistry::new();

        let snapshot = vec![Alarm::new("A", 2, "1203", T1_TOPIC)];
        let summary = reconciler
            .reconcile(&mut known, &devices, &store, snapshot.clone())
            .unwrap();
        assert_eq!(summary.new, 1);
        assert_eq!(
            store.get("ambient.1.temperature.status").unwrap().as_deref(),
            Some("critical-high")
        );
        assert_eq!(
            store.get("ups.alarm").unwrap().as_deref(),
            Some("[Ambient temperature high critical]")
        );
        assert_eq!(store.get("ups.status").unwrap().as_deref(), Some("ALARM"));

        // Same snapshot: object field not rewritten
        store.set("ambient.1.temperature.status", "marker").unwrap();
        let summary = reconciler
            .reconcile(&mut known, &devices, &store, snapshot)
            .unwrap();
        assert_eq!(summary.active, 1);
        assert_eq!(summary.new, 0);
        assert_eq!(
            store.get("ambient.1.temperature.status").unwrap().as_deref(),
            Some("marker")
        );

        let summary = reconciler
            .reconcile(&mut known, &devices, &store, Vec::new())
            .unwrap();
        assert_eq!(summary.inactive, 1);
        assert!(known.is_empty());
        assert_eq!(
            store.get("ambient.1.temperature.status").unwrap().as_deref(),
            Some("good")
        );
        assert_eq!(store.get("ups.alarm").unwrap(), None);
        assert_eq!(store.get("ups.status").unwrap(), None);
    }

    #[test]
    fn test_conservation() {
        let table = AlarmTable::nm2().unwrap();
        let keyspace = KeySpace::default();
        let reconciler = AlarmReconciler::new(&table, &keyspace);
        let devices = devices();
        let store = MemoryStore::new();
        let mut known = AlarmRegistry::new();

        reconciler
            .reconcile(
                &mut known,
                &devices,
                &store,
                vec![
                    Alarm::new("A", 1, "2001", "mbdetnrs/1.0/powerDistributions/1/inputs/1"),
                    Alarm::new("B", 1, "9999", "nowhere"),
                ],
            )
            .unwrap();

        let summary = reconciler
            .reconcile(
                &mut known,
                &devices,
                &store,
                vec![
                    Alarm::new("B", 1, "9999", "nowhere"),
                    Alarm::new("C", 1, "3000", "mbdetnrs/1.0/powerDistributions/1/inputs/1/batteries"),
                ],
            )
            .unwrap();

        // |New| + |Active| == snapshot size, |Inactive| == known minus retained
        assert_eq!(summary.new + summary.active, 2);
        assert_eq!(summary.inactive, 1);
        assert_eq!(summary.unmatched, 1);
        let ids: Vec<&str> = known.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C"]);
        assert_eq!(
            store.get("ups.status").unwrap().as_deref(),
            Some("RB ALARM")
        );
        assert_eq!(
            store.get("ups.alarm").unwrap().as_deref(),
            Some("[Replace battery]")
        );
    }

    #[test]
    fn test_unknown_device_is_tolerated() {
        let table = AlarmTable::nm2().unwrap();
        let keyspace = KeySpace::default();
        let reconciler = AlarmReconciler::new(&table, &keyspace);
        let devices = DeviceRegistry::default();
        let store = MemoryStore::new();
        let mut known = AlarmRegistry::new();

        let summary = reconciler
            .reconcile(
                &mut known,
                &devices,
                &store,
                vec![Alarm::new("A", 2, "1203", T1_TOPIC)],
            )
            .unwrap();
        assert_eq!(summary.tolerated, 1);
        assert_eq!(summary.failed, 0);
        // Global channels still follow the snapshot
        assert!(store.get("ups.alarm").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_ids_in_snapshot() {
        let table = AlarmTable::nm2().unwrap();
        let keyspace = KeySpace::default();
        let reconciler = AlarmReconciler::new(&table, &keyspace);
        let store = MemoryStore::new();
        let mut known = AlarmRegistry::new();

        let summary = reconciler
            .reconcile(
                &mut known,
                &devices(),
                &store,
                vec![
                    Alarm::new("A", 2, "1203", T1_TOPIC),
                    Alarm::new("A", 2, "1203", T1_TOPIC),
                ],
            )
            .unwrap();
        assert_eq!(summary.new, 1);
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn test_alarm_without_id_still_clears_previous() {
        let table = AlarmTable::nm2().unwrap();
        let keyspace = KeySpace::default();
        let reconciler = AlarmReconciler::new(&table, &keyspace);
        let devices = devices();
        let store = MemoryStore::new();
        let mut known = AlarmRegistry::new();

        reconciler
            .reconcile(&mut known, &devices, &store, vec![Alarm::new("a1", 2, "1203", T1_TOPIC)])
            .unwrap();

        let summary = reconciler
            .reconcile(&mut known, &devices, &store, vec![Alarm::new("", 2, "1203", T1_TOPIC)])
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.inactive, 1);
        assert_eq!(summary.new, 0);
        assert!(known.is_empty());
        assert_eq!(
            store.get("ambient.1.temperature.status").unwrap().as_deref(),
            Some("good")
        );
        assert_eq!(store.get("ups.alarm").unwrap(), None);
        assert_eq!(store.get("ups.status").unwrap(), None);

        let summary = reconciler
            .reconcile(&mut known, &devices, &store, Vec::new())
            .unwrap();
        assert_eq!(summary, ReconcileSummary::default());
        assert_eq!(
            store.get("ambient.1.temperature.status").unwrap().as_deref(),
            Some("good")
        );
    }
}
