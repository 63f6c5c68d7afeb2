//! Snapshot assembly from count + field announcements
//!
//! `activeAlarms/members@count` opens a snapshot with that many slots; each
//! `members/N/<field>` fills one field of one slot. Announcements may be
//! spread over several messages.

use super::registry::Alarm;
use crate::error::{Nm2Error, Result};

/// Default upper bound on alarms per snapshot
pub const DEFAULT_MAX_ALARMS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmField {
    Id,
    Level,
    Code,
    /// Topic of the object the alarm is raised on (`device/@id`)
    Topic,
}

#[derive(Debug, Clone, Default)]
struct PendingAlarm {
    id: Option<String>,
    level: Option<i64>,
    code: Option<String>,
    topic: Option<String>,
}

impl PendingAlarm {
    fn is_complete(&self) -> bool {
        self.id.is_some() && self.code.is_some() && self.topic.is_some()
    }

    fn into_alarm(self) -> Option<Alarm> {
        Some(Alarm {
            id: self.id?,
            level: self.level.unwrap_or(0),
            code: self.code?,
            topic: self.topic?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AlarmSnapshotBuilder {
    slots: Option<Vec<PendingAlarm>>,
    max_alarms: usize,
}

impl Default for AlarmSnapshotBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ALARMS)
    }
}

impl AlarmSnapshotBuilder {
    pub fn new(max_alarms: usize) -> Self {
        Self {
            slots: None,
            max_alarms,
        }
    }

    /// Start a snapshot of `count` alarms, dropping any unfinished one
    pub fn begin(&mut self, count: usize) -> Result<()> {
        if count > self.max_alarms {
            self.slots = None;
            return Err(Nm2Error::CapacityExceeded {
                requested: count,
                limit: self.max_alarms,
            });
        }
        self.slots = Some(vec![PendingAlarm::default(); count]);
        Ok(())
    }

    pub fn set_field(&mut self, index: usize, field: AlarmField, value: &str) -> Result<()> {
        let slots = self.slots.as_mut().ok_or(Nm2Error::OutOfBounds { index, len: 0 })?;
        let len = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(Nm2Error::OutOfBounds { index, len })?;
        match field {
            AlarmField::Id => slot.id = Some(value.to_string()),
            AlarmField::Code => slot.code = Some(value.to_string()),
            AlarmField::Topic => slot.topic = Some(value.to_string()),
            AlarmField::Level => {
                let level = value
                    .parse::<i64>()
                    .map_err(|e| Nm2Error::invalid_value(value, e.to_string()))?;
                slot.level = Some(level);
            },
        }
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.slots.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.slots
            .as_ref()
            .is_some_and(|slots| slots.iter().all(PendingAlarm::is_complete))
    }

    /// Hand out the finished snapshot and reset
    pub fn take_complete(&mut self) -> Option<Vec<Alarm>> {
        if !self.is_complete() {
            return None;
        }
        let slots = self.slots.take()?;
        Some(slots.into_iter().filter_map(PendingAlarm::into_alarm).collect())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_complete_after_all_required_fields() {
        let mut builder = AlarmSnapshotBuilder::default();
        builder.begin(2).unwrap();
        for i in 0..2 {
            builder.set_field(i, AlarmField::Id, &format!("a{}", i)).unwrap();
            builder.set_field(i, AlarmField::Code, "1203").unwrap();
        }
        assert!(builder.take_complete().is_none());

        builder.set_field(0, AlarmField::Topic, "t0").unwrap();
        builder.set_field(1, AlarmField::Topic, "t1").unwrap();
        builder.set_field(1, AlarmField::Level, "3").unwrap();

        let alarms = builder.take_complete().unwrap();
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0].level, 0);
        assert_eq!(alarms[1].level, 3);
        assert!(!builder.is_pending());
    }

    #[test]
    fn test_empty_snapshot_is_complete() {
        let mut builder = AlarmSnapshotBuilder::default();
        assert!(!builder.is_complete());
        builder.begin(0).unwrap();
        assert_eq!(builder.take_complete().unwrap(), Vec::<Alarm>::new());
    }

    #[test]
    fn test_field_errors() {
        let mut builder = AlarmSnapshotBuilder::new(4);
        assert!(matches!(
            builder.set_field(0, AlarmField::Id, "a"),
            Err(Nm2Error::OutOfBounds { index: 0, len: 0 })
        ));
        builder.begin(1).unwrap();
        assert!(matches!(
            builder.set_field(1, AlarmField::Id, "a"),
            Err(Nm2Error::OutOfBounds { index: 1, len: 1 })
        ));
        assert!(matches!(
            builder.set_field(0, AlarmField::Level, "high"),
            Err(Nm2Error::InvalidValue { .. })
        ));
        assert!(matches!(
            builder.begin(5),
            Err(Nm2Error::CapacityExceeded { .. })
        ));
        assert!(!builder.is_pending());
    }
}
