//! Known alarms keyed by id

use crate::error::{Nm2Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    pub level: i64,
    pub code: String,
    /// Topic of the object the alarm is raised on
    pub topic: String,
}

impl Alarm {
    pub fn new(
        id: impl Into<String>,
        level: i64,
        code: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            level,
            code: code.into(),
            topic: topic.into(),
        }
    }
}

/// Alarms in first-seen order
#[derive(Debug, Clone, Default)]
pub struct AlarmRegistry {
    alarms: Vec<Alarm>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alarm> {
        self.alarms.iter()
    }

    pub fn add(&mut self, alarm: Alarm) -> Result<()> {
        if alarm.id.is_empty() {
            return Err(Nm2Error::EmptyKey);
        }
        if self.contains(&alarm.id) {
            return Err(Nm2Error::DuplicateKey(alarm.id));
        }
        self.alarms.push(alarm);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.alarms.iter().any(|a| a.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&Alarm> {
        self.alarms.iter().find(|a| a.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Alarm> {
        let index = self.alarms.iter().position(|a| a.id == id)?;
        Some(self.alarms.remove(index))
    }

    pub fn remove_all(&mut self) -> Vec<Alarm> {
        std::mem::take(&mut self.alarms)
    }

    /// Remove every alarm whose id `keep` rejects, returning them in order
    pub fn drain_absent<F>(&mut self, mut keep: F) -> Vec<Alarm>
    where
        F: FnMut(&Alarm) -> bool,
    {
        let (kept, dropped): (Vec<Alarm>, Vec<Alarm>) =
            std::mem::take(&mut self.alarms).into_iter().partition(|a| keep(a));
        self.alarms = kept;
        dropped
    }
}
