//! Sensor types owned by a device

use crate::error::{Nm2Error, Result};
use std::fmt;
use std::str::FromStr;

/// Channel family a sensor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Temperature,
    Humidity,
    DigitalInput,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::DigitalInput,
    ];

    /// Channel collection name on the wire
    pub fn channel_name(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperatures",
            SensorKind::Humidity => "humidities",
            SensorKind::DigitalInput => "digitalInputs",
        }
    }

    /// Segment used in published key names
    pub fn object_name(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::DigitalInput => "contacts",
        }
    }

    /// Temperature and humidity publish one entry per device; contacts carry their index
    pub fn is_indexed(self) -> bool {
        matches!(self, SensorKind::DigitalInput)
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            SensorKind::Temperature => 0,
            SensorKind::Humidity => 1,
            SensorKind::DigitalInput => 2,
        }
    }
}

impl FromStr for SensorKind {
    type Err = Nm2Error;

    fn from_str(s: &str) -> Result<Self> {
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.channel_name() == s)
            .ok_or_else(|| Nm2Error::UnknownSensorKind(s.to_string()))
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel_name())
    }
}

/// Tri-state enable flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorState {
    #[default]
    Unknown,
    Enabled,
    Disabled,
}

impl SensorState {
    /// `"1"` enables, anything else disables
    pub fn from_flag(value: &str) -> Self {
        if value == "1" {
            SensorState::Enabled
        } else {
            SensorState::Disabled
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sensor {
    pub key: Option<String>,
    pub state: SensorState,
}

/// Fixed-size set of sensors of one kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorGroup {
    sensors: Vec<Sensor>,
}

impl SensorGroup {
    /// `count` unkeyed slots in the unknown state
    pub fn with_count(count: usize) -> Self {
        Self {
            sensors: vec![Sensor::default(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sensor> {
        self.sensors.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Sensor> {
        self.sensors.get_mut(index)
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.sensors
            .iter()
            .position(|s| s.key.as_deref() == Some(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }
}
