//! Published key names
//!
//! Every name the bridge writes is built here from 0-based positions; the
//! rendered names carry 1-based indices.
//!
//! ```
//! use nm2srv::keyspace::KeySpace;
//! use nm2srv::registry::SensorKind;
//!
//! let ks = KeySpace::default();
//! assert_eq!(ks.device(0, "mfr"), "ambient.1.mfr");
//! assert_eq!(ks.sensor(1, SensorKind::Temperature, 0, Some("name")), "ambient.2.temperature.name");
//! assert_eq!(ks.sensor(1, SensorKind::DigitalInput, 1, Some("config")), "ambient.2.contacts.2.config");
//! assert_eq!(ks.outlet(2, "switchable"), "outlet.3.switchable");
//! ```

use crate::error::{Nm2Error, Result};
use crate::registry::SensorKind;
use serde::{Deserialize, Serialize};

/// Device fields renumbered or deleted with the device
pub const DEVICE_FIELDS: [&str; 7] = ["key", "firmware", "mfr", "model", "name", "present", "serial"];

/// Fields of the single temperature or humidity entry; `None` is the value itself
pub const SENSOR_FIELDS: [Option<&str>; 7] = [
    None,
    Some("name"),
    Some("low.critical"),
    Some("low.warning"),
    Some("high.critical"),
    Some("high.warning"),
    Some("status"),
];

/// Fields of each contact
pub const CONTACT_FIELDS: [&str; 3] = ["name", "config", "status"];

/// Key naming configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeySpace {
    /// Ambient device prefix (`ambient`)
    #[serde(default = "default_ambient_prefix")]
    pub ambient_prefix: String,

    /// Outlet prefix (`outlet`)
    #[serde(default = "default_outlet_prefix")]
    pub outlet_prefix: String,

    /// Global alarm channel (`ups.alarm`)
    #[serde(default = "default_alarm_key")]
    pub alarm_key: String,

    /// Global status channel (`ups.status`)
    #[serde(default = "default_status_key")]
    pub status_key: String,
}

fn default_ambient_prefix() -> String {
    "ambient".to_string()
}

fn default_outlet_prefix() -> String {
    "outlet".to_string()
}

fn default_alarm_key() -> String {
    "ups.alarm".to_string()
}

fn default_status_key() -> String {
    "ups.status".to_string()
}

impl Default for KeySpace {
    fn default() -> Self {
        Self {
            ambient_prefix: default_ambient_prefix(),
            outlet_prefix: default_outlet_prefix(),
            alarm_key: default_alarm_key(),
            status_key: default_status_key(),
        }
    }
}

impl KeySpace {
    /// `ambient.{position+1}.{field}`
    pub fn device(&self, position: usize, field: &str) -> String {
        format!("{}.{}.{}", self.ambient_prefix, position + 1, field)
    }

    /// Sensor entry of a device
    ///
    /// Temperature and humidity collapse to `ambient.N.temperature[.field]`;
    /// contacts keep their index, `ambient.N.contacts.M[.field]`.
    pub fn sensor(
        &self,
        position: usize,
        kind: SensorKind,
        index: usize,
        field: Option<&str>,
    ) -> String {
        let base = if kind.is_indexed() {
            format!(
                "{}.{}.{}.{}",
                self.ambient_prefix,
                position + 1,
                kind.object_name(),
                index + 1
            )
        } else {
            format!(
                "{}.{}.{}",
                self.ambient_prefix,
                position + 1,
                kind.object_name()
            )
        };
        match field {
            Some(field) => format!("{}.{}", base, field),
            None => base,
        }
    }

    /// `outlet.{index+1}.{field}`
    pub fn outlet(&self, index: usize, field: &str) -> String {
        format!("{}.{}.{}", self.outlet_prefix, index + 1, field)
    }

    /// Every name tied to a device position, in a fixed order
    ///
    /// Lists for two positions with the same `contacts` line up index by
    /// index, which is what renumbering relies on.
    pub fn device_object_keys(&self, position: usize, contacts: usize) -> Vec<String> {
        let mut keys: Vec<String> = DEVICE_FIELDS
            .iter()
            .map(|field| self.device(position, field))
            .collect();
        for kind in [SensorKind::Temperature, SensorKind::Humidity] {
            keys.extend(
                SENSOR_FIELDS
                    .iter()
                    .map(|field| self.sensor(position, kind, 0, *field)),
            );
        }
        for index in 0..contacts {
            keys.extend(self.contact_keys(position, index));
        }
        keys
    }

    /// Every field of contact `index` on the device at `position`
    pub fn contact_keys(&self, position: usize, index: usize) -> impl Iterator<Item = String> + '_ {
        CONTACT_FIELDS
            .iter()
            .map(move |field| self.sensor(position, SensorKind::DigitalInput, index, Some(field)))
    }

    /// Names hidden when a sensor is disabled
    pub fn disabled_sensor_keys(&self, position: usize, kind: SensorKind, index: usize) -> Vec<String> {
        if kind.is_indexed() {
            vec![self.sensor(position, kind, index, Some("status"))]
        } else {
            vec![
                self.sensor(position, kind, index, None),
                self.sensor(position, kind, index, Some("status")),
            ]
        }
    }
}

/// Output name of a dispatch rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTemplate {
    /// Written as-is
    Fixed(&'static str),
    /// Device field, `ambient.N.<field>`
    Device(&'static str),
    /// Sensor entry with optional field, see [`KeySpace::sensor`]
    Sensor(Option<&'static str>),
    /// Outlet field, `outlet.N.<field>`
    Outlet(&'static str),
}

/// What a template is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTarget {
    Global,
    Device(usize),
    Sensor {
        position: usize,
        kind: SensorKind,
        index: usize,
    },
    Outlet(usize),
}

impl KeyTarget {
    fn name(&self) -> &'static str {
        match self {
            KeyTarget::Global => "global",
            KeyTarget::Device(_) => "device",
            KeyTarget::Sensor { .. } => "sensor",
            KeyTarget::Outlet(_) => "outlet",
        }
    }
}

impl KeyTemplate {
    pub fn render(&self, keyspace: &KeySpace, target: KeyTarget) -> Result<String> {
        match (*self, target) {
            (KeyTemplate::Fixed(name), _) => Ok(name.to_string()),
            (KeyTemplate::Device(field), KeyTarget::Device(position))
            | (KeyTemplate::Device(field), KeyTarget::Sensor { position, .. }) => {
                Ok(keyspace.device(position, field))
            },
            (
                KeyTemplate::Sensor(field),
                KeyTarget::Sensor {
                    position,
                    kind,
                    index,
                },
            ) => Ok(keyspace.sensor(position, kind, index, field)),
            (KeyTemplate::Outlet(field), KeyTarget::Outlet(index)) => {
                Ok(keyspace.outlet(index, field))
            },
            (template, target) => Err(Nm2Error::TemplateMismatch {
                template: format!("{:?}", template),
                target: target.name(),
            }),
        }
    }
}
