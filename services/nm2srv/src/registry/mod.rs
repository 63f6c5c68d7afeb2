//! Ordered device registry
//!
//! Devices are announced by position (`members/N/@id`), so the registry is a
//! plain vector whose indices are the published positions. Each device owns
//! one sensor group per channel family.
//!
//! ```text
//!   position   0        1        2
//!            +------+ +------+ +------+
//!   devices  |  DD  | |  A   | |  B   |   declared_count = 3
//!            +------+ +------+ +------+
//!               |
//!               +-- temperatures [T1, T2]
//!               +-- humidities   [H1]
//!               +-- digitalInputs [C1, C2]
//! ```

pub mod outlet;
pub mod sensor;

pub use outlet::{Outlet, OutletRegistry};
pub use sensor::{Sensor, SensorGroup, SensorKind, SensorState};

use crate::error::{Nm2Error, Result};

/// Default upper bound on sensors per group
pub const DEFAULT_MAX_SENSORS: usize = 32;

/// Insertion point in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    At(usize),
    End,
}

impl From<usize> for Position {
    fn from(value: usize) -> Self {
        Position::At(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    key: String,
    groups: [SensorGroup; 3],
}

impl Device {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            groups: Default::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn group(&self, kind: SensorKind) -> &SensorGroup {
        &self.groups[kind.slot()]
    }

    pub fn group_mut(&mut self, kind: SensorKind) -> &mut SensorGroup {
        &mut self.groups[kind.slot()]
    }
}

#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    declared_count: usize,
    max_sensors: usize,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SENSORS)
    }
}

impl DeviceRegistry {
    pub fn new(max_sensors: usize) -> Self {
        Self {
            devices: Vec::new(),
            declared_count: 0,
            max_sensors,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Device keys in position order
    pub fn keys(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.key.clone()).collect()
    }

    // ==================== Declared count ====================

    pub fn declared_count(&self) -> usize {
        self.declared_count
    }

    pub fn set_declared_count(&mut self, count: usize) {
        self.declared_count = count;
    }

    /// True when `index` is the last position of the announced list
    pub fn completes_declared(&self, index: usize) -> bool {
        self.declared_count > 0 && index + 1 == self.declared_count
    }

    /// Remove every device after `index`, last first
    ///
    /// Returns the removed devices with the position each one held.
    pub fn trim_after(&mut self, index: usize) -> Vec<(usize, Device)> {
        let mut removed = Vec::new();
        while self.devices.len() > index + 1 {
            let position = self.devices.len() - 1;
            if let Some(device) = self.devices.pop() {
                removed.push((position, device));
            }
        }
        removed
    }

    // ==================== Positional operations ====================

    /// Insert `key` so that it ends up at `position`
    pub fn add_device(&mut self, position: Position, key: &str) -> Result<usize> {
        if key.is_empty() {
            return Err(Nm2Error::EmptyKey);
        }
        if self.devices.iter().any(|d| d.key == key) {
            return Err(Nm2Error::DuplicateKey(key.to_string()));
        }
        let index = match position {
            Position::End => self.devices.len(),
            Position::At(p) if p <= self.devices.len() => p,
            Position::At(p) => {
                return Err(Nm2Error::OutOfBounds {
                    index: p,
                    len: self.devices.len(),
                })
            },
        };
        self.devices.insert(index, Device::new(key));
        Ok(index)
    }

    /// Relocate the device at `from`
    ///
    /// Nothing happens when the device currently following `from` is already
    /// the one at `to`. Otherwise the device is taken out and re-inserted at
    /// `to`, counted on the shortened list. Returns whether the order changed.
    pub fn move_device(&mut self, from: usize, to: Position) -> Result<bool> {
        let len = self.devices.len();
        if len == 0 {
            return Err(Nm2Error::EmptyRegistry);
        }
        if from >= len {
            return Err(Nm2Error::OutOfBounds { index: from, len });
        }
        let target = match to {
            Position::End => None,
            Position::At(t) if t < len => Some(t),
            Position::At(t) => return Err(Nm2Error::OutOfBounds { index: t, len }),
        };

        let follower = self.devices.get(from + 1).map(|d| d.key.as_str());
        let occupant = target
            .and_then(|t| self.devices.get(t))
            .map(|d| d.key.as_str());
        if follower == occupant {
            return Ok(false);
        }

        let device = self.devices.remove(from);
        let insert_at = target.unwrap_or(self.devices.len());
        self.devices.insert(insert_at, device);
        Ok(insert_at != from)
    }

    pub fn remove_device(&mut self, position: usize) -> Result<Device> {
        if self.devices.is_empty() {
            return Err(Nm2Error::EmptyRegistry);
        }
        if position >= self.devices.len() {
            return Err(Nm2Error::OutOfBounds {
                index: position,
                len: self.devices.len(),
            });
        }
        Ok(self.devices.remove(position))
    }

    /// Drop every device, returning them in position order
    pub fn remove_all(&mut self) -> Vec<Device> {
        std::mem::take(&mut self.devices)
    }

    pub fn find_index_by_key(&self, key: &str) -> Result<usize> {
        if self.devices.is_empty() {
            return Err(Nm2Error::EmptyRegistry);
        }
        self.devices
            .iter()
            .position(|d| d.key == key)
            .ok_or_else(|| Nm2Error::DeviceNotFound(key.to_string()))
    }

    pub fn find_by_index(&self, position: usize) -> Result<&Device> {
        if self.devices.is_empty() {
            return Err(Nm2Error::EmptyRegistry);
        }
        self.devices.get(position).ok_or(Nm2Error::OutOfBounds {
            index: position,
            len: self.devices.len(),
        })
    }

    fn find_by_index_mut(&mut self, position: usize) -> Result<&mut Device> {
        let len = self.devices.len();
        if len == 0 {
            return Err(Nm2Error::EmptyRegistry);
        }
        self.devices.get_mut(position).ok_or(Nm2Error::OutOfBounds {
            index: position,
            len,
        })
    }

    // ==================== Sensors ====================

    /// (Re)allocate the group of `kind` with exactly `count` unkeyed slots
    ///
    /// Returns the previous slot count.
    pub fn add_sensors(&mut self, device_key: &str, kind: SensorKind, count: usize) -> Result<usize> {
        if count > self.max_sensors {
            return Err(Nm2Error::CapacityExceeded {
                requested: count,
                limit: self.max_sensors,
            });
        }
        let position = self.find_index_by_key(device_key)?;
        let group = self.find_by_index_mut(position)?.group_mut(kind);
        let previous = group.len();
        *group = SensorGroup::with_count(count);
        Ok(previous)
    }

    /// Key the slot at `index`
    ///
    /// Returns `true` when the slot was unkeyed before. Re-announcing the key
    /// a slot already carries is accepted and returns `false`.
    pub fn init_sensor(
        &mut self,
        device_key: &str,
        kind: SensorKind,
        index: usize,
        key: &str,
    ) -> Result<bool> {
        if key.is_empty() {
            return Err(Nm2Error::EmptyKey);
        }
        let position = self.find_index_by_key(device_key)?;
        let group = self.find_by_index_mut(position)?.group_mut(kind);
        let len = group.len();
        let sensor = group
            .get_mut(index)
            .ok_or(Nm2Error::OutOfBounds { index, len })?;
        match &sensor.key {
            None => {
                sensor.key = Some(key.to_string());
                Ok(true)
            },
            Some(existing) if existing == key => Ok(false),
            Some(existing) => Err(Nm2Error::SlotAlreadyKeyed {
                index,
                existing: existing.clone(),
            }),
        }
    }

    pub fn find_sensor_index(&self, position: usize, kind: SensorKind, key: &str) -> Result<usize> {
        self.find_by_index(position)?
            .group(kind)
            .position_of(key)
            .ok_or_else(|| Nm2Error::SensorNotFound(format!("{}/{}", kind, key)))
    }

    /// Resolve device and sensor keys to positions
    pub fn resolve_sensor(
        &self,
        device_key: &str,
        kind: SensorKind,
        sensor_key: &str,
    ) -> Result<(usize, usize)> {
        let position = self.find_index_by_key(device_key)?;
        let index = self.find_sensor_index(position, kind, sensor_key)?;
        Ok((position, index))
    }

    /// Set the tri-state flag, returning the previous one
    pub fn set_sensor_state(
        &mut self,
        position: usize,
        kind: SensorKind,
        index: usize,
        state: SensorState,
    ) -> Result<SensorState> {
        let group = self.find_by_index_mut(position)?.group_mut(kind);
        let len = group.len();
        let sensor = group
            .get_mut(index)
            .ok_or(Nm2Error::OutOfBounds { index, len })?;
        Ok(std::mem::replace(&mut sensor.state, state))
    }

    pub fn get_sensor_state(
        &self,
        position: usize,
        kind: SensorKind,
        index: usize,
    ) -> Result<SensorState> {
        let group = self.find_by_index(position)?.group(kind);
        group
            .get(index)
            .map(|s| s.state)
            .ok_or(Nm2Error::OutOfBounds {
                index,
                len: group.len(),
            })
    }
}
