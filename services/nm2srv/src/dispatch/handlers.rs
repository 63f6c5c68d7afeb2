//! Typed handlers behind dispatch rules
//!
//! Each handler receives the rule's output template, the coerced value and
//! the pattern captures. Capture counts are part of each handler's contract
//! and are checked before anything is touched.

use crate::alarm::{AlarmField, AlarmSnapshotBuilder};
use crate::error::{Nm2Error, Result};
use crate::keyspace::{KeySpace, KeyTarget, KeyTemplate};
use crate::registry::{Device, DeviceRegistry, OutletRegistry, Position, SensorKind, SensorState};
use nm2_store::numfmt::kelvin_to_celsius;
use nm2_store::StateStore;
use tracing::{debug, info};

/// Topic prefix outlets are resolved under
pub const OUTLET_TOPIC_PREFIX: &str = "mbdetnrs/1.0/powerDistributions/1/outlets/";

const CONTACT_CONFIG: [&str; 2] = ["normal-opened", "normal-closed"];
const CONTACT_STATUS: [&str; 2] = ["active", "inactive"];
const PRESENCE: [&str; 2] = ["no", "yes"];

/// Mutable state a handler may touch
pub struct HandlerContext<'a> {
    pub devices: &'a mut DeviceRegistry,
    pub outlets: &'a mut OutletRegistry,
    pub snapshot: &'a mut AlarmSnapshotBuilder,
    pub store: &'a dyn StateStore,
    pub keyspace: &'a KeySpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    // ========== Sensor devices ==========
    /// `members@count`: declared device count, 0 clears everything
    DeviceCount,
    /// `members/(N)/@id`: place a device at position N
    DeviceIndex,
    /// `(device)/...`: device field
    DeviceData,
    /// `(device)/communication/state`: presence code
    DevicePresence,

    // ========== Sensors ==========
    /// `(device)/channels/(kind)/members@count`
    SensorCount,
    /// `(device)/channels/(kind)/members/(N)/@id`
    SensorIndex,
    /// `(device)/channels/(kind)/(sensor)/...`: sensor field
    SensorData,
    /// `(device)/channels/temperatures/(sensor)/measure/current`: kelvin reading
    TemperatureValue,
    /// `(device)/channels/(kind)/(sensor)/configuration/enabled`
    SensorEnable,
    /// `(device)/channels/digitalInputs/(contact)/configuration/activeLow`
    ContactConfig,
    /// `(device)/channels/digitalInputs/(contact)/measure/active`
    ContactStatus,

    // ========== Outlets ==========
    OutletCount,
    OutletIndex,
    OutletData,
    OutletSwitchable,

    // ========== Alarm snapshot ==========
    AlarmCount,
    AlarmField(AlarmField),
}

impl Handler {
    /// Number of pattern captures the handler expects
    pub fn expected_params(&self) -> usize {
        match self {
            Handler::DeviceCount | Handler::OutletCount | Handler::AlarmCount => 0,
            Handler::DeviceIndex
            | Handler::DeviceData
            | Handler::DevicePresence
            | Handler::OutletIndex
            | Handler::OutletData
            | Handler::OutletSwitchable
            | Handler::AlarmField(_) => 1,
            Handler::SensorCount
            | Handler::TemperatureValue
            | Handler::ContactConfig
            | Handler::ContactStatus => 2,
            Handler::SensorIndex | Handler::SensorData | Handler::SensorEnable => 3,
        }
    }

    pub fn process(
        &self,
        ctx: &mut HandlerContext<'_>,
        template: Option<KeyTemplate>,
        value: &str,
        params: &[String],
    ) -> Result<()> {
        let expected = self.expected_params();
        if params.len() != expected {
            return Err(Nm2Error::InvalidParams {
                expected,
                got: params.len(),
            });
        }

        match self {
            Handler::DeviceCount => device_count(ctx, value),
            Handler::DeviceIndex => device_index(ctx, value, &params[0]),
            Handler::DeviceData => {
                let position = ctx.devices.find_index_by_key(&params[0])?;
                write(ctx, template, KeyTarget::Device(position), value)
            },
            Handler::DevicePresence => {
                let position = ctx.devices.find_index_by_key(&params[0])?;
                match lookup(&PRESENCE, value)? {
                    Some(text) => write(ctx, template, KeyTarget::Device(position), text),
                    None => Ok(()),
                }
            },
            Handler::SensorCount => {
                let kind: SensorKind = params[1].parse()?;
                let count = parse_count(value)?;
                let previous = ctx.devices.add_sensors(&params[0], kind, count)?;
                if kind == SensorKind::DigitalInput && count < previous {
                    let position = ctx.devices.find_index_by_key(&params[0])?;
                    let keyspace = ctx.keyspace;
                    let stale: Vec<String> = (count..previous)
                        .flat_map(move |index| keyspace.contact_keys(position, index))
                        .collect();
                    ctx.store.del_many(&stale)?;
                }
                debug!("Device {} has {} {}", params[0], count, kind);
                Ok(())
            },
            Handler::SensorIndex => sensor_index(ctx, value, params),
            Handler::SensorData => {
                let kind: SensorKind = params[1].parse()?;
                match enabled_sensor(ctx, &params[0], kind, &params[2])? {
                    Some(target) => write(ctx, template, target, value),
                    None => Ok(()),
                }
            },
            Handler::TemperatureValue => {
                let kelvin: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| Nm2Error::invalid_value(value, "not a number"))?;
                match enabled_sensor(ctx, &params[0], SensorKind::Temperature, &params[1])? {
                    Some(target) => write(ctx, template, target, &kelvin_to_celsius(kelvin)),
                    None => Ok(()),
                }
            },
            Handler::SensorEnable => sensor_enable(ctx, value, params),
            Handler::ContactConfig => {
                let (position, index) =
                    ctx.devices
                        .resolve_sensor(&params[0], SensorKind::DigitalInput, &params[1])?;
                match lookup(&CONTACT_CONFIG, value)? {
                    Some(text) => write(
                        ctx,
                        template,
                        KeyTarget::Sensor {
                            position,
                            kind: SensorKind::DigitalInput,
                            index,
                        },
                        text,
                    ),
                    None => Ok(()),
                }
            },
            Handler::ContactStatus => {
                let target = enabled_sensor(ctx, &params[0], SensorKind::DigitalInput, &params[1])?;
                match (target, lookup(&CONTACT_STATUS, value)?) {
                    (Some(target), Some(text)) => write(ctx, template, target, text),
                    _ => Ok(()),
                }
            },
            Handler::OutletCount => {
                let count = parse_count(value)?;
                ctx.outlets.init(count)?;
                debug!("Outlet table reset to {} slots", count);
                Ok(())
            },
            Handler::OutletIndex => {
                let index = parse_index(&params[0])?;
                ctx.outlets.set_topic(index, normalize_topic(value))
            },
            Handler::OutletData => {
                let index = outlet_index(ctx, &params[0])?;
                write(ctx, template, KeyTarget::Outlet(index), value)
            },
            Handler::OutletSwitchable => {
                let index = outlet_index(ctx, &params[0])?;
                let switchable = match value {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    other => return Err(Nm2Error::invalid_value(other, "expected a boolean")),
                };
                ctx.outlets.set_switchable(index, switchable)?;
                write(
                    ctx,
                    template,
                    KeyTarget::Outlet(index),
                    if switchable { "yes" } else { "no" },
                )
            },
            Handler::AlarmCount => {
                let count = parse_count(value)?;
                ctx.snapshot.begin(count)?;
                debug!("Alarm snapshot of {} opened", count);
                Ok(())
            },
            Handler::AlarmField(field) => {
                let index = parse_index(&params[0])?;
                let value = match field {
                    AlarmField::Topic => normalize_topic(value),
                    _ => value,
                };
                ctx.snapshot.set_field(index, *field, value)
            },
        }
    }
}

// ============================================================================
// Device announcements
// ============================================================================

fn device_count(ctx: &mut HandlerContext<'_>, value: &str) -> Result<()> {
    let count = parse_count(value)?;
    ctx.devices.set_declared_count(count);
    if count == 0 {
        let removed = ctx.devices.remove_all();
        let mut stale = Vec::new();
        for (position, device) in removed.iter().enumerate() {
            stale.extend(object_keys(ctx.keyspace, position, device));
        }
        let deleted = ctx.store.del_many(&stale)?;
        if !removed.is_empty() {
            info!("All {} sensor devices removed ({} keys)", removed.len(), deleted);
        }
    }
    Ok(())
}

fn device_index(ctx: &mut HandlerContext<'_>, value: &str, position: &str) -> Result<()> {
    let key = last_segment(value)?;
    let position = parse_index(position)?;
    let before = layout(ctx.devices);

    match ctx.devices.find_index_by_key(key) {
        Ok(current) if current == position => {},
        Ok(current) => {
            let to = if position >= ctx.devices.len() {
                Position::End
            } else {
                Position::At(position)
            };
            if ctx.devices.move_device(current, to)? {
                debug!("Device {} moved from {} to {:?}", key, current, to);
                renumber(ctx, &before)?;
            }
        },
        Err(e) if e.is_not_found() => {
            let at = if position > ctx.devices.len() {
                Position::End
            } else {
                Position::At(position)
            };
            let index = ctx.devices.add_device(at, key)?;
            renumber(ctx, &before)?;
            ctx.store.set(&ctx.keyspace.device(index, "key"), key)?;
            info!("Sensor device {} added at {}", key, index + 1);
        },
        Err(e) => return Err(e),
    }

    if ctx.devices.completes_declared(position) {
        trim_tail(ctx, position)?;
    }
    Ok(())
}

/// Device keys with their contact counts, in position order
fn layout(devices: &DeviceRegistry) -> Vec<(String, usize)> {
    devices
        .iter()
        .map(|d| (d.key().to_string(), d.group(SensorKind::DigitalInput).len()))
        .collect()
}

fn object_keys(keyspace: &KeySpace, position: usize, device: &Device) -> Vec<String> {
    keyspace.device_object_keys(position, device.group(SensorKind::DigitalInput).len())
}

/// Move the stored fields of every device whose position changed
///
/// All old values are read before anything is deleted or written, so
/// overlapping ranges are safe.
fn renumber(ctx: &mut HandlerContext<'_>, before: &[(String, usize)]) -> Result<()> {
    let mut stale = Vec::new();
    let mut fresh = Vec::new();
    for (old_position, (key, contacts)) in before.iter().enumerate() {
        let new_position = match ctx.devices.find_index_by_key(key) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if new_position == old_position {
            continue;
        }
        let old_keys = ctx.keyspace.device_object_keys(old_position, *contacts);
        let new_keys = ctx.keyspace.device_object_keys(new_position, *contacts);
        for (old, new) in old_keys.into_iter().zip(new_keys) {
            if let Some(value) = ctx.store.get(&old)? {
                fresh.push((new, value));
            }
            stale.push(old);
        }
    }
    if stale.is_empty() {
        return Ok(());
    }
    ctx.store.del_many(&stale)?;
    ctx.store.set_many(&fresh)?;
    debug!("Renumbered {} device keys", fresh.len());
    Ok(())
}

fn trim_tail(ctx: &mut HandlerContext<'_>, index: usize) -> Result<()> {
    let removed = ctx.devices.trim_after(index);
    for (position, device) in &removed {
        ctx.store.del_many(&object_keys(ctx.keyspace, *position, device))?;
        info!("Sensor device {} removed from {}", device.key(), position + 1);
    }
    Ok(())
}

// ============================================================================
// Sensors
// ============================================================================

fn sensor_index(ctx: &mut HandlerContext<'_>, value: &str, params: &[String]) -> Result<()> {
    let kind: SensorKind = params[1].parse()?;
    let index = parse_index(&params[2])?;
    let key = last_segment(value)?;
    let newly_keyed = ctx.devices.init_sensor(&params[0], kind, index, key)?;
    if newly_keyed && !kind.is_indexed() {
        let position = ctx.devices.find_index_by_key(&params[0])?;
        let status = ctx.keyspace.sensor(position, kind, index, Some("status"));
        if !ctx.store.exists(&status)? {
            ctx.store.set(&status, "good")?;
        }
    }
    Ok(())
}

fn sensor_enable(ctx: &mut HandlerContext<'_>, value: &str, params: &[String]) -> Result<()> {
    let kind: SensorKind = params[1].parse()?;
    let (position, index) = ctx.devices.resolve_sensor(&params[0], kind, &params[2])?;
    let state = SensorState::from_flag(value);
    let previous = ctx.devices.set_sensor_state(position, kind, index, state)?;
    if state == SensorState::Disabled && previous != SensorState::Disabled {
        let keys = ctx.keyspace.disabled_sensor_keys(position, kind, index);
        ctx.store.del_many(&keys)?;
        debug!("Sensor {}/{} disabled", kind, params[2]);
    }
    Ok(())
}

/// Resolve a sensor, `None` while it is disabled
fn enabled_sensor(
    ctx: &HandlerContext<'_>,
    device_key: &str,
    kind: SensorKind,
    sensor_key: &str,
) -> Result<Option<KeyTarget>> {
    let (position, index) = ctx.devices.resolve_sensor(device_key, kind, sensor_key)?;
    if ctx.devices.get_sensor_state(position, kind, index)? == SensorState::Disabled {
        debug!("Sensor {}/{} disabled, value dropped", kind, sensor_key);
        return Ok(None);
    }
    Ok(Some(KeyTarget::Sensor {
        position,
        kind,
        index,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn outlet_index(ctx: &HandlerContext<'_>, key: &str) -> Result<usize> {
    ctx.outlets
        .find_by_topic(&format!("{}{}", OUTLET_TOPIC_PREFIX, key))
}

fn write(
    ctx: &HandlerContext<'_>,
    template: Option<KeyTemplate>,
    target: KeyTarget,
    value: &str,
) -> Result<()> {
    let template = template.ok_or_else(|| Nm2Error::MissingTemplate(format!("{:?}", target)))?;
    let key = template.render(ctx.keyspace, target)?;
    ctx.store.set(&key, value)?;
    debug!("{} = {}", key, value);
    Ok(())
}

/// Table lookup by integer code; out-of-range codes give `None`
fn lookup(table: &[&'static str], value: &str) -> Result<Option<&'static str>> {
    let code: i64 = value
        .trim()
        .parse()
        .map_err(|_| Nm2Error::invalid_value(value, "not an integer code"))?;
    let text = usize::try_from(code).ok().and_then(|i| table.get(i).copied());
    if text.is_none() {
        debug!("Code {} outside table of {}, ignored", code, table.len());
    }
    Ok(text)
}

/// Text after the last `/`, which must exist and be followed by something
pub fn last_segment(value: &str) -> Result<&str> {
    match value.rfind('/') {
        Some(pos) if pos + 1 < value.len() => Ok(&value[pos + 1..]),
        _ => Err(Nm2Error::invalid_value(value, "expected a path ending in a key")),
    }
}

/// `@id` values may carry a leading `/`
pub fn normalize_topic(value: &str) -> &str {
    value.trim_start_matches('/')
}

pub fn parse_count(value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Nm2Error::invalid_value(value, "not a count"))
}

pub fn parse_index(value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Nm2Error::invalid_value(value, "not an index"))
}
