//! NM2 (`mbdetnrs/1.0`) mapping
//!
//! Rules are tried in order; several sensor rules overlap and rely on it.

use super::handlers::Handler;
use super::table::RuleSpec;
use crate::alarm::AlarmField;
use crate::error::Result;
use crate::keyspace::KeyTemplate;
use regex::RegexSet;

const fn device(field: &'static str) -> Option<KeyTemplate> {
    Some(KeyTemplate::Device(field))
}

const fn sensor(field: &'static str) -> Option<KeyTemplate> {
    Some(KeyTemplate::Sensor(Some(field)))
}

const fn outlet(field: &'static str) -> Option<KeyTemplate> {
    Some(KeyTemplate::Outlet(field))
}

const SENSOR_VALUE: Option<KeyTemplate> = Some(KeyTemplate::Sensor(None));

pub static NM2_RULES: &[RuleSpec] = &[
    // ========== Identification ==========
    RuleSpec::direct("^mbdetnrs/1.0/managers/1/identification/firmwareVersion$", "ups.firmware.aux"),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/identification/vendor$", "device.mfr"),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/identification/model$", "device.model"),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/identification/serialNumber$", "device.serial"),
    RuleSpec::direct("^mbdetnrs/1.0/managers/1/identification/location$", "device.location"),
    RuleSpec::direct("^mbdetnrs/1.0/managers/1/identification/contact$", "device.contact"),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/identification/firmwareVersion$", "ups.firmware"),
    // ========== Input and battery measures ==========
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/inputs/1/measures/realtime/current$", "output.current"),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/inputs/1/measures/realtime/frequency$", "output.frequency"),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/inputs/1/measures/realtime/voltage$", "output.voltage"),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/inputs/1/measures/realtime/percentLoad$", "ups.load"),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/inputs/1/batteries/measures/voltage$", "battery.voltage"),
    RuleSpec::direct(
        "^mbdetnrs/1.0/powerDistributions/1/inputs/1/batteries/measures/remainingChargeCapacity$",
        "battery.charge",
    ),
    RuleSpec::direct("^mbdetnrs/1.0/powerDistributions/1/inputs/1/batteries/measures/remainingTime$", "battery.runtime"),
    // ========== Sensor devices ==========
    RuleSpec::handled("^mbdetnrs/1.0/sensors/devices/members@count$", None, Handler::DeviceCount),
    RuleSpec::handled("^mbdetnrs/1.0/sensors/devices/members/([0-9]+)/@id$", None, Handler::DeviceIndex),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/identification/manufacturer$",
        device("mfr"),
        Handler::DeviceData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/identification/model$",
        device("model"),
        Handler::DeviceData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/identification/serial$",
        device("serial"),
        Handler::DeviceData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/identification/version$",
        device("firmware"),
        Handler::DeviceData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/identification/name$",
        device("name"),
        Handler::DeviceData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/communication/state$",
        device("present"),
        Handler::DevicePresence,
    ),
    // ========== Channels ==========
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures|humidities|digitalInputs)/members@count$",
        None,
        Handler::SensorCount,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures|humidities|digitalInputs)/members/([0-9]+)/@id$",
        None,
        Handler::SensorIndex,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures|humidities)/([^/]+)/identification/name$",
        sensor("name"),
        Handler::SensorData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures|humidities)/([^/]+)/alarms/thresholds/lowCritical$",
        sensor("low.critical"),
        Handler::SensorData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures|humidities)/([^/]+)/alarms/thresholds/lowWarning$",
        sensor("low.warning"),
        Handler::SensorData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures|humidities)/([^/]+)/alarms/thresholds/highCritical$",
        sensor("high.critical"),
        Handler::SensorData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures|humidities)/([^/]+)/alarms/thresholds/highWarning$",
        sensor("high.warning"),
        Handler::SensorData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/temperatures/([^/]+)/measure/current$",
        SENSOR_VALUE,
        Handler::TemperatureValue,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(humidities)/([^/]+)/measure/current$",
        SENSOR_VALUE,
        Handler::SensorData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures|humidities)/([^/]+)/configuration/enabled$",
        None,
        Handler::SensorEnable,
    ),
    // ========== Dry contacts ==========
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(digitalInputs)/([^/]+)/identification/name$",
        sensor("name"),
        Handler::SensorData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/digitalInputs/([^/]+)/configuration/activeLow$",
        sensor("config"),
        Handler::ContactConfig,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(digitalInputs)/([^/]+)/configuration/enabled$",
        None,
        Handler::SensorEnable,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/digitalInputs/([^/]+)/measure/active$",
        sensor("status"),
        Handler::ContactStatus,
    ),
    // ========== Outlets ==========
    RuleSpec::handled("^mbdetnrs/1.0/powerDistributions/1/outlets/members@count$", None, Handler::OutletCount),
    RuleSpec::handled(
        "^mbdetnrs/1.0/powerDistributions/1/outlets/members/([0-9]+)/@id$",
        None,
        Handler::OutletIndex,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/powerDistributions/1/outlets/([^/]+)/identification/name$",
        outlet("name"),
        Handler::OutletData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/powerDistributions/1/outlets/([^/]+)/identification/physicalName$",
        outlet("id"),
        Handler::OutletData,
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/powerDistributions/1/outlets/([^/]+)/configuration/switchable$",
        outlet("switchable"),
        Handler::OutletSwitchable,
    ),
    // ========== Active alarms ==========
    RuleSpec::handled("^mbdetnrs/1.0/alarmService/activeAlarms/members@count$", None, Handler::AlarmCount),
    RuleSpec::handled(
        "^mbdetnrs/1.0/alarmService/activeAlarms/members/([0-9]+)/id$",
        None,
        Handler::AlarmField(AlarmField::Id),
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/alarmService/activeAlarms/members/([0-9]+)/level$",
        None,
        Handler::AlarmField(AlarmField::Level),
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/alarmService/activeAlarms/members/([0-9]+)/code$",
        None,
        Handler::AlarmField(AlarmField::Code),
    ),
    RuleSpec::handled(
        "^mbdetnrs/1.0/alarmService/activeAlarms/members/([0-9]+)/device/@id$",
        None,
        Handler::AlarmField(AlarmField::Topic),
    ),
];

// ============================================================================
// Accepted topics
// ============================================================================

const ACCEPTED_TOPICS: &[&str] = &[
    "^mbdetnrs/1.0/managers/1/identification$",
    "^mbdetnrs/1.0/powerDistributions/1/identification$",
    "^mbdetnrs/1.0/powerDistributions/1/(inputs|outputs)/[0-9]+/measures$",
    "^mbdetnrs/1.0/powerDistributions/1/inputs/[0-9]+/batteries/measures$",
    "^mbdetnrs/1.0/powerDistributions/1/outlets$",
    "^mbdetnrs/1.0/powerDistributions/1/outlets/[^/]+/(identification|configuration)$",
    "^mbdetnrs/1.0/sensors/devices$",
    "^mbdetnrs/1.0/sensors/devices/[^/]+/(identification|communication)$",
    "^mbdetnrs/1.0/sensors/devices/[^/]+/channels/(temperatures|humidities|digitalInputs)$",
    "^mbdetnrs/1.0/sensors/devices/[^/]+/channels/(temperatures|humidities|digitalInputs)/[^/]+/(identification|configuration|alarms|measure)$",
    "^mbdetnrs/1.0/alarmService/activeAlarms$",
];

/// Subscription filters covering the accepted topics
pub const NM2_SUBSCRIPTIONS: &[&str] = &[
    "mbdetnrs/1.0/managers/1/identification",
    "mbdetnrs/1.0/powerDistributions/1/identification",
    "mbdetnrs/1.0/powerDistributions/1/inputs/+/measures",
    "mbdetnrs/1.0/powerDistributions/1/outputs/+/measures",
    "mbdetnrs/1.0/powerDistributions/1/inputs/+/batteries/measures",
    "mbdetnrs/1.0/powerDistributions/1/outlets",
    "mbdetnrs/1.0/powerDistributions/1/outlets/+/identification",
    "mbdetnrs/1.0/powerDistributions/1/outlets/+/configuration",
    "mbdetnrs/1.0/sensors/devices",
    "mbdetnrs/1.0/sensors/devices/+/identification",
    "mbdetnrs/1.0/sensors/devices/+/communication",
    "mbdetnrs/1.0/sensors/devices/+/channels/+",
    "mbdetnrs/1.0/sensors/devices/+/channels/+/+/identification",
    "mbdetnrs/1.0/sensors/devices/+/channels/+/+/configuration",
    "mbdetnrs/1.0/sensors/devices/+/channels/+/+/alarms",
    "mbdetnrs/1.0/sensors/devices/+/channels/+/+/measure",
    "mbdetnrs/1.0/alarmService/activeAlarms",
];

/// Topics whose payloads are walked at all
#[derive(Debug, Clone)]
pub struct TopicFilter {
    set: RegexSet,
}

impl TopicFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            set: RegexSet::new(patterns)?,
        })
    }

    pub fn nm2() -> Result<Self> {
        Self::new(ACCEPTED_TOPICS)
    }

    pub fn accepts(&self, topic: &str) -> bool {
        self.set.is_match(topic)
    }

    pub fn subscriptions(&self) -> &'static [&'static str] {
        NM2_SUBSCRIPTIONS
    }
}
