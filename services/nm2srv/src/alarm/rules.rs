//! Alarm code table
//!
//! A rule applies to an alarm when its comma-separated code list contains
//! the alarm code and its topic pattern matches the alarm topic. Every
//! applicable rule runs, not just the first.

use crate::error::Result;
use crate::keyspace::KeyTemplate;
use regex::Regex;
use tracing::debug;

/// Exact membership in a comma-separated code list
///
/// `"111,222"` contains `"222"` but not `"22"`.
pub fn code_list_contains(list: &str, code: &str) -> bool {
    !code.is_empty() && list.split(',').any(|candidate| candidate == code)
}

/// What a matching rule does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmAction {
    /// Per-object field: `raised` on NEW, `cleared` on INACTIVE
    Object {
        template: KeyTemplate,
        raised: &'static str,
        cleared: &'static str,
    },
    /// Text for the global alarm channel while the alarm is present
    Alarm(&'static str),
    /// Flag for the global status channel while the alarm is present
    Status(&'static str),
}

/// Static table entry
#[derive(Debug, Clone, Copy)]
pub struct AlarmRuleSpec {
    pub codes: &'static str,
    pub topic: &'static str,
    pub actions: &'static [AlarmAction],
}

#[derive(Debug, Clone)]
pub struct AlarmRule {
    codes: &'static str,
    topic: Regex,
    actions: &'static [AlarmAction],
}

impl AlarmRule {
    pub fn actions(&self) -> &'static [AlarmAction] {
        self.actions
    }
}

#[derive(Debug, Clone)]
pub struct AlarmTable {
    rules: Vec<AlarmRule>,
}

impl AlarmTable {
    pub fn new(specs: &[AlarmRuleSpec]) -> Result<Self> {
        let rules = specs
            .iter()
            .map(|spec| {
                Ok(AlarmRule {
                    codes: spec.codes,
                    topic: Regex::new(spec.topic)?,
                    actions: spec.actions,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Alarm table: {} rules", rules.len());
        Ok(Self { rules })
    }

    /// Table for NM2 ambient sensors and the power distribution unit
    pub fn nm2() -> Result<Self> {
        Self::new(NM2_ALARM_RULES)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every rule applying to `(code, topic)` with the topic's captures
    pub fn matching<'a>(
        &'a self,
        code: &'a str,
        topic: &'a str,
    ) -> impl Iterator<Item = (&'a AlarmRule, Vec<String>)> + 'a {
        self.rules.iter().filter_map(move |rule| {
            if !code_list_contains(rule.codes, code) {
                return None;
            }
            let caps = rule.topic.captures(topic)?;
            let params = caps
                .iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect();
            Some((rule, params))
        })
    }
}

// ============================================================================
// NM2 alarm codes
// ============================================================================

const SENSOR_STATUS: KeyTemplate = KeyTemplate::Sensor(Some("status"));

const fn raise(raised: &'static str) -> AlarmAction {
    AlarmAction::Object {
        template: SENSOR_STATUS,
        raised,
        cleared: "good",
    }
}

const TEMPERATURE_TOPIC: &str =
    "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(temperatures)/([^/]+)$";
const HUMIDITY_TOPIC: &str = "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(humidities)/([^/]+)$";

// Only 1203 has a documented mapping. The other rows are provisional
// until the full alarm catalog is available.
static NM2_ALARM_RULES: &[AlarmRuleSpec] = &[
    // Ambient device
    AlarmRuleSpec {
        codes: "1100",
        topic: "^mbdetnrs/1.0/sensors/devices/([^/]+)$",
        actions: &[
            AlarmAction::Object {
                template: KeyTemplate::Device("present"),
                raised: "no",
                cleared: "yes",
            },
            AlarmAction::Alarm("Ambient communication lost"),
        ],
    },
    // Temperature thresholds
    AlarmRuleSpec {
        codes: "1200",
        topic: TEMPERATURE_TOPIC,
        actions: &[raise("warning-low"), AlarmAction::Alarm("Ambient temperature low warning")],
    },
    AlarmRuleSpec {
        codes: "1201",
        topic: TEMPERATURE_TOPIC,
        actions: &[raise("critical-low"), AlarmAction::Alarm("Ambient temperature low critical")],
    },
    AlarmRuleSpec {
        codes: "1202",
        topic: TEMPERATURE_TOPIC,
        actions: &[raise("warning-high"), AlarmAction::Alarm("Ambient temperature high warning")],
    },
    AlarmRuleSpec {
        codes: "1203",
        topic: TEMPERATURE_TOPIC,
        actions: &[raise("critical-high"), AlarmAction::Alarm("Ambient temperature high critical")],
    },
    // Humidity thresholds
    AlarmRuleSpec {
        codes: "1300",
        topic: HUMIDITY_TOPIC,
        actions: &[raise("warning-low"), AlarmAction::Alarm("Ambient humidity low warning")],
    },
    AlarmRuleSpec {
        codes: "1301",
        topic: HUMIDITY_TOPIC,
        actions: &[raise("critical-low"), AlarmAction::Alarm("Ambient humidity low critical")],
    },
    AlarmRuleSpec {
        codes: "1302",
        topic: HUMIDITY_TOPIC,
        actions: &[raise("warning-high"), AlarmAction::Alarm("Ambient humidity high warning")],
    },
    AlarmRuleSpec {
        codes: "1303",
        topic: HUMIDITY_TOPIC,
        actions: &[raise("critical-high"), AlarmAction::Alarm("Ambient humidity high critical")],
    },
    // Dry contacts
    AlarmRuleSpec {
        codes: "1400",
        topic: "^mbdetnrs/1.0/sensors/devices/([^/]+)/channels/(digitalInputs)/([^/]+)$",
        actions: &[AlarmAction::Alarm("Ambient contact active")],
    },
    // Power distribution
    AlarmRuleSpec {
        codes: "2000,2001",
        topic: "^mbdetnrs/1.0/powerDistributions/1/inputs/[0-9]+$",
        actions: &[AlarmAction::Status("OVER"), AlarmAction::Alarm("Input overload")],
    },
    AlarmRuleSpec {
        codes: "3000",
        topic: "^mbdetnrs/1.0/powerDistributions/1/inputs/[0-9]+/batteries$",
        actions: &[AlarmAction::Status("RB"), AlarmAction::Alarm("Replace battery")],
    },
    AlarmRuleSpec {
        codes: "3001,3002",
        topic: "^mbdetnrs/1.0/powerDistributions/1/inputs/[0-9]+/batteries$",
        actions: &[AlarmAction::Status("LB"), AlarmAction::Alarm("Battery low")],
    },
    AlarmRuleSpec {
        codes: "4100",
        topic: "^mbdetnrs/1.0/powerDistributions/1/outputs/[0-9]+$",
        actions: &[AlarmAction::Status("BYPASS")],
    },
];
