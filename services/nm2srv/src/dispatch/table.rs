//! Ordered pattern rules
//!
//! Patterns are compiled once into a `RegexSet` for the first-match lookup
//! plus one `Regex` per rule for capture extraction.

use super::handlers::{Handler, HandlerContext};
use crate::error::{Nm2Error, Result};
use crate::keyspace::{KeyTarget, KeyTemplate};
use regex::{Regex, RegexSet};
use tracing::debug;

/// Static table entry
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub pattern: &'static str,
    pub template: Option<KeyTemplate>,
    pub handler: Option<Handler>,
}

impl RuleSpec {
    /// Write the coerced value under a fixed name
    pub const fn direct(pattern: &'static str, name: &'static str) -> Self {
        Self {
            pattern,
            template: Some(KeyTemplate::Fixed(name)),
            handler: None,
        }
    }

    pub const fn handled(
        pattern: &'static str,
        template: Option<KeyTemplate>,
        handler: Handler,
    ) -> Self {
        Self {
            pattern,
            template,
            handler: Some(handler),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    template: Option<KeyTemplate>,
    handler: Option<Handler>,
}

impl Rule {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn template(&self) -> Option<KeyTemplate> {
        self.template
    }

    pub fn handler(&self) -> Option<Handler> {
        self.handler
    }
}

/// What happened to one `(path, value)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Unmatched,
    /// Direct rule, value stored under this key
    Written(String),
    Handled(Handler),
}

#[derive(Debug, Clone)]
pub struct TopicDispatchTable {
    set: RegexSet,
    rules: Vec<Rule>,
}

impl TopicDispatchTable {
    pub fn new(specs: &[RuleSpec]) -> Result<Self> {
        let set = RegexSet::new(specs.iter().map(|s| s.pattern))?;
        let rules = specs
            .iter()
            .map(|spec| {
                if spec.handler.is_none() && !matches!(spec.template, Some(KeyTemplate::Fixed(_))) {
                    return Err(Nm2Error::MissingTemplate(spec.pattern.to_string()));
                }
                Ok(Rule {
                    pattern: Regex::new(spec.pattern)?,
                    template: spec.template,
                    handler: spec.handler,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Dispatch table: {} rules", rules.len());
        Ok(Self { set, rules })
    }

    pub fn nm2() -> Result<Self> {
        Self::new(super::mapping::NM2_RULES)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching `path`, with its captures
    pub fn find(&self, path: &str) -> Option<(&Rule, Vec<String>)> {
        let index = self.set.matches(path).iter().next()?;
        let rule = &self.rules[index];
        let caps = rule.pattern.captures(path)?;
        let params = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
        Some((rule, params))
    }

    pub fn dispatch(
        &self,
        ctx: &mut HandlerContext<'_>,
        path: &str,
        value: &str,
    ) -> Result<DispatchOutcome> {
        let Some((rule, params)) = self.find(path) else {
            return Ok(DispatchOutcome::Unmatched);
        };
        match rule.handler {
            Some(handler) => {
                handler.process(ctx, rule.template, value, &params)?;
                Ok(DispatchOutcome::Handled(handler))
            },
            None => {
                let template = rule
                    .template
                    .ok_or_else(|| Nm2Error::MissingTemplate(rule.pattern().to_string()))?;
                let key = template.render(ctx.keyspace, KeyTarget::Global)?;
                ctx.store.set(&key, value)?;
                debug!("Mapped {} to {} = {}", path, key, value);
                Ok(DispatchOutcome::Written(key))
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::alarm::AlarmSnapshotBuilder;
    use crate::keyspace::KeySpace;
    use crate::registry::{DeviceRegistry, OutletRegistry};
    use nm2_store::{MemoryStore, StateStore};

    #[test]
    fn test_first_match_wins() {
        let table = TopicDispatchTable::new(&[
            RuleSpec::direct("^a/b$", "first"),
            RuleSpec::direct("^a/.*$", "second"),
        ])
        .unwrap();
        let (rule, params) = table.find("a/b").unwrap();
        assert_eq!(rule.template(), Some(KeyTemplate::Fixed("first")));
        assert!(params.is_empty());
        let (rule, _) = table.find("a/c").unwrap();
        assert_eq!(rule.template(), Some(KeyTemplate::Fixed("second")));
        assert!(table.find("b").is_none());
    }

    #[test]
    fn test_direct_rule_needs_fixed_template() {
        let spec = RuleSpec {
            pattern: "^x$",
            template: Some(KeyTemplate::Device("mfr")),
            handler: None,
        };
        assert!(matches!(
            TopicDispatchTable::new(&[spec]),
            Err(Nm2Error::MissingTemplate(_))
        ));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        assert!(matches!(
            TopicDispatchTable::new(&[RuleSpec::direct("^(unclosed$", "x")]),
            Err(Nm2Error::Pattern(_))
        ));
    }

    #[test]
    fn test_captures_in_order() {
        let table = TopicDispatchTable::nm2().unwrap();
        let (rule, params) = table
            .find("mbdetnrs/1.0/sensors/devices/dev-a/channels/humidities/members/1/@id")
            .unwrap();
        assert_eq!(rule.handler(), Some(Handler::SensorIndex));
        assert_eq!(params, vec!["dev-a", "humidities", "1"]);
    }

    #[test]
    fn test_dispatch_direct_write() {
        let table = TopicDispatchTable::nm2().unwrap();
        let store = MemoryStore::new();
        let keyspace = KeySpace::default();
        let mut devices = DeviceRegistry::default();
        let mut outlets = OutletRegistry::new(8);
        let mut snapshot = AlarmSnapshotBuilder::default();
        let mut ctx = HandlerContext {
            devices: &mut devices,
            outlets: &mut outlets,
            snapshot: &mut snapshot,
            store: &store,
            keyspace: &keyspace,
        };

        let outcome = table
            .dispatch(
                &mut ctx,
                "mbdetnrs/1.0/powerDistributions/1/identification/vendor",
                "EATON",
            )
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Written("device.mfr".to_string()));
        assert_eq!(store.get("device.mfr").unwrap().as_deref(), Some("EATON"));

        let outcome = table.dispatch(&mut ctx, "mbdetnrs/1.0/unknown", "1").unwrap();
        assert_eq!(outcome, DispatchOutcome::Unmatched);
    }
}
