//! Newline-delimited capture replay
//!
//! Each line is `{"topic": "...", "payload": ...}`. The payload is either the
//! JSON document itself or a string holding the raw message text, which is
//! how captures of non-JSON or truncated messages are kept.

use crate::engine::{Engine, MessageReport};
use common::OutputFormat;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayRecord {
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

impl ReplayRecord {
    /// Message body as it would arrive on the wire
    pub fn payload_bytes(&self) -> Vec<u8> {
        match &self.payload {
            Value::String(raw) => raw.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub lines: usize,
    /// Lines that were not a valid record
    pub invalid: usize,
    pub accepted: usize,
    /// Accepted messages whose payload was rejected
    pub rejected: usize,
    pub reconciliations: usize,
}

impl ReplayStats {
    fn record(&mut self, report: &MessageReport) {
        if report.accepted {
            self.accepted += 1;
        }
        if report.reconciliation.is_some() {
            self.reconciliations += 1;
        }
    }
}

/// Feed one line to the engine
pub fn replay_line(engine: &mut Engine, line: &str, stats: &mut ReplayStats) {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return;
    }
    stats.lines += 1;
    let record: ReplayRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            stats.invalid += 1;
            warn!("Line {}: not a record: {}", stats.lines, e);
            return;
        },
    };
    match engine.process_message(&record.topic, &record.payload_bytes()) {
        Ok(report) => {
            debug!("{}: {:?}", record.topic, report);
            stats.record(&report);
        },
        Err(e) => {
            stats.accepted += 1;
            stats.rejected += 1;
            warn!("{}", e);
        },
    }
}

/// Replay every line of `reader` until EOF
///
/// Counters accumulate in `stats`, so they survive the future being dropped
/// before EOF.
pub async fn replay<R>(engine: &mut Engine, reader: R, stats: &mut ReplayStats) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        replay_line(engine, &line, stats);
    }
    Ok(())
}

/// Render the store contents for printing
pub fn render_store(entries: &BTreeMap<String, String>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => entries
            .iter()
            .map(|(key, value)| format!("{}: {}\n", key, value))
            .collect(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(entries).unwrap_or_else(|_| "{}".to_string())
        },
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use nm2_store::helpers::create_test_memory_store;
    use nm2_store::StateStore;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, BufReader};

    #[test]
    fn test_payload_forms() {
        let record: ReplayRecord =
            serde_json::from_str(r#"{"topic": "t", "payload": {"a": 1}}"#).unwrap();
        assert_eq!(record.payload_bytes(), br#"{"a":1}"#.to_vec());

        let record: ReplayRecord =
            serde_json::from_str(r#"{"topic": "t", "payload": "{\"a\": 1}"}"#).unwrap();
        assert_eq!(record.payload_bytes(), br#"{"a": 1}"#.to_vec());
    }

    #[tokio::test]
    async fn test_replay_counts() {
        let store = create_test_memory_store();
        let mut engine = Engine::new(store.clone(), &EngineConfig::default()).unwrap();
        let input = [
            json!({"topic": "mbdetnrs/1.0/managers/1/identification", "payload": {"firmwareVersion": "1.2.3"}}).to_string(),
            "# comment".to_string(),
            "not a record".to_string(),
            json!({"topic": "mbdetnrs/1.0/sensors/devices", "payload": "{broken"}).to_string(),
            json!({"topic": "ignored/topic", "payload": {}}).to_string(),
        ]
        .join("\n");

        let mut stats = ReplayStats::default();
        replay(&mut engine, input.as_bytes(), &mut stats).await.unwrap();
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(
            store.get("ups.firmware.aux").unwrap().as_deref(),
            Some("1.2.3")
        );
    }

    #[tokio::test]
    async fn test_interrupted_replay_keeps_counts() {
        let store = create_test_memory_store();
        let mut engine = Engine::new(store.clone(), &EngineConfig::default()).unwrap();
        let (mut writer, reader) = tokio::io::duplex(1024);
        let line = json!({"topic": "mbdetnrs/1.0/managers/1/identification", "payload": {"firmwareVersion": "2.0"}});
        writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();

        // The writer stays open, so replay only stops when it is dropped
        let mut stats = ReplayStats::default();
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            replay(&mut engine, BufReader::new(reader), &mut stats),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(stats.lines, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(
            store.get("ups.firmware.aux").unwrap().as_deref(),
            Some("2.0")
        );
        drop(writer);
    }

    #[test]
    fn test_render_store() {
        let mut entries = BTreeMap::new();
        entries.insert("b".to_string(), "2".to_string());
        entries.insert("a".to_string(), "1".to_string());
        assert_eq!(render_store(&entries, OutputFormat::Text), "a: 1\nb: 2\n");
        let json: Value =
            serde_json::from_str(&render_store(&entries, OutputFormat::Json)).unwrap();
        assert_eq!(json, json!({"a": "1", "b": "2"}));
    }
}
