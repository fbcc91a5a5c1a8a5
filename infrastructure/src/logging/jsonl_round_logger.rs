//! JSONL writer for round events.
//!
//! Each [`RoundEvent`] becomes one line: the event payload merged with a
//! `type` and a millisecond `timestamp`. The file is opened in append mode so
//! consecutive runs of the same replica share one journal.

use chainbet_application::{RoundEvent, RoundEventLogger};
use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub struct JsonlRoundEventLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlRoundEventLogger {
    /// Open (or create) the journal at `path`.
    ///
    /// Returns `None` when the file cannot be opened; the caller falls back to
    /// not journaling rather than refusing to run.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create round log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open round log {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: RoundEvent) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        match event.payload {
            Value::Object(mut map) => {
                map.insert("type".to_string(), Value::String(event.event_type.to_string()));
                map.insert("timestamp".to_string(), Value::String(timestamp));
                Value::Object(map)
            }
            other => json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": other,
            }),
        }
    }
}

impl RoundEventLogger for JsonlRoundEventLogger {
    fn log(&self, event: RoundEvent) {
        let Ok(line) = serde_json::to_string(&Self::record(event)) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                warn!("Could not write round event to {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for JsonlRoundEventLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replica-0.rounds.jsonl");
        let logger = JsonlRoundEventLogger::new(&path).unwrap();

        logger.log(RoundEvent::new(
            "phase",
            json!({"replica": 0, "round": 3, "phase": "collect_facts"}),
        ));
        logger.log(RoundEvent::new(
            "round_failed",
            json!({"replica": 0, "round": 3, "kind": "consensus_timeout"}),
        ));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "phase");
        assert_eq!(lines[0]["phase"], "collect_facts");
        assert_eq!(lines[1]["type"], "round_failed");
        assert_eq!(lines[1]["kind"], "consensus_timeout");
        assert!(lines.iter().all(|l| l["timestamp"].is_string()));
    }

    #[test]
    fn test_appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rounds.jsonl");

        let first = JsonlRoundEventLogger::new(&path).unwrap();
        first.log(RoundEvent::new("phase", json!({"round": 0})));
        drop(first);

        let second = JsonlRoundEventLogger::new(&path).unwrap();
        second.log(RoundEvent::new("phase", json!({"round": 1})));
        drop(second);

        let rounds: Vec<u64> = read_lines(&path)
            .iter()
            .map(|l| l["round"].as_u64().unwrap())
            .collect();
        assert_eq!(rounds, vec![0, 1]);
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.jsonl");
        let logger = JsonlRoundEventLogger::new(&path).unwrap();

        logger.log(RoundEvent::new("note", json!("halted")));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "note");
        assert_eq!(lines[0]["data"], "halted");
    }
}
