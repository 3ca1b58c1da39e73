use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::errors::RestoreError;
use crate::options::{BaseRestorationType, RestorationOptions, RestoredImage, SourceImage};
use crate::prompt::prompt_fingerprint;

/// One line of the restore log. The variant name becomes the `type` field.
///
/// Prompt text and image bytes never appear here; the prompt is recorded by
/// fingerprint and length only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RestoreEvent {
    RestoreStarted {
        model: String,
        base_type: BaseRestorationType,
        additive: Vec<&'static str>,
        prompt_sha256: String,
        prompt_chars: usize,
        image_bytes: usize,
        mime_type: String,
    },
    RestoreSucceeded {
        model: String,
        latency_ms: u64,
        bytes: usize,
        mime_type: Option<String>,
    },
    RestoreFailed {
        model: String,
        latency_ms: u64,
        kind: &'static str,
        /// False when the attempt stopped before a request was sent.
        submitted: bool,
        message: String,
    },
}

impl RestoreEvent {
    pub fn started(
        model: &str,
        image: &SourceImage,
        options: &RestorationOptions,
        prompt: &str,
    ) -> Self {
        Self::RestoreStarted {
            model: model.to_string(),
            base_type: options.base_type,
            additive: options.additive.enabled(),
            prompt_sha256: prompt_fingerprint(prompt),
            prompt_chars: prompt.chars().count(),
            image_bytes: image.bytes.len(),
            mime_type: image.mime_type.trim().to_string(),
        }
    }

    pub fn finished(
        model: &str,
        result: &Result<RestoredImage, RestoreError>,
        latency_ms: u64,
    ) -> Self {
        match result {
            Ok(restored) => Self::RestoreSucceeded {
                model: model.to_string(),
                latency_ms,
                bytes: restored.bytes.len(),
                mime_type: restored.mime_type.clone(),
            },
            Err(err) => Self::RestoreFailed {
                model: model.to_string(),
                latency_ms,
                kind: err.kind(),
                submitted: !err.is_pre_submission(),
                message: err.to_string(),
            },
        }
    }
}

/// Append-only JSONL log of restoration attempts.
///
/// Each line is the serialized [`RestoreEvent`] plus `run_id` and `ts`.
/// Clones share one file lock, so concurrent restores never interleave lines.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    run_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                run_id: run_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn record(&self, event: &RestoreEvent) -> anyhow::Result<Value> {
        let Value::Object(mut line) = serde_json::to_value(event)? else {
            bail!("restore event did not serialize to a JSON object");
        };
        line.insert("run_id".to_string(), Value::String(self.inner.run_id.clone()));
        line.insert("ts".to_string(), Value::String(now_utc_iso()));

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }

        let encoded = serde_json::to_string(&line)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)
            .with_context(|| format!("failed opening {}", self.inner.path.display()))?;
        file.write_all(encoded.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(line))
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
