use std::env;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use retouch_contracts::errors::{truncate_text, RestoreError};
use retouch_contracts::events::{EventWriter, RestoreEvent};
use retouch_contracts::models::DEFAULT_IMAGE_MODEL;
use retouch_contracts::options::{RestorationOptions, RestoredImage, SourceImage};
use retouch_contracts::prompt::compose;
use serde_json::{json, Value};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const ERROR_MESSAGE_MAX_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base: String,
    pub model: String,
    /// `None` leaves the request unbounded; callers that want a deadline set one.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Reads `GEMINI_API_BASE` and `RETOUCH_IMAGE_MODEL`. Credentials are
    /// never read here.
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    /// Builds a config from `lookup`, ignoring blank values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            api_base: read("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            model: read("RETOUCH_IMAGE_MODEL").unwrap_or(defaults.model),
            timeout: defaults.timeout,
        }
    }
}

/// One `generateContent` round trip. Implementations must not retry.
pub trait GenerateContentTransport: Send + Sync {
    fn generate_content(&self, model: &str, api_key: &str, payload: &Value) -> Result<Value>;
}

pub struct HttpTransport {
    api_base: String,
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl GenerateContentTransport for HttpTransport {
    fn generate_content(&self, model: &str, api_key: &str, payload: &Value) -> Result<Value> {
        let endpoint = self.endpoint_for_model(model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(payload)
            .send()
            // The URL carries the key as a query parameter; keep it out of messages.
            .map_err(|err| anyhow::Error::new(err.without_url()))
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error("Gemini", response)
    }
}

/// Restores photos through Gemini's image model.
///
/// Holds no per-call state: one instance can serve concurrent callers, each
/// call owning its own request and response.
pub struct GeminiRestorer<T = HttpTransport> {
    transport: T,
    model: String,
    events: Option<EventWriter>,
}

impl GeminiRestorer<HttpTransport> {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(
            HttpTransport::new(config)?,
            config.model.clone(),
        ))
    }
}

impl<T: GenerateContentTransport> GeminiRestorer<T> {
    pub fn with_transport(transport: T, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn restore(
        &self,
        image: &SourceImage,
        options: &RestorationOptions,
        api_key: &str,
    ) -> Result<RestoredImage, RestoreError> {
        let started = Instant::now();
        let result = self.restore_once(image, options, api_key);
        self.record_outcome(&result, started);
        result
    }

    fn restore_once(
        &self,
        image: &SourceImage,
        options: &RestorationOptions,
        api_key: &str,
    ) -> Result<RestoredImage, RestoreError> {
        options.validate()?;
        image.validate()?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(RestoreError::MissingCredentials);
        }

        let prompt = compose(options);
        self.emit(&RestoreEvent::started(&self.model, image, options, &prompt));

        let payload = build_request_payload(image, &prompt);
        let response = self
            .transport
            .generate_content(&self.model, api_key, &payload)
            .map_err(|err| classify_failure(&err))?;
        extract_restored_image(&response)
    }

    fn record_outcome(&self, result: &Result<RestoredImage, RestoreError>, started: Instant) {
        let latency_ms = started.elapsed().as_millis() as u64;
        self.emit(&RestoreEvent::finished(&self.model, result, latency_ms));
    }

    fn emit(&self, event: &RestoreEvent) {
        if let Some(events) = self.events.as_ref() {
            let _ = events.record(event);
        }
    }
}

/// Request body: the photo first, then the instruction text, accepting either
/// an image or an explanation back.
pub fn build_request_payload(image: &SourceImage, prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": image.mime_type.trim(),
                        "data": BASE64.encode(&image.bytes),
                    }
                },
                { "text": prompt },
            ],
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"],
        },
    })
}

enum ContentPart<'a> {
    InlineImage {
        data: &'a str,
        mime_type: Option<&'a str>,
    },
    Text(&'a str),
    Other,
}

impl<'a> ContentPart<'a> {
    fn from_value(part: &'a Value) -> Self {
        let inline = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object);
        if let Some(inline) = inline {
            let data = inline.get("data").and_then(Value::as_str).unwrap_or("");
            if !data.is_empty() {
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str);
                return Self::InlineImage { data, mime_type };
            }
        }
        match part.get("text").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => Self::Text(text),
            _ => Self::Other,
        }
    }
}

/// Reduces a `generateContent` response to the restored image.
///
/// Only the first candidate is read. Its first inline image wins; text parts
/// seen before it are discarded.
pub fn extract_restored_image(response: &Value) -> Result<RestoredImage, RestoreError> {
    let Some(candidate) = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
    else {
        return Err(RestoreError::Blocked {
            reason: block_reason(response),
        });
    };

    let parts = candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut text = String::new();
    for part in parts {
        match ContentPart::from_value(part) {
            ContentPart::InlineImage { data, mime_type } => {
                let bytes = BASE64.decode(data.as_bytes()).map_err(|err| {
                    RestoreError::Service(format!("Gemini image base64 decode failed: {err}"))
                })?;
                return Ok(RestoredImage {
                    bytes,
                    mime_type: mime_type.map(str::to_string),
                });
            }
            ContentPart::Text(fragment) => text.push_str(fragment),
            ContentPart::Other => {}
        }
    }

    if text.trim().is_empty() {
        return Err(RestoreError::EmptyResult);
    }
    Err(RestoreError::unexpected_text(&text))
}

fn block_reason(response: &Value) -> Option<String> {
    response
        .get("promptFeedback")
        .or_else(|| response.get("prompt_feedback"))
        .and_then(|feedback| {
            feedback
                .get("blockReason")
                .or_else(|| feedback.get("block_reason"))
        })
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Maps a transport or service failure onto the caller-facing taxonomy.
pub fn classify_failure(err: &anyhow::Error) -> RestoreError {
    classify_message(&error_chain_text(err, ERROR_MESSAGE_MAX_CHARS))
}

pub fn classify_message(message: &str) -> RestoreError {
    let lowered = message.to_ascii_lowercase();
    let matches_any = |needles: &[&str]| needles.iter().any(|needle| lowered.contains(needle));

    if matches_any(&["api key not valid", "api_key_invalid", "invalid api key"]) {
        return RestoreError::Authentication(message.to_string());
    }
    if matches_any(&["quota", "resource_exhausted", "429", "rate limit"]) {
        return RestoreError::RateLimit(message.to_string());
    }
    RestoreError::Service(message.to_string())
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, ERROR_MESSAGE_MAX_CHARS)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().map(|existing| existing == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

/// Trimmed value of `key`, or `None` when it is unset or blank.
pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
