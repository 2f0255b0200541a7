//! Recorded HTTP interactions ("cassettes") with secrets redacted.
//!
//! A [`Cassette`] is an ordered list of request/response pairs that tests
//! replay in place of live API calls. Every interaction passes through a
//! [`Redactor`] before it is stored, so credentials never reach the
//! in-memory cassette or the file it is saved to.
//!
//! # Redaction rules
//!
//! - Filtered headers are dropped from requests and responses
//!   (names compare case-insensitively).
//! - Filtered POST parameters are dropped from request bodies, both JSON
//!   objects and `application/x-www-form-urlencoded` bodies.
//! - Response body rules replace regex matches with a fixed placeholder.
//!
//! # Example
//!
//! ```
//! use regdns::cassette::{Cassette, Interaction, RecordedRequest, RecordedResponse, Redactor};
//!
//! let redactor = Redactor::transip();
//! let mut cassette = Cassette::new();
//!
//! let request = RecordedRequest::new("POST", "https://api.transip.nl/v6/auth")
//!     .header("Signature", "c2lnbmF0dXJl")
//!     .body(r#"{"login":"alice","nonce":"abc"}"#);
//! let response = RecordedResponse::new(201).body(r#"{"token":"eyJ0eXAi.eyJpc3Mi.sig"}"#);
//!
//! cassette.record(Interaction::new(request, response), &redactor);
//!
//! let stored = &cassette.interactions()[0];
//! assert!(stored.request.headers.get("signature").is_none());
//! assert_eq!(stored.request.body.as_deref(), Some(r#"{"nonce":"abc"}"#));
//! assert_eq!(stored.response.body, r#"{"token":"TOKEN"}"#);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stale once a body is rewritten, so dropped along with it.
const CONTENT_LENGTH: &str = "content-length";

/// Header names are stored lower-cased, each with all of its values.
pub type Headers = BTreeMap<String, Vec<String>>;

/// Errors raised when loading or saving a cassette.
#[derive(Debug, Error)]
pub enum CassetteError {
    #[error("cassette I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cassette serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cassette body is not valid base64: {0}")]
    Body(#[from] base64::DecodeError),
}

/// The request half of an [`Interaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RecordedRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Appends a header value.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        push_header(&mut self.headers, name, value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// The response half of an [`Interaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: String,
    /// `body` holds the base64 of a body that was not valid UTF-8.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub base64: bool,
}

impl RecordedResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: String::new(),
            base64: false,
        }
    }

    /// Appends a header value.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        push_header(&mut self.headers, name, value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self.base64 = false;
        self
    }

    /// Stores raw body bytes. UTF-8 is kept as text, anything else as base64.
    pub fn body_bytes(mut self, bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                self.body = text.to_string();
                self.base64 = false;
            }
            Err(_) => {
                self.body = BASE64.encode(bytes);
                self.base64 = true;
            }
        }
        self
    }

    /// Returns the body exactly as it was received.
    pub fn body_as_bytes(&self) -> Result<Vec<u8>, CassetteError> {
        if self.base64 {
            return Ok(BASE64.decode(&self.body)?);
        }
        Ok(self.body.clone().into_bytes())
    }
}

fn push_header(headers: &mut Headers, name: &str, value: String) {
    headers
        .entry(name.to_ascii_lowercase())
        .or_default()
        .push(value);
}

/// One recorded request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub request: RecordedRequest,
    pub response: RecordedResponse,
}

impl Interaction {
    pub fn new(request: RecordedRequest, response: RecordedResponse) -> Self {
        Self { request, response }
    }
}

/// An ordered list of redacted interactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cassette {
    #[serde(default)]
    interactions: Vec<Interaction>,
}

impl Cassette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redacts `interaction` and appends it.
    pub fn record(&mut self, interaction: Interaction, redactor: &Redactor) {
        self.interactions.push(redactor.redact(interaction));
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Reads a cassette from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CassetteError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the cassette as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CassetteError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(path, json)?;
        log::debug!(
            "saved cassette with {} interaction(s) to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }
}

/// A response body substitution.
#[derive(Debug, Clone)]
struct BodyRule {
    pattern: Regex,
    replacement: String,
}

/// Strips secrets from interactions before they are stored.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    headers: Vec<String>,
    post_parameters: Vec<String>,
    body_rules: Vec<BodyRule>,
}

impl Redactor {
    /// Creates a redactor that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for TransIP traffic.
    ///
    /// Drops the `Signature` and `Authorization` headers and the `login`
    /// POST field, and masks `token` and `authCode` values in response
    /// bodies as `TOKEN` and `AUTH_CODE`.
    pub fn transip() -> Self {
        Self::new()
            .filter_header("Signature")
            .filter_header("Authorization")
            .filter_post_data_parameter("login")
            .mask_json_field("token", "TOKEN")
            .mask_json_field("authCode", "AUTH_CODE")
    }

    /// Drops the named header from requests and responses.
    pub fn filter_header(mut self, name: &str) -> Self {
        self.headers.push(name.to_ascii_lowercase());
        self
    }

    /// Drops the named field from request bodies.
    pub fn filter_post_data_parameter(mut self, name: &str) -> Self {
        self.post_parameters.push(name.to_string());
        self
    }

    /// Replaces every match of `pattern` in response bodies with
    /// `replacement`, inserted literally.
    pub fn replace_in_response(
        mut self,
        pattern: &str,
        replacement: &str,
    ) -> Result<Self, regex::Error> {
        self.body_rules.push(BodyRule {
            pattern: Regex::new(pattern)?,
            replacement: replacement.to_string(),
        });
        Ok(self)
    }

    /// Rewrites `"<field>":"<value>"` to `"<field>":"<placeholder>"` in
    /// response bodies. `<value>` is any JSON string, escapes included.
    pub fn mask_json_field(mut self, field: &str, placeholder: &str) -> Self {
        let pattern = format!(r#""{}"\s*:\s*"(?:[^"\\]|\\.)*""#, regex::escape(field));
        match Regex::new(&pattern) {
            Ok(pattern) => self.body_rules.push(BodyRule {
                pattern,
                replacement: format!(r#""{}":"{}""#, field, placeholder),
            }),
            Err(err) => log::error!("skipping mask for field {field:?}: {err}"),
        }
        self
    }

    /// Returns true if the header is removed by this redactor.
    pub fn filters_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn redact(&self, mut interaction: Interaction) -> Interaction {
        self.redact_request(&mut interaction.request);
        self.redact_response(&mut interaction.response);
        interaction
    }

    pub fn redact_request(&self, request: &mut RecordedRequest) {
        request.headers.retain(|name, _| !self.filters_header(name));
        if let Some(body) = request.body.take() {
            let redacted = self.redact_request_body(&body);
            if redacted != body {
                request.headers.remove(CONTENT_LENGTH);
            }
            request.body = Some(redacted);
        }
    }

    /// Base64-stored bodies are binary and left untouched by the body rules.
    pub fn redact_response(&self, response: &mut RecordedResponse) {
        response.headers.retain(|name, _| !self.filters_header(name));
        if response.base64 {
            return;
        }
        let redacted = self.redact_response_body(&response.body);
        if redacted != response.body {
            response.headers.remove(CONTENT_LENGTH);
            response.body = redacted;
        }
    }

    /// Applies the body rules to a response body.
    pub fn redact_response_body(&self, body: &str) -> String {
        self.body_rules
            .iter()
            .fold(body.to_string(), |acc, rule| {
                rule.pattern
                    .replace_all(&acc, NoExpand(&rule.replacement))
                    .into_owned()
            })
    }

    /// Removes filtered parameters from a JSON-object or form-encoded body.
    /// Other bodies are returned unchanged.
    pub fn redact_request_body(&self, body: &str) -> String {
        if self.post_parameters.is_empty() {
            return body.to_string();
        }

        if let Ok(serde_json::Value::Object(mut map)) = serde_json::from_str(body) {
            let mut removed = false;
            for name in &self.post_parameters {
                removed |= map.remove(name).is_some();
            }
            if !removed {
                return body.to_string();
            }
            return serde_json::to_string(&map).unwrap_or_else(|_| body.to_string());
        }

        if is_form_encoded(body) {
            return body
                .split('&')
                .filter(|pair| {
                    let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
                    !self.post_parameters.iter().any(|p| p == key)
                })
                .collect::<Vec<_>>()
                .join("&");
        }

        body.to_string()
    }
}

fn is_form_encoded(body: &str) -> bool {
    !body.is_empty()
        && !body.contains(char::is_whitespace)
        && body.split('&').all(|pair| pair.contains('='))
}

/// A cassette shared between an HTTP client and the code that saves it.
#[derive(Debug, Clone)]
pub struct Recorder {
    cassette: Arc<Mutex<Cassette>>,
    redactor: Arc<Redactor>,
}

impl Recorder {
    pub fn new(redactor: Redactor) -> Self {
        Self {
            cassette: Arc::new(Mutex::new(Cassette::new())),
            redactor: Arc::new(redactor),
        }
    }

    /// Redacts and appends an interaction.
    pub fn record(&self, interaction: Interaction) {
        let mut cassette = self
            .cassette
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cassette.record(interaction, &self.redactor);
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Returns a copy of everything recorded so far.
    pub fn snapshot(&self) -> Cassette {
        self.cassette
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CassetteError> {
        self.snapshot().save(path)
    }
}
