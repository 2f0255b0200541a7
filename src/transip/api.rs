//! Low-level TransIP REST API v6 client.
//!
//! Authentication exchanges a signed request for a short-lived bearer token:
//! the JSON body of `POST /auth` is signed with the account's RSA private
//! key (PKCS#1 v1.5, SHA-512) and the base64 signature goes in the
//! `Signature` header. The token is cached and re-acquired once when the
//! API rejects it.
//!
//! # API Reference
//!
//! - [Authentication](https://api.transip.nl/rest/docs.html#header-authentication)
//! - [Domains](https://api.transip.nl/rest/docs.html#domains-domains)
//! - [DNS](https://api.transip.nl/rest/docs.html#domains-dns)

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha512};
use thiserror::Error;

use crate::cassette::{Interaction, RecordedRequest, RecordedResponse, Recorder, Redactor};
use crate::HttpClientConfig;

/// The TransIP API base URL.
const TRANSIP_API_URL: &str = "https://api.transip.nl/v6";

/// Lifetime requested for access tokens.
const DEFAULT_EXPIRATION_TIME: &str = "30 minutes";

/// Prefix of the label attached to every access token.
const DEFAULT_LABEL_PREFIX: &str = "regdns";

/// Maximum number of body bytes written to the log.
const LOG_TRUNCATE_LIMIT: usize = 256;

/// Errors that may occur when interacting with the TransIP API.
#[derive(Debug, Error)]
pub enum TransipError {
    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// An HTTP request error occurred.
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Failed to serialize or deserialize a body.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The private key could not be parsed.
    #[error("invalid private key: {0}")]
    Key(String),

    /// The private key file could not be read.
    #[error("failed to read private key: {0}")]
    KeyIo(#[from] std::io::Error),

    /// Signing the authentication request failed.
    #[error("request signing failed: {0}")]
    Signing(#[from] rsa::Error),

    /// A token or signature was not a valid header value.
    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

impl TransipError {
    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransipError::Api { status, .. } => Some(*status),
            TransipError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the API refused a create because the entry exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            TransipError::Api { status, message } => {
                matches!(status, 403 | 406 | 409)
                    && message.to_ascii_lowercase().contains("already exists")
            }
            _ => false,
        }
    }
}

/// Where the RSA private key comes from.
///
/// A string that names an existing file is read from disk; any other string
/// is taken as the PEM text itself.
#[derive(Clone, PartialEq, Eq)]
pub enum PrivateKeySource {
    Path(PathBuf),
    Pem(String),
}

impl PrivateKeySource {
    /// Classifies `value` as a path or literal PEM.
    pub fn detect(value: &str) -> Self {
        let candidate = Path::new(value.trim());
        if !value.contains("-----BEGIN") && candidate.is_file() {
            PrivateKeySource::Path(candidate.to_path_buf())
        } else {
            PrivateKeySource::Pem(value.to_string())
        }
    }

    /// Loads and parses the key. Accepts PKCS#1 and PKCS#8 PEM.
    pub fn resolve(&self) -> Result<RsaPrivateKey, TransipError> {
        let pem = match self {
            PrivateKeySource::Path(path) => fs::read_to_string(path)?,
            PrivateKeySource::Pem(pem) => pem.clone(),
        };
        parse_private_key(&pem)
    }
}

impl fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKeySource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            PrivateKeySource::Pem(_) => f.write_str("Pem(<redacted>)"),
        }
    }
}

impl From<&str> for PrivateKeySource {
    fn from(value: &str) -> Self {
        Self::detect(value)
    }
}

impl From<String> for PrivateKeySource {
    fn from(value: String) -> Self {
        Self::detect(&value)
    }
}

impl From<&Path> for PrivateKeySource {
    fn from(path: &Path) -> Self {
        PrivateKeySource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for PrivateKeySource {
    fn from(path: PathBuf) -> Self {
        PrivateKeySource::Path(path)
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, TransipError> {
    let pem = pem.trim();
    if pem.contains("BEGIN RSA PRIVATE KEY") {
        return RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| TransipError::Key(e.to_string()));
    }
    RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| TransipError::Key(e.to_string()))
}

/// Configuration for the TransIP API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Account login name.
    pub login: String,
    /// The key pair's private half.
    pub private_key: PrivateKeySource,
    /// Whether the key is valid from any IP address rather than a whitelist.
    pub global_key: bool,
    /// Request read-only tokens.
    pub read_only: bool,
    /// Token lifetime, e.g. `"30 minutes"`.
    pub expiration_time: String,
    /// Prefix of the unique label attached to each token.
    pub label_prefix: String,
}

impl ClientConfig {
    /// Creates a configuration.
    ///
    /// # Arguments
    ///
    /// * `login` - TransIP account name
    /// * `private_key` - path to a PEM file, or the PEM text
    /// * `global_key` - whether the key is a global (non IP-whitelisted) key
    pub fn new(
        login: impl Into<String>,
        private_key: impl Into<PrivateKeySource>,
        global_key: bool,
    ) -> Self {
        Self {
            login: login.into(),
            private_key: private_key.into(),
            global_key,
            read_only: false,
            expiration_time: DEFAULT_EXPIRATION_TIME.to_string(),
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn expiration_time(mut self, expiration_time: impl Into<String>) -> Self {
        self.expiration_time = expiration_time.into();
        self
    }

    pub fn label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Body of `POST /auth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub login: String,
    pub nonce: String,
    pub read_only: bool,
    pub expiration_time: String,
    pub label: String,
    pub global_key: bool,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

/// A domain in the account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    #[serde(default)]
    pub auth_code: Option<String>,
    #[serde(default)]
    pub is_transfer_locked: Option<bool>,
    #[serde(default)]
    pub registration_date: Option<String>,
    #[serde(default)]
    pub renewal_date: Option<String>,
    #[serde(default)]
    pub is_dns_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DomainResponse {
    domain: Domain,
}

#[derive(Debug, Deserialize)]
struct DomainsResponse {
    #[serde(default)]
    domains: Vec<Domain>,
}

/// A DNS entry. TransIP identifies entries by name, type and content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsEntry {
    /// Name relative to the domain, `@` for the apex.
    pub name: String,
    /// TTL in seconds.
    pub expire: u64,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DnsEntryRequest<'a> {
    dns_entry: &'a DnsEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DnsEntriesResponse {
    #[serde(default)]
    dns_entries: Vec<DnsEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// API Client
// =============================================================================

/// TransIP API client.
pub struct Client {
    http_client: reqwest::Client,
    base_url: String,
    config: ClientConfig,
    private_key: RsaPrivateKey,
    token: Mutex<Option<String>>,
    recorder: Option<Recorder>,
    log_redactor: Redactor,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("login", &self.config.login)
            .field("global_key", &self.config.global_key)
            .field("recording", &self.recorder.is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the production API.
    pub fn new(config: ClientConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_base_url(config, TRANSIP_API_URL, HttpClientConfig::default())
    }

    /// Creates a client with custom HTTP configuration.
    pub fn with_config(
        config: ClientConfig,
        http_config: HttpClientConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_base_url(config, TRANSIP_API_URL, http_config)
    }

    /// Creates a client with a custom base URL.
    ///
    /// This is primarily useful for testing with mock servers.
    pub fn with_base_url(
        config: ClientConfig,
        base_url: &str,
        http_config: HttpClientConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let private_key = config.private_key.resolve()?;
        let http_client = http_config
            .client_builder()
            .user_agent(concat!("regdns/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            private_key,
            token: Mutex::new(None),
            recorder: None,
            log_redactor: Redactor::transip(),
        })
    }

    /// Captures every exchange into `recorder`, redacted.
    pub fn with_recorder(mut self, recorder: Recorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Signs `body` with the private key and returns the base64 signature.
    pub fn sign(&self, body: &[u8]) -> Result<String, TransipError> {
        let digest = Sha512::digest(body);
        let signature = self
            .private_key
            .sign(Pkcs1v15Sign::new::<Sha512>(), &digest)?;
        Ok(BASE64.encode(signature))
    }

    fn auth_request(&self) -> AuthRequest {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        AuthRequest {
            login: self.config.login.clone(),
            label: format!("{} {}", self.config.label_prefix, nonce),
            nonce,
            read_only: self.config.read_only,
            expiration_time: self.config.expiration_time.clone(),
            global_key: self.config.global_key,
        }
    }

    /// Requests a new access token and caches it.
    pub async fn authenticate(&self) -> Result<String, TransipError> {
        let body = serde_json::to_vec(&self.auth_request())?;

        let mut signature = HeaderValue::from_str(&self.sign(&body)?)?;
        signature.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("Signature", signature);

        let (status, text) = self
            .execute(Method::POST, "/auth", Some(body), headers)
            .await?;
        let auth: AuthResponse = parse(check_status(status, text)?)?;

        log::debug!(
            "[transip] authenticated as {} (global key: {})",
            self.config.login,
            self.config.global_key
        );
        *self.lock_token() = Some(auth.token.clone());
        Ok(auth.token)
    }

    fn lock_token(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sends a request and returns status and body text.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        headers: HeaderMap,
    ) -> Result<(StatusCode, String), TransipError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http_client.request(method.clone(), &url).headers(headers);
        if let Some(body) = body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }
        let request = builder.build()?;
        let recorded_request = self.recorder.as_ref().map(|_| capture_request(&request));

        log::debug!("[transip] {} {}", method, path);
        let response = self.http_client.execute(request).await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        log::debug!("[transip] Response Status: {}", status.as_u16());
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "[transip] Response Body: {}",
                truncate_for_log(&self.log_redactor.redact_response_body(&text))
            );
        }

        if let (Some(recorder), Some(request)) = (&self.recorder, recorded_request) {
            let mut response = RecordedResponse::new(status.as_u16()).body_bytes(&bytes);
            for (name, value) in &response_headers {
                response = response.header(
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                );
            }
            recorder.record(Interaction::new(request, response));
        }

        Ok((status, text))
    }

    /// Sends an authorized request, re-authenticating once if a cached
    /// token is rejected.
    async fn authorized(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<String, TransipError> {
        let cached = self.lock_token().clone();
        let (token, reused) = match cached {
            Some(token) => (token, true),
            None => (self.authenticate().await?, false),
        };

        let (status, text) = self
            .execute(method.clone(), path, body.clone(), bearer(&token)?)
            .await?;

        if status == StatusCode::UNAUTHORIZED && reused {
            log::warn!("[transip] access token rejected, re-authenticating");
            self.lock_token().take();
            let token = self.authenticate().await?;
            let (status, text) = self.execute(method, path, body, bearer(&token)?).await?;
            return check_status(status, text);
        }

        check_status(status, text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransipError> {
        let text = self.authorized(Method::GET, path, None).await?;
        parse(text)
    }

    async fn send_entry(
        &self,
        method: Method,
        domain: &str,
        entry: &DnsEntry,
    ) -> Result<(), TransipError> {
        let body = serde_json::to_vec(&DnsEntryRequest { dns_entry: entry })?;
        self.authorized(method, &format!("/domains/{}/dns", domain), Some(body))
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Domain APIs
    // =========================================================================

    /// Lists all domains in the account.
    pub async fn list_domains(&self) -> Result<Vec<Domain>, TransipError> {
        let response: DomainsResponse = self.get("/domains").await?;
        Ok(response.domains)
    }

    /// Gets a domain by name.
    pub async fn get_domain(&self, name: &str) -> Result<Domain, TransipError> {
        let response: DomainResponse = self.get(&format!("/domains/{}", name)).await?;
        Ok(response.domain)
    }

    // =========================================================================
    // DNS APIs
    // =========================================================================

    /// Lists all DNS entries of a domain.
    pub async fn list_dns_entries(&self, domain: &str) -> Result<Vec<DnsEntry>, TransipError> {
        let response: DnsEntriesResponse = self.get(&format!("/domains/{}/dns", domain)).await?;
        Ok(response.dns_entries)
    }

    /// Adds a DNS entry.
    pub async fn create_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<(), TransipError> {
        self.send_entry(Method::POST, domain, entry).await
    }

    /// Changes the content of the entry matching name, type and expire.
    pub async fn update_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<(), TransipError> {
        self.send_entry(Method::PATCH, domain, entry).await
    }

    /// Removes a DNS entry.
    pub async fn delete_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<(), TransipError> {
        self.send_entry(Method::DELETE, domain, entry).await
    }
}

fn bearer(token: &str) -> Result<HeaderMap, TransipError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

fn check_status(status: StatusCode, text: String) -> Result<String, TransipError> {
    if status.is_success() {
        return Ok(text);
    }
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    log::debug!("[transip] API error {}: {}", status.as_u16(), message);
    Err(TransipError::Api {
        status: status.as_u16(),
        message,
    })
}

fn parse<T: DeserializeOwned>(text: String) -> Result<T, TransipError> {
    serde_json::from_str(&text).map_err(|err| {
        log::error!("[transip] JSON parse failed: {err}");
        TransipError::Serialization(err)
    })
}

fn capture_request(request: &reqwest::Request) -> RecordedRequest {
    let mut recorded = RecordedRequest::new(request.method().as_str(), request.url().as_str());
    for (name, value) in request.headers() {
        recorded = recorded.header(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    if let Some(bytes) = request.body().and_then(|body| body.as_bytes()) {
        recorded = recorded.body(String::from_utf8_lossy(bytes).into_owned());
    }
    recorded
}

/// Truncates `s` to [`LOG_TRUNCATE_LIMIT`] bytes on a char boundary.
fn truncate_for_log(s: &str) -> String {
    if s.len() <= LOG_TRUNCATE_LIMIT {
        return s.to_string();
    }
    let mut end = LOG_TRUNCATE_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, total {} bytes]", &s[..end], s.len())
}
