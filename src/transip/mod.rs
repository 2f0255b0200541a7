//! TransIP DNS provider implementation.
//!
//! This provider uses the TransIP REST API v6 with key-pair authentication.
//!
//! # Authentication
//!
//! Requires a TransIP account login and an API key pair:
//! - Generate a key pair at: <https://www.transip.nl/cp/account/api/>
//! - Keys are either IP-whitelisted or *global* (usable from any address);
//!   pass `global_key = true` for the latter
//! - The private key can be given as a path to the PEM file or as the PEM text
//!
//! # Example
//!
//! ```no_run
//! use regdns::transip::{ClientConfig, TransipProvider};
//! use regdns::{CreateRecord, Provider, RecordData, Zone};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = ClientConfig::new("my-login", "/home/me/transip.pem", true);
//! let provider = TransipProvider::new(config)?;
//!
//! let zone = provider.get_zone("example.nl").await?;
//! // CNAME targets outside the zone must be fully qualified.
//! zone.create_record("docs", &RecordData::CNAME("docs.example.com.".into()), 3600)
//!     .await?;
//!
//! for record in zone.list_records().await? {
//!     println!("{} {} {}", record.host, record.data.get_type(), record.data.get_value());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Record Identifiers
//!
//! TransIP DNS entries carry no identifier of their own. Records are
//! identified as `"<name>/<type>/<content>"`, e.g. `docs/CNAME/docs.example.com.`.
//!
//! # Supported Record Types
//!
//! A, AAAA, CNAME, MX, NS, TXT, SRV, SSHFP, TLSA, CAA, NAPTR, DS and ALIAS.

pub mod api;

use std::error::Error as StdErr;
use std::sync::Arc;

pub use api::{Client, ClientConfig, DnsEntry, Domain, PrivateKeySource, TransipError};

use crate::types::{DomainName, RecordType, Ttl};
use crate::{
    CreateRecord, CreateRecordError, DeleteRecord, DeleteRecordError, HttpClientConfig, Provider,
    Record, RecordData, RetrieveRecordError, RetrieveZoneError, UpdateRecord, UpdateRecordError,
    Zone,
};

/// Supported record types for TransIP DNS.
const SUPPORTED_RECORD_TYPES: &[&str; 13] = &[
    "A", "AAAA", "CNAME", "MX", "NS", "TXT", "SRV", "SSHFP", "TLSA", "CAA", "NAPTR", "DS",
    "ALIAS",
];

/// TTL used when a record is created with a TTL of 0.
pub const DEFAULT_TTL: u64 = 3600;

/// TransIP DNS provider.
#[derive(Debug, Clone)]
pub struct TransipProvider {
    api_client: Arc<Client>,
}

impl TransipProvider {
    /// Creates a new TransIP provider.
    ///
    /// Fails if the private key cannot be read or parsed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use regdns::transip::{ClientConfig, TransipProvider};
    ///
    /// let config = ClientConfig::new("my-login", "/home/me/transip.pem", false);
    /// let provider = TransipProvider::new(config).unwrap();
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self, Box<dyn StdErr + Send + Sync>> {
        Ok(Self::from_client(Client::new(config)?))
    }

    /// Creates a new TransIP provider with custom HTTP client configuration.
    pub fn with_config(
        config: ClientConfig,
        http_config: HttpClientConfig,
    ) -> Result<Self, Box<dyn StdErr + Send + Sync>> {
        Ok(Self::from_client(Client::with_config(config, http_config)?))
    }

    /// Creates a new TransIP provider with a custom API base URL.
    ///
    /// This is primarily useful for testing with mock servers.
    pub fn with_base_url(
        config: ClientConfig,
        base_url: &str,
    ) -> Result<Self, Box<dyn StdErr + Send + Sync>> {
        Ok(Self::from_client(Client::with_base_url(
            config,
            base_url,
            HttpClientConfig::default(),
        )?))
    }

    /// Wraps an already configured client, e.g. one with a recorder attached.
    pub fn from_client(client: Client) -> Self {
        Self {
            api_client: Arc::new(client),
        }
    }

    /// Returns the underlying API client.
    pub fn client(&self) -> &Client {
        &self.api_client
    }
}

fn retrieve_zone_error(err: TransipError) -> RetrieveZoneError<TransipError> {
    match err.status() {
        Some(404) => RetrieveZoneError::NotFound,
        Some(401) | Some(403) => RetrieveZoneError::Unauthorized,
        _ => RetrieveZoneError::Custom(err),
    }
}

fn retrieve_record_error(err: TransipError) -> RetrieveRecordError<TransipError> {
    match err.status() {
        Some(404) => RetrieveRecordError::NotFound,
        Some(401) | Some(403) => RetrieveRecordError::Unauthorized,
        _ => RetrieveRecordError::Custom(err),
    }
}

impl Provider for TransipProvider {
    type Zone = TransipZone;
    type CustomRetrieveError = TransipError;

    async fn get_zone(
        &self,
        zone_id: &str,
    ) -> Result<Self::Zone, RetrieveZoneError<Self::CustomRetrieveError>> {
        let domain = self
            .api_client
            .get_domain(zone_id.trim_end_matches('.'))
            .await
            .map_err(retrieve_zone_error)?;

        Ok(TransipZone::from_api(self.api_client.clone(), domain))
    }

    async fn list_zones(
        &self,
    ) -> Result<Vec<Self::Zone>, RetrieveZoneError<Self::CustomRetrieveError>> {
        let domains = self
            .api_client
            .list_domains()
            .await
            .map_err(retrieve_zone_error)?;

        Ok(domains
            .into_iter()
            .map(|domain| TransipZone::from_api(self.api_client.clone(), domain))
            .collect())
    }
}

/// A domain managed at TransIP.
///
/// Host names passed to the record operations may be relative (`docs`),
/// fully written out (`docs.example.nl`) or absolute (`docs.example.nl.`);
/// all three address the same entry.
#[derive(Debug, Clone)]
pub struct TransipZone {
    api_client: Arc<Client>,
    repr: api::Domain,
    origin: DomainName,
}

impl TransipZone {
    fn from_api(api_client: Arc<Client>, domain: api::Domain) -> Self {
        let origin = DomainName::from_dotted(&domain.name).unwrap_or_default();
        Self {
            api_client,
            repr: domain,
            origin,
        }
    }

    /// Returns the raw domain information.
    pub fn info(&self) -> &api::Domain {
        &self.repr
    }

    /// Returns `host` relative to this zone, `@` for the apex.
    pub fn relative_name(&self, host: &str) -> String {
        let host = host.trim();
        if host.is_empty() || host == "@" {
            return "@".to_string();
        }
        DomainName::from_dotted(host)
            .and_then(|name| name.relative_to(&self.origin))
            .unwrap_or_else(|| host.trim_end_matches('.').to_string())
    }

    /// Creates a record from a type mnemonic, host and presentation-format
    /// content, using the default TTL.
    ///
    /// ```no_run
    /// # use regdns::transip::TransipZone;
    /// # async fn example(zone: &TransipZone) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// zone.create_entry("CNAME", "docs", "docs.example.com.").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_entry(
        &self,
        rtype: &str,
        name: &str,
        content: &str,
    ) -> Result<Record, CreateRecordError<TransipError>> {
        let typ = RecordType::from_str(rtype)
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| rtype.to_ascii_uppercase());
        self.create_record(name, &RecordData::from_raw(&typ, content), 0)
            .await
    }

    fn record_from_entry(&self, entry: &DnsEntry) -> Record {
        Record {
            id: record_id(&entry.name, &entry.entry_type, &entry.content),
            host: entry.name.clone(),
            data: RecordData::from_raw(&entry.entry_type, &entry.content),
            ttl: entry.expire,
        }
    }

    /// Finds the entries addressed by a record id.
    async fn matching_entries(
        &self,
        record_id: &str,
    ) -> Result<Vec<DnsEntry>, RetrieveRecordError<TransipError>> {
        let (name, typ, content) = parse_record_id(record_id).ok_or(RetrieveRecordError::NotFound)?;
        let name = self.relative_name(name);

        let entries = self
            .api_client
            .list_dns_entries(&self.repr.name)
            .await
            .map_err(retrieve_record_error)?;

        Ok(entries
            .into_iter()
            .filter(|e| {
                e.name.eq_ignore_ascii_case(&name)
                    && e.entry_type.eq_ignore_ascii_case(typ)
                    && e.content == content
            })
            .collect())
    }
}

/// Builds the `"<name>/<type>/<content>"` record id.
pub fn record_id(name: &str, typ: &str, content: &str) -> String {
    format!("{}/{}/{}", name, typ, content)
}

/// Splits a record id into name, type and content.
pub fn parse_record_id(record_id: &str) -> Option<(&str, &str, &str)> {
    let mut parts = record_id.splitn(3, '/');
    let name = parts.next().filter(|s| !s.is_empty())?;
    let typ = parts.next().filter(|s| !s.is_empty())?;
    let content = parts.next()?;
    Some((name, typ, content))
}

impl Zone for TransipZone {
    type CustomRetrieveError = TransipError;

    fn id(&self) -> &str {
        &self.repr.name
    }

    fn domain(&self) -> &str {
        &self.repr.name
    }

    async fn list_records(
        &self,
    ) -> Result<Vec<Record>, RetrieveRecordError<Self::CustomRetrieveError>> {
        let entries = self
            .api_client
            .list_dns_entries(&self.repr.name)
            .await
            .map_err(retrieve_record_error)?;

        Ok(entries.iter().map(|e| self.record_from_entry(e)).collect())
    }

    async fn get_record(
        &self,
        record_id: &str,
    ) -> Result<Record, RetrieveRecordError<Self::CustomRetrieveError>> {
        let entries = self.matching_entries(record_id).await?;
        entries
            .first()
            .map(|e| self.record_from_entry(e))
            .ok_or(RetrieveRecordError::NotFound)
    }
}

impl CreateRecord for TransipZone {
    type CustomCreateError = TransipError;

    async fn create_record(
        &self,
        host: &str,
        data: &RecordData,
        ttl: u64,
    ) -> Result<Record, CreateRecordError<Self::CustomCreateError>> {
        let typ = data.get_type();
        if !SUPPORTED_RECORD_TYPES.contains(&typ) {
            return Err(CreateRecordError::UnsupportedType);
        }

        let content = data.get_value();
        if host.trim().is_empty() || content.trim().is_empty() {
            return Err(CreateRecordError::InvalidRecord);
        }

        if let RecordData::CNAME(target) = data {
            let name = DomainName::from_dotted(target).ok_or(CreateRecordError::InvalidRecord)?;
            if !name.is_absolute() {
                log::warn!(
                    "[transip] CNAME target {target:?} has no trailing dot and resolves relative to {}",
                    self.repr.name
                );
            }
        }

        let expire = if ttl == 0 {
            DEFAULT_TTL
        } else {
            u64::from(Ttl::saturating_from_u64(ttl).as_secs())
        };

        let entry = DnsEntry {
            name: self.relative_name(host),
            expire,
            entry_type: typ.to_string(),
            content,
        };

        match self.api_client.create_dns_entry(&self.repr.name, &entry).await {
            Ok(()) => {}
            Err(err) if err.is_already_exists() => {
                log::debug!(
                    "[transip] {} {} already present in {}",
                    entry.entry_type,
                    entry.name,
                    self.repr.name
                );
            }
            Err(err) => {
                return Err(match err.status() {
                    Some(401) | Some(403) => CreateRecordError::Unauthorized,
                    Some(406) | Some(422) => CreateRecordError::InvalidRecord,
                    _ => CreateRecordError::Custom(err),
                });
            }
        }

        Ok(Record {
            id: record_id(&entry.name, &entry.entry_type, &entry.content),
            host: entry.name,
            data: data.clone(),
            ttl: expire,
        })
    }
}

impl UpdateRecord for TransipZone {
    type CustomUpdateError = TransipError;

    async fn update_record(
        &self,
        record_id: &str,
        data: &RecordData,
    ) -> Result<Record, UpdateRecordError<Self::CustomUpdateError>> {
        let entries = self.matching_entries(record_id).await.map_err(|err| match err {
            RetrieveRecordError::NotFound => UpdateRecordError::NotFound,
            RetrieveRecordError::Unauthorized => UpdateRecordError::Unauthorized,
            RetrieveRecordError::Custom(err) => UpdateRecordError::Custom(err),
        })?;

        let current = entries.first().ok_or(UpdateRecordError::NotFound)?;
        if entries.len() > 1 {
            log::warn!(
                "[transip] {} entries match {record_id:?}, only the first is updated",
                entries.len()
            );
        }

        if !data.get_type().eq_ignore_ascii_case(&current.entry_type) {
            return Err(UpdateRecordError::InvalidRecord);
        }

        let content = data.get_value();
        if content.trim().is_empty() {
            return Err(UpdateRecordError::InvalidRecord);
        }

        let entry = DnsEntry {
            content,
            ..current.clone()
        };

        self.api_client
            .update_dns_entry(&self.repr.name, &entry)
            .await
            .map_err(|err| match err.status() {
                Some(404) => UpdateRecordError::NotFound,
                Some(401) | Some(403) => UpdateRecordError::Unauthorized,
                Some(406) | Some(422) => UpdateRecordError::InvalidRecord,
                _ => UpdateRecordError::Custom(err),
            })?;

        Ok(self.record_from_entry(&entry))
    }
}

impl DeleteRecord for TransipZone {
    type CustomDeleteError = TransipError;

    async fn delete_record(
        &self,
        record_id: &str,
    ) -> Result<(), DeleteRecordError<Self::CustomDeleteError>> {
        let entries = self.matching_entries(record_id).await.map_err(|err| match err {
            RetrieveRecordError::NotFound => DeleteRecordError::NotFound,
            RetrieveRecordError::Unauthorized => DeleteRecordError::Unauthorized,
            RetrieveRecordError::Custom(err) => DeleteRecordError::Custom(err),
        })?;

        if entries.is_empty() {
            return Err(DeleteRecordError::NotFound);
        }

        for entry in &entries {
            self.api_client
                .delete_dns_entry(&self.repr.name, entry)
                .await
                .map_err(|err| match err.status() {
                    Some(404) => DeleteRecordError::NotFound,
                    Some(401) | Some(403) => DeleteRecordError::Unauthorized,
                    _ => DeleteRecordError::Custom(err),
                })?;
        }

        Ok(())
    }
}
