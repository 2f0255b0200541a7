//! Provider-agnostic DNS record management.
//!
//! The crate exposes a small set of traits that every DNS provider implements:
//!
//! - [`Provider`] - look up and list the zones an account can manage
//! - [`Zone`] - list and fetch records inside a zone
//! - [`CreateRecord`], [`UpdateRecord`], [`DeleteRecord`] - record mutation
//!
//! Providers are enabled through Cargo features:
//!
//! | Feature | Module | Notes |
//! |---------|--------|-------|
//! | `transip` | [`transip`] | TransIP REST API v6, RSA-signed key authentication |
//! | `cassette` | [`cassette`] | Recording HTTP interactions with secrets redacted |
//!
//! # Example
//!
//! ```no_run
//! use regdns::transip::{ClientConfig, TransipProvider};
//! use regdns::{CreateRecord, Provider, RecordData};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = ClientConfig::new("my-login", "/etc/transip/key.pem", true);
//! let provider = TransipProvider::new(config)?;
//!
//! let zone = provider.get_zone("example.nl").await?;
//! zone.create_record("docs", &RecordData::CNAME("docs.example.com.".into()), 3600)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::error::Error as StdErr;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use thiserror::Error;

pub mod types;

#[cfg(feature = "cassette")]
pub mod cassette;

#[cfg(feature = "transip")]
pub mod transip;

/// Timeout applied to HTTP clients when [`HttpClientConfig::timeout`] is unset.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client configuration shared by all providers.
///
/// Allows binding outgoing connections to a local address or interface and
/// overriding the request timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Local IP address to bind outgoing connections to.
    pub local_address: Option<IpAddr>,
    /// Network interface to bind outgoing connections to (Unix only).
    pub interface: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl HttpClientConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds outgoing connections to `addr`.
    pub fn local_address(mut self, addr: IpAddr) -> Self {
        self.local_address = Some(addr);
        self
    }

    /// Binds outgoing connections to the named interface.
    pub fn interface(mut self, iface: impl Into<String>) -> Self {
        self.interface = Some(iface.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns a `reqwest` client builder with this configuration applied.
    #[cfg(feature = "transip")]
    pub(crate) fn client_builder(&self) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT));

        if let Some(addr) = self.local_address {
            builder = builder.local_address(addr);
        }

        #[cfg(any(
            target_os = "android",
            target_os = "fuchsia",
            target_os = "linux",
            target_os = "macos",
            target_os = "ios",
            target_os = "tvos",
            target_os = "watchos",
            target_os = "illumos",
            target_os = "solaris",
        ))]
        if let Some(ref iface) = self.interface {
            builder = builder.interface(iface);
        }

        builder
    }
}

/// A DNS record as seen by the generic traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Provider-specific record identifier.
    pub id: String,
    /// Host name relative to the zone, `@` for the apex.
    pub host: String,
    /// Typed record data.
    pub data: RecordData,
    /// TTL in seconds.
    pub ttl: u64,
}

/// Typed DNS record data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(String),
    MX {
        priority: u16,
        mail_server: String,
    },
    NS(String),
    TXT(String),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    /// Any record type without a dedicated variant.
    Other { typ: String, value: String },
}

impl RecordData {
    /// Returns the record type as an upper-case string.
    pub fn get_type(&self) -> &str {
        match self {
            RecordData::A(_) => "A",
            RecordData::AAAA(_) => "AAAA",
            RecordData::CNAME(_) => "CNAME",
            RecordData::MX { .. } => "MX",
            RecordData::NS(_) => "NS",
            RecordData::TXT(_) => "TXT",
            RecordData::SRV { .. } => "SRV",
            RecordData::Other { typ, .. } => typ,
        }
    }

    /// Returns the record value in zone-file presentation.
    ///
    /// MX values are `"<priority> <host>"`, SRV values are
    /// `"<priority> <weight> <port> <target>"`.
    pub fn get_value(&self) -> String {
        match self {
            RecordData::A(ip) => ip.to_string(),
            RecordData::AAAA(ip) => ip.to_string(),
            RecordData::CNAME(target) => target.clone(),
            RecordData::MX {
                priority,
                mail_server,
            } => format!("{} {}", priority, mail_server),
            RecordData::NS(ns) => ns.clone(),
            RecordData::TXT(txt) => txt.clone(),
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => format!("{} {} {} {}", priority, weight, port, target),
            RecordData::Other { value, .. } => value.clone(),
        }
    }

    /// Returns the value for APIs that carry MX priority in a separate field.
    pub fn get_api_value(&self) -> String {
        match self {
            RecordData::MX { mail_server, .. } => mail_server.clone(),
            _ => self.get_value(),
        }
    }

    /// Parses a type and presentation-format value.
    ///
    /// Values that do not parse for their type are kept as [`RecordData::Other`].
    pub fn from_raw(typ: &str, value: &str) -> RecordData {
        let other = || RecordData::Other {
            typ: typ.to_string(),
            value: value.to_string(),
        };

        match typ {
            "A" => value.parse().map(RecordData::A).unwrap_or_else(|_| other()),
            "AAAA" => value
                .parse()
                .map(RecordData::AAAA)
                .unwrap_or_else(|_| other()),
            "CNAME" => RecordData::CNAME(value.to_string()),
            "NS" => RecordData::NS(value.to_string()),
            "TXT" => RecordData::TXT(value.to_string()),
            "MX" => match value.split_once(' ') {
                Some((priority, server)) => match priority.parse() {
                    Ok(priority) => RecordData::MX {
                        priority,
                        mail_server: server.to_string(),
                    },
                    Err(_) => other(),
                },
                None => other(),
            },
            "SRV" => {
                let parts: Vec<&str> = value.splitn(4, ' ').collect();
                if parts.len() != 4 {
                    return other();
                }
                match (parts[0].parse(), parts[1].parse(), parts[2].parse()) {
                    (Ok(priority), Ok(weight), Ok(port)) => RecordData::SRV {
                        priority,
                        weight,
                        port,
                        target: parts[3].to_string(),
                    },
                    _ => other(),
                }
            }
            _ => other(),
        }
    }
}

/// Errors returned when retrieving zones.
#[derive(Debug, Error)]
pub enum RetrieveZoneError<T> {
    #[error("zone not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Custom(T),
}

/// Errors returned when retrieving records.
#[derive(Debug, Error)]
pub enum RetrieveRecordError<T> {
    #[error("record not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Custom(T),
}

/// Errors returned when creating records.
#[derive(Debug, Error)]
pub enum CreateRecordError<T> {
    #[error("unsupported record type")]
    UnsupportedType,
    #[error("invalid record")]
    InvalidRecord,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Custom(T),
}

/// Errors returned when updating records.
#[derive(Debug, Error)]
pub enum UpdateRecordError<T> {
    #[error("record not found")]
    NotFound,
    #[error("invalid record")]
    InvalidRecord,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Custom(T),
}

/// Errors returned when deleting records.
#[derive(Debug, Error)]
pub enum DeleteRecordError<T> {
    #[error("record not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Custom(T),
}

/// A DNS provider account.
#[allow(async_fn_in_trait)]
pub trait Provider {
    type Zone: Zone;
    type CustomRetrieveError: StdErr;

    /// Fetches a zone by provider id or domain name.
    async fn get_zone(
        &self,
        zone_id: &str,
    ) -> Result<Self::Zone, RetrieveZoneError<Self::CustomRetrieveError>>;

    /// Lists every zone the credentials can manage.
    async fn list_zones(
        &self,
    ) -> Result<Vec<Self::Zone>, RetrieveZoneError<Self::CustomRetrieveError>>;
}

/// A DNS zone.
#[allow(async_fn_in_trait)]
pub trait Zone {
    type CustomRetrieveError: StdErr;

    fn id(&self) -> &str;

    fn domain(&self) -> &str;

    async fn list_records(
        &self,
    ) -> Result<Vec<Record>, RetrieveRecordError<Self::CustomRetrieveError>>;

    async fn get_record(
        &self,
        record_id: &str,
    ) -> Result<Record, RetrieveRecordError<Self::CustomRetrieveError>>;
}

/// A zone that supports record creation.
#[allow(async_fn_in_trait)]
pub trait CreateRecord: Zone {
    type CustomCreateError: StdErr;

    /// Creates a record. A `ttl` of 0 selects the provider default.
    async fn create_record(
        &self,
        host: &str,
        data: &RecordData,
        ttl: u64,
    ) -> Result<Record, CreateRecordError<Self::CustomCreateError>>;
}

/// A zone that supports changing the value of an existing record.
#[allow(async_fn_in_trait)]
pub trait UpdateRecord: Zone {
    type CustomUpdateError: StdErr;

    async fn update_record(
        &self,
        record_id: &str,
        data: &RecordData,
    ) -> Result<Record, UpdateRecordError<Self::CustomUpdateError>>;
}

/// A zone that supports record deletion.
#[allow(async_fn_in_trait)]
pub trait DeleteRecord: Zone {
    type CustomDeleteError: StdErr;

    async fn delete_record(
        &self,
        record_id: &str,
    ) -> Result<(), DeleteRecordError<Self::CustomDeleteError>>;
}
