//! Mock-based tests for the TransIP DNS provider.
//!
//! These tests use `wiremock` to simulate the TransIP REST API v6 without
//! requiring network access or an account.
//!
//! # Coverage
//!
//! - Authentication (signature, request body, token caching, token refresh)
//! - Zone operations (list, get)
//! - DNS entry operations (list, get, create, update, delete)
//! - Error handling (401, 404, 406, duplicate entries)
//! - Recording redacted cassettes and replaying committed ones
//!
//! # API Structure
//!
//! - Auth: `POST /auth` signed with the `Signature` header, answered with a token
//! - Domains: `GET /domains`, `GET /domains/{name}`
//! - DNS: `GET/POST/PATCH/DELETE /domains/{name}/dns`
//! - Requests after auth carry `Authorization: Bearer <token>`

use crate::common::transip::*;
use crate::common::{
    cassette_path, constants::*, fake_key_file, replay_cassette, setup_mock_server,
};

use regdns::cassette::{Cassette, Recorder, Redactor};
use regdns::transip::{Client, ClientConfig, TransipProvider, TransipZone};
use regdns::{
    CreateRecord, CreateRecordError, DeleteRecord, DeleteRecordError, HttpClientConfig, Provider,
    RecordData, RetrieveRecordError, RetrieveZoneError, UpdateRecord, UpdateRecordError, Zone,
};
use serde_json::{json, Value};
use std::net::Ipv4Addr;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Helpers
// =============================================================================

fn bearer() -> String {
    format!("Bearer {}", TEST_TOKEN)
}

fn test_config(key_file: &tempfile::NamedTempFile) -> ClientConfig {
    ClientConfig::new(TEST_LOGIN, key_file.path(), true)
}

fn test_provider(server: &MockServer) -> TransipProvider {
    let key_file = fake_key_file();
    TransipProvider::with_base_url(test_config(&key_file), &server.uri())
        .expect("Failed to create provider")
}

/// Mounts `/auth`, answering only correctly signed requests.
async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(ValidSignature(fake_public_key()))
        .respond_with(ResponseTemplate::new(201).set_body_json(mock_auth_response()))
        .mount(server)
        .await;
}

async fn mount_domain(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/domains/{}", TEST_DOMAIN)))
        .and(header("Authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_domain_response(TEST_DOMAIN)))
        .mount(server)
        .await;
}

async fn mount_entries(server: &MockServer, entries: &[(&str, u64, &str, &str)]) {
    Mock::given(method("GET"))
        .and(path(format!("/domains/{}/dns", TEST_DOMAIN)))
        .and(header("Authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_dns_entries_response(entries)))
        .mount(server)
        .await;
}

/// Mounts auth and domain lookup and returns the zone.
async fn test_zone(server: &MockServer) -> TransipZone {
    mount_auth(server).await;
    mount_domain(server).await;
    test_provider(server)
        .get_zone(TEST_DOMAIN)
        .await
        .expect("Failed to get zone")
}

async fn received_body(server: &MockServer, http_method: &str, url_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .iter()
        .filter(|r| r.method.as_str() == http_method && r.url.path() == url_path)
        .map(|r| serde_json::from_slice(&r.body).expect("Request body is JSON"))
        .collect()
}

fn dns_path() -> String {
    format!("/domains/{}/dns", TEST_DOMAIN)
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_auth_request_is_signed_and_complete() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    assert_eq!(zone.domain(), TEST_DOMAIN);

    let bodies = received_body(&server, "POST", "/auth").await;
    assert_eq!(bodies.len(), 1);
    let auth = &bodies[0];

    assert_eq!(auth["login"], TEST_LOGIN);
    assert_eq!(auth["global_key"], true);
    assert_eq!(auth["read_only"], false);
    assert_eq!(auth["expiration_time"], "30 minutes");

    let nonce = auth["nonce"].as_str().unwrap();
    assert_eq!(nonce.len(), 32);
    assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(auth["label"], format!("regdns {}", nonce));
}

#[tokio::test]
async fn test_auth_honours_config_options() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;

    let key_file = fake_key_file();
    let config = ClientConfig::new(TEST_LOGIN, key_file.path(), false)
        .read_only(true)
        .expiration_time("1 hour")
        .label_prefix("ci-run");
    let client = Client::with_base_url(config, &server.uri(), HttpClientConfig::default())
        .expect("Failed to create client");

    let token = client.authenticate().await.expect("Failed to authenticate");
    assert_eq!(token, TEST_TOKEN);

    let auth = &received_body(&server, "POST", "/auth").await[0];
    assert_eq!(auth["global_key"], false);
    assert_eq!(auth["read_only"], true);
    assert_eq!(auth["expiration_time"], "1 hour");
    assert!(auth["label"].as_str().unwrap().starts_with("ci-run "));
}

#[tokio::test]
async fn test_nonce_differs_per_authentication() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;

    let key_file = fake_key_file();
    let client = Client::with_base_url(test_config(&key_file), &server.uri(), HttpClientConfig::default())
        .expect("Failed to create client");
    client.authenticate().await.unwrap();
    client.authenticate().await.unwrap();

    let bodies = received_body(&server, "POST", "/auth").await;
    assert_eq!(bodies.len(), 2);
    assert_ne!(bodies[0]["nonce"], bodies[1]["nonce"]);
}

#[tokio::test]
async fn test_auth_rejected_maps_to_unauthorized() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(mock_error_response("Signature is invalid")),
        )
        .mount(&server)
        .await;

    let result = test_provider(&server).get_zone(TEST_DOMAIN).await;
    assert!(matches!(result, Err(RetrieveZoneError::Unauthorized)));
}

#[tokio::test]
async fn test_token_is_reused() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(201).set_body_json(mock_auth_response()))
        .expect(1)
        .mount(&server)
        .await;
    mount_domain(&server).await;
    mount_entries(&server, &[]).await;

    let zone = test_provider(&server).get_zone(TEST_DOMAIN).await.unwrap();
    zone.list_records().await.unwrap();
    zone.list_records().await.unwrap();
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_once() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(201).set_body_json(mock_auth_response()))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/domains"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_domains_response(&[TEST_DOMAIN])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/domains/{}", TEST_DOMAIN)))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(mock_error_response("Token expired")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_domain(&server).await;

    let provider = test_provider(&server);
    provider.list_zones().await.expect("Failed to list zones");

    let zone = provider
        .get_zone(TEST_DOMAIN)
        .await
        .expect("Expected the refreshed token to succeed");
    assert_eq!(zone.id(), TEST_DOMAIN);
}

// =============================================================================
// Zone Tests
// =============================================================================

#[tokio::test]
async fn test_list_zones_success() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path("/domains"))
        .and(header("Authorization", bearer().as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mock_domains_response(&[TEST_DOMAIN, "example.nl"])),
        )
        .mount(&server)
        .await;

    let zones = test_provider(&server)
        .list_zones()
        .await
        .expect("Failed to list zones");
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].domain(), TEST_DOMAIN);
    assert_eq!(zones[1].domain(), "example.nl");
    assert_eq!(zones[0].info().auth_code.as_deref(), Some(TEST_AUTH_CODE));
}

#[tokio::test]
async fn test_list_zones_empty() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path("/domains"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "domains": [] })))
        .mount(&server)
        .await;

    let zones = test_provider(&server).list_zones().await.unwrap();
    assert!(zones.is_empty());
}

#[tokio::test]
async fn test_get_zone_accepts_trailing_dot() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;
    mount_domain(&server).await;

    let zone = test_provider(&server)
        .get_zone("nuvius.nl.")
        .await
        .expect("Failed to get zone");
    assert_eq!(zone.domain(), TEST_DOMAIN);
    assert_eq!(zone.info().is_dns_only, Some(false));
}

#[tokio::test]
async fn test_get_zone_not_found() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path("/domains/missing.nl"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(mock_error_response("Domain with name 'missing.nl' not found")),
        )
        .mount(&server)
        .await;

    let result = test_provider(&server).get_zone("missing.nl").await;
    assert!(matches!(result, Err(RetrieveZoneError::NotFound)));
}

#[tokio::test]
async fn test_server_error_is_custom() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path("/domains"))
        .respond_with(ResponseTemplate::new(500).set_body_json(mock_error_response("Internal error")))
        .mount(&server)
        .await;

    match test_provider(&server).list_zones().await {
        Err(RetrieveZoneError::Custom(err)) => {
            assert_eq!(err.status(), Some(500));
            assert!(err.to_string().contains("Internal error"));
        }
        other => panic!("Expected Custom error, got {:?}", other.map(|z| z.len())),
    }
}

// =============================================================================
// Record Retrieval Tests
// =============================================================================

#[tokio::test]
async fn test_list_records() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    mount_entries(
        &server,
        &[
            ("@", 86400, "A", "192.0.2.1"),
            ("docs", 3600, "CNAME", "docs.example.com."),
            ("@", 86400, "MX", "10 mail.nuvius.nl."),
            ("_acme-challenge", 60, "TXT", "abc123"),
        ],
    )
    .await;

    let records = zone.list_records().await.expect("Failed to list records");
    assert_eq!(records.len(), 4);

    assert_eq!(records[0].host, "@");
    assert_eq!(records[0].data, RecordData::A(Ipv4Addr::new(192, 0, 2, 1)));
    assert_eq!(records[0].ttl, 86400);

    assert_eq!(records[1].id, "docs/CNAME/docs.example.com.");
    assert_eq!(
        records[1].data,
        RecordData::CNAME("docs.example.com.".to_string())
    );

    assert_eq!(
        records[2].data,
        RecordData::MX {
            priority: 10,
            mail_server: "mail.nuvius.nl.".to_string()
        }
    );
    assert_eq!(records[3].data, RecordData::TXT("abc123".to_string()));
}

#[tokio::test]
async fn test_get_record_by_id() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    mount_entries(
        &server,
        &[
            ("docs", 3600, "CNAME", "docs.example.com."),
            ("www", 3600, "CNAME", "nuvius.nl."),
        ],
    )
    .await;

    let record = zone
        .get_record("www/cname/nuvius.nl.")
        .await
        .expect("Failed to get record");
    assert_eq!(record.id, "www/CNAME/nuvius.nl.");
    assert_eq!(record.host, "www");

    let record = zone
        .get_record("docs.nuvius.nl./CNAME/docs.example.com.")
        .await
        .expect("Fully qualified names address the same record");
    assert_eq!(record.host, "docs");
}

#[tokio::test]
async fn test_get_record_not_found() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    mount_entries(&server, &[("docs", 3600, "CNAME", "docs.example.com.")]).await;

    let result = zone.get_record("docs/CNAME/other.example.com.").await;
    assert!(matches!(result, Err(RetrieveRecordError::NotFound)));

    let result = zone.get_record("malformed").await;
    assert!(matches!(result, Err(RetrieveRecordError::NotFound)));
}

// =============================================================================
// Record Creation Tests
// =============================================================================

#[tokio::test]
async fn test_create_cname_record() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .and(header("Authorization", bearer().as_str()))
        .and(body_json(json!({
            "dnsEntry": {
                "name": "docs",
                "expire": 3600,
                "type": "CNAME",
                "content": "docs.example.com."
            }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let record = zone
        .create_record(
            "docs",
            &RecordData::CNAME("docs.example.com.".to_string()),
            0,
        )
        .await
        .expect("Failed to create record");

    assert_eq!(record.id, "docs/CNAME/docs.example.com.");
    assert_eq!(record.host, "docs");
    assert_eq!(record.ttl, 3600);
}

#[tokio::test]
async fn test_create_entry_from_strings() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .and(body_json(json!({
            "dnsEntry": {
                "name": "docs",
                "expire": 3600,
                "type": "CNAME",
                "content": "docs.example.com."
            }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let record = zone
        .create_entry("cname", "docs", "docs.example.com.")
        .await
        .expect("Failed to create entry");
    assert_eq!(
        record.data,
        RecordData::CNAME("docs.example.com.".to_string())
    );
}

#[tokio::test]
async fn test_create_record_relativizes_host() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let data = RecordData::A(Ipv4Addr::new(192, 0, 2, 10));
    let hosts = ["www.nuvius.nl.", "www.NUVIUS.nl", "@", "nuvius.nl."];
    for host in hosts {
        zone.create_record(host, &data, 300).await.unwrap();
    }

    let names: Vec<Value> = received_body(&server, "POST", &dns_path())
        .await
        .into_iter()
        .map(|b| b["dnsEntry"]["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("www"), json!("www"), json!("@"), json!("@")]);
}

#[tokio::test]
async fn test_create_record_ttl_handling() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let data = RecordData::TXT("v=spf1 -all".to_string());
    assert_eq!(zone.create_record("@", &data, 0).await.unwrap().ttl, 3600);
    assert_eq!(zone.create_record("@", &data, 300).await.unwrap().ttl, 300);
    assert_eq!(
        zone.create_record("@", &data, u64::MAX).await.unwrap().ttl,
        2_147_483_647
    );
}

#[tokio::test]
async fn test_create_mx_record_content() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .and(body_json(json!({
            "dnsEntry": {
                "name": "@",
                "expire": 3600,
                "type": "MX",
                "content": "10 mail.nuvius.nl."
            }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let data = RecordData::MX {
        priority: 10,
        mail_server: "mail.nuvius.nl.".to_string(),
    };
    zone.create_record("@", &data, 3600).await.unwrap();
}

#[tokio::test]
async fn test_create_duplicate_record_is_ok() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .respond_with(
            ResponseTemplate::new(406).set_body_json(mock_error_response(
                "DNS Entry 'docs CNAME docs.example.com.' already exists",
            )),
        )
        .mount(&server)
        .await;

    let record = zone
        .create_record(
            "docs",
            &RecordData::CNAME("docs.example.com.".to_string()),
            0,
        )
        .await
        .expect("Existing entries are not an error");
    assert_eq!(record.id, "docs/CNAME/docs.example.com.");
}

#[tokio::test]
async fn test_create_rejected_record_is_invalid() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .respond_with(
            ResponseTemplate::new(406)
                .set_body_json(mock_error_response("Invalid content for A record")),
        )
        .mount(&server)
        .await;

    let data = RecordData::Other {
        typ: "A".to_string(),
        value: "not-an-ip".to_string(),
    };
    let result = zone.create_record("www", &data, 0).await;
    assert!(matches!(result, Err(CreateRecordError::InvalidRecord)));
}

#[tokio::test]
async fn test_create_forbidden_is_unauthorized() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(mock_error_response("This is a read-only token")),
        )
        .mount(&server)
        .await;

    let result = zone
        .create_record("www", &RecordData::A(Ipv4Addr::LOCALHOST), 0)
        .await;
    assert!(matches!(result, Err(CreateRecordError::Unauthorized)));
}

#[tokio::test]
async fn test_create_rejected_locally() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;

    let unsupported = RecordData::Other {
        typ: "PTR".to_string(),
        value: "host.nuvius.nl.".to_string(),
    };
    let result = zone.create_record("1", &unsupported, 0).await;
    assert!(matches!(result, Err(CreateRecordError::UnsupportedType)));

    let result = zone
        .create_record("docs", &RecordData::CNAME(String::new()), 0)
        .await;
    assert!(matches!(result, Err(CreateRecordError::InvalidRecord)));

    let result = zone
        .create_record("docs", &RecordData::CNAME("bad..target.".to_string()), 0)
        .await;
    assert!(matches!(result, Err(CreateRecordError::InvalidRecord)));

    let result = zone
        .create_record("  ", &RecordData::A(Ipv4Addr::LOCALHOST), 0)
        .await;
    assert!(matches!(result, Err(CreateRecordError::InvalidRecord)));

    assert!(received_body(&server, "POST", &dns_path()).await.is_empty());
}

// =============================================================================
// Record Update Tests
// =============================================================================

#[tokio::test]
async fn test_update_record_patches_content() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    mount_entries(&server, &[("www", 300, "A", "192.0.2.1")]).await;

    Mock::given(method("PATCH"))
        .and(path(dns_path()))
        .and(body_json(json!({
            "dnsEntry": {
                "name": "www",
                "expire": 300,
                "type": "A",
                "content": "192.0.2.2"
            }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let record = zone
        .update_record("www/A/192.0.2.1", &RecordData::A(Ipv4Addr::new(192, 0, 2, 2)))
        .await
        .expect("Failed to update record");
    assert_eq!(record.id, "www/A/192.0.2.2");
    assert_eq!(record.ttl, 300);
}

#[tokio::test]
async fn test_update_record_type_mismatch() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    mount_entries(&server, &[("www", 300, "A", "192.0.2.1")]).await;

    let result = zone
        .update_record("www/A/192.0.2.1", &RecordData::CNAME("nuvius.nl.".to_string()))
        .await;
    assert!(matches!(result, Err(UpdateRecordError::InvalidRecord)));
}

#[tokio::test]
async fn test_update_missing_record() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    mount_entries(&server, &[]).await;

    let result = zone
        .update_record("www/A/192.0.2.1", &RecordData::A(Ipv4Addr::LOCALHOST))
        .await;
    assert!(matches!(result, Err(UpdateRecordError::NotFound)));
}

// =============================================================================
// Record Deletion Tests
// =============================================================================

#[tokio::test]
async fn test_delete_record() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    mount_entries(
        &server,
        &[
            ("docs", 3600, "CNAME", "docs.example.com."),
            ("www", 3600, "CNAME", "nuvius.nl."),
        ],
    )
    .await;

    Mock::given(method("DELETE"))
        .and(path(dns_path()))
        .and(header("Authorization", bearer().as_str()))
        .and(body_json(json!({
            "dnsEntry": {
                "name": "docs",
                "expire": 3600,
                "type": "CNAME",
                "content": "docs.example.com."
            }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    zone.delete_record("docs/CNAME/docs.example.com.")
        .await
        .expect("Failed to delete record");
}

#[tokio::test]
async fn test_delete_missing_record() {
    let server = setup_mock_server().await;
    let zone = test_zone(&server).await;
    mount_entries(&server, &[("www", 3600, "CNAME", "nuvius.nl.")]).await;

    let result = zone.delete_record("docs/CNAME/docs.example.com.").await;
    assert!(matches!(result, Err(DeleteRecordError::NotFound)));

    let result = zone.delete_record("nonsense").await;
    assert!(matches!(result, Err(DeleteRecordError::NotFound)));
}

// =============================================================================
// Cassette Tests
// =============================================================================

#[tokio::test]
async fn test_recorder_captures_redacted_interactions() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;
    mount_domain(&server).await;

    Mock::given(method("POST"))
        .and(path(dns_path()))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let recorder = Recorder::new(Redactor::transip());
    let key_file = fake_key_file();
    let client = Client::with_base_url(test_config(&key_file), &server.uri(), HttpClientConfig::default())
        .expect("Failed to create client")
        .with_recorder(recorder.clone());
    let provider = TransipProvider::from_client(client);

    assert_eq!(provider.client().config().login, TEST_LOGIN);

    let zone = provider.get_zone(TEST_DOMAIN).await.unwrap();
    zone.create_record(
        "docs",
        &RecordData::CNAME("docs.example.com.".to_string()),
        0,
    )
    .await
    .unwrap();

    let cassette = recorder.snapshot();
    assert_eq!(cassette.len(), 3);

    let methods: Vec<&str> = cassette
        .interactions()
        .iter()
        .map(|i| i.request.method.as_str())
        .collect();
    assert_eq!(methods, vec!["POST", "GET", "POST"]);

    for interaction in cassette.interactions() {
        assert!(!interaction.request.headers.contains_key("signature"));
        assert!(!interaction.request.headers.contains_key("authorization"));
        if let Some(body) = &interaction.request.body {
            assert!(!body.contains("login"), "login leaked: {}", body);
        }
    }

    let auth = &cassette.interactions()[0];
    assert_eq!(auth.response.body, r#"{"token":"TOKEN"}"#);

    let domain = &cassette.interactions()[1];
    assert!(domain.response.body.contains(r#""authCode":"AUTH_CODE""#));
    assert!(!domain.response.body.contains(TEST_AUTH_CODE));

    // Rewritten bodies lose their length header, untouched ones keep the sent bytes
    assert!(!auth.response.headers.contains_key("content-length"));

    let sent = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == dns_path())
        .expect("Create request was sent");
    assert_eq!(
        cassette.interactions()[2].request.body.as_deref(),
        Some(String::from_utf8(sent.body).unwrap().as_str())
    );
}

#[tokio::test]
async fn test_recorder_keeps_binary_response_bodies() {
    let server = setup_mock_server().await;
    mount_auth(&server).await;

    let raw = vec![0xff, 0xfe, 0x00, 0x7b];
    Mock::given(method("GET"))
        .and(path("/domains"))
        .respond_with(ResponseTemplate::new(502).set_body_raw(raw.clone(), "application/octet-stream"))
        .mount(&server)
        .await;

    let recorder = Recorder::new(Redactor::transip());
    let key_file = fake_key_file();
    let client = Client::with_base_url(test_config(&key_file), &server.uri(), HttpClientConfig::default())
        .expect("Failed to create client")
        .with_recorder(recorder.clone());
    let provider = TransipProvider::from_client(client);

    assert!(provider.list_zones().await.is_err());

    let cassette = recorder.snapshot();
    let response = &cassette.interactions()[1].response;
    assert_eq!(response.status, 502);
    assert!(response.base64);
    assert_eq!(response.body_as_bytes().unwrap(), raw);
}

#[tokio::test]
async fn test_replay_committed_cassette() {
    let server = setup_mock_server().await;
    let cassette = Cassette::load(cassette_path("transip/create_cname_record.json"))
        .expect("Failed to load cassette");
    replay_cassette(&server, &cassette, API_PATH_PREFIX).await;

    let zone = test_provider(&server)
        .get_zone(TEST_DOMAIN)
        .await
        .expect("Failed to get zone from cassette");
    assert_eq!(zone.info().auth_code.as_deref(), Some("AUTH_CODE"));

    let record = zone
        .create_record(
            "docs",
            &RecordData::CNAME("docs.example.com.".to_string()),
            0,
        )
        .await
        .expect("Failed to create record from cassette");
    assert_eq!(record.id, "docs/CNAME/docs.example.com.");

    let sent = received_body(&server, "POST", &dns_path()).await;
    let recorded: Value = serde_json::from_str(
        cassette.interactions()[2].request.body.as_deref().unwrap(),
    )
    .unwrap();
    assert_eq!(sent, vec![recorded]);
}

#[test]
fn test_committed_cassettes_contain_no_secrets() {
    let dir = cassette_path("transip");
    let entries = std::fs::read_dir(&dir).expect("Cassette directory exists");

    for entry in entries {
        let path = entry.unwrap().path();
        let raw = std::fs::read_to_string(&path).unwrap().to_ascii_lowercase();
        assert!(!raw.contains("\"signature\""), "{}", path.display());
        assert!(!raw.contains("\"authorization\""), "{}", path.display());
        assert!(!raw.contains("login"), "{}", path.display());
        assert!(!raw.contains("bearer"), "{}", path.display());

        let cassette = Cassette::load(&path).unwrap();
        for interaction in cassette.interactions() {
            if let Ok(body) = serde_json::from_str::<Value>(&interaction.response.body) {
                if let Some(token) = body.get("token") {
                    assert_eq!(token, "TOKEN");
                }
            }
        }
    }
}
