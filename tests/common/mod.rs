//! Shared fixtures for the integration tests

#![allow(dead_code)]

use creatio_client::api::{ClientOptions, CredentialSet, Environment, ResilienceConfig, RetryConfig};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SERVICE_PATH: &str = "/0/ServiceModel/EntityDataService.svc";
pub const LOGIN_PATH: &str = "/ServiceModel/AuthService.svc/Login";
pub const TOKEN_PATH: &str = "/connect/token";

pub fn collection_path(collection: &str) -> String {
    format!("{}/{}", SERVICE_PATH, collection)
}

pub fn record_path(collection: &str, id: &str) -> String {
    format!("{}/{}(guid'{}')", SERVICE_PATH, collection, id)
}

/// OAuth environment whose site and identity service are both the mock server
pub fn oauth_environment(server: &MockServer) -> Environment {
    Environment {
        name: "test".to_string(),
        base_url: server.uri(),
        identity_url: Some(server.uri()),
        credentials: CredentialSet::ClientCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
        },
    }
}

pub fn session_environment(server: &MockServer) -> Environment {
    Environment {
        name: "test".to_string(),
        base_url: server.uri(),
        identity_url: None,
        credentials: CredentialSet::UsernamePassword {
            username: "Supervisor".to_string(),
            password: "Supervisor".to_string(),
        },
    }
}

/// Three attempts with millisecond backoff
pub fn fast_options() -> ClientOptions {
    ClientOptions {
        resilience: ResilienceConfig::builder()
            .retry_config(RetryConfig::immediate(3))
            .build(),
        ..ClientOptions::default()
    }
}

pub fn token_response(token: &str, expires_in: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    }))
}

/// Token endpoint that hands out a long-lived token and expects `calls` hits
pub async fn mount_token(server: &MockServer, calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(token_response("test-token", 3600))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn login_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .append_header("Set-Cookie", ".ASPXAUTH=auth-cookie; path=/; HttpOnly")
        .append_header("Set-Cookie", "BPMCSRF=csrf-token; path=/")
        .set_body_json(json!({ "Code": 0, "Message": "" }))
}

/// Verbose OData collection envelope
pub fn results(rows: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "d": { "results": rows } }))
}
