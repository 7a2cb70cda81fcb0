//! Request adapter behaviour: URL shapes, retries and the transport log

mod common;

use common::*;
use creatio_client::api::{ClientOptions, ResilienceConfig, RetryConfig};
use creatio_client::{CreatioClient, Filter, QueryBuilder};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORDER_ID: &str = "51d67a11-703f-4f86-9814-e079ee362cab";

async fn oauth_client(server: &MockServer) -> CreatioClient {
    mount_token(server, 1).await;
    CreatioClient::with_options(oauth_environment(server), fast_options()).unwrap()
}

#[tokio::test]
async fn test_read_sends_paging_and_verbose_accept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("OrderCollection")))
        .and(query_param("$select", "Id,Number"))
        .and(query_param("$top", "10000"))
        .and(query_param("$skip", "0"))
        .and(header("Accept", "application/json;odata=verbose"))
        .respond_with(results(json!([{ "Id": ORDER_ID, "Number": "ORD-1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let response = client
        .read("OrderCollection", &[("$select", "Id,Number")], None, None, 0)
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.json().unwrap()["d"]["results"][0]["Number"], "ORD-1");
}

#[tokio::test]
async fn test_read_with_limit_order_and_skip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbInterviewCollection")))
        .and(query_param("$orderby", "ModifiedOn desc"))
        .and(query_param("$top", "20"))
        .and(query_param("$skip", "40"))
        .respond_with(results(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let response = client
        .read("GlbInterviewCollection", &[], Some(20), Some("ModifiedOn"), 40)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_filter_quotes_are_doubled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .and(query_param("$filter", "Name eq 'O''Brien'"))
        .respond_with(results(json!([{ "Id": "c-1", "Name": "O'Brien" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let result = QueryBuilder::new("ContactCollection")
        .filter(Filter::eq("Name", "O'Brien"))
        .execute(&client)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn test_create_posts_to_collection_with_trailing_slash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/", collection_path("OrderCollection"))))
        .and(query_param_is_missing("$top"))
        .and(header("Content-Type", "application/json;odata=verbose"))
        .and(body_json(json!({ "Number": "ORD-2" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "d": { "Id": "new-order" } })))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let response = client.create("OrderCollection", &json!({ "Number": "ORD-2" })).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.json().unwrap()["d"]["Id"], "new-order");
}

#[tokio::test]
async fn test_update_and_delete_address_the_record() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(record_path("OrderCollection", ORDER_ID)))
        .and(body_json(json!({ "StatusId": "s-2" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(record_path("OrderCollection", ORDER_ID)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let updated = client
        .update("OrderCollection", ORDER_ID, &json!({ "StatusId": "s-2" }))
        .await
        .unwrap();
    let deleted = client.delete("OrderCollection", ORDER_ID).await.unwrap();

    assert_eq!(updated.status, 200);
    assert_eq!(deleted.status, 204);
    assert!(deleted.body.is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(results(json!([{ "Id": "c-1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let response = client.read("ContactCollection", &[], None, None, 0).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.body.contains("c-1"));
}

#[tokio::test]
async fn test_exhausted_retries_return_last_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let response = client.read("ContactCollection", &[], None, None, 0).await.unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.body, "boom");
}

#[tokio::test]
async fn test_create_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/", collection_path("OrderCollection"))))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let response = client.create("OrderCollection", &json!({ "Number": "X" })).await.unwrap();

    assert_eq!(response.status, 503);
}

#[tokio::test]
async fn test_client_errors_are_returned_raw() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("Nope")))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "error": { "message": { "value": "Resource not found for the segment 'Nope'." } } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let response = client.read("Nope", &[], None, None, 0).await.unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(
        response.service_error().as_deref(),
        Some("Resource not found for the segment 'Nope'.")
    );
}

fn options_with_transport_log(log_path: &std::path::Path) -> ClientOptions {
    ClientOptions {
        resilience: ResilienceConfig::builder()
            .retry_config(RetryConfig::immediate(3))
            .transport_log(Some(log_path.to_path_buf()))
            .build(),
        ..ClientOptions::default()
    }
}

fn transport_log_lines(log_path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(log_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_unreachable_host_is_an_error() {
    let identity = MockServer::start().await;
    mount_token(&identity, 1).await;

    let mut environment = oauth_environment(&identity);
    // Nothing listens on the discard port
    environment.base_url = "http://127.0.0.1:9".to_string();

    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("transport.log");
    let client = CreatioClient::with_options(environment, options_with_transport_log(&log_path)).unwrap();
    let result = client.read("ContactCollection", &[], None, None, 0).await;

    assert!(result.is_err());
    let attempts = transport_log_lines(&log_path);
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|line| line["status"].is_null() && line["error"].is_string()));
}

#[tokio::test]
async fn test_read_timeouts_are_retried() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(results(json!([{ "Id": "c-1" }])).set_delay(std::time::Duration::from_millis(800)))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(results(json!([{ "Id": "c-1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let options = ClientOptions {
        timeout: std::time::Duration::from_millis(200),
        ..fast_options()
    };
    let client = CreatioClient::with_options(oauth_environment(&server), options).unwrap();
    let response = client.read("ContactCollection", &[], None, None, 0).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["d"]["results"][0]["Id"], "c-1");
}

#[tokio::test]
async fn test_read_options_are_encoded_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .and(query_param("$select", "Id,Name"))
        .and(query_param("$filter", "Name eq 'Jane Doe'"))
        .and(query_param("$top", "25"))
        .and(query_param("$skip", "0"))
        .respond_with(results(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    client
        .read(
            "ContactCollection",
            &[("$select", "Id,Name"), ("$filter", "Name eq 'Jane Doe'"), ("$top", "25")],
            None,
            None,
            0,
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let read = requests.iter().find(|r| r.method.as_str() == "GET").unwrap();
    let query = read.url.query().unwrap();
    assert_eq!(query.matches("$top=").count(), 1);
    assert!(query.starts_with("$select=Id,Name&$filter=Name%20eq%20%27Jane%20Doe%27"));
}

#[tokio::test]
async fn test_duplicate_read_option_is_rejected_before_sending() {
    let server = MockServer::start().await;
    mount_token(&server, 0).await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(results(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = CreatioClient::with_options(oauth_environment(&server), fast_options()).unwrap();
    let result = client
        .read("ContactCollection", &[("$filter", "Name eq 'a'"), ("$filter", "Name eq 'b'")], None, None, 0)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_correlation_header_follows_settings() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(results(json!([])))
        .mount(&server)
        .await;

    let tagged = CreatioClient::with_options(oauth_environment(&server), fast_options()).unwrap();
    tagged.read("ContactCollection", &[], None, None, 0).await.unwrap();

    let untagged_options = ClientOptions {
        resilience: ResilienceConfig::builder()
            .retry_config(RetryConfig::immediate(1))
            .correlation_ids(false)
            .build(),
        ..ClientOptions::default()
    };
    let untagged = CreatioClient::with_options(oauth_environment(&server), untagged_options).unwrap();
    untagged.read("ContactCollection", &[], None, None, 0).await.unwrap();

    let reads: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "GET")
        .collect();
    assert_eq!(reads.len(), 2);
    assert!(reads[0].headers.contains_key("x-correlation-id"));
    assert!(!reads[1].headers.contains_key("x-correlation-id"));
}

#[tokio::test]
async fn test_transport_log_appends_one_line_per_request() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(results(json!([])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("transport.log");

    let client = CreatioClient::with_options(oauth_environment(&server), options_with_transport_log(&log_path)).unwrap();
    client.read("ContactCollection", &[], None, None, 0).await.unwrap();
    client.read("ContactCollection", &[], Some(5), None, 0).await.unwrap();

    let lines = transport_log_lines(&log_path);

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["method"], "GET");
    assert_eq!(lines[0]["status"], 200);
    assert!(lines[1]["url"].as_str().unwrap().contains("$top=5"));
}
