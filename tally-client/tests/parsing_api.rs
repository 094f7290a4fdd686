use serde_json::json;
use tally_client::{BackendClient, ClientError, ParsingBackend};
use tally_core::domain::descriptor::JobDescriptor;
use tally_core::domain::job::{JobId, JobStatus, LaunchRequest, SpecialImport};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn start_posts_descriptor_and_reads_log_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/parsing/start"))
        .and(body_json(json!({
            "source_id": 1,
            "style_id": 1,
            "custom_options": {"days": 7}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "log_id": 42,
            "status": "started",
            "message": "Parsing task started for source: shop with style: basic"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let started = client
        .start_parsing(&JobDescriptor::new(1, 1).with_option("days", 7))
        .await
        .expect("start ok");

    assert_eq!(started.job_id, JobId(42));
    assert!(started.message.unwrap().contains("shop"));
}

#[tokio::test]
async fn start_rejection_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/parsing/start"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Parsing source not found"})),
        )
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let err = client
        .start_parsing(&JobDescriptor::new(99, 1))
        .await
        .unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(err.reason(), "Parsing source not found");
}

#[tokio::test]
async fn special_imports_hit_their_own_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/parsing/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"log_id": 5, "message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/parsing/googlesheets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"log_id": 6, "message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let orders = ParsingBackend::start(&client, &LaunchRequest::Special(SpecialImport::Orders))
        .await
        .unwrap();
    let sheets = ParsingBackend::start(&client, &LaunchRequest::Special(SpecialImport::GoogleSheets))
        .await
        .unwrap();

    assert_eq!(orders.job_id, JobId(5));
    assert_eq!(sheets.job_id, JobId(6));
}

#[tokio::test]
async fn status_decodes_backend_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/parsing/status/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "log_id": 42,
            "status": "completed",
            "items_processed": 200,
            "items_added": 150,
            "items_updated": 45,
            "items_failed": 5,
            "start_time": "2024-03-01T12:00:00",
            "end_time": "2024-03-01T12:10:30",
            "message": "done",
            "details": null
        })))
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let snapshot = client.parsing_status(JobId(42)).await.unwrap();

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.processed, 200);
    assert_eq!(snapshot.elapsed(), Some(630.0));
}

#[tokio::test]
async fn status_takes_live_counters_from_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/parsing/status/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "log_id": 42,
            "status": "in_progress",
            "items_processed": 50,
            "items_added": 30,
            "items_updated": 20,
            "items_failed": 0,
            "start_time": "2024-03-01T12:00:00",
            "end_time": null,
            "message": null,
            "details": {
                "total_items": 200,
                "current_item": 50,
                "added": 30,
                "updated": 20,
                "failed": 0,
                "progress": 25
            }
        })))
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let snapshot = client.parsing_status(JobId(42)).await.unwrap();

    assert_eq!(snapshot.status, JobStatus::Running);
    assert_eq!(snapshot.current, Some(50));
    assert_eq!(snapshot.total, Some(200));
    assert_eq!(snapshot.derived_progress(), 25);
}

#[tokio::test]
async fn stop_posts_to_job_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/parsing/stop/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "log_id": 42,
            "status": "stopped",
            "message": "Parsing task stopped successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let ack = client.stop_parsing(JobId(42)).await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("Parsing task stopped successfully"));
}

#[tokio::test]
async fn catalog_is_fetched_from_three_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/parsing/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "shop", "url": "https://shop.example", "description": null, "enabled": true}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/parsing/styles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "basic", "description": null, "include_images": true, "deep_details": false}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/parsing/modes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "full", "name": "Full", "description": "", "icon": "🔄", "estimated_time": "1-2 h"},
            {"id": "incremental", "name": "Incremental", "description": "", "icon": "📈", "estimated_time": "5-15 min",
             "params": {"days": {"type": "number", "default": 7, "min": 1, "max": 30, "description": "Days"}}}
        ])))
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let catalog = client.fetch_catalog().await.unwrap();

    assert_eq!(catalog.sources.len(), 1);
    assert_eq!(catalog.styles.len(), 1);
    assert!(catalog.mode("incremental").unwrap().params.contains_key("days"));
    assert!(JobDescriptor::new(1, 1).with_option("days", 7).validate(&catalog).is_ok());
}

#[tokio::test]
async fn logs_pass_limit_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/parsing/logs"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "source_id": 1, "status": "in_progress", "items_processed": 4,
             "start_time": "2024-03-01T12:00:00", "end_time": null, "message": null}
        ])))
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let logs = client.parsing_logs(10).await.unwrap();

    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, JobStatus::Running);
}

#[tokio::test]
async fn server_errors_are_not_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/parsing/stop/1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let client = BackendClient::new(server.uri());
    let err = client.stop_parsing(JobId(1)).await.unwrap_err();

    assert!(matches!(err, ClientError::ApiError { status: 503, .. }));
    assert!(!err.is_client_error());
}
