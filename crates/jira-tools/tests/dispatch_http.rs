use serde_json::{Value, json};
use std::time::Duration;
use unrelated_jira_tools::retry::RetryPolicy;
use unrelated_jira_tools::{
    JiraConfig, Payload, ToolDispatcher, ToolErrorKind, ToolInvocation,
    result::into_call_tool_result,
};
use unrelated_test_support::{MockJira, MockResponse};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        maximum_attempts: 3,
        initial_interval_ms: 10,
        backoff_coefficient: 2.0,
        maximum_interval_ms: 50,
        jitter: 0.0,
    }
}

fn config(mock: &MockJira) -> JiraConfig {
    JiraConfig::new(mock.base_url())
        .with_api_token("bot@example.com", "secret-token")
        .with_retry(fast_retry())
}

#[tokio::test]
async fn get_issue_round_trips_over_http() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "GET",
        "/rest/api/2/issue/PROJ-7",
        [MockResponse::json(
            200,
            &json!({ "key": "PROJ-7", "fields": { "summary": "Fix it" } }),
        )],
    );

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    let payload = dispatcher
        .invoke(ToolInvocation::new(
            "jira_get_issue",
            json!({ "issue_key": "PROJ-7", "fields": ["summary", "status"] }),
        ))
        .await
        .expect("ok");

    let Payload::Object(issue) = payload else {
        panic!("expected object payload");
    };
    assert_eq!(issue["fields"]["summary"], "Fix it");

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.query_param("fields").as_deref(), Some("summary,status"));
    // base64("bot@example.com:secret-token")
    assert_eq!(
        req.header("authorization"),
        Some("Basic Ym90QGV4YW1wbGUuY29tOnNlY3JldC10b2tlbg==")
    );
    assert_eq!(req.header("accept"), Some("application/json"));

    mock.stop().await;
}

#[tokio::test]
async fn create_issue_posts_json_body() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "POST",
        "/rest/api/2/issue",
        [MockResponse::json(201, &json!({ "id": "10001", "key": "PROJ-8" }))],
    );

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    dispatcher
        .invoke(ToolInvocation::new(
            "jira_create_issue",
            json!({
                "project_key": "PROJ",
                "summary": "New thing",
                "issue_type": "Task",
                "description": "Details"
            }),
        ))
        .await
        .expect("created");

    let body = mock.requests()[0].json_body().expect("json body");
    assert_eq!(
        body,
        json!({
            "fields": {
                "project": { "key": "PROJ" },
                "summary": "New thing",
                "issuetype": { "name": "Task" },
                "description": "Details"
            }
        })
    );
    assert_eq!(
        mock.requests()[0].header("content-type"),
        Some("application/json")
    );
}

#[tokio::test]
async fn transient_503s_then_success() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "GET",
        "/rest/api/2/project",
        [
            MockResponse::empty(503),
            MockResponse::empty(503),
            MockResponse::json(200, &json!([{ "key": "PROJ" }])),
        ],
    );

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    let payload = dispatcher
        .invoke(ToolInvocation::new("jira_get_all_projects", Value::Null))
        .await
        .expect("ok on third attempt");
    assert_eq!(payload, Payload::List(vec![json!({ "key": "PROJ" })]));
    assert_eq!(mock.hits("GET", "/rest/api/2/project"), 3);
}

#[tokio::test]
async fn persistent_500_exhausts_retries() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "GET",
        "/rest/api/2/issue/PROJ-1/worklog",
        [MockResponse::json(500, &json!({ "message": "database down" }))],
    );

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    let err = dispatcher
        .invoke(ToolInvocation::new(
            "jira_get_worklog",
            json!({ "issue_key": "PROJ-1" }),
        ))
        .await
        .expect_err("exhausted");
    assert_eq!(err.kind, ToolErrorKind::TransientFailure);
    assert!(err.message.contains("database down"), "{}", err.message);
    assert_eq!(mock.hits("GET", "/rest/api/2/issue/PROJ-1/worklog"), 3);
}

#[tokio::test]
async fn validation_errors_surface_jira_messages() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "POST",
        "/rest/api/2/issue/PROJ-1/worklog",
        [MockResponse::json(
            400,
            &json!({ "errorMessages": [], "errors": { "timeLogged": "Invalid time duration" } }),
        )],
    );

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    let err = dispatcher
        .invoke(ToolInvocation::new(
            "jira_add_worklog",
            json!({ "issue_key": "PROJ-1", "time_spent": "forever" }),
        ))
        .await
        .expect_err("rejected");
    assert_eq!(err.kind, ToolErrorKind::ValidationFailure);
    assert!(err.message.contains("timeLogged: Invalid time duration"));
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn slow_upstream_times_out_per_attempt() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "GET",
        "/rest/api/2/issueLinkType",
        [MockResponse::json(200, &json!({ "issueLinkTypes": [] }))
            .with_delay(Duration::from_secs(8))],
    );

    let mut cfg = config(&mock);
    cfg.timeout_seconds = 5;
    cfg.retry.maximum_attempts = 1;
    let dispatcher = ToolDispatcher::new(cfg).expect("dispatcher");
    let err = dispatcher
        .invoke(ToolInvocation::new("jira_get_link_types", json!({})))
        .await
        .expect_err("timeout");
    assert_eq!(err.kind, ToolErrorKind::TransientFailure);
    assert!(err.message.contains("timed out"), "{}", err.message);
}

#[tokio::test]
async fn search_fields_filters_locally() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "GET",
        "/rest/api/2/field",
        [MockResponse::json(
            200,
            &json!([
                { "id": "summary", "name": "Summary" },
                { "id": "customfield_10014", "name": "Epic Link" }
            ]),
        )],
    );

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    let payload = dispatcher
        .invoke(ToolInvocation::new(
            "jira_search_fields",
            json!({ "query": "epic" }),
        ))
        .await
        .expect("ok");
    assert_eq!(
        payload,
        Payload::List(vec![json!({ "id": "customfield_10014", "name": "Epic Link" })])
    );
    assert_eq!(mock.requests()[0].query, None);
}

#[tokio::test]
async fn attachment_download_is_binary_and_renders_as_image() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "GET",
        "/rest/api/2/attachment/content/10100",
        [MockResponse::bytes(200, "image/png", &[0x89, b'P', b'N', b'G'])],
    );

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    let result = dispatcher
        .invoke(ToolInvocation::new(
            "jira_download_attachments",
            json!({ "attachment_id": "10100" }),
        ))
        .await;
    assert_eq!(
        result,
        Ok(Payload::Binary {
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png".into(),
        })
    );

    let rendered = serde_json::to_value(into_call_tool_result(result)).expect("serialize");
    assert_eq!(rendered["content"][0]["type"], "image");
}

#[tokio::test]
async fn attachment_upload_is_multipart() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "POST",
        "/rest/api/2/issue/PROJ-3/attachments",
        [MockResponse::json(200, &json!([{ "id": "1", "filename": "notes.txt" }]))],
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "remember the milk").expect("write");

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    dispatcher
        .invoke(ToolInvocation::new(
            "jira_add_attachment",
            json!({ "issue_key": "PROJ-3", "file_path": path.to_string_lossy() }),
        ))
        .await
        .expect("uploaded");

    let req = &mock.requests()[0];
    assert_eq!(req.header("x-atlassian-token"), Some("no-check"));
    assert!(
        req.header("content-type")
            .is_some_and(|ct| ct.starts_with("multipart/form-data")),
        "{:?}",
        req.header("content-type")
    );
    let body = String::from_utf8_lossy(&req.body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"notes.txt\""));
    assert!(body.contains("remember the milk"));
}

#[tokio::test]
async fn read_only_write_never_reaches_server() {
    let mock = MockJira::start().await.expect("mock");
    let dispatcher =
        ToolDispatcher::new(config(&mock).with_read_only(true)).expect("dispatcher");
    let err = dispatcher
        .invoke(ToolInvocation::new(
            "jira_delete_issue",
            json!({ "issue_key": "PROJ-1" }),
        ))
        .await
        .expect_err("denied");
    assert_eq!(err.kind, ToolErrorKind::PolicyDenied);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn transition_by_name_lists_then_posts_resolved_id() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "GET",
        "/rest/api/2/issue/PROJ-1/transitions",
        [MockResponse::json(
            200,
            &json!({ "transitions": [
                { "id": "11", "name": "Start Progress" },
                { "id": "31", "name": "Done" }
            ] }),
        )],
    );
    mock.on("POST", "/rest/api/2/issue/PROJ-1/transitions", [MockResponse::empty(204)]);

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    dispatcher
        .invoke(ToolInvocation::new(
            "jira_transition_issue",
            json!({ "issue_key": "PROJ-1", "transition_name": "START PROGRESS" }),
        ))
        .await
        .expect("transitioned");

    assert_eq!(mock.hits("GET", "/rest/api/2/issue/PROJ-1/transitions"), 1);
    assert_eq!(mock.hits("POST", "/rest/api/2/issue/PROJ-1/transitions"), 1);
    let post = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "POST")
        .expect("post recorded");
    assert_eq!(post.json_body(), Some(json!({ "transition": { "id": "11" } })));

    let err = dispatcher
        .invoke(ToolInvocation::new(
            "jira_transition_issue",
            json!({ "issue_key": "PROJ-1", "transition_name": "Won't Fix" }),
        ))
        .await
        .expect_err("unknown transition");
    assert_eq!(err.kind, ToolErrorKind::InvalidArgument);
    assert_eq!(
        err.message,
        "transition 'Won't Fix' not found; available transitions: Start Progress, Done"
    );
    assert_eq!(mock.hits("POST", "/rest/api/2/issue/PROJ-1/transitions"), 1);

    mock.stop().await;
}

#[tokio::test]
async fn shared_dispatcher_serves_concurrent_calls() {
    let mock = MockJira::start().await.expect("mock");
    for n in 1..=8 {
        mock.on(
            "GET",
            &format!("/rest/api/2/issue/PROJ-{n}"),
            [MockResponse::json(200, &json!({ "key": format!("PROJ-{n}") }))
                .with_delay(Duration::from_millis(20))],
        );
    }

    let dispatcher = ToolDispatcher::new(config(&mock)).expect("dispatcher");
    let mut calls = tokio::task::JoinSet::new();
    for n in 1..=8 {
        let dispatcher = dispatcher.clone();
        calls.spawn(async move {
            let key = format!("PROJ-{n}");
            let payload = dispatcher
                .invoke(ToolInvocation::new("jira_get_issue", json!({ "issue_key": key })))
                .await;
            (key, payload)
        });
    }

    let mut seen = 0;
    while let Some(joined) = calls.join_next().await {
        let (key, payload) = joined.expect("task");
        let issue = match payload {
            Ok(Payload::Object(issue)) => issue,
            other => panic!("{key}: expected object payload, got {other:?}"),
        };
        assert_eq!(issue["key"], Value::String(key));
        seen += 1;
    }
    assert_eq!(seen, 8);
    assert_eq!(mock.requests().len(), 8);

    mock.stop().await;
}

#[tokio::test]
async fn tls_verification_can_be_disabled() {
    let mock = MockJira::start().await.expect("mock");
    mock.on(
        "GET",
        "/rest/api/2/myself",
        [MockResponse::json(200, &json!({ "displayName": "Bot" }))],
    );

    let mut config = config(&mock);
    config.verify_tls = false;
    let dispatcher = ToolDispatcher::new(config).expect("dispatcher without TLS verification");
    let payload = dispatcher
        .invoke(ToolInvocation::new("jira_get_user_profile", json!({})))
        .await
        .expect("ok");
    assert_eq!(payload.to_value()["displayName"], "Bot");

    mock.stop().await;
}
