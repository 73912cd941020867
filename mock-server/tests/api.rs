use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, User, Variable, RAW_BYTES, TOKEN};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("PRIVATE-TOKEN", TOKEN)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("PRIVATE-TOKEN", TOKEN)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_token_returns_401() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/v4/users").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["message"], "401 Unauthorized");
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/v4/users")
                .header("PRIVATE-TOKEN", "nope")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- users ---

#[tokio::test]
async fn users_filter_by_username() {
    let resp = app().oneshot(request("GET", "/api/v4/users?username=alice")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<User> = body_json(resp).await;
    assert_eq!(
        users,
        vec![User {
            id: 42,
            username: "alice".to_string()
        }]
    );
}

#[tokio::test]
async fn users_unfiltered_lists_all() {
    let resp = app().oneshot(request("GET", "/api/v4/users")).await.unwrap();
    let users: Vec<User> = body_json(resp).await;
    assert_eq!(users.len(), 2);
}

// --- echo, stream, status ---

#[tokio::test]
async fn echo_returns_body_and_content_type() {
    let resp = app()
        .oneshot(json_request("POST", "/api/v4/echo", r#"{"key":"X","value":"1"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
    assert_eq!(body_bytes(resp).await, r#"{"key":"X","value":"1"}"#);
}

#[tokio::test]
async fn stream_emits_numbered_lines() {
    let resp = app().oneshot(request("GET", "/api/v4/stream/3")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "chunk-0\nchunk-1\nchunk-2\n");
}

#[tokio::test]
async fn raw_serves_binary_body() {
    let resp = app().oneshot(request("GET", "/api/v4/raw")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, RAW_BYTES);
}

#[tokio::test]
async fn status_route_answers_requested_code() {
    for (code, expected) in [(404, StatusCode::NOT_FOUND), (500, StatusCode::INTERNAL_SERVER_ERROR)] {
        let resp = app()
            .oneshot(request("GET", &format!("/api/v4/status/{code}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), expected);
        let body: serde_json::Value = body_json(resp).await;
        assert!(body["message"].as_str().unwrap().starts_with(&code.to_string()));
    }
}

// --- variables ---

#[tokio::test]
async fn get_variable_not_found() {
    let resp = app().oneshot(request("GET", "/api/v4/projects/7/variables/X")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_variable_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/v4/projects/7/variables", r#"{"value":"1"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_variable_not_found() {
    let resp = app()
        .oneshot(request("DELETE", "/api/v4/projects/7/variables/X"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn variables_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/v4/projects/7/variables",
            r#"{"key":"DEPLOY_ENV","value":"staging"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Variable = body_json(resp).await;
    assert_eq!(created.value, "staging");
    assert_eq!(created.variable_type, "env_var");

    // duplicate create is rejected
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/v4/projects/7/variables",
            r#"{"key":"DEPLOY_ENV","value":"prod"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // list is scoped to the project
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", "/api/v4/projects/8/variables"))
        .await
        .unwrap();
    let other: Vec<Variable> = body_json(resp).await;
    assert!(other.is_empty());

    // update — partial: only protected
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            "/api/v4/projects/7/variables/DEPLOY_ENV",
            r#"{"protected":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Variable = body_json(resp).await;
    assert_eq!(updated.value, "staging"); // unchanged
    assert!(updated.protected);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", "/api/v4/projects/7/variables/DEPLOY_ENV"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // list after delete — empty
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", "/api/v4/projects/7/variables"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let vars: Vec<Variable> = body_json(resp).await;
    assert!(vars.is_empty());
}
