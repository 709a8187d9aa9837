use reddit_uploader::{
    AuthError, Client, Credentials, Error, Media, Session, SubmitError, Submission, UploadError,
};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const USER_AGENT: &str = "test:reddit-uploader:v0 (by /u/tester)";

/// Matches requests that carry no `Authorization` header.
struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

fn client(server: &MockServer) -> Client {
    Client::new()
        .with_auth_host(server.uri())
        .with_api_host(server.uri())
        .with_user_agent(USER_AGENT.into())
}

fn credentials() -> Credentials {
    Credentials::new("tester", "hunter2", "client-id", "client-secret")
}

async fn mount_token(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 86400,
            "scope": "*",
        })))
        .mount(server)
        .await;
}

async fn login(server: &MockServer) -> Session {
    mount_token(server, "t1").await;
    client(server).login(credentials()).await.unwrap()
}

/// Grants leases pointing at `/storage` on the mock server, expecting `n` of them.
async fn mount_lease(server: &MockServer, n: u64) {
    Mock::given(method("POST"))
        .and(path("/api/media/asset.json"))
        .and(header("authorization", "Bearer t1"))
        .and(body_string_contains("api_type=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "args": {
                "action": format!("{}/storage", server.uri()),
                "fields": [
                    {"name": "acl", "value": "public-read"},
                    {"name": "key", "value": "k1"},
                    {"name": "policy", "value": "cG9saWN5"},
                ],
            },
            "asset": {"asset_id": "a1"},
        })))
        .expect(n)
        .mount(server)
        .await;
}

/// Accepts uploads of `content` that carry every signing field from [`mount_lease`].
async fn mount_storage(server: &MockServer, content: &str, status: u16, n: u64) {
    Mock::given(method("POST"))
        .and(path("/storage"))
        .and(NoAuthorization)
        .and(body_string_contains("name=\"acl\"\r\n\r\npublic-read\r\n"))
        .and(body_string_contains("name=\"key\"\r\n\r\nk1\r\n"))
        .and(body_string_contains("name=\"policy\"\r\n\r\ncG9saWN5\r\n"))
        .and(body_string_contains(r#"name="file"; filename="#))
        .and(body_string_contains(format!("\r\n\r\n{}\r\n", content)))
        .respond_with(ResponseTemplate::new(status).set_body_string("<Error>AccessDenied</Error>"))
        .expect(n)
        .mount(server)
        .await;
}

async fn mount_submit(server: &MockServer, response: serde_json::Value, n: u64) {
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .expect(n)
        .mount(server)
        .await;
}

const PNG: &str = "not really a png";

fn png() -> Media {
    Media::new(PNG.as_bytes(), "photo.png")
}

#[tokio::test]
async fn login_sends_password_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(basic_auth("client-id", "client-secret"))
        .and(header("user-agent", USER_AGENT))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=tester"))
        .and(body_string_contains("password=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = client(&server).login(credentials()).await.unwrap();
    assert_eq!(session.token().expires_at(), None);
}

#[tokio::test]
async fn credentials_user_agent_overrides_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(header("user-agent", "custom/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1"})))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials {
        user_agent: Some("custom/1.0".into()),
        ..credentials()
    };
    client(&server).login(credentials).await.unwrap();
}

#[tokio::test]
async fn login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let err = client(&server).login(credentials()).await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::Rejected(ref e)) if e == "invalid_grant"));
}

#[tokio::test]
async fn login_unauthorized_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Unauthorized", "error": 401})),
        )
        .mount(&server)
        .await;

    let err = client(&server).login(credentials()).await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::Rejected(ref e)) if e == "401"));
}

#[tokio::test]
async fn submit_image_end_to_end() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    mount_lease(&server, 1).await;
    mount_storage(&server, PNG, 201, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(header("authorization", "Bearer t1"))
        .and(body_string_contains("sr=test"))
        .and(body_string_contains("title=hi"))
        .and(body_string_contains("kind=image"))
        .and(body_string_contains("storage%2Fk1"))
        .and(body_string_contains("api_type=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": {
                "errors": [],
                "data": {"url": "https://www.reddit.com/r/test/comments/abc/hi/", "id": "abc", "name": "t3_abc"},
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let submitted = session
        .submit_image(&Submission::new("test", "hi"), &png())
        .await
        .unwrap();
    assert_eq!(
        submitted.url.as_deref(),
        Some("https://www.reddit.com/r/test/comments/abc/hi/")
    );
    assert_eq!(submitted.name.as_deref(), Some("t3_abc"));
}

#[tokio::test]
async fn upload_media_returns_lease_url() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    mount_lease(&server, 1).await;
    mount_storage(&server, PNG, 204, 1).await;

    let media_url = session.upload_media(&png()).await.unwrap();
    assert_eq!(media_url.url, format!("{}/storage/k1", server.uri()));
    assert_eq!(media_url.kind, reddit_uploader::MediaKind::Image);
}

#[tokio::test]
async fn unknown_extension_makes_no_requests() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    mount_lease(&server, 0).await;
    mount_storage(&server, PNG, 201, 0).await;

    let err = session
        .upload_media(&Media::new(&b"hello"[..], "notes.txt"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Upload(UploadError::LeaseDenied(ref reason)) if reason == "unknown extension")
    );
}

#[tokio::test]
async fn lease_refused_over_http() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/media/asset.json"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden", "error": 403})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_storage(&server, PNG, 201, 0).await;
    mount_submit(&server, json!({}), 0).await;

    let err = session
        .submit_image(&Submission::new("test", "hi"), &png())
        .await
        .unwrap_err();
    match err {
        Error::Upload(UploadError::LeaseDenied(reason)) => {
            assert!(reason.starts_with("403 Forbidden: "), "{}", reason);
            assert!(reason.contains(r#""error":403"#), "{}", reason);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn lease_not_granted() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/media/asset.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"args": {"action": "", "fields": []}})))
        .expect(1)
        .mount(&server)
        .await;
    mount_storage(&server, PNG, 201, 0).await;
    mount_submit(&server, json!({}), 0).await;

    let err = session
        .submit_image(&Submission::new("test", "hi"), &png())
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Upload(UploadError::LeaseDenied(ref reason)) if reason == "lease not granted")
    );
}

#[tokio::test]
async fn transfer_failed() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    mount_lease(&server, 1).await;
    mount_storage(&server, PNG, 403, 1).await;
    mount_submit(&server, json!({}), 0).await;

    let err = session
        .submit_image(&Submission::new("test", "hi"), &png())
        .await
        .unwrap_err();
    match err {
        Error::Upload(UploadError::TransferFailed { status, body }) => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body, "<Error>AccessDenied</Error>");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_lease_response() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/media/asset.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"args": {"action": 7}})))
        .mount(&server)
        .await;

    let err = session.upload_media(&png()).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn video_uses_default_poster() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;
    let session = client(&server)
        .with_default_poster(Media::new(&b"poster"[..], "preview.jpg"))
        .login(credentials())
        .await
        .unwrap();
    mount_lease(&server, 2).await;
    mount_storage(&server, "video", 201, 1).await;
    mount_storage(&server, "poster", 201, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_string_contains("kind=video"))
        .and(body_string_contains("video_poster_url="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": {
                "errors": [],
                "data": {"websocket_url": "wss://ws.example/x", "user_submitted_page": "https://www.reddit.com/user/tester/submitted/"},
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let submitted = session
        .submit_video(
            &Submission::new("test", "clip"),
            &Media::new(&b"video"[..], "clip.mp4"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(submitted.websocket_url.as_deref(), Some("wss://ws.example/x"));
}

#[tokio::test]
async fn video_without_any_poster() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    mount_lease(&server, 0).await;
    mount_submit(&server, json!({}), 0).await;

    let err = session
        .submit_video(
            &Submission::new("test", "clip"),
            &Media::new(&b"video"[..], "clip.mp4"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submit(SubmitError::MissingVideoUrls)));
}

#[tokio::test]
async fn submit_error_is_classified() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    mount_submit(
        &server,
        json!({"json": {"errors": [["SUBREDDIT_NOEXIST", "no such sub", "sr"]]}}),
        1,
    )
    .await;

    let err = session
        .submit_text(&Submission::new("nope", "hi"), "body")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submit(SubmitError::SubredditDoesNotExist)));
}

#[tokio::test]
async fn incomplete_submission_uploads_nothing() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    mount_lease(&server, 0).await;

    let err = session
        .submit_image(&Submission::new("test", ""), &png())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IncompleteSubmission("title")));
}

#[tokio::test]
async fn refresh_replaces_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_token(&server, "t2").await;
    mount_submit(&server, json!({}), 0).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(header("authorization", "Bearer t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": {"errors": [], "data": {"url": "p"}},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = client(&server).login(credentials()).await.unwrap();
    assert!(!session.refresh_if_expired().await.unwrap());
    session.refresh().await.unwrap();
    let submitted = session
        .submit_link(&Submission::new("test", "hi"), "https://example.com/")
        .await
        .unwrap();
    assert_eq!(submitted.url.as_deref(), Some("p"));
}

#[tokio::test]
async fn slow_response_is_timeout() {
    let server = MockServer::start().await;
    mount_token(&server, "t1").await;
    let session = client(&server)
        .with_timeout(Duration::from_millis(100))
        .login(credentials())
        .await
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"json": {"errors": []}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = session
        .submit_text(&Submission::new("test", "hi"), "body")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}
