use async_trait::async_trait;
use clipscout_search::{PageSource, PublishTime, SearchOrchestrator, SearchSettings};
use clipscout_server::{AppState, SearchDefaults, SiteGate, spawn};
use clipscout_social::tiktok::{FetchError, PageRequest, PageResult, VideoItem};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Serves one recent item per offset and records each request's filter and
/// sort parameters.
#[derive(Default)]
struct StubSource {
    seen: Mutex<Vec<(String, String, String)>>,
    fail_all: bool,
}

#[async_trait]
impl PageSource for StubSource {
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<PageResult, FetchError> {
        self.seen.lock().unwrap().push((
            request.query.to_string(),
            request.publish_time.to_string(),
            request.sort_by.to_string(),
        ));
        if self.fail_all {
            return Err(FetchError::Status {
                status: 500,
                message: "down".into(),
            });
        }
        let offset = request.cursor.unwrap_or(0);
        let item: VideoItem = serde_json::from_value(json!({
            "id": format!("vid-{offset}"),
            "create_time": chrono::Utc::now().timestamp(),
            "desc": "a cat"
        }))
        .unwrap();
        Ok(PageResult {
            items: vec![item],
            credits_remaining: 900 - u64::from(offset),
            next_cursor: None,
            has_more: false,
        })
    }
}

fn orchestrator(source: Arc<StubSource>, api_key: Option<&str>) -> Arc<SearchOrchestrator> {
    let settings = SearchSettings::default().with_api_key(api_key.map(str::to_string));
    Arc::new(SearchOrchestrator::new(source, settings).unwrap())
}

async fn start(state: AppState) -> SocketAddr {
    spawn(state).await.unwrap()
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn health_is_always_reachable() {
    let source = Arc::new(StubSource::default());
    let state = AppState::new(orchestrator(source, Some("k")))
        .with_gate(Some(SiteGate::new("pw", false)));
    let addr = start(state).await;

    let resp = client()
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"status": "ok"}));
}

#[tokio::test]
async fn search_returns_aggregate_with_wire_names() {
    let source = Arc::new(StubSource::default());
    let addr = start(AppState::new(orchestrator(source.clone(), Some("k")))).await;

    let resp = client()
        .get(format!("http://{addr}/api/search"))
        .query(&[("query", "cats")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["pages_fetched"], json!(5));
    assert_eq!(body["total_videos_checked"], json!(5));
    assert_eq!(body["filtered_out"], json!(0));
    assert_eq!(body["credits_remaining"], json!(780));
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["vid-0", "vid-30", "vid-60", "vid-90", "vid-120"]);

    let seen = source.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 5);
    assert!(
        seen.iter()
            .all(|(q, p, s)| q == "cats" && p == "this-week" && s == "most-liked")
    );
}

#[tokio::test]
async fn explicit_params_and_configured_defaults_are_forwarded() {
    let source = Arc::new(StubSource::default());
    let state = AppState::new(orchestrator(source.clone(), Some("k"))).with_defaults(
        SearchDefaults {
            publish_time: PublishTime::AllTime,
            sort_by: "date-posted".into(),
        },
    );
    let addr = start(state).await;

    client()
        .get(format!("http://{addr}/api/search"))
        .query(&[("query", "dogs")])
        .send()
        .await
        .unwrap();
    client()
        .get(format!("http://{addr}/api/search"))
        .query(&[
            ("query", "dogs"),
            ("publish_time", "yesterday"),
            ("sort_by", "relevance"),
        ])
        .send()
        .await
        .unwrap();

    let seen = source.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 10);
    assert_eq!(
        seen.iter()
            .filter(|(_, p, s)| p == "all-time" && s == "date-posted")
            .count(),
        5
    );
    assert_eq!(
        seen.iter()
            .filter(|(_, p, s)| p == "yesterday" && s == "relevance")
            .count(),
        5
    );
}

#[tokio::test]
async fn missing_or_blank_query_is_a_bad_request() {
    let source = Arc::new(StubSource::default());
    let addr = start(AppState::new(orchestrator(source.clone(), Some("k")))).await;

    for url in [
        format!("http://{addr}/api/search"),
        format!("http://{addr}/api/search?query=%20%20"),
    ] {
        let resp = client().get(url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.json::<Value>().await.unwrap(),
            json!({"error": "Query parameter is required"})
        );
    }
    assert!(source.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_api_key_is_a_server_error() {
    let source = Arc::new(StubSource::default());
    let addr = start(AppState::new(orchestrator(source.clone(), None))).await;

    let resp = client()
        .get(format!("http://{addr}/api/search?query=cats"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.json::<Value>().await.unwrap(),
        json!({"error": "API key not configured"})
    );
    assert!(source.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn all_pages_failing_still_answers_ok_and_empty() {
    let source = Arc::new(StubSource {
        fail_all: true,
        ..StubSource::default()
    });
    let addr = start(AppState::new(orchestrator(source, Some("k")))).await;

    let resp = client()
        .get(format!("http://{addr}/api/search?query=cats"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pages_fetched"], json!(0));
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["credits_remaining"], json!(0));
}

#[tokio::test]
async fn auth_without_configured_password_is_a_server_error() {
    let source = Arc::new(StubSource::default());
    let addr = start(AppState::new(orchestrator(source, Some("k")))).await;

    let resp = client()
        .post(format!("http://{addr}/api/auth"))
        .json(&json!({"password": "anything"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.json::<Value>().await.unwrap(),
        json!({"error": "No password configured"})
    );
}

#[tokio::test]
async fn gate_blocks_until_login_then_admits_cookie() {
    let source = Arc::new(StubSource::default());
    let state = AppState::new(orchestrator(source, Some("k")))
        .with_gate(Some(SiteGate::new("hunter2", false)));
    let addr = start(state).await;
    let http = client();

    let blocked = http
        .get(format!("http://{addr}/api/search?query=cats"))
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        blocked.json::<Value>().await.unwrap(),
        json!({"error": "unauthorized"})
    );

    let wrong = http
        .post(format!("http://{addr}/api/auth"))
        .json(&json!({"password": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        wrong.json::<Value>().await.unwrap(),
        json!({"error": "Invalid password"})
    );

    let login = http
        .post(format!("http://{addr}/api/auth"))
        .json(&json!({"password": "hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let set_cookie = login
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(!set_cookie.contains("hunter2"));
    assert!(set_cookie.contains("HttpOnly"));
    assert_eq!(
        login.json::<Value>().await.unwrap(),
        json!({"success": true})
    );

    let pair = set_cookie.split(';').next().unwrap().to_string();
    let admitted = http
        .get(format!("http://{addr}/api/search?query=cats"))
        .header(reqwest::header::COOKIE, pair)
        .send()
        .await
        .unwrap();
    assert_eq!(admitted.status(), StatusCode::OK);

    let forged = http
        .get(format!("http://{addr}/api/search?query=cats"))
        .header(reqwest::header::COOKIE, "site-auth=hunter2")
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}
