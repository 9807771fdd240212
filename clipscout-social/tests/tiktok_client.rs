use clipscout_social::tiktok::{FetchError, PageRequest, TikTokApi};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(cursor: Option<u32>) -> PageRequest<'static> {
    PageRequest {
        api_key: "test-key",
        query: "cat",
        publish_time: "this-week",
        sort_by: "most-liked",
        cursor,
    }
}

#[tokio::test]
async fn first_page_omits_cursor_and_sends_fixed_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tiktok/search/top"))
        .and(header("x-api-key", "test-key"))
        .and(query_param("query", "cat"))
        .and(query_param("publish_time", "this-week"))
        .and(query_param("sort_by", "most-liked"))
        .and(query_param("region", "US"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "credits_remaining": 990,
            "cursor": 30,
            "items": [
                {"id": "1", "create_time": 1_700_000_000, "desc": "one"},
                {"id": "2", "create_time": 1_700_000_100, "desc": "two"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = TikTokApi::new(&server.uri()).unwrap();
    let page = api.search_page(&request(None)).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, "1");
    assert_eq!(page.credits_remaining, 990);
    assert_eq!(page.next_cursor, Some(30));
    assert!(page.has_more);
}

#[tokio::test]
async fn later_pages_carry_cursor_and_region_override() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tiktok/search/top"))
        .and(query_param("cursor", "60"))
        .and(query_param("region", "GB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "credits_remaining": 10,
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = TikTokApi::new(&server.uri()).unwrap().with_region("GB");
    let page = api.search_page(&request(Some(60))).await.unwrap();

    assert!(page.items.is_empty());
    assert!(!page.has_more);
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn non_success_status_is_reported_with_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "success": false,
            "message": "Out of credits"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = TikTokApi::new(&server.uri()).unwrap();
    let err = api.search_page(&request(None)).await.unwrap_err();
    match err {
        FetchError::Status { status, message } => {
            assert_eq!(status, 402);
            assert_eq!(message, "Out of credits");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let api = TikTokApi::new(&server.uri()).unwrap();
    let err = api.search_page(&request(Some(30))).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 502, .. }));
}

#[tokio::test]
async fn stalled_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": []}))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let api = TikTokApi::new(&server.uri())
        .unwrap()
        .with_timeout(Duration::from_millis(100));
    let err = api.search_page(&request(None)).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn a_malformed_item_is_skipped_and_the_page_survives() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credits_remaining": 12,
            "items": [
                {"id": "good-1", "create_time": 1_700_000_000},
                {"desc": "no id here"},
                {"id": 99, "create_time": 1_700_000_100}
            ]
        })))
        .mount(&server)
        .await;

    let api = TikTokApi::new(&server.uri()).unwrap();
    let page = api.search_page(&request(None)).await.unwrap();
    let ids: Vec<_> = page.items.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, ["good-1", "99"]);
    assert_eq!(page.credits_remaining, 12);
}

#[tokio::test]
async fn non_array_items_are_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": {"id": "1"}
        })))
        .mount(&server)
        .await;

    let api = TikTokApi::new(&server.uri()).unwrap();
    let err = api.search_page(&request(None)).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
}
