use chrono::Utc;
use gitsearch_lib::{GitHubSearcher, MatchFilter, PageCursor, SearchError, SearchQuery};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn item(repo: &str, path: &str, fragments: &[&str]) -> Value {
    json!({
        "name": path,
        "path": path,
        "html_url": format!("https://github.com/{repo}/blob/main/{path}"),
        "repository": {
            "full_name": repo,
            "html_url": format!("https://github.com/{repo}")
        },
        "text_matches": fragments
            .iter()
            .map(|f| json!({ "object_type": "FileContent", "property": "content", "fragment": f }))
            .collect::<Vec<_>>()
    })
}

fn page_body(items: Vec<Value>) -> Value {
    json!({
        "total_count": items.len(),
        "incomplete_results": false,
        "items": items
    })
}

fn next_link(server: &MockServer, page: u32) -> String {
    format!(
        "<{}/search/code?q=foo&per_page=100&page={}>; rel=\"next\", <{}/search/code?q=foo&per_page=100&page=9>; rel=\"last\"",
        server.uri(),
        page,
        server.uri()
    )
}

async fn mount_page(server: &MockServer, page: u32, items: Vec<Value>, next: Option<u32>) {
    let mut response = ResponseTemplate::new(200).set_body_json(page_body(items));
    if let Some(next) = next {
        response = response.insert_header("link", next_link(server, next).as_str());
    }

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("page", page.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn requested_pages(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .map(|(_, v)| v.into_owned())
        })
        .collect()
}

fn searcher(server: &MockServer) -> GitHubSearcher {
    GitHubSearcher::with_base_url(&server.uri(), TOKEN).unwrap()
}

#[tokio::test]
async fn test_two_pages_fold_into_one_repository() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        vec![item("a/b", "x.go", &["has foo here", "unrelated"])],
        Some(2),
    )
    .await;
    mount_page(&server, 2, vec![item("a/b", "y.go", &["also foo"])], None).await;

    let query = SearchQuery::new(&["foo"], None);
    let results = searcher(&server)
        .search(&query, MatchFilter::new(false, false), false)
        .await
        .unwrap();

    assert_eq!(results.query(), "foo");
    assert_eq!(results.len(), 1);

    let repo = &results.repos()[0];
    assert_eq!(repo.name, "a/b");
    assert_eq!(repo.href, "https://github.com/a/b");

    let files: Vec<(&str, Vec<&str>)> = repo
        .files
        .iter()
        .map(|f| (f.path.as_str(), f.matches.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        files,
        vec![("x.go", vec!["has foo here"]), ("y.go", vec!["also foo"])]
    );

    assert_eq!(requested_pages(&server).await, vec!["1", "2"]);
}

#[tokio::test]
async fn test_search_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("q", "\"tokio select\" language:rust"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .and(query_param("sort", "indexed"))
        .and(query_param("order", "desc"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.github.text-match+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let query = SearchQuery::new(&["tokio", "select"], Some("language:rust"));
    let page = searcher(&server)
        .fetch_page(&query, &PageCursor::first())
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.next_page, None);
}

#[tokio::test]
async fn test_rate_limited_page_is_retried_without_advancing() {
    let server = MockServer::start().await;
    mount_page(&server, 1, vec![item("a/b", "x.go", &["foo one"])], Some(2)).await;

    // Registered first, so it answers the first request for page 2 only.
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("retry-after", "0")
                .set_body_json(page_body(vec![item("evil/repo", "z.go", &["foo"])])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 2, vec![item("c/d", "y.go", &["foo two"])], None).await;

    let query = SearchQuery::new(&["foo"], None);
    let results = searcher(&server)
        .search(&query, MatchFilter::default(), false)
        .await
        .unwrap();

    assert_eq!(requested_pages(&server).await, vec!["1", "2", "2"]);

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a/b", "c/d"]);
}

#[tokio::test]
async fn test_malformed_retry_after_retries_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "later"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, 1, vec![item("a/b", "x.go", &["foo"])], None).await;

    let query = SearchQuery::new(&["foo"], None);
    let results = searcher(&server)
        .search(&query, MatchFilter::default(), false)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(requested_pages(&server).await, vec!["1", "1", "1"]);
}

#[tokio::test]
async fn test_past_quota_reset_retries_immediately() {
    let server = MockServer::start().await;

    // Reset time in the past: no sleep, just retry.
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-limit", "30")
                .insert_header("x-ratelimit-reset", "1"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, vec![item("a/b", "x.go", &["foo"])], None).await;

    let query = SearchQuery::new(&["foo"], None);
    let results = searcher(&server)
        .search(&query, MatchFilter::default(), false)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(requested_pages(&server).await, vec!["1", "1"]);
}

#[tokio::test]
async fn test_retry_after_is_slept_before_retrying() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .respond_with(ResponseTemplate::new(403).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, vec![item("a/b", "x.go", &["foo"])], None).await;

    let query = SearchQuery::new(&["foo"], None);
    let started = Instant::now();
    let results = searcher(&server)
        .search(&query, MatchFilter::default(), false)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(results.len(), 1);
    assert_eq!(requested_pages(&server).await, vec!["1", "1"]);
}

#[tokio::test]
async fn test_quota_reset_is_slept_before_retrying() {
    let server = MockServer::start().await;

    let reset = Utc::now().timestamp() + 2;
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-limit", "30")
                .insert_header("x-ratelimit-reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, vec![item("a/b", "x.go", &["foo"])], None).await;

    let query = SearchQuery::new(&["foo"], None);
    let started = Instant::now();
    let results = searcher(&server)
        .search(&query, MatchFilter::default(), false)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(results.len(), 1);
    assert_eq!(requested_pages(&server).await, vec!["1", "1"]);
}

#[tokio::test]
async fn test_forbidden_without_rate_limit_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "4999")
                .set_body_json(json!({ "message": "Resource not accessible by integration" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let query = SearchQuery::new(&["foo"], None);
    let err = searcher(&server)
        .search(&query, MatchFilter::default(), false)
        .await
        .unwrap_err();

    match err {
        SearchError::Api { status, message } => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(message, "Resource not accessible by integration");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failure_on_later_page_discards_everything() {
    let server = MockServer::start().await;
    mount_page(&server, 1, vec![item("a/b", "x.go", &["foo"])], Some(2)).await;

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let query = SearchQuery::new(&["foo"], None);
    let err = searcher(&server)
        .search(&query, MatchFilter::default(), false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SearchError::Api { status, ref message } if status == StatusCode::INTERNAL_SERVER_ERROR && message == "boom"
    ));
}

#[tokio::test]
async fn test_repositories_without_matches_are_pruned() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        vec![
            item("z/last", "a.txt", &["Foo"]),
            item("m/middle", "b.txt", &["foo"]),
            item("a/first", "c.txt", &["a foo b"]),
            item("q/none", "d.txt", &["bar"]),
        ],
        None,
    )
    .await;

    let query = SearchQuery::new(&["foo"], None);

    let strict = searcher(&server)
        .search(&query, MatchFilter::default(), false)
        .await
        .unwrap();
    let names: Vec<&str> = strict.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a/first", "m/middle"]);

    let relaxed = searcher(&server)
        .search(&query, MatchFilter::new(true, false), false)
        .await
        .unwrap();
    let names: Vec<&str> = relaxed.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a/first", "m/middle", "z/last"]);

    let everything = searcher(&server)
        .search(&query, MatchFilter::new(false, true), true)
        .await
        .unwrap();
    assert_eq!(everything.len(), 4);
    assert!(everything.repos()[0].files[0].href.ends_with("#:~:text=foo"));
}

#[tokio::test]
async fn test_list_organizations_pages_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("since", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "login": "acme", "id": 3 },
            { "login": "globex", "id": 7 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("since", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let orgs = searcher(&server).list_organizations().await.unwrap();
    let logins: Vec<&str> = orgs.iter().map(|o| o.login.as_str()).collect();
    assert_eq!(logins, vec!["acme", "globex"]);
}
