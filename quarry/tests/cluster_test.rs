//! Client tests against an in-process mock cluster.
//!
//! Each test starts an Axum server on a random port that answers the subset
//! of the REST API the client needs: ping, nodes info, cluster health,
//! document get/index, search, scroll, count, msearch and bulk.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, head, post};
use axum::{Json, Router};
use quarry::dsl::aggs::TermsAggregation;
use quarry::dsl::MatchAllQuery;
use quarry::services::msearch::SearchRequest;
use quarry::{BulkIndexRequest, Client, Error};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

struct MockCluster {
    /// Address published through `/_nodes/http`
    publish_address: String,
    requests: AtomicUsize,
}

type Shared = Arc<MockCluster>;

async fn root(State(state): State<Shared>) -> Json<Value> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "name": "node-1",
        "cluster_name": "mock",
        "cluster_uuid": "abc",
        "version": {"number": "5.6.16", "lucene_version": "6.6.1"},
        "tagline": "You Know, for Search"
    }))
}

async fn nodes_http(State(state): State<Shared>) -> Json<Value> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "cluster_name": "mock",
        "nodes": {
            "node-1": {
                "name": "node-1",
                "roles": ["master", "data"],
                "http": {
                    "bound_address": [state.publish_address],
                    "publish_address": state.publish_address
                }
            }
        }
    }))
}

/// The mock cluster is yellow; waiting for green times out with 408
async fn cluster_health(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let timed_out = params.get("wait_for_status").map(String::as_str) == Some("green");
    let status = if timed_out {
        StatusCode::REQUEST_TIMEOUT
    } else {
        StatusCode::OK
    };
    (status, Json(json!({
        "cluster_name": "mock",
        "status": "yellow",
        "timed_out": timed_out,
        "number_of_nodes": 1,
        "number_of_data_nodes": 1,
        "active_primary_shards": 5,
        "active_shards": 5,
        "unassigned_shards": 5
    })))
}

async fn nodes_info(Path((_node_id, _metric)): Path<(String, String)>) -> Json<Value> {
    Json(json!({
        "cluster_name": "mock",
        "nodes": {
            "node-1": {
                "name": "node-1",
                "roles": ["master", "data"],
                "plugins": [
                    {"name": "analysis-kuromoji", "version": "5.6.16"}
                ]
            }
        }
    }))
}

async fn get_doc(Path((index, typ, id)): Path<(String, String, String)>) -> (StatusCode, Json<Value>) {
    if index == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "type": "index_not_found_exception",
                    "reason": "no such index",
                    "index": "missing"
                },
                "status": 404
            })),
        );
    }
    if id != "1" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"_index": index, "_type": typ, "_id": id, "found": false})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "_index": index,
            "_type": typ,
            "_id": id,
            "_version": 3,
            "found": true,
            "_source": {"user": "olivere", "message": "Welcome"}
        })),
    )
}

async fn put_doc(
    Path((index, typ, id)): Path<(String, String, String)>,
    Json(_doc): Json<Value>,
) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({
            "_index": index,
            "_type": typ,
            "_id": id,
            "_version": 1,
            "result": "created",
            "_shards": {"total": 2, "successful": 1, "failed": 0},
            "created": true
        })),
    )
}

fn search_body(index: &str) -> Value {
    json!({
        "took": 3,
        "timed_out": false,
        "_shards": {"total": 5, "successful": 5, "failed": 0},
        "hits": {
            "total": 2,
            "max_score": 1.0,
            "hits": [
                {"_index": index, "_type": "doc", "_id": "1", "_score": 1.0, "_source": {"user": "olivere"}},
                {"_index": index, "_type": "doc", "_id": "2", "_score": 0.5, "_source": {"user": "sandrae"}}
            ]
        },
        "aggregations": {
            "users": {
                "doc_count_error_upper_bound": 0,
                "sum_other_doc_count": 0,
                "buckets": [
                    {"key": "olivere", "doc_count": 1},
                    {"key": "sandrae", "doc_count": 1}
                ]
            }
        }
    })
}

async fn search(
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if index == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {"type": "index_not_found_exception", "reason": "no such index"},
                "status": 404
            })),
        );
    }
    let mut body = search_body(&index);
    if params.contains_key("scroll") {
        body["_scroll_id"] = json!("scroll-1");
    }
    (StatusCode::OK, Json(body))
}

/// The first page holds every hit, so a continuation is always empty
async fn scroll_next(Json(req): Json<Value>) -> Json<Value> {
    Json(json!({
        "_scroll_id": req["scroll_id"],
        "took": 1,
        "timed_out": false,
        "hits": {"total": 2, "max_score": null, "hits": []}
    }))
}

async fn clear_scroll() -> Json<Value> {
    Json(json!({"succeeded": true, "num_freed": 1}))
}

async fn count(Path(_index): Path<String>) -> Json<Value> {
    Json(json!({"count": 42, "_shards": {"total": 5, "successful": 5, "failed": 0}}))
}

async fn msearch(body: String) -> Json<Value> {
    // header and body lines alternate
    let searches = body.lines().filter(|l| !l.trim().is_empty()).count() / 2;
    let responses: Vec<Value> = (0..searches).map(|_| search_body("twitter")).collect();
    Json(json!({ "responses": responses }))
}

async fn bulk(body: String) -> Json<Value> {
    let mut items = Vec::new();
    for line in body.lines() {
        let Ok(Value::Object(action)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(meta) = action.get("index") else {
            continue;
        };
        items.push(json!({
            "index": {
                "_index": "twitter",
                "_type": "tweet",
                "_id": meta["_id"],
                "_version": 1,
                "result": "created",
                "status": 201
            }
        }));
    }
    Json(json!({"took": 7, "errors": false, "items": items}))
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/_nodes/http", get(nodes_http))
        .route("/_nodes/:node_id/:metric", get(nodes_info))
        .route("/_cluster/health", get(cluster_health))
        .route("/_bulk", post(bulk))
        .route("/_msearch", post(msearch))
        .route("/_search/scroll", post(scroll_next).delete(clear_scroll))
        .route("/:index/_search", get(search).post(search))
        .route("/:index/_count", get(count).post(count))
        .route("/:index/:type/:id", get(get_doc).put(put_doc))
        .with_state(state)
}

/// Start a mock cluster on a random port and return its base URL.
async fn start_server() -> (String, Shared, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(MockCluster {
        publish_address: addr.to_string(),
        requests: AtomicUsize::new(0),
    });

    let app = router(state.clone());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{}", addr), state, handle)
}

async fn head_unavailable(State(heads): State<Arc<AtomicUsize>>) -> StatusCode {
    heads.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE
}

/// A node that fails every HEAD ping but serves cluster health.
/// Returns the base URL and the number of pings received.
async fn start_unpingable_server() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let heads = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route("/", head(head_unavailable))
        .route("/_cluster/health", get(cluster_health))
        .with_state(heads.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{}", addr), heads)
}

/// A node that answers every request with a body shorter than its
/// Content-Length and then hangs up.
async fn start_truncating_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"status\":",
                    )
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

async fn simple_client(url: &str) -> Client {
    Client::builder()
        .url(url)
        .sniff(false)
        .healthcheck(false)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sniff_replaces_seed_with_published_address() {
    let (base, state, _handle) = start_server().await;

    let client = Client::builder()
        .url(&base)
        .sniff(true)
        .healthcheck(true)
        .build()
        .await
        .unwrap();

    let conns = client.conns();
    assert_eq!(conns.len(), 1);
    assert_eq!(conns[0].node_id(), "node-1");
    assert_eq!(conns[0].url(), base);
    assert!(!conns[0].is_dead());
    assert!(client.is_running());
    assert!(state.requests.load(Ordering::SeqCst) >= 2);

    client.stop().await;
    assert!(!client.is_running());
}

#[tokio::test]
async fn test_sniff_callback_can_reject_every_node() {
    let (base, _state, _handle) = start_server().await;

    let result = Client::builder()
        .url(&base)
        .sniff(true)
        .healthcheck(false)
        .sniffer_timeout_startup(Duration::from_millis(500))
        .sniffer_callback(|node| !node.is_master())
        .build()
        .await;

    assert!(matches!(result, Err(Error::NoClient(_))));
}

#[tokio::test]
async fn test_startup_healthcheck_fails_without_live_node() {
    let result = Client::builder()
        .url("http://127.0.0.1:1")
        .sniff(false)
        .healthcheck(true)
        .healthcheck_timeout_startup(Duration::from_millis(200))
        .build()
        .await;

    assert!(matches!(result, Err(Error::NoClient(_))));
}

#[tokio::test]
async fn test_failover_to_live_node() {
    let (base, _state, _handle) = start_server().await;

    let client = Client::builder()
        .urls(vec!["http://127.0.0.1:1".to_string(), base.clone()])
        .sniff(false)
        .healthcheck(false)
        .max_retries(3)
        .build()
        .await
        .unwrap();

    let health = client.cluster_health().do_request().await.unwrap();
    assert_eq!(health.status, "yellow");

    let conns = client.conns();
    let dead: Vec<_> = conns.iter().filter(|c| c.is_dead()).collect();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].url(), "http://127.0.0.1:1");

    // the dead node is skipped from now on
    for _ in 0..3 {
        client.cluster_health().do_request().await.unwrap();
    }
    assert!(client.conns()[0].is_dead());
    assert!(!client.conns()[1].is_dead());
}

#[tokio::test]
async fn test_transport_error_without_retries() {
    let client = Client::builder()
        .url("http://127.0.0.1:1")
        .sniff(false)
        .healthcheck(false)
        .build()
        .await
        .unwrap();

    let err = client.cluster_health().do_request().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(client.conns()[0].is_dead());
}

#[tokio::test]
async fn test_truncated_body_marks_node_dead_and_fails_over() {
    let (base, _state, _handle) = start_server().await;
    let truncating = start_truncating_server().await;

    let client = Client::builder()
        .url(&truncating)
        .sniff(false)
        .healthcheck(false)
        .build()
        .await
        .unwrap();
    let err = client.cluster_health().do_request().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(client.conns()[0].is_dead());

    let client = Client::builder()
        .urls(vec![truncating.clone(), base])
        .sniff(false)
        .healthcheck(false)
        .max_retries(2)
        .build()
        .await
        .unwrap();
    let health = client.cluster_health().do_request().await.unwrap();
    assert_eq!(health.status, "yellow");
    let conns = client.conns();
    assert!(conns[0].is_dead());
    assert_eq!(conns[0].url(), truncating);
    assert!(!conns[1].is_dead());
}

#[tokio::test]
async fn test_no_live_node_does_not_ping_when_healthcheck_disabled() {
    let (base, heads) = start_unpingable_server().await;

    let client = Client::builder()
        .url(&base)
        .sniff(false)
        .healthcheck(false)
        .max_retries(1)
        .build()
        .await
        .unwrap();
    client.conns()[0].mark_as_dead();

    // the pool resurrects the node; a ping would have killed it again
    let health = client.cluster_health().do_request().await.unwrap();
    assert_eq!(health.status, "yellow");
    assert_eq!(heads.load(Ordering::SeqCst), 0);
    assert!(!client.conns()[0].is_dead());
}

#[tokio::test]
async fn test_wait_for_status_times_out() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    client.wait_for_yellow_status("1s").await.unwrap();

    let err = client.wait_for_green_status("1s").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn test_required_plugins() {
    let (base, _state, _handle) = start_server().await;

    let client = Client::builder()
        .url(&base)
        .sniff(false)
        .healthcheck(false)
        .required_plugins(["analysis-kuromoji"])
        .build()
        .await
        .unwrap();
    assert!(client.has_plugin("analysis-kuromoji").await.unwrap());
    assert!(!client.has_plugin("analysis-icu").await.unwrap());

    let result = Client::builder()
        .url(&base)
        .sniff(false)
        .healthcheck(false)
        .required_plugins(["analysis-icu"])
        .build()
        .await;
    match result {
        Err(Error::PluginNotFound(name)) => assert_eq!(name, "analysis-icu"),
        Err(other) => panic!("expected PluginNotFound, got {}", other),
        Ok(_) => panic!("expected PluginNotFound"),
    }
}

#[tokio::test]
async fn test_scroll_ends_with_empty_page() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let mut scroll = client.scroll(["twitter"]).size(2);
    let page = scroll.do_request().await.unwrap();
    assert_eq!(page.hits.hits.len(), 2);
    assert_eq!(scroll.current_scroll_id(), Some("scroll-1"));

    let err = scroll.do_request().await.unwrap_err();
    assert!(matches!(err, Error::EndOfScroll));
    assert_eq!(scroll.current_scroll_id(), Some("scroll-1"));

    scroll.clear().await.unwrap();
    assert!(scroll.current_scroll_id().is_none());
}

#[tokio::test]
async fn test_ping_bypasses_pool() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let (info, status) = client.ping(&base).do_request().await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(info.name, "node-1");
    assert_eq!(info.cluster_name, "mock");
    assert_eq!(info.version.number, "5.6.16");
}

#[tokio::test]
async fn test_api_error_keeps_node_alive() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let err = client
        .search(["missing"])
        .query(MatchAllQuery::new())
        .do_request()
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    let details = err.details().unwrap();
    assert_eq!(details.error_type, "index_not_found_exception");
    assert!(!client.conns()[0].is_dead());
}

#[tokio::test]
async fn test_get_missing_document() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let res = client
        .get()
        .index("twitter")
        .typ("tweet")
        .id("99")
        .do_request()
        .await
        .unwrap();
    assert!(!res.found);
    assert!(res.source.is_none());

    let exists = client
        .exists()
        .index("twitter")
        .typ("tweet")
        .id("99")
        .do_request()
        .await
        .unwrap();
    assert!(!exists);
}

#[tokio::test]
async fn test_get_missing_index_is_an_error() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let err = client
        .get()
        .index("missing")
        .typ("tweet")
        .id("1")
        .do_request()
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_index_and_get_document() {
    #[derive(serde::Deserialize)]
    struct Tweet {
        user: String,
        message: String,
    }

    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let res = client
        .index()
        .index("twitter")
        .typ("tweet")
        .id("1")
        .body(json!({"user": "olivere", "message": "Welcome"}))
        .do_request()
        .await
        .unwrap();
    assert_eq!(res.id, "1");
    assert_eq!(res.result, "created");

    let got = client
        .get()
        .index("twitter")
        .typ("tweet")
        .id("1")
        .do_request()
        .await
        .unwrap();
    assert!(got.found);
    assert_eq!(got.version, Some(3));
    let tweet: Tweet = got.source_as().unwrap().unwrap();
    assert_eq!(tweet.user, "olivere");
    assert_eq!(tweet.message, "Welcome");
}

#[tokio::test]
async fn test_search_decodes_hits_and_aggregations() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let res = client
        .search(["twitter"])
        .query(MatchAllQuery::new())
        .aggregation("users", TermsAggregation::new().field("user"))
        .size(10)
        .do_request()
        .await
        .unwrap();

    assert_eq!(res.total_hits(), 2);
    assert_eq!(res.hits.hits.len(), 2);
    assert_eq!(res.hits.hits[0].id, "1");

    let users = res.aggregations.terms("users").unwrap();
    assert_eq!(users.buckets.len(), 2);
    assert_eq!(users.bucket("sandrae").unwrap().doc_count, 1);
}

#[tokio::test]
async fn test_count() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let n = client.count(["twitter"]).do_request().await.unwrap();
    assert_eq!(n, 42);
}

#[tokio::test]
async fn test_multi_search() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let res = client
        .multi_search()
        .add(SearchRequest::new().index(["twitter"]).query(MatchAllQuery::new()))
        .add(SearchRequest::new().index(["twitter"]).query(MatchAllQuery::new()))
        .do_request()
        .await
        .unwrap();

    assert_eq!(res.responses.len(), 2);
    assert_eq!(res.responses[1].total_hits(), 2);
}

#[tokio::test]
async fn test_bulk_index() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let mut bulk = client.bulk();
    for id in ["1", "2", "3"] {
        bulk = bulk
            .add(
                BulkIndexRequest::new(json!({"user": "olivere"}))
                    .index("twitter")
                    .typ("tweet")
                    .id(id),
            )
            .unwrap();
    }
    assert_eq!(bulk.number_of_actions(), 3);

    let res = bulk.do_request().await.unwrap();
    assert!(!res.errors);
    assert_eq!(res.indexed().len(), 3);
    assert_eq!(res.succeeded().len(), 3);
    assert!(res.failed().is_empty());
    assert_eq!(res.by_id("2").len(), 1);
    assert_eq!(bulk.number_of_actions(), 0);
}

#[tokio::test]
async fn test_bulk_processor_flushes_on_close() {
    let (base, _state, _handle) = start_server().await;
    let client = simple_client(&base).await;

    let processor = client
        .bulk_processor()
        .name("test")
        .workers(2)
        .bulk_actions(2)
        .stats(true)
        .start()
        .unwrap();

    for i in 0..5 {
        processor
            .add(
                BulkIndexRequest::new(json!({"n": i}))
                    .index("twitter")
                    .typ("tweet")
                    .id(i.to_string()),
            )
            .await
            .unwrap();
    }
    processor.close().await.unwrap();

    let stats = processor.stats();
    assert_eq!(stats.indexed, 5);
    assert_eq!(stats.succeeded, 5);
    assert_eq!(stats.failed, 0);
    assert!(stats.committed >= 1);
}
