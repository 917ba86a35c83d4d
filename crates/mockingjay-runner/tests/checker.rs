//! Compatibility checker against live local servers

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::time::sleep;

use mockingjay_core::{CheckOutcome, Endpoint, RequestSpec, ResponseSpec, parse_endpoints};
use mockingjay_runner::{CompatibilityChecker, fake};

const LATENCY: Duration = Duration::from_millis(500);

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on
async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn endpoint(name: &str, uri: &str, code: u16, body: &str) -> Endpoint {
    Endpoint {
        name: name.into(),
        request: RequestSpec {
            uri: uri.into(),
            method: "GET".into(),
            headers: Default::default(),
            body: None,
        },
        response: ResponseSpec {
            code,
            body: body.into(),
            headers: Default::default(),
        },
    }
}

fn hello_backend() -> Router {
    Router::new().route("/hello", get(|| async { "world" }))
}

fn slow_backend() -> Router {
    Router::new().route(
        "/slow/:id",
        get(|| async {
            sleep(LATENCY).await;
            "ok"
        }),
    )
}

fn checker() -> CompatibilityChecker {
    CompatibilityChecker::new().unwrap()
}

#[tokio::test]
async fn matching_service_is_compatible() {
    let base = spawn(hello_backend()).await;
    let report = checker()
        .check_report(&[endpoint("hello", "/hello", 200, "world")], &base)
        .await;

    assert!(report.is_compatible());
    assert_eq!(report.total(), 1);
    assert_eq!(report.verdict().exit_code, 0);
}

#[tokio::test]
async fn hello_endpoint_passes_then_fails_once_the_route_is_gone() {
    let hello0 = endpoint("Test endpoint 0", "/hello0", 200, "hello, world");

    let matching = spawn(Router::new().route("/hello0", get(|| async { "hello, world" }))).await;
    let report = checker().check_report(&[hello0.clone()], &matching).await;
    assert!(report.is_compatible());

    let broken = spawn(Router::new()).await;
    let report = checker().check_report(&[hello0], &broken).await;
    assert!(!report.is_compatible());
    assert_eq!(report.verdict().exit_code, 1);
    let diagnostic = report.results[0].diagnostic().unwrap();
    assert!(diagnostic.starts_with("expected 200, got 404"), "{diagnostic}");
    assert_eq!(report.results[0].endpoint, "Test endpoint 0");
}

#[tokio::test]
async fn missing_route_is_reported_as_mismatch() {
    let base = spawn(hello_backend()).await;
    let results = checker()
        .check(&[endpoint("gone", "/gone", 200, "world")], &base)
        .await;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(!result.success);
    assert!(result.is_mismatch());
    let diagnostic = result.diagnostic().unwrap();
    assert!(
        diagnostic.starts_with("expected 200, got 404"),
        "unexpected diagnostic: {diagnostic}"
    );
}

#[tokio::test]
async fn body_difference_is_a_mismatch() {
    let base = spawn(hello_backend()).await;
    let results = checker()
        .check(&[endpoint("hello", "/hello", 200, "world\n")], &base)
        .await;

    match &results[0].outcome {
        CheckOutcome::Mismatch {
            expected,
            observed,
            body_matches,
        } => {
            assert_eq!(expected.status, observed.status);
            assert_eq!(observed.body, "world");
            assert!(!body_matches);
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}

async fn assert_runs_concurrently(count: usize) {
    let base = spawn(slow_backend()).await;
    let endpoints: Vec<Endpoint> = (0..count)
        .map(|i| endpoint(&format!("slow {i}"), &format!("/slow/{i}"), 200, "ok"))
        .collect();

    let checker = checker();

    let started = Instant::now();
    let results = checker.check(&endpoints, &base).await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), count);
    assert!(results.iter().all(|r| r.success), "{results:?}");
    assert!(elapsed >= LATENCY);
    assert!(
        elapsed < LATENCY.mul_f64(1.2),
        "{count} checks took {elapsed:?}, expected about {LATENCY:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_slow_endpoints_take_one_latency() {
    assert_runs_concurrently(3).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_slow_endpoints_take_one_latency() {
    assert_runs_concurrently(100).await;
}

#[tokio::test]
async fn unreachable_service_yields_one_result_per_endpoint() {
    let base = refused_url().await;
    let endpoints: Vec<Endpoint> = (0..5)
        .map(|i| endpoint(&format!("e{i}"), &format!("/e{i}"), 200, ""))
        .collect();

    let report = checker().check_report(&endpoints, &base).await;

    assert_eq!(report.total(), 5);
    assert_eq!(report.transport_errors(), 5);
    assert!(report.results.iter().all(|r| !r.success));
    assert_eq!(report.verdict().exit_code, 2);

    let names: Vec<&str> = report.results.iter().map(|r| r.endpoint.as_str()).collect();
    assert_eq!(names, ["e0", "e1", "e2", "e3", "e4"]);
}

#[tokio::test]
async fn mixed_outcomes_are_all_reported() {
    let base = spawn(hello_backend()).await;
    let endpoints = vec![
        endpoint("ok", "/hello", 200, "world"),
        endpoint("wrong status", "/hello", 201, "world"),
        endpoint("missing", "/missing", 200, ""),
    ];

    let report = checker().check_report(&endpoints, &base).await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.passed(), 1);
    assert_eq!(report.mismatches(), 2);
    assert_eq!(report.verdict().exit_code, 1);
}

#[tokio::test]
async fn slow_response_times_out() {
    let base = spawn(slow_backend()).await;
    let results = checker()
        .with_timeout(Duration::from_millis(50))
        .check(&[endpoint("slow", "/slow/0", 200, "ok")], &base)
        .await;

    assert!(results[0].is_transport_error());
    match &results[0].outcome {
        CheckOutcome::TransportError { message } => {
            assert_eq!(message, "timed out after 50ms");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_limit_caps_in_flight_requests() {
    let gauge = Arc::new(Gauge::default());
    let backend = Router::new()
        .route(
            "/gauge/:id",
            get(|State(gauge): State<Arc<Gauge>>| async move {
                let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
                gauge.peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(50)).await;
                gauge.current.fetch_sub(1, Ordering::SeqCst);
                "ok"
            }),
        )
        .with_state(Arc::clone(&gauge));
    let base = spawn(backend).await;
    let endpoints: Vec<Endpoint> = (0..8)
        .map(|i| endpoint(&format!("g{i}"), &format!("/gauge/{i}"), 200, "ok"))
        .collect();

    let results = checker()
        .with_concurrency(Some(2))
        .check(&endpoints, &base)
        .await;

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| r.success));
    assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn fake_server_is_compatible_with_its_own_contract() {
    let endpoints = parse_endpoints(
        r#"
- name: Test endpoint 0
  request:
    uri: /hello0
    method: GET
  response:
    code: 200
    body: 'hello, world'

- name: Create thing
  request:
    uri: /things
    method: POST
    body: '{"name":"thing"}'
    headers:
      Content-Type: application/json
  response:
    code: 201
    body: 'created'

- name: Teapot
  request:
    uri: /tea?kind=green
    method: get
  response:
    code: 418
"#,
    )
    .unwrap();

    let base = spawn(fake::router(endpoints.clone())).await;
    let report = checker().check_report(&endpoints, &base).await;

    assert!(report.is_compatible(), "{}", report.to_terminal());
    assert_eq!(report.total(), 3);
}

#[tokio::test]
async fn empty_endpoint_set_fails_as_tool_error() {
    let report = checker().check_report(&[], "http://127.0.0.1:1").await;
    assert_eq!(report.total(), 0);
    assert_eq!(report.verdict().exit_code, 3);
}
