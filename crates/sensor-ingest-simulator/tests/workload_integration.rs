use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use sensor_ingest_simulator::fleet::find_fixture;
use sensor_ingest_simulator::{
    run_workload, Config, IngestPayload, PacingConfig, TaskWeights,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct IngestServer {
    requests: Arc<Mutex<Vec<(HeaderMap, String)>>>,
    fail: bool,
}

impl IngestServer {
    fn captured(&self) -> Vec<(HeaderMap, String)> {
        self.requests.lock().unwrap().clone()
    }
}

/// Mirrors the ingestion service: `ok` for registered devices, `nok` otherwise.
async fn ingest(
    State(server): State<IngestServer>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, &'static str) {
    let known = serde_json::from_str::<IngestPayload>(&body)
        .map(|payload| find_fixture(&payload.device_id).is_some())
        .unwrap_or(false);
    server.requests.lock().unwrap().push((headers, body));

    if server.fail {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom")
    } else if known {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::OK, "nok")
    }
}

async fn spawn_server(fail: bool) -> (String, IngestServer) {
    let server = IngestServer {
        fail,
        ..Default::default()
    };
    let app = Router::new()
        .route("/ingest", post(ingest))
        .with_state(server.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), server)
}

fn fast_config(server_url: String) -> Config {
    Config {
        server_url,
        users: 4,
        duration_secs: 1.0,
        pacing: PacingConfig {
            min_wait_secs: 0.01,
            max_wait_secs: 0.05,
        },
        seed: Some(7),
        ..Default::default()
    }
}

#[tokio::test]
async fn run_posts_well_formed_payloads() {
    let (url, server) = spawn_server(false).await;

    let report = run_workload(fast_config(url), CancellationToken::new())
        .await
        .unwrap();

    let captured = server.captured();
    assert!(!captured.is_empty());
    assert_eq!(report.total_requests(), captured.len() as u64);
    assert_eq!(report.total_errors(), 0);
    assert!(!report.interrupted);

    for (headers, body) in &captured {
        assert_eq!(headers["accept"], "text/plain");
        assert_eq!(headers["content-type"], "application/json");

        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert!(json["deviceId"].is_string());
        assert!(json["timestamp"].is_string());
        let readings = json["readings"].as_array().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].as_object().unwrap().len(), 1);
    }

    // Known devices are accepted and unknown ones rejected by the server.
    assert_eq!(report.known_device.accepted, report.known_device.requests);
    assert_eq!(report.unknown_device.rejected, report.unknown_device.requests);
    assert!(report.known_device.latency.count > 0);
}

#[tokio::test]
async fn server_errors_are_counted_without_retry() {
    let (url, server) = spawn_server(true).await;

    let report = run_workload(fast_config(url), CancellationToken::new())
        .await
        .unwrap();

    let captured = server.captured();
    assert!(captured.len() > 4, "users keep going after failures");
    assert_eq!(report.total_requests(), captured.len() as u64);
    assert_eq!(report.total_errors(), report.total_requests());
    assert_eq!(report.known_device.latency.count, 0);
}

#[tokio::test]
async fn weights_drive_the_traffic_mix() {
    let (url, server) = spawn_server(false).await;
    let config = Config {
        tasks: TaskWeights {
            known_device: 0,
            unknown_device: 1,
        },
        ..fast_config(url)
    };

    let report = run_workload(config, CancellationToken::new()).await.unwrap();

    assert_eq!(report.known_device.requests, 0);
    assert!(report.unknown_device.requests > 0);
    for (_, body) in server.captured() {
        let payload: IngestPayload = serde_json::from_str(&body).unwrap();
        assert!(find_fixture(&payload.device_id).is_none());
        assert_eq!(payload.readings[0].name, "noise");
    }
}

#[tokio::test]
async fn cancellation_stops_a_long_run() {
    let (url, server) = spawn_server(false).await;
    let config = Config {
        duration_secs: 600.0,
        ..fast_config(url)
    };

    let shutdown = CancellationToken::new();
    let canceller = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), run_workload(config, shutdown))
        .await
        .expect("run stops after cancellation")
        .unwrap();

    assert!(report.interrupted);
    assert!(report.duration < Duration::from_secs(10));
    assert!(report.total_requests() > 0);
    // Requests in flight at cancellation still finish and are counted.
    assert_eq!(report.total_requests(), server.captured().len() as u64);
    assert_eq!(report.total_errors(), 0);
}
