//! HTTP client behavior against a canned local endpoint

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tracksim::core::config::IngestConfig;
use tracksim::core::error::DeliveryError;
use tracksim::core::types::{GeoPosition, ObjectId, ObjectKind, TaskKind};
use tracksim::ingest::{ClassificationSuggestion, HttpIngestClient, IngestBatch, IngestSink, ObjectRecord, RadarPoint};
use tracksim::simulation::object::{ObjectUpdate, SimulatedObject};

/// Serve one connection with `response`, returning the request line and body
async fn serve_once(response: &'static str, delay: Duration) -> (String, tokio::task::JoinHandle<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if raw.len() >= split + 4 + length {
                    break;
                }
            }
        }
        tokio::time::sleep(delay).await;
        socket.write_all(response.as_bytes()).await.ok();
        socket.shutdown().await.ok();

        let text = String::from_utf8_lossy(&raw).to_string();
        let request_line = text.lines().next().unwrap_or_default().to_string();
        let body = text.split("\r\n\r\n").nth(1).unwrap_or_default().to_string();
        (request_line, body)
    });

    (base_url, handle)
}

fn client(base_url: String, timeout_secs: f64) -> HttpIngestClient {
    HttpIngestClient::new(&IngestConfig {
        base_url,
        objects_path: "/objects/temporary".into(),
        classify_path: "/objects/classify".into(),
        radar_point_path: "/objects/radar-point".into(),
        request_timeout_secs: timeout_secs,
    })
    .unwrap()
}

fn batch() -> IngestBatch {
    IngestBatch::new(TaskKind::RandomRadar, 1, &[], &[])
}

#[tokio::test]
async fn test_success_posts_json_batch() {
    let (url, server) = serve_once(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 11\r\n\r\n{\"ok\":true}",
        Duration::ZERO,
    )
    .await;

    client(url, 2.0).send(&batch()).await.unwrap();

    let (request_line, body) = server.await.unwrap();
    assert!(request_line.starts_with("POST /objects/temporary "), "{request_line}");
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["task"], "random_radar");
    assert_eq!(body["tick"], 1);
}

#[tokio::test]
async fn test_non_2xx_is_status_error() {
    let (url, _server) = serve_once(
        "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 4\r\n\r\nbusy",
        Duration::ZERO,
    )
    .await;

    let err = client(url, 2.0).send(&batch()).await.unwrap_err();
    assert_eq!(
        err,
        DeliveryError::Status {
            status: 503,
            body: "busy".into()
        }
    );
}

#[tokio::test]
async fn test_invalid_json_body_is_malformed() {
    let (url, _server) = serve_once(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 5\r\n\r\n{oops",
        Duration::ZERO,
    )
    .await;

    let err = client(url, 2.0).send(&batch()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let (url, _server) = serve_once(
        "HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n",
        Duration::from_secs(3),
    )
    .await;

    let err = client(url, 0.2).send(&batch()).await.unwrap_err();
    assert_eq!(err, DeliveryError::Timeout);
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(url, 2.0).send(&batch()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Unreachable(_)), "{err:?}");
}

#[tokio::test]
async fn test_suggestion_posts_to_classify() {
    let (url, server) = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n", Duration::ZERO).await;

    let update = ObjectUpdate::new(ObjectId::new("uav-1"), ObjectKind::Drone, GeoPosition::new(33.2, 35.4, 1524.0))
        .with_hint("drone")
        .with_reason("slow and low");
    let record = ObjectRecord::from(&SimulatedObject::from_update(update, 5));
    let suggestion = ClassificationSuggestion::from_record(TaskKind::DroneAttack, &record).unwrap();
    client(url, 2.0).suggest(&suggestion).await.unwrap();

    let (request_line, body) = server.await.unwrap();
    assert!(request_line.starts_with("POST /objects/classify "), "{request_line}");
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["id"], "uav-1");
    assert_eq!(body["classification"]["suggested_identification"], "drone");
}

#[tokio::test]
async fn test_radar_point_posts_to_its_endpoint() {
    let (url, server) = serve_once(
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n",
        Duration::ZERO,
    )
    .await;

    let point = RadarPoint::from(&GeoPosition::new(33.261657, 35.419922, 1524.0));
    let err = client(url, 2.0).radar_point(&point).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Status { status: 500, .. }), "{err:?}");

    let (request_line, body) = server.await.unwrap();
    assert!(request_line.starts_with("POST /objects/radar-point "), "{request_line}");
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["lng"], 35.419922);
}
