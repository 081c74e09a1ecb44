//! End-to-end pipeline tests against a local stub HTTP server.
//!
//! Each test binds a listener on an ephemeral port, serves canned JSON for
//! a handful of routes and points a [`PipelineConfig`] at it. Nothing here
//! touches the real endpoints.

use std::collections::BTreeMap;
use std::time::Duration;
use stratus_tui::api::SnapshotProvider;
use stratus_tui::config::PipelineConfig;
use stratus_tui::geo;
use stratus_tui::models::{Track, TrackPoint};
use stratus_tui::weather::WeatherProvider;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves `routes` by path until the test's runtime shuts down. A route
/// matches its exact path or that path plus a query string; anything else
/// gets a 404.
async fn spawn_stub(routes: Vec<(String, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut request = Vec::with_capacity(1024);
                let mut chunk = [0u8; 512];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            request.extend_from_slice(&chunk[..n]);
                            if request.windows(4).any(|w| w == b"\r\n\r\n")
                                || request.len() > 8192
                            {
                                break;
                            }
                        }
                    }
                }

                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let response = routes
                    .iter()
                    .find(|(route, _)| {
                        path == *route || path.starts_with(&format!("{route}?"))
                    })
                    .map(|(_, body)| http_ok(body))
                    .unwrap_or_else(http_not_found);

                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Accepts connections and never answers them; forces the client timeout.
async fn spawn_black_hole() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

/// A bound-then-dropped port: every connect is refused.
async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn http_ok(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

fn http_not_found() -> String {
    "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_string()
}

fn route(path: &str, body: &str) -> (String, String) {
    (path.to_string(), body.to_string())
}

fn config_for(snapshot_base: &str, weather_base: &str) -> PipelineConfig {
    PipelineConfig {
        snapshot_base_url: snapshot_base.to_string(),
        weather_base_url: weather_base.to_string(),
        request_timeout: Duration::from_secs(2),
        max_in_flight: None,
    }
}

fn point(lat: f64, lon: f64, hour: u8) -> TrackPoint {
    TrackPoint { lat, lon, ts: None, hour }
}

#[tokio::test]
async fn a_single_surviving_hour_still_builds_the_constellation() {
    let base = spawn_stub(vec![route(
        "/23.json",
        r#"[{"lat": 1.0, "lon": 2.0, "id": "X"}]"#,
    )])
    .await;

    let provider = SnapshotProvider::new(config_for(&base, &base));
    let history = provider.fetch_history().await;

    assert_eq!(history.constellation.len(), 1);
    let entry = &history.constellation[0];
    assert_eq!(entry.id, "X");
    assert_eq!(entry.latest_lat, 1.0);
    assert_eq!(entry.latest_lon, 2.0);
    assert_eq!(entry.history.len(), 1);
    assert_eq!(entry.history[0].hour, 23);

    assert_eq!(history.raw_hours.len(), 24);
    assert_eq!(history.raw_hours[23].len(), 1);
    assert!(history.raw_hours[..23].iter().all(Vec::is_empty));
}

#[tokio::test]
async fn tracks_run_oldest_to_newest_with_latest_and_drift_to_match() {
    let base = spawn_stub(vec![
        route("/23.json", r#"[{"lat": 0.0, "lon": 0.0, "id": "X"}]"#),
        route("/00.json", r#"[{"lat": 0.0, "lon": 1.0, "id": "X"}]"#),
    ])
    .await;

    let provider = SnapshotProvider::new(config_for(&base, &base));
    let history = provider.fetch_history().await;

    let track = &history.tracks["X"];
    let hours: Vec<u8> = track.points.iter().map(|p| p.hour).collect();
    assert_eq!(hours, vec![23, 0]);

    let entry = &history.constellation[0];
    assert_eq!((entry.latest_lat, entry.latest_lon), (0.0, 1.0));

    let drift = geo::total_track_distance(&entry.history);
    let expected = geo::haversine_distance(0.0, 0.0, 0.0, 1.0);
    assert!((drift - expected).abs() < 1e-9);
}

#[tokio::test]
async fn malformed_and_odd_shaped_hours_are_tolerated() {
    let base = spawn_stub(vec![
        route("/00.json", "{not json"),
        route("/01.json", r#""just a string""#),
        route("/02.json", r#"[[10.5, 20.25, 5000, 1700000000]]"#),
        route(
            "/03.json",
            r#"{"fleet": [[1.0, 2.0]], "meta": {"lat": 3.0, "lon": 4.0, "id": "K"}, "note": "x"}"#,
        ),
    ])
    .await;

    let provider = SnapshotProvider::new(config_for(&base, &base));
    let history = provider.fetch_history().await;

    // Hour 0 is unparseable, hour 1 parses to a useless shape.
    assert!(history.raw_hours[0].is_empty());
    assert!(history.raw_hours[1].is_empty());

    assert_eq!(history.raw_hours[2].len(), 1);
    assert_eq!(history.raw_hours[3].len(), 2);

    assert_eq!(history.tracks.len(), 3);
    assert!(history.tracks.contains_key("K"));
    assert!(history.tracks.contains_key("u_2_10.5000_20.2500_1700000000"));
}

#[tokio::test]
async fn every_hour_down_yields_an_empty_constellation_not_an_error() {
    let base = dead_endpoint().await;
    let provider = SnapshotProvider::new(config_for(&base, &base));
    let history = provider.fetch_history().await;

    assert!(history.constellation.is_empty());
    assert!(history.tracks.is_empty());
    assert_eq!(history.raw_hours.len(), 24);
    assert!(history.raw_hours.iter().all(Vec::is_empty));
}

#[tokio::test]
async fn hung_requests_collapse_to_absence_via_the_timeout() {
    let base = spawn_black_hole().await;
    let mut config = config_for(&base, &base);
    config.request_timeout = Duration::from_millis(250);

    let provider = SnapshotProvider::new(config);
    assert!(provider.fetch_snapshot(0).await.is_none());

    let history = provider.fetch_history().await;
    assert!(history.constellation.is_empty());
}

#[tokio::test]
async fn capped_fan_out_matches_the_unbounded_result() {
    let base = spawn_stub(vec![
        route("/05.json", r#"[{"lat": 5.0, "lon": 5.0, "id": "A"}]"#),
        route("/06.json", r#"[{"lat": 6.0, "lon": 6.0, "id": "B"}]"#),
        route("/07.json", r#"[{"lat": 7.0, "lon": 7.0, "id": "A"}]"#),
    ])
    .await;

    let unbounded = SnapshotProvider::new(config_for(&base, &base))
        .fetch_history()
        .await;
    let mut capped_config = config_for(&base, &base);
    capped_config.max_in_flight = Some(2);
    let capped = SnapshotProvider::new(capped_config).fetch_history().await;

    let ids = |h: &stratus_tui::history::ConstellationHistory| {
        h.constellation.iter().map(|e| e.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&unbounded), ids(&capped));
    assert_eq!(unbounded.tracks["A"].points, capped.tracks["A"].points);
}

#[tokio::test]
async fn legacy_weather_blocks_map_to_metrics_and_kmh_units() {
    let base = spawn_stub(vec![route(
        "/forecast",
        r#"{"current_weather": {"temperature": 15, "windspeed": 10, "winddirection": 200}}"#,
    )])
    .await;

    let weather_base = format!("{base}/forecast");
    let provider = WeatherProvider::new(config_for(&base, &weather_base));
    let summary = provider.fetch_for_track(&[point(10.0, 20.0, 0)]).await;

    let metrics = summary.metrics.expect("metrics");
    assert_eq!(metrics.temperature_c, Some(15.0));
    assert_eq!(metrics.wind_speed, Some(10.0));
    assert_eq!(metrics.wind_direction_deg, Some(200.0));

    let units = summary.units.expect("units");
    assert_eq!(units.get("temperature_2m").unwrap(), "°C");
    assert_eq!(units.get("wind_speed_10m").unwrap(), "km/h");
    assert_eq!(units.get("wind_direction_10m").unwrap(), "°");

    let coords = summary.coords.expect("coords");
    assert_eq!((coords.lat, coords.lon), (10.0, 20.0));
}

#[tokio::test]
async fn weather_failures_degrade_to_an_unavailable_summary() {
    let base = dead_endpoint().await;
    let provider = WeatherProvider::new(config_for(&base, &base));
    let summary = provider.fetch_for_track(&[point(10.0, 20.0, 0)]).await;

    assert_eq!(summary.source, "Open-Meteo");
    assert_eq!(summary.note, "External dataset temporarily unavailable.");
    assert_eq!(summary.metrics, None);
    assert_eq!(summary.units, None);
    assert_eq!(summary.coords, None);
}

#[tokio::test]
async fn enrich_all_returns_one_summary_per_track() {
    let base = spawn_stub(vec![route(
        "/forecast",
        r#"{
            "current": {"temperature_2m": -51.5, "wind_speed_10m": 12.0, "wind_direction_10m": 270},
            "current_units": {"temperature_2m": "°C", "wind_speed_10m": "m/s", "wind_direction_10m": "°"}
        }"#,
    )])
    .await;

    let weather_base = format!("{base}/forecast");
    let provider = WeatherProvider::new(config_for(&base, &weather_base));

    let mut tracks = BTreeMap::new();
    tracks.insert(
        "X".to_string(),
        Track { id: "X".to_string(), points: vec![point(10.0, 20.0, 0)] },
    );
    tracks.insert(
        "Y".to_string(),
        Track { id: "Y".to_string(), points: vec![point(30.0, 40.0, 0)] },
    );

    let summaries = provider.enrich_all(&tracks).await;
    assert_eq!(summaries.len(), 2);
    for id in ["X", "Y"] {
        let summary = &summaries[id];
        let metrics = summary.metrics.as_ref().expect("metrics");
        assert_eq!(metrics.temperature_c, Some(-51.5));
        assert_eq!(
            summary.units.as_ref().unwrap().get("wind_speed_10m").unwrap(),
            "m/s"
        );
    }
}

#[tokio::test]
async fn a_full_load_cycle_runs_as_a_spawned_task() {
    let base = spawn_stub(vec![
        route("/23.json", r#"[{"id": "X", "lat": 1.0, "lon": 2.0}]"#),
        route(
            "/forecast",
            r#"{
                "current": {"temperature_2m": 3.5, "wind_speed_10m": 1.0, "wind_direction_10m": 90},
                "current_units": {"temperature_2m": "°C", "wind_speed_10m": "m/s", "wind_direction_10m": "°"}
            }"#,
        ),
    ])
    .await;

    let weather_base = format!("{base}/forecast");
    let config = config_for(&base, &weather_base);

    // Same shape as the worker in main: both phases inside one owned task.
    let worker = tokio::spawn(async move {
        let snapshots = SnapshotProvider::new(config.clone());
        let history = snapshots.fetch_history().await;
        let weather = WeatherProvider::new(config);
        let summaries = weather.enrich_all(&history.tracks).await;
        (history, summaries)
    });

    let (history, summaries) = worker.await.expect("cycle task lost");
    assert_eq!(history.constellation.len(), 1);
    assert_eq!(history.constellation[0].id, "X");
    let metrics = summaries["X"].metrics.as_ref().expect("metrics");
    assert_eq!(metrics.temperature_c, Some(3.5));
}
