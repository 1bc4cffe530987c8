//! HTTP provider adapters against a local one-shot server.

mod fixtures;

use std::net::TcpListener;

use visit_planner::distance_api::{DistanceMatrixClient, DistanceMatrixConfig};
use visit_planner::error::ProviderError;
use visit_planner::haversine::HaversineProvider;
use visit_planner::model::{ElementStatus, Measurement, Place};
use visit_planner::osrm::{OsrmClient, OsrmConfig};
use visit_planner::traits::RoutingProvider;

use fixtures::serve_once;

fn matrix_client(base_url: String) -> DistanceMatrixClient {
    DistanceMatrixClient::new(DistanceMatrixConfig {
        base_url,
        api_key: "secret".to_string(),
        timeout_secs: 5,
        ..DistanceMatrixConfig::default()
    })
    .unwrap()
}

fn osrm_client(base_url: String) -> OsrmClient {
    OsrmClient::new(OsrmConfig {
        base_url,
        timeout_secs: 5,
        ..OsrmConfig::default()
    })
    .unwrap()
}

#[test]
fn test_distance_matrix_parses_grid() {
    let (base_url, server) = serve_once(
        200,
        r#"{
            "status": "OK",
            "rows": [
                {"elements": [
                    {"status": "OK", "distance": {"value": 5200}, "duration": {"value": 780}},
                    {"status": "NOT_FOUND"}
                ]}
            ]
        }"#,
    );
    let client = matrix_client(base_url);

    let grid = client
        .distance_duration_matrix(&[Place::new("Plaza Mayor")], &[Place::new("Sol"), Place::new("???")])
        .unwrap();

    assert_eq!(grid.len(), 1);
    assert_eq!(grid[0][0].resolved(), Some(Measurement::new(5200, 780)));
    assert_eq!(grid[0][1].status, ElementStatus::NotFound);

    let request = server.join().unwrap();
    assert!(request.contains("origins=Plaza"));
    assert!(request.contains("destinations=Sol"));
    assert!(request.contains("mode=driving"));
    assert!(request.contains("key=secret"));
}

#[test]
fn test_distance_matrix_short_row_is_padded() {
    let (base_url, server) = serve_once(
        200,
        r#"{"status": "OK", "rows": [{"elements": [
            {"status": "OK", "distance": {"value": 10}, "duration": {"value": 5}}
        ]}]}"#,
    );
    let client = matrix_client(base_url);

    let grid = client
        .distance_duration_matrix(&[Place::new("a")], &[Place::new("b"), Place::new("c")])
        .unwrap();
    server.join().unwrap();

    assert_eq!(grid[0].len(), 2);
    assert_eq!(grid[0][1].status, ElementStatus::Failed);
}

#[test]
fn test_distance_matrix_top_level_error() {
    let (base_url, server) = serve_once(200, r#"{"status": "REQUEST_DENIED", "rows": []}"#);
    let client = matrix_client(base_url);

    let err = client
        .distance_duration(&Place::new("a"), &Place::new("b"))
        .unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, ProviderError::Status(status) if status == "REQUEST_DENIED"));
}

#[test]
fn test_distance_matrix_single_pair_without_route() {
    let (base_url, server) = serve_once(
        200,
        r#"{"status": "OK", "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]}"#,
    );
    let client = matrix_client(base_url);

    let err = client
        .distance_duration(&Place::new("island"), &Place::new("mainland"))
        .unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, ProviderError::NoRoute { .. }));
}

#[test]
fn test_distance_matrix_http_error_status() {
    let (base_url, server) = serve_once(500, "{}");
    let client = matrix_client(base_url);

    let err = client
        .distance_duration(&Place::new("a"), &Place::new("b"))
        .unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, ProviderError::Http(_)));
}

#[test]
fn test_connection_refused_is_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = matrix_client(base_url)
        .distance_duration(&Place::new("a"), &Place::new("b"))
        .unwrap_err();
    assert!(matches!(err, ProviderError::Http(_)));
}

#[test]
fn test_osrm_table_grid() {
    let (base_url, server) = serve_once(
        200,
        r#"{
            "code": "Ok",
            "durations": [[0, 95.6], [101.2, 0]],
            "distances": [[0, 1200.2], [1300.8, 0]]
        }"#,
    );
    let client = osrm_client(base_url);
    let places = [
        Place::new("a").with_coordinates(Some((40.4168, -3.7038))),
        Place::new("b").with_coordinates(Some((40.4200, -3.7000))),
    ];

    let grid = client.distance_duration_matrix(&places, &places).unwrap();

    assert_eq!(grid[0][1].resolved(), Some(Measurement::new(1200, 96)));
    assert_eq!(grid[1][0].resolved(), Some(Measurement::new(1301, 101)));

    let request = server.join().unwrap();
    assert!(request.contains("/table/v1/car/-3.703800,40.416800;"));
    assert!(request.contains("sources=0;1"));
    assert!(request.contains("destinations=2;3"));
}

#[test]
fn test_osrm_place_without_coordinates_stays_unresolved() {
    let (base_url, server) = serve_once(
        200,
        r#"{"code": "Ok", "durations": [[0]], "distances": [[0]]}"#,
    );
    let client = osrm_client(base_url);
    let located = Place::new("a").with_coordinates(Some((40.0, -3.0)));
    let places = [located.clone(), Place::new("unknown")];

    let grid = client
        .distance_duration_matrix(&[located], &places)
        .unwrap();
    server.join().unwrap();

    assert_eq!(grid[0][0].resolved(), Some(Measurement::new(0, 0)));
    assert_eq!(grid[0][1].status, ElementStatus::NotFound);
}

#[test]
fn test_osrm_error_code() {
    let (base_url, server) = serve_once(200, r#"{"code": "InvalidQuery"}"#);
    let client = osrm_client(base_url);
    let a = Place::new("a").with_coordinates(Some((40.0, -3.0)));
    let b = Place::new("b").with_coordinates(Some((41.0, -3.0)));

    let err = client.distance_duration(&a, &b).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, ProviderError::Status(code) if code == "InvalidQuery"));
}

#[test]
fn test_haversine_grid_needs_coordinates() {
    let provider = HaversineProvider::default();
    let madrid = Place::new("Madrid").with_coordinates(Some((40.4168, -3.7038)));
    let nowhere = Place::new("nowhere");

    let grid = provider
        .distance_duration_matrix(&[madrid.clone()], &[madrid, nowhere])
        .unwrap();

    assert_eq!(grid[0][0].resolved(), Some(Measurement::new(0, 0)));
    assert!(grid[0][1].resolved().is_none());
}
