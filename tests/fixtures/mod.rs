//! Test fixtures for visit-planner.
//!
//! Provides:
//! - a builder for test visits
//! - predictable matrix providers (Manhattan, uniform)
//! - a scripted routing provider that counts and can fail calls
//! - a cache store that always fails
//! - a one-shot local HTTP server for provider adapters

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, NaiveDate, Utc};

use visit_planner::cache::CacheEntry;
use visit_planner::error::{CacheError, ProviderError};
use visit_planner::matrix::TravelMatrix;
use visit_planner::model::{ElementStatus, MatrixElement, Measurement, Place};
use visit_planner::traits::{CacheStore, DistanceMatrixProvider, RoutingProvider, Visit};

// ============================================================================
// Visits
// ============================================================================

/// Builder for test visits with sensible defaults. The address defaults to
/// the id so every visit is its own location.
#[derive(Clone, Debug, PartialEq)]
pub struct TestVisit {
    pub id: String,
    pub address: String,
    pub category: String,
    pub location: Option<(f64, f64)>,
    pub mandatory: bool,
}

impl TestVisit {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            address: format!("{id} street"),
            category: "general".to_string(),
            location: None,
            mandatory: false,
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some((lat, lng));
        self
    }

    pub fn address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

impl Visit for TestVisit {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn location(&self) -> Option<(f64, f64)> {
        self.location
    }

    fn is_mandatory(&self) -> bool {
        self.mandatory
    }
}

pub fn ids(visits: &[TestVisit]) -> Vec<&str> {
    visits.iter().map(|visit| visit.id.as_str()).collect()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hours(h: u32) -> u32 {
    h * 3600
}

pub fn minutes(m: u32) -> u32 {
    m * 60
}

// ============================================================================
// Matrix providers
// ============================================================================

/// Manhattan distance over coordinates: one unit is one minute of travel
/// and one kilometer. Places without coordinates stay unresolved.
pub struct ManhattanMatrix;

impl DistanceMatrixProvider for ManhattanMatrix {
    fn matrix_for(&self, places: &[Place]) -> TravelMatrix {
        let mut matrix = TravelMatrix::new(places.len());
        for i in 0..places.len() {
            for j in i + 1..places.len() {
                if let (Some(a), Some(b)) = (places[i].coordinates, places[j].coordinates) {
                    let units = (a.0 - b.0).abs() + (a.1 - b.1).abs();
                    matrix.set(
                        i,
                        j,
                        Measurement::new((units * 1000.0).round() as u32, (units * 60.0).round() as u32),
                    );
                }
            }
        }
        matrix
    }
}

/// Every pair of distinct places is the same distance apart.
pub struct UniformMatrix {
    pub measurement: Measurement,
}

impl UniformMatrix {
    pub fn seconds(duration: u32) -> Self {
        Self {
            measurement: Measurement::new(duration * 10, duration),
        }
    }
}

impl DistanceMatrixProvider for UniformMatrix {
    fn matrix_for(&self, places: &[Place]) -> TravelMatrix {
        let mut matrix = TravelMatrix::new(places.len());
        for i in 0..places.len() {
            for j in i + 1..places.len() {
                matrix.set(i, j, self.measurement);
            }
        }
        matrix
    }
}

/// Nothing is ever resolved.
pub struct BlindMatrix;

impl DistanceMatrixProvider for BlindMatrix {
    fn matrix_for(&self, places: &[Place]) -> TravelMatrix {
        TravelMatrix::new(places.len())
    }
}

// ============================================================================
// Routing providers
// ============================================================================

/// Answers every pair with the same measurement unless told otherwise.
pub struct ScriptedProvider {
    pub measurement: Measurement,
    pub fail_batches: bool,
    /// Unordered address pairs the provider cannot route.
    pub unreachable: HashSet<(String, String)>,
    pub batch_calls: AtomicUsize,
    pub pair_calls: AtomicUsize,
    /// (origins, destinations) per batched call.
    pub batch_shapes: Mutex<Vec<(usize, usize)>>,
}

impl ScriptedProvider {
    pub fn new(measurement: Measurement) -> Self {
        Self {
            measurement,
            fail_batches: false,
            unreachable: HashSet::new(),
            batch_calls: AtomicUsize::new(0),
            pair_calls: AtomicUsize::new(0),
            batch_shapes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    pub fn unreachable(mut self, a: &str, b: &str) -> Self {
        self.unreachable.insert((a.to_string(), b.to_string()));
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn pair_calls(&self) -> usize {
        self.pair_calls.load(Ordering::SeqCst)
    }

    fn routable(&self, a: &str, b: &str) -> bool {
        !self.unreachable.contains(&(a.to_string(), b.to_string()))
            && !self.unreachable.contains(&(b.to_string(), a.to_string()))
    }
}

impl RoutingProvider for ScriptedProvider {
    fn distance_duration(
        &self,
        origin: &Place,
        destination: &Place,
    ) -> Result<Measurement, ProviderError> {
        self.pair_calls.fetch_add(1, Ordering::SeqCst);
        if self.routable(&origin.address, &destination.address) {
            Ok(self.measurement)
        } else {
            Err(ProviderError::NoRoute {
                origin: origin.address.clone(),
                destination: destination.address.clone(),
            })
        }
    }

    fn distance_duration_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
    ) -> Result<Vec<Vec<MatrixElement>>, ProviderError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.batch_shapes
            .lock()
            .unwrap()
            .push((origins.len(), destinations.len()));

        if self.fail_batches {
            return Err(ProviderError::Status("OVER_QUERY_LIMIT".to_string()));
        }

        Ok(origins
            .iter()
            .map(|origin| {
                destinations
                    .iter()
                    .map(|destination| {
                        if self.routable(&origin.address, &destination.address) {
                            MatrixElement::ok(self.measurement)
                        } else {
                            MatrixElement::unresolved(ElementStatus::ZeroResults)
                        }
                    })
                    .collect()
            })
            .collect())
    }
}

// ============================================================================
// Cache stores
// ============================================================================

/// A store whose backend is always down.
pub struct BrokenStore;

impl CacheStore for BrokenStore {
    fn fetch(&self, _origin: &str, _destination: &str) -> Result<Option<CacheEntry>, CacheError> {
        Err(CacheError::Corrupt("backend down".to_string()))
    }

    fn upsert(&self, _entry: &CacheEntry) -> Result<(), CacheError> {
        Err(CacheError::Corrupt("backend down".to_string()))
    }

    fn prune(&self, _cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        Err(CacheError::Corrupt("backend down".to_string()))
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Serves exactly one HTTP response on a random local port. The handle
/// yields the request head that was received.
pub fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let body = body.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept connection");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = stream.read(&mut buf).unwrap_or(0);
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
        }

        let response = format!(
            "HTTP/1.1 {} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        String::from_utf8_lossy(&request).into_owned()
    });

    (base_url, handle)
}
