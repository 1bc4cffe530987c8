//! OSRM HTTP adapter for distance/duration lookups.
//!
//! OSRM routes between coordinates, so every place passed here must carry
//! coordinates. Places without them come back unresolved.

use serde::Deserialize;

use crate::error::ProviderError;
use crate::model::{ElementStatus, MatrixElement, Measurement, Place};
use crate::traits::RoutingProvider;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn table(
        &self,
        sources: &[(f64, f64)],
        destinations: &[(f64, f64)],
    ) -> Result<OsrmTableResponse, ProviderError> {
        let coords = sources
            .iter()
            .chain(destinations)
            .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
            .collect::<Vec<_>>()
            .join(";");
        let source_indexes = index_list(0..sources.len());
        let destination_indexes = index_list(sources.len()..sources.len() + destinations.len());

        let url = format!(
            "{}/table/v1/{}/{}?annotations=duration,distance&sources={}&destinations={}",
            self.config.base_url, self.config.profile, coords, source_indexes, destination_indexes
        );

        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmTableResponse>())?;

        if body.code != "Ok" {
            return Err(ProviderError::Status(body.code));
        }
        Ok(body)
    }
}

impl RoutingProvider for OsrmClient {
    fn distance_duration(
        &self,
        origin: &Place,
        destination: &Place,
    ) -> Result<Measurement, ProviderError> {
        let from = coordinates(origin)?;
        let to = coordinates(destination)?;
        let body = self.table(&[from], &[to])?;

        cell(&body, 0, 0).ok_or_else(|| ProviderError::NoRoute {
            origin: origin.address.clone(),
            destination: destination.address.clone(),
        })
    }

    fn distance_duration_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
    ) -> Result<Vec<Vec<MatrixElement>>, ProviderError> {
        let located = |places: &[Place]| -> Vec<(usize, (f64, f64))> {
            places
                .iter()
                .enumerate()
                .filter_map(|(i, place)| place.coordinates.map(|c| (i, c)))
                .collect()
        };
        let sources = located(origins);
        let targets = located(destinations);

        let mut grid =
            vec![vec![MatrixElement::unresolved(ElementStatus::NotFound); destinations.len()]; origins.len()];
        if sources.is_empty() || targets.is_empty() {
            return Ok(grid);
        }

        let source_coords: Vec<_> = sources.iter().map(|(_, c)| *c).collect();
        let target_coords: Vec<_> = targets.iter().map(|(_, c)| *c).collect();
        let body = self.table(&source_coords, &target_coords)?;

        for (row, (i, _)) in sources.iter().enumerate() {
            for (column, (j, _)) in targets.iter().enumerate() {
                grid[*i][*j] = match cell(&body, row, column) {
                    Some(measurement) => MatrixElement::ok(measurement),
                    None => MatrixElement::unresolved(ElementStatus::ZeroResults),
                };
            }
        }

        Ok(grid)
    }
}

fn coordinates(place: &Place) -> Result<(f64, f64), ProviderError> {
    place
        .coordinates
        .ok_or_else(|| ProviderError::MissingCoordinates(place.address.clone()))
}

fn index_list(range: std::ops::Range<usize>) -> String {
    range.map(|i| i.to_string()).collect::<Vec<_>>().join(";")
}

fn cell(body: &OsrmTableResponse, row: usize, column: usize) -> Option<Measurement> {
    let duration = body.durations.as_ref()?.get(row)?.get(column).copied().flatten()?;
    let distance = body.distances.as_ref()?.get(row)?.get(column).copied().flatten()?;
    Some(Measurement::new(distance.round() as u32, duration.round() as u32))
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}
