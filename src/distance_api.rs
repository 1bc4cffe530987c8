//! HTTP adapter for a Distance Matrix style web API.
//!
//! Places are sent by address (`origins=a|b&destinations=c|d`) and the
//! response carries one status per element, so no geocoding is needed on
//! this side.

use serde::Deserialize;

use crate::error::ProviderError;
use crate::model::{ElementStatus, MatrixElement, Measurement, Place};
use crate::traits::RoutingProvider;

#[derive(Debug, Clone)]
pub struct DistanceMatrixConfig {
    pub base_url: String,
    pub api_key: String,
    /// Travel mode, e.g. "driving".
    pub mode: String,
    pub timeout_secs: u64,
}

impl Default for DistanceMatrixConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/distancematrix/json".to_string(),
            api_key: String::new(),
            mode: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistanceMatrixClient {
    config: DistanceMatrixConfig,
    client: reqwest::blocking::Client,
}

impl DistanceMatrixClient {
    pub fn new(config: DistanceMatrixConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn request(
        &self,
        origins: &[Place],
        destinations: &[Place],
    ) -> Result<DistanceMatrixResponse, ProviderError> {
        let join = |places: &[Place]| {
            places
                .iter()
                .map(|place| place.address.as_str())
                .collect::<Vec<_>>()
                .join("|")
        };

        let body = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("origins", join(origins)),
                ("destinations", join(destinations)),
                ("mode", self.config.mode.clone()),
                ("key", self.config.api_key.clone()),
            ])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<DistanceMatrixResponse>())?;

        if body.status != "OK" {
            return Err(ProviderError::Status(body.status));
        }
        if body.rows.len() != origins.len() {
            return Err(ProviderError::Malformed(format!(
                "expected {} rows, got {}",
                origins.len(),
                body.rows.len()
            )));
        }
        Ok(body)
    }
}

impl RoutingProvider for DistanceMatrixClient {
    fn distance_duration(
        &self,
        origin: &Place,
        destination: &Place,
    ) -> Result<Measurement, ProviderError> {
        let body = self.request(std::slice::from_ref(origin), std::slice::from_ref(destination))?;
        body.rows
            .first()
            .and_then(|row| row.elements.first())
            .map(Element::to_matrix_element)
            .and_then(|element| element.resolved())
            .ok_or_else(|| ProviderError::NoRoute {
                origin: origin.address.clone(),
                destination: destination.address.clone(),
            })
    }

    fn distance_duration_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
    ) -> Result<Vec<Vec<MatrixElement>>, ProviderError> {
        let body = self.request(origins, destinations)?;
        Ok(body
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<MatrixElement> =
                    row.elements.iter().map(Element::to_matrix_element).collect();
                cells.resize(
                    destinations.len(),
                    MatrixElement::unresolved(ElementStatus::Failed),
                );
                cells
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    status: String,
    distance: Option<Value>,
    duration: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Value {
    value: u32,
}

impl Element {
    fn to_matrix_element(&self) -> MatrixElement {
        let status = match self.status.as_str() {
            "OK" => ElementStatus::Ok,
            "NOT_FOUND" => ElementStatus::NotFound,
            "ZERO_RESULTS" => ElementStatus::ZeroResults,
            _ => ElementStatus::Failed,
        };

        match (status, &self.distance, &self.duration) {
            (ElementStatus::Ok, Some(distance), Some(duration)) => {
                MatrixElement::ok(Measurement::new(distance.value, duration.value))
            }
            (ElementStatus::Ok, _, _) => MatrixElement::unresolved(ElementStatus::Failed),
            (status, _, _) => MatrixElement::unresolved(status),
        }
    }
}
