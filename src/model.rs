//! Plain value types shared across the planner.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::traits::Visit;

/// A location as the routing layer sees it.
///
/// The address is the lookup key for cache entries and address-based
/// providers. Coordinates are only needed by coordinate-based providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub coordinates: Option<(f64, f64)>,
}

impl Place {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Option<(f64, f64)>) -> Self {
        self.coordinates = coordinates;
        self
    }
}

/// Distance and duration of one directed leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub distance_meters: u32,
    pub duration_seconds: u32,
}

impl Measurement {
    pub fn new(distance_meters: u32, duration_seconds: u32) -> Self {
        Self {
            distance_meters,
            duration_seconds,
        }
    }
}

/// Per-element status reported by a batched provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementStatus {
    Ok,
    NotFound,
    ZeroResults,
    Failed,
}

/// One cell of a batched provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixElement {
    pub status: ElementStatus,
    pub measurement: Measurement,
}

impl MatrixElement {
    pub fn ok(measurement: Measurement) -> Self {
        Self {
            status: ElementStatus::Ok,
            measurement,
        }
    }

    pub fn unresolved(status: ElementStatus) -> Self {
        Self {
            status,
            measurement: Measurement::new(0, 0),
        }
    }

    pub fn resolved(&self) -> Option<Measurement> {
        (self.status == ElementStatus::Ok).then_some(self.measurement)
    }
}

/// One day's ordered visits and their total working time.
///
/// `total_seconds` is the sum of one service duration per visit plus the
/// travel between consecutive visits. It is only ever set by code that just
/// computed it for exactly this order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRoute<V> {
    visits: Vec<V>,
    total_seconds: u32,
}

impl<V> DayRoute<V> {
    pub(crate) fn computed(visits: Vec<V>, total_seconds: u32) -> Self {
        Self {
            visits,
            total_seconds,
        }
    }

    pub fn visits(&self) -> &[V] {
        &self.visits
    }

    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn into_visits(self) -> Vec<V> {
        self.visits
    }
}

/// Calendar date to ordered day route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan<V> {
    service_seconds: u32,
    days: BTreeMap<NaiveDate, DayRoute<V>>,
}

impl<V> RoutePlan<V> {
    pub fn new(service_seconds: u32) -> Self {
        Self {
            service_seconds,
            days: BTreeMap::new(),
        }
    }

    /// Service duration every total in this plan was computed with.
    pub fn service_seconds(&self) -> u32 {
        self.service_seconds
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayRoute<V>> {
        self.days.get(&date)
    }

    /// Days in calendar order.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, &DayRoute<V>)> {
        self.days.iter().map(|(date, day)| (*date, day))
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.keys().copied().collect()
    }

    pub fn day_seconds(&self, date: NaiveDate) -> u32 {
        self.days.get(&date).map_or(0, DayRoute::total_seconds)
    }

    pub fn visit_count(&self) -> usize {
        self.days.values().map(DayRoute::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub(crate) fn put_day(&mut self, date: NaiveDate, day: DayRoute<V>) {
        self.days.insert(date, day);
    }

    pub(crate) fn take_day(&mut self, date: NaiveDate) -> Option<DayRoute<V>> {
        self.days.remove(&date)
    }
}

impl<V: Visit> RoutePlan<V> {
    /// Date holding the visit with `id`, if any.
    pub fn find_visit(&self, id: &V::Id) -> Option<NaiveDate> {
        self.days
            .iter()
            .find(|(_, day)| day.visits.iter().any(|visit| visit.id() == id))
            .map(|(date, _)| *date)
    }
}

/// Plain visit record for callers without their own visit model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub coordinates: Option<(f64, f64)>,
    #[serde(default)]
    pub mandatory: bool,
}

impl VisitRecord {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            category: String::new(),
            coordinates: None,
            mandatory: false,
        }
    }
}

impl Visit for VisitRecord {
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
        self.coordinates
    }

    fn is_mandatory(&self) -> bool {
        self.mandatory
    }
}
