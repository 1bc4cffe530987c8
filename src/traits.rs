//! Core domain traits for the visit planner.
//!
//! These are the seams to the outside world: visit records come in through
//! [`Visit`], travel measurements through [`RoutingProvider`], cached rows
//! through [`CacheStore`], and day budgets through [`BudgetRule`].

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, Utc};

use crate::cache::CacheEntry;
use crate::error::{CacheError, ProviderError};
use crate::matrix::TravelMatrix;
use crate::model::{MatrixElement, Measurement, Place};

/// Unique identifier for planner entities.
pub trait Id: Clone + Eq + Hash + fmt::Display {}

impl<T> Id for T where T: Clone + Eq + Hash + fmt::Display {}

/// A visit is a single service occurrence to be placed on a day.
pub trait Visit {
    type Id: Id;

    fn id(&self) -> &Self::Id;

    /// Address text, used as the key for travel lookups.
    fn address(&self) -> &str;

    /// Team or category label.
    fn category(&self) -> &str;

    /// Location coordinates (lat, lng), if geocoded upstream.
    fn location(&self) -> Option<(f64, f64)>;

    /// Whether the visit must be planned if at all feasible.
    fn is_mandatory(&self) -> bool {
        false
    }

    fn place(&self) -> Place {
        Place::new(self.address()).with_coordinates(self.location())
    }
}

/// External service answering distance/duration questions.
pub trait RoutingProvider: Send + Sync {
    fn distance_duration(
        &self,
        origin: &Place,
        destination: &Place,
    ) -> Result<Measurement, ProviderError>;

    /// Batched lookup. `grid[i][j]` answers `origins[i]` to `destinations[j]`.
    fn distance_duration_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
    ) -> Result<Vec<Vec<MatrixElement>>, ProviderError>;
}

/// Backing store for cached travel measurements.
///
/// Implementations must tolerate concurrent readers and writers. Writes are
/// upserts keyed by (origin, destination).
pub trait CacheStore: Send + Sync {
    fn fetch(&self, origin: &str, destination: &str) -> Result<Option<CacheEntry>, CacheError>;

    fn upsert(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Delete entries stored before `cutoff`. Returns the number removed.
    fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError>;
}

/// Provides a complete travel matrix for a set of places.
///
/// The matrix is indexed by the provided place order.
pub trait DistanceMatrixProvider: Sync {
    fn matrix_for(&self, places: &[Place]) -> TravelMatrix;
}

/// Maximum working seconds for a calendar day.
pub trait BudgetRule: Sync {
    fn budget_for(&self, date: NaiveDate) -> u32;
}

impl<F> BudgetRule for F
where
    F: Fn(NaiveDate) -> u32 + Sync,
{
    fn budget_for(&self, date: NaiveDate) -> u32 {
        self(date)
    }
}
