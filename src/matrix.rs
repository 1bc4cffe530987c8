//! Distance/duration matrices filled from the travel cache and a routing
//! provider.
//!
//! Pairs that neither the cache nor the provider can answer stay at zero and
//! are marked unresolved. Callers read legs through [`TravelMatrix::duration`]
//! and [`TravelMatrix::distance`], which return `None` for those pairs, so a
//! zero is never mistaken for a free leg.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::TravelCache;
use crate::model::{Measurement, Place};
use crate::traits::{CacheStore, DistanceMatrixProvider, RoutingProvider};

/// Symmetric N x N travel matrix with a resolved flag per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelMatrix {
    distances: Vec<Vec<u32>>,
    durations: Vec<Vec<u32>>,
    resolved: Vec<Vec<bool>>,
}

impl TravelMatrix {
    /// All off-diagonal pairs unresolved.
    pub fn new(n: usize) -> Self {
        let mut resolved = vec![vec![false; n]; n];
        for (i, row) in resolved.iter_mut().enumerate() {
            row[i] = true;
        }
        Self {
            distances: vec![vec![0; n]; n],
            durations: vec![vec![0; n]; n],
            resolved,
        }
    }

    /// Fully resolved matrix from explicit rows.
    pub fn from_rows(distances: Vec<Vec<u32>>, durations: Vec<Vec<u32>>) -> Self {
        let n = durations.len();
        Self {
            distances,
            durations,
            resolved: vec![vec![true; n]; n],
        }
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Sets both (i, j) and (j, i).
    pub fn set(&mut self, i: usize, j: usize, measurement: Measurement) {
        self.distances[i][j] = measurement.distance_meters;
        self.distances[j][i] = measurement.distance_meters;
        self.durations[i][j] = measurement.duration_seconds;
        self.durations[j][i] = measurement.duration_seconds;
        self.resolved[i][j] = true;
        self.resolved[j][i] = true;
    }

    pub fn duration(&self, i: usize, j: usize) -> Option<u32> {
        self.resolved[i][j].then(|| self.durations[i][j])
    }

    pub fn distance(&self, i: usize, j: usize) -> Option<u32> {
        self.resolved[i][j].then(|| self.distances[i][j])
    }

    /// Raw rows; unresolved cells read as zero.
    pub fn durations(&self) -> &[Vec<u32>] {
        &self.durations
    }

    pub fn distances(&self) -> &[Vec<u32>] {
        &self.distances
    }

    pub fn unresolved_pairs(&self) -> usize {
        let n = self.len();
        let mut count = 0;
        for i in 0..n {
            for j in i + 1..n {
                if !self.resolved[i][j] {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn is_degraded(&self) -> bool {
        self.unresolved_pairs() > 0
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MatrixOptions {
    /// Maximum number of pairs per batched provider call.
    pub batch_size: usize,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

/// Builds travel matrices: cache first, then batched provider calls, then
/// one-by-one calls for batches that failed outright.
#[derive(Debug)]
pub struct DistanceMatrixBuilder<P, S> {
    provider: P,
    cache: TravelCache<S>,
    options: MatrixOptions,
}

impl<P, S> DistanceMatrixBuilder<P, S>
where
    P: RoutingProvider,
    S: CacheStore,
{
    pub fn new(provider: P, cache: TravelCache<S>, options: MatrixOptions) -> Self {
        Self {
            provider,
            cache,
            options,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &TravelCache<S> {
        &self.cache
    }

    /// Matrix over `places` in the given order. Places sharing an address
    /// share their row.
    pub fn build(&self, places: &[Place]) -> TravelMatrix {
        let (unique, slots) = dedupe_by_address(places);
        let compact = self.build_unique(&unique);

        let mut matrix = TravelMatrix::new(places.len());
        for i in 0..places.len() {
            for j in i + 1..places.len() {
                let (a, b) = (slots[i], slots[j]);
                if a == b {
                    matrix.set(i, j, Measurement::new(0, 0));
                } else if let (Some(distance), Some(duration)) =
                    (compact.distance(a, b), compact.duration(a, b))
                {
                    matrix.set(i, j, Measurement::new(distance, duration));
                }
            }
        }
        matrix
    }

    fn build_unique(&self, places: &[Place]) -> TravelMatrix {
        let n = places.len();
        let mut matrix = TravelMatrix::new(n);
        let mut worklist = Vec::new();

        for i in 0..n {
            for j in i + 1..n {
                let (a, b) = (&places[i].address, &places[j].address);
                match self.cache.lookup(a, b).or_else(|| self.cache.lookup(b, a)) {
                    Some(measurement) => matrix.set(i, j, measurement),
                    None => worklist.push((i, j)),
                }
            }
        }

        if worklist.is_empty() {
            return matrix;
        }

        debug!(
            places = n,
            misses = worklist.len(),
            "travel cache misses, querying provider"
        );

        for batch in worklist.chunks(self.options.batch_size.max(1)) {
            self.resolve_batch(places, batch, &mut matrix);
        }

        let unresolved = matrix.unresolved_pairs();
        if unresolved > 0 {
            warn!(unresolved, places = n, "travel matrix is degraded");
        } else {
            info!(places = n, fetched = worklist.len(), "travel matrix complete");
        }

        matrix
    }

    fn resolve_batch(&self, places: &[Place], batch: &[(usize, usize)], matrix: &mut TravelMatrix) {
        let mut origin_slots: Vec<usize> = Vec::new();
        let mut destination_slots: Vec<usize> = Vec::new();
        for &(i, j) in batch {
            if !origin_slots.contains(&i) {
                origin_slots.push(i);
            }
            if !destination_slots.contains(&j) {
                destination_slots.push(j);
            }
        }

        let origins: Vec<Place> = origin_slots.iter().map(|&i| places[i].clone()).collect();
        let destinations: Vec<Place> = destination_slots
            .iter()
            .map(|&j| places[j].clone())
            .collect();

        match self.provider.distance_duration_matrix(&origins, &destinations) {
            Ok(grid) => {
                for &(i, j) in batch {
                    let row = origin_slots.iter().position(|&slot| slot == i);
                    let column = destination_slots.iter().position(|&slot| slot == j);
                    let element = row
                        .zip(column)
                        .and_then(|(row, column)| grid.get(row)?.get(column).copied());

                    match element.and_then(|element| element.resolved()) {
                        Some(measurement) => self.accept(places, i, j, measurement, matrix),
                        None => debug!(
                            origin = %places[i].address,
                            destination = %places[j].address,
                            "provider left pair unresolved"
                        ),
                    }
                }
            }
            Err(err) => {
                warn!(pairs = batch.len(), error = %err, "batched provider call failed, retrying pairs one by one");
                for &(i, j) in batch {
                    match self.provider.distance_duration(&places[i], &places[j]) {
                        Ok(measurement) => self.accept(places, i, j, measurement, matrix),
                        Err(err) => debug!(
                            origin = %places[i].address,
                            destination = %places[j].address,
                            error = %err,
                            "pair unresolved"
                        ),
                    }
                }
            }
        }
    }

    fn accept(
        &self,
        places: &[Place],
        i: usize,
        j: usize,
        measurement: Measurement,
        matrix: &mut TravelMatrix,
    ) {
        matrix.set(i, j, measurement);
        self.cache
            .store(&places[i].address, &places[j].address, measurement);
    }
}

impl<P, S> DistanceMatrixProvider for DistanceMatrixBuilder<P, S>
where
    P: RoutingProvider,
    S: CacheStore,
{
    fn matrix_for(&self, places: &[Place]) -> TravelMatrix {
        self.build(places)
    }
}

fn dedupe_by_address(places: &[Place]) -> (Vec<Place>, Vec<usize>) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut unique = Vec::new();
    let mut slots = Vec::with_capacity(places.len());
    for place in places {
        let slot = *seen.entry(place.address.as_str()).or_insert_with(|| {
            unique.push(place.clone());
            unique.len() - 1
        });
        slots.push(slot);
    }
    (unique, slots)
}
