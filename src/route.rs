//! Single-day route ordering: nearest-neighbor construction followed by a
//! bounded 2-opt pass.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matrix::TravelMatrix;
use crate::model::{DayRoute, RoutePlan};
use crate::traits::{DistanceMatrixProvider, Visit};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Days with more visits than this skip 2-opt.
    pub two_opt_max_visits: usize,
    /// Maximum improvement sweeps for 2-opt.
    pub two_opt_max_iterations: usize,
    /// Cost charged for a leg the matrix could not resolve.
    pub unknown_travel_seconds: u32,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            two_opt_max_visits: 10,
            two_opt_max_iterations: 100,
            unknown_travel_seconds: 1800,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteResult<V> {
    pub visits: Vec<V>,
    pub total_seconds: u32,
    /// Some legs were unresolved and priced at the fallback cost.
    pub degraded: bool,
}

/// Leg costs over a matrix, with unresolved legs charged a fixed fallback.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Legs<'m> {
    matrix: &'m TravelMatrix,
    fallback: u32,
}

impl<'m> Legs<'m> {
    pub(crate) fn new(matrix: &'m TravelMatrix, fallback: u32) -> Self {
        Self { matrix, fallback }
    }

    pub(crate) fn travel(&self, from: usize, to: usize) -> u32 {
        self.matrix.duration(from, to).unwrap_or(self.fallback)
    }

    /// Service per visit plus travel between consecutive nodes.
    pub(crate) fn route_seconds(&self, order: &[usize], service_seconds: u32) -> u32 {
        let travel: u32 = order
            .windows(2)
            .map(|pair| self.travel(pair[0], pair[1]))
            .sum();
        travel + order.len() as u32 * service_seconds
    }

    /// Position in `candidates` of the node closest to `from`. First wins ties.
    pub(crate) fn nearest(&self, from: usize, candidates: &[usize]) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (position, &node) in candidates.iter().enumerate() {
            let cost = self.travel(from, node);
            if best.is_none_or(|(_, best_cost)| cost < best_cost) {
                best = Some((position, cost));
            }
        }
        best.map(|(position, _)| position)
    }

    /// Nearest-neighbor tour over `nodes`, starting at `nodes[0]`.
    pub(crate) fn nearest_neighbor(&self, nodes: &[usize], service_seconds: u32) -> (Vec<usize>, u32) {
        let Some((&first, rest)) = nodes.split_first() else {
            return (Vec::new(), 0);
        };

        let mut remaining = rest.to_vec();
        let mut order = Vec::with_capacity(nodes.len());
        let mut total = 0;
        let mut current = first;
        order.push(first);

        while let Some(position) = self.nearest(current, &remaining) {
            let next = remaining.remove(position);
            total += service_seconds + self.travel(current, next);
            order.push(next);
            current = next;
        }
        total += service_seconds;

        (order, total)
    }

    /// First-improvement 2-opt keeping the first node fixed. Only strictly
    /// better reversals are taken.
    pub(crate) fn two_opt(
        &self,
        order: &mut [usize],
        service_seconds: u32,
        max_iterations: usize,
    ) -> u32 {
        let n = order.len();
        let mut best = self.route_seconds(order, service_seconds);
        if n < 3 {
            return best;
        }

        for iteration in 0..max_iterations {
            let mut improved = false;

            for i in 1..n - 1 {
                for j in i + 1..n {
                    order[i..=j].reverse();
                    let candidate = self.route_seconds(order, service_seconds);
                    if candidate < best {
                        best = candidate;
                        improved = true;
                    } else {
                        order[i..=j].reverse();
                    }
                }
            }

            if !improved {
                debug!(iterations = iteration + 1, total = best, "2-opt converged");
                break;
            }
        }

        best
    }

    /// Construction plus 2-opt when the route is small enough.
    pub(crate) fn optimize(
        &self,
        nodes: &[usize],
        service_seconds: u32,
        options: &RouteOptions,
    ) -> (Vec<usize>, u32) {
        let (mut order, mut total) = self.nearest_neighbor(nodes, service_seconds);
        if order.len() <= options.two_opt_max_visits {
            total = self.two_opt(&mut order, service_seconds, options.two_opt_max_iterations);
        }
        (order, total)
    }
}

/// Orders one day's visits to minimize travel.
#[derive(Debug)]
pub struct RouteOptimizer<'a, M> {
    matrices: &'a M,
    options: RouteOptions,
}

impl<'a, M: DistanceMatrixProvider> RouteOptimizer<'a, M> {
    pub fn new(matrices: &'a M, options: RouteOptions) -> Self {
        Self { matrices, options }
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    pub fn optimize_route<V>(&self, visits: &[V], service_seconds: u32) -> RouteResult<V>
    where
        V: Visit + Clone,
    {
        if visits.len() <= 1 {
            return RouteResult {
                visits: visits.to_vec(),
                total_seconds: visits.len() as u32 * service_seconds,
                degraded: false,
            };
        }

        let places: Vec<_> = visits.iter().map(Visit::place).collect();
        let matrix = self.matrices.matrix_for(&places);
        let legs = Legs::new(&matrix, self.options.unknown_travel_seconds);

        let nodes: Vec<usize> = (0..visits.len()).collect();
        let (order, total_seconds) = legs.optimize(&nodes, service_seconds, &self.options);

        debug!(
            visits = visits.len(),
            total_seconds,
            two_opt = visits.len() <= self.options.two_opt_max_visits,
            "route optimized"
        );

        RouteResult {
            visits: order.into_iter().map(|i| visits[i].clone()).collect(),
            total_seconds,
            degraded: matrix.is_degraded(),
        }
    }

    /// Total time of `visits` in the given order.
    pub fn route_seconds<V: Visit>(&self, visits: &[V], service_seconds: u32) -> u32 {
        if visits.len() <= 1 {
            return visits.len() as u32 * service_seconds;
        }
        let places: Vec<_> = visits.iter().map(Visit::place).collect();
        let matrix = self.matrices.matrix_for(&places);
        let nodes: Vec<usize> = (0..visits.len()).collect();
        Legs::new(&matrix, self.options.unknown_travel_seconds).route_seconds(&nodes, service_seconds)
    }

    /// Plan from caller-supplied day assignments, keeping each day's order
    /// and computing its total.
    pub fn build_plan<V>(
        &self,
        assignments: impl IntoIterator<Item = (NaiveDate, Vec<V>)>,
        service_seconds: u32,
    ) -> RoutePlan<V>
    where
        V: Visit,
    {
        let mut plan = RoutePlan::new(service_seconds);
        for (date, visits) in assignments {
            let total = self.route_seconds(&visits, service_seconds);
            plan.put_day(date, DayRoute::computed(visits, total));
        }
        plan
    }
}
