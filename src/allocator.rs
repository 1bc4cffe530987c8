//! Multi-day allocation: greedy nearest-next packing of visits into day
//! budgets, with a 2-opt polish of each filled day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::matrix::TravelMatrix;
use crate::model::{DayRoute, RoutePlan};
use crate::route::{Legs, RouteOptions};
use crate::traits::{BudgetRule, DistanceMatrixProvider, Visit};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AllocatorOptions {
    /// Move mandatory visits to the front of the pool before packing.
    pub prioritize_mandatory: bool,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self {
            prioritize_mandatory: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Allocation<V: Visit> {
    pub plan: RoutePlan<V>,
    /// Visits that did not fit any day, in pool order.
    pub unassigned: Vec<V>,
    /// Mandatory visits among `unassigned`.
    pub infeasible: Vec<V::Id>,
    /// Some legs were unresolved and priced at the fallback cost.
    pub degraded: bool,
}

impl<V: Visit> Allocation<V> {
    pub fn is_feasible(&self) -> bool {
        self.infeasible.is_empty()
    }
}

#[derive(Debug)]
pub struct MultiDayAllocator<'a, M> {
    matrices: &'a M,
    route: RouteOptions,
    options: AllocatorOptions,
}

impl<'a, M: DistanceMatrixProvider> MultiDayAllocator<'a, M> {
    pub fn new(matrices: &'a M, route: RouteOptions, options: AllocatorOptions) -> Self {
        Self {
            matrices,
            route,
            options,
        }
    }

    /// Fills `days` in order. Each day takes the nearest remaining visit to
    /// its last one until the next would overrun the day's budget, drawing
    /// from mandatory visits first when `prioritize_mandatory` is set.
    pub fn optimize_multiday<V, B>(
        &self,
        visits: &[V],
        days: &[NaiveDate],
        service_seconds: u32,
        budgets: &B,
    ) -> Allocation<V>
    where
        V: Visit + Clone,
        B: BudgetRule,
    {
        let mut plan = RoutePlan::new(service_seconds);
        let mut pool: Vec<usize> = (0..visits.len()).collect();
        if self.options.prioritize_mandatory {
            pool.sort_by_key(|&i| !visits[i].is_mandatory());
        }

        let places: Vec<_> = visits.iter().map(Visit::place).collect();
        let matrix = if visits.len() > 1 {
            self.matrices.matrix_for(&places)
        } else {
            TravelMatrix::new(visits.len())
        };
        let legs = Legs::new(&matrix, self.route.unknown_travel_seconds);

        // Last visit placed on the previous day; seeds the next day's sweep.
        let mut anchor: Option<usize> = None;

        for &date in days {
            if pool.is_empty() {
                break;
            }

            let budget = budgets.budget_for(date);
            let mut day: Vec<usize> = Vec::new();
            let mut used = 0u32;

            // Mandatory visits are packed before any optional one is considered.
            let mut mandatory_only = self.options.prioritize_mandatory;

            loop {
                if mandatory_only && !pool.iter().any(|&i| visits[i].is_mandatory()) {
                    mandatory_only = false;
                }
                let candidates: Vec<usize> = pool
                    .iter()
                    .copied()
                    .filter(|&i| !mandatory_only || visits[i].is_mandatory())
                    .collect();

                let Some((node, cost)) =
                    Self::next_pick(&legs, &candidates, day.last().copied(), anchor, service_seconds)
                else {
                    break;
                };

                if used + cost > budget {
                    if mandatory_only {
                        mandatory_only = false;
                        continue;
                    }
                    break;
                }

                used += cost;
                pool.retain(|&i| i != node);
                day.push(node);
            }

            let Some(&last) = day.last() else {
                debug!(%date, budget, "no remaining visit fits the day");
                continue;
            };
            anchor = Some(last);

            let (order, total) = self.polish(&legs, day, used, service_seconds);
            debug!(%date, visits = order.len(), total, budget, "day filled");
            plan.put_day(
                date,
                DayRoute::computed(order.into_iter().map(|i| visits[i].clone()).collect(), total),
            );
        }

        let unassigned: Vec<V> = pool.iter().map(|&i| visits[i].clone()).collect();
        let infeasible: Vec<V::Id> = unassigned
            .iter()
            .filter(|visit| visit.is_mandatory())
            .map(|visit| visit.id().clone())
            .collect();

        if !infeasible.is_empty() {
            warn!(mandatory = infeasible.len(), "mandatory visits could not be placed");
        }
        info!(
            days = plan.dates().len(),
            assigned = plan.visit_count(),
            unassigned = unassigned.len(),
            "multi-day allocation complete"
        );

        Allocation {
            plan,
            unassigned,
            infeasible,
            degraded: matrix.is_degraded(),
        }
    }

    /// Nearest candidate to the day's last visit, or to the previous day's
    /// anchor when the day is still empty, with its incremental cost. The
    /// first visit of a day costs service only.
    fn next_pick(
        legs: &Legs<'_>,
        candidates: &[usize],
        last: Option<usize>,
        anchor: Option<usize>,
        service_seconds: u32,
    ) -> Option<(usize, u32)> {
        let first = *candidates.first()?;
        let Some(from) = last.or(anchor) else {
            return Some((first, service_seconds));
        };

        let node = candidates[legs.nearest(from, candidates)?];
        let travel = if last.is_some() { legs.travel(from, node) } else { 0 };
        Some((node, service_seconds + travel))
    }

    /// Re-runs the single-day optimizer on small days. The greedy order is
    /// kept unless the polished order is strictly shorter, so a day never
    /// grows past what the greedy fill accepted.
    fn polish(
        &self,
        legs: &Legs<'_>,
        day: Vec<usize>,
        greedy_total: u32,
        service_seconds: u32,
    ) -> (Vec<usize>, u32) {
        if day.len() < 2 || day.len() > self.route.two_opt_max_visits {
            return (day, greedy_total);
        }

        let (order, total) = legs.optimize(&day, service_seconds, &self.route);
        if total < greedy_total {
            (order, total)
        } else {
            (day, greedy_total)
        }
    }
}
