//! Suitability of a day for one more visit, blending spare capacity with
//! spatial proximity to the visits already on that day.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::RoutePlan;
use crate::traits::{BudgetRule, DistanceMatrixProvider, Visit};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringOptions {
    pub capacity_weight: f64,
    pub proximity_weight: f64,
    /// Proximity credited to a day with no visits yet.
    pub empty_day_proximity: f64,
    /// Proximity used when no distance to the day's visits is known.
    pub unresolved_proximity: f64,
    /// Mean distance at which proximity reaches zero.
    pub max_proximity_meters: u32,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            capacity_weight: 0.6,
            proximity_weight: 0.4,
            empty_day_proximity: 0.7,
            unresolved_proximity: 0.5,
            max_proximity_meters: 20_000,
        }
    }
}

/// Display-only ranking data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreInfo {
    /// In [0, 1]; configured weights never sum above 1.
    pub score: f64,
    pub capacity: f64,
    pub proximity: f64,
    /// Share of the day's budget already used, in percent.
    pub capacity_percent: f64,
}

#[derive(Debug)]
pub struct ScoringService<'a, M, B> {
    matrices: &'a M,
    budgets: &'a B,
    options: ScoringOptions,
}

impl<'a, M, B> ScoringService<'a, M, B>
where
    M: DistanceMatrixProvider,
    B: BudgetRule,
{
    pub fn new(matrices: &'a M, budgets: &'a B, options: ScoringOptions) -> Self {
        Self {
            matrices,
            budgets,
            options,
        }
    }

    pub fn calculate_score<V: Visit>(&self, visit: &V, date: NaiveDate, plan: &RoutePlan<V>) -> ScoreInfo {
        let budget = f64::from(self.budgets.budget_for(date));
        let used = f64::from(plan.day_seconds(date));

        let (capacity, capacity_percent) = if budget > 0.0 {
            (((budget - used) / budget).max(0.0), used / budget * 100.0)
        } else {
            (0.0, if used > 0.0 { f64::INFINITY } else { 0.0 })
        };

        let proximity = match plan.day(date).filter(|day| !day.is_empty()) {
            None => self.options.empty_day_proximity,
            Some(day) => {
                let places: Vec<_> = std::iter::once(visit)
                    .chain(day.visits())
                    .map(Visit::place)
                    .collect();
                let matrix = self.matrices.matrix_for(&places);
                let known: Vec<u32> = (1..places.len())
                    .filter_map(|j| matrix.distance(0, j))
                    .collect();

                if known.is_empty() {
                    self.options.unresolved_proximity
                } else {
                    let mean = known.iter().map(|&d| f64::from(d)).sum::<f64>() / known.len() as f64;
                    let limit = f64::from(self.options.max_proximity_meters.max(1));
                    (1.0 - mean / limit).max(0.0)
                }
            }
        };

        ScoreInfo {
            score: capacity * self.options.capacity_weight + proximity * self.options.proximity_weight,
            capacity,
            proximity,
            capacity_percent,
        }
    }

    /// Candidate days by descending score. Equal scores keep `days` order.
    pub fn sort_days_by_score<V>(
        &self,
        visit: &V,
        days: &[NaiveDate],
        plan: &RoutePlan<V>,
    ) -> Vec<(NaiveDate, ScoreInfo)>
    where
        V: Visit + Sync,
    {
        let mut scored: Vec<(NaiveDate, ScoreInfo)> = days
            .par_iter()
            .map(|&date| (date, self.calculate_score(visit, date, plan)))
            .collect();
        scored.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));
        scored
    }

    pub fn get_best_day<V>(
        &self,
        visit: &V,
        days: &[NaiveDate],
        plan: &RoutePlan<V>,
    ) -> Option<(NaiveDate, ScoreInfo)>
    where
        V: Visit + Sync,
    {
        self.sort_days_by_score(visit, days, plan).into_iter().next()
    }
}
