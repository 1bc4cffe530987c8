//! Inspection of a finished plan: per-day load, imbalance problems, and
//! corrective suggestions that can be applied back onto the plan.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{DayRoute, RoutePlan};
use crate::route::{Legs, RouteOptimizer, RouteOptions};
use crate::traits::{BudgetRule, DistanceMatrixProvider, Visit};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalanceOptions {
    /// Load ratio above which a day is overloaded.
    pub overload_threshold: f64,
    /// Load ratio below which a non-empty day is underloaded.
    pub underload_threshold: f64,
    /// Only days below this load receive moved visits.
    pub destination_ceiling: f64,
    /// A reorder is only suggested when it saves more than this.
    pub min_reorder_saving_seconds: u32,
    pub max_suggestions: usize,
    /// Days need at least this many visits to be considered for reordering.
    pub reorder_min_visits: usize,
}

impl Default for BalanceOptions {
    fn default() -> Self {
        Self {
            overload_threshold: 1.0,
            underload_threshold: 0.5,
            destination_ceiling: 0.8,
            min_reorder_saving_seconds: 300,
            max_suggestions: 5,
            reorder_min_visits: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Overload,
    Underload,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::Overload => f.write_str("overload"),
            ProblemKind::Underload => f.write_str("underload"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub date: NaiveDate,
    pub message: String,
    /// 1 (minor) to 5 (severe).
    pub severity: u8,
}

/// Everything needed to apply a suggestion without re-deriving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestionAction<I> {
    Move {
        from: NaiveDate,
        to: NaiveDate,
        visit_id: I,
    },
    Reorder {
        date: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion<I> {
    pub message: String,
    pub benefit: String,
    pub action: SuggestionAction<I>,
}

impl<I> Suggestion<I> {
    pub fn kind(&self) -> &'static str {
        match self.action {
            SuggestionAction::Move { .. } => "move",
            SuggestionAction::Reorder { .. } => "reorder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayLoad {
    pub date: NaiveDate,
    pub total_seconds: u32,
    pub budget_seconds: u32,
    /// total / budget as a percentage.
    pub percent: f64,
}

impl DayLoad {
    fn ratio(&self) -> f64 {
        self.percent / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanAnalysis<I> {
    pub loads: Vec<DayLoad>,
    /// Sorted by descending severity.
    pub problems: Vec<Problem>,
    pub suggestions: Vec<Suggestion<I>>,
}

#[derive(Debug)]
pub struct BalanceAnalyzer<'a, M, B> {
    matrices: &'a M,
    budgets: &'a B,
    route: RouteOptions,
    options: BalanceOptions,
}

impl<'a, M, B> BalanceAnalyzer<'a, M, B>
where
    M: DistanceMatrixProvider,
    B: BudgetRule,
{
    pub fn new(matrices: &'a M, budgets: &'a B, route: RouteOptions, options: BalanceOptions) -> Self {
        Self {
            matrices,
            budgets,
            route,
            options,
        }
    }

    fn optimizer(&self) -> RouteOptimizer<'a, M> {
        RouteOptimizer::new(self.matrices, self.route.clone())
    }

    pub fn day_load<V>(&self, date: NaiveDate, day: &DayRoute<V>) -> DayLoad {
        let budget = self.budgets.budget_for(date);
        let total = day.total_seconds();
        let percent = if budget > 0 {
            f64::from(total) / f64::from(budget) * 100.0
        } else if total > 0 {
            f64::INFINITY
        } else {
            0.0
        };
        DayLoad {
            date,
            total_seconds: total,
            budget_seconds: budget,
            percent,
        }
    }

    pub fn analyze_plan<V>(&self, plan: &RoutePlan<V>) -> PlanAnalysis<V::Id>
    where
        V: Visit + Clone,
    {
        let loads: Vec<DayLoad> = plan.days().map(|(date, day)| self.day_load(date, day)).collect();

        let mut problems = Vec::new();
        for (load, (_, day)) in loads.iter().zip(plan.days()) {
            if load.ratio() > self.options.overload_threshold {
                problems.push(Problem {
                    kind: ProblemKind::Overload,
                    date: load.date,
                    message: format!(
                        "{} is at {:.0}% of its budget ({} of {} min)",
                        load.date,
                        load.percent,
                        minutes(load.total_seconds),
                        minutes(load.budget_seconds)
                    ),
                    severity: 5,
                });
            } else if !day.is_empty() && load.ratio() < self.options.underload_threshold {
                problems.push(Problem {
                    kind: ProblemKind::Underload,
                    date: load.date,
                    message: format!(
                        "{} is only at {:.0}% of its budget",
                        load.date, load.percent
                    ),
                    severity: 2,
                });
            }
        }
        problems.sort_by(|a, b| b.severity.cmp(&a.severity));

        let mut suggestions = Vec::new();
        self.suggest_moves(plan, &loads, &mut suggestions);
        self.suggest_reorders(plan, &mut suggestions);

        info!(
            days = loads.len(),
            problems = problems.len(),
            suggestions = suggestions.len(),
            "plan analyzed"
        );

        PlanAnalysis {
            loads,
            problems,
            suggestions,
        }
    }

    fn suggest_moves<V>(
        &self,
        plan: &RoutePlan<V>,
        loads: &[DayLoad],
        suggestions: &mut Vec<Suggestion<V::Id>>,
    ) where
        V: Visit + Clone,
    {
        let service = plan.service_seconds();
        let overloaded = loads
            .iter()
            .filter(|load| load.ratio() > self.options.overload_threshold);

        for origin in overloaded {
            let Some(origin_day) = plan.day(origin.date) else {
                continue;
            };

            let destinations = loads.iter().filter(|load| {
                load.date != origin.date && load.ratio() < self.options.destination_ceiling
            });

            for destination in destinations {
                if suggestions.len() >= self.options.max_suggestions {
                    return;
                }
                let Some(destination_day) = plan.day(destination.date) else {
                    continue;
                };

                // One matrix over both days: origin visits first, then destination.
                let places: Vec<_> = origin_day
                    .visits()
                    .iter()
                    .chain(destination_day.visits())
                    .map(Visit::place)
                    .collect();
                let matrix = self.matrices.matrix_for(&places);
                let legs = Legs::new(&matrix, self.route.unknown_travel_seconds);

                let origin_nodes: Vec<usize> = (0..origin_day.len()).collect();
                let destination_nodes: Vec<usize> =
                    (origin_day.len()..places.len()).collect();

                for (index, visit) in origin_day.visits().iter().enumerate() {
                    let without: Vec<usize> = origin_nodes
                        .iter()
                        .copied()
                        .filter(|&node| node != index)
                        .collect();
                    let mut with = destination_nodes.clone();
                    with.push(index);

                    let origin_after = legs.route_seconds(&without, service);
                    let destination_after = legs.route_seconds(&with, service);

                    if origin_after <= origin.budget_seconds
                        && destination_after <= destination.budget_seconds
                    {
                        debug!(visit = %visit.id(), from = %origin.date, to = %destination.date, "move candidate");
                        suggestions.push(Suggestion {
                            message: format!(
                                "Move visit {} from {} to {}",
                                visit.id(),
                                origin.date,
                                destination.date
                            ),
                            benefit: format!(
                                "{}: {} -> {} min; {}: {} -> {} min",
                                origin.date,
                                minutes(origin.total_seconds),
                                minutes(origin_after),
                                destination.date,
                                minutes(destination.total_seconds),
                                minutes(destination_after)
                            ),
                            action: SuggestionAction::Move {
                                from: origin.date,
                                to: destination.date,
                                visit_id: visit.id().clone(),
                            },
                        });
                        break;
                    }
                }
            }
        }
    }

    fn suggest_reorders<V>(&self, plan: &RoutePlan<V>, suggestions: &mut Vec<Suggestion<V::Id>>)
    where
        V: Visit + Clone,
    {
        let optimizer = self.optimizer();

        for (date, day) in plan.days() {
            if suggestions.len() >= self.options.max_suggestions {
                return;
            }
            if day.len() < self.options.reorder_min_visits {
                continue;
            }

            let result = optimizer.optimize_route(day.visits(), plan.service_seconds());
            let same_order = result
                .visits
                .iter()
                .map(Visit::id)
                .eq(day.visits().iter().map(Visit::id));
            let saving = day.total_seconds().saturating_sub(result.total_seconds);

            if !same_order
                && result.total_seconds < day.total_seconds()
                && saving > self.options.min_reorder_saving_seconds
            {
                suggestions.push(Suggestion {
                    message: format!("Reorder the visits of {date}"),
                    benefit: format!(
                        "saves {} min ({} -> {} min)",
                        minutes(saving),
                        minutes(day.total_seconds()),
                        minutes(result.total_seconds)
                    ),
                    action: SuggestionAction::Reorder { date },
                });
            }
        }
    }

    /// Applies a suggestion in place. Returns `false` and leaves the plan
    /// untouched when the referenced day or visit is no longer there.
    pub fn apply_suggestion<V>(&self, plan: &mut RoutePlan<V>, suggestion: &Suggestion<V::Id>) -> bool
    where
        V: Visit + Clone,
    {
        let service = plan.service_seconds();
        let optimizer = self.optimizer();

        match &suggestion.action {
            SuggestionAction::Move { from, to, visit_id } => {
                let position = plan
                    .day(*from)
                    .and_then(|day| day.visits().iter().position(|visit| visit.id() == visit_id));
                let Some(position) = position else {
                    debug!(visit = %visit_id, from = %from, "move target no longer in source day");
                    return false;
                };
                let Some(source) = plan.take_day(*from) else {
                    return false;
                };

                let mut source_visits = source.into_visits();
                let visit = source_visits.remove(position);
                let source_total = optimizer.route_seconds(&source_visits, service);
                plan.put_day(*from, DayRoute::computed(source_visits, source_total));

                let mut destination_visits = plan
                    .take_day(*to)
                    .map(DayRoute::into_visits)
                    .unwrap_or_default();
                destination_visits.push(visit);
                let destination_total = optimizer.route_seconds(&destination_visits, service);
                plan.put_day(*to, DayRoute::computed(destination_visits, destination_total));

                info!(visit = %visit_id, from = %from, to = %to, "move applied");
                true
            }
            SuggestionAction::Reorder { date } => {
                let Some(day) = plan.day(*date) else {
                    debug!(date = %date, "reorder target day missing");
                    return false;
                };

                let result = optimizer.optimize_route(day.visits(), service);
                plan.put_day(*date, DayRoute::computed(result.visits, result.total_seconds));
                info!(date = %date, total = result.total_seconds, "reorder applied");
                true
            }
        }
    }
}

fn minutes(seconds: u32) -> u32 {
    (seconds + 30) / 60
}
