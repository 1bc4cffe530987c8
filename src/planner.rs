//! Planner facade: one configured entry point for every planning operation.
//!
//! The planner holds configuration and the matrix builder (provider + travel
//! cache) and nothing else. Plans are plain values owned by the caller and
//! passed into each call.

use chrono::NaiveDate;

use crate::allocator::{Allocation, MultiDayAllocator};
use crate::balance::{BalanceAnalyzer, PlanAnalysis, Suggestion};
use crate::cache::TravelCache;
use crate::calendar::WorkCalendar;
use crate::config::PlannerConfig;
use crate::error::ConfigError;
use crate::matrix::DistanceMatrixBuilder;
use crate::model::RoutePlan;
use crate::route::{RouteOptimizer, RouteResult};
use crate::scoring::{ScoreInfo, ScoringService};
use crate::traits::{CacheStore, RoutingProvider, Visit};

#[derive(Debug)]
pub struct Planner<P, S> {
    config: PlannerConfig,
    matrices: DistanceMatrixBuilder<P, S>,
}

impl<P, S> Planner<P, S>
where
    P: RoutingProvider,
    S: CacheStore,
{
    pub fn new(config: PlannerConfig, provider: P, store: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = TravelCache::new(store, &config.cache);
        let matrices = DistanceMatrixBuilder::new(provider, cache, config.matrix.clone());
        Ok(Self { config, matrices })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.config.calendar
    }

    pub fn matrices(&self) -> &DistanceMatrixBuilder<P, S> {
        &self.matrices
    }

    pub fn route_optimizer(&self) -> RouteOptimizer<'_, DistanceMatrixBuilder<P, S>> {
        RouteOptimizer::new(&self.matrices, self.config.route.clone())
    }

    pub fn allocator(&self) -> MultiDayAllocator<'_, DistanceMatrixBuilder<P, S>> {
        MultiDayAllocator::new(
            &self.matrices,
            self.config.route.clone(),
            self.config.allocator.clone(),
        )
    }

    pub fn balance_analyzer(&self) -> BalanceAnalyzer<'_, DistanceMatrixBuilder<P, S>, WorkCalendar> {
        BalanceAnalyzer::new(
            &self.matrices,
            &self.config.calendar,
            self.config.route.clone(),
            self.config.balance.clone(),
        )
    }

    pub fn scoring(&self) -> ScoringService<'_, DistanceMatrixBuilder<P, S>, WorkCalendar> {
        ScoringService::new(&self.matrices, &self.config.calendar, self.config.scoring.clone())
    }

    pub fn optimize_route<V: Visit + Clone>(&self, visits: &[V], service_seconds: u32) -> RouteResult<V> {
        self.route_optimizer().optimize_route(visits, service_seconds)
    }

    pub fn route_seconds<V: Visit>(&self, visits: &[V], service_seconds: u32) -> u32 {
        self.route_optimizer().route_seconds(visits, service_seconds)
    }

    pub fn optimize_multiday<V: Visit + Clone>(
        &self,
        visits: &[V],
        days: &[NaiveDate],
        service_seconds: u32,
    ) -> Allocation<V> {
        self.allocator()
            .optimize_multiday(visits, days, service_seconds, &self.config.calendar)
    }

    /// Plan from caller-supplied day assignments, keeping each day's order
    /// and computing its total.
    pub fn build_plan<V: Visit>(
        &self,
        assignments: impl IntoIterator<Item = (NaiveDate, Vec<V>)>,
        service_seconds: u32,
    ) -> RoutePlan<V> {
        self.route_optimizer().build_plan(assignments, service_seconds)
    }

    pub fn analyze_plan<V: Visit + Clone>(&self, plan: &RoutePlan<V>) -> PlanAnalysis<V::Id> {
        self.balance_analyzer().analyze_plan(plan)
    }

    pub fn apply_suggestion<V: Visit + Clone>(
        &self,
        plan: &mut RoutePlan<V>,
        suggestion: &Suggestion<V::Id>,
    ) -> bool {
        self.balance_analyzer().apply_suggestion(plan, suggestion)
    }

    pub fn calculate_score<V: Visit>(&self, visit: &V, date: NaiveDate, plan: &RoutePlan<V>) -> ScoreInfo {
        self.scoring().calculate_score(visit, date, plan)
    }

    pub fn sort_days_by_score<V: Visit + Sync>(
        &self,
        visit: &V,
        days: &[NaiveDate],
        plan: &RoutePlan<V>,
    ) -> Vec<(NaiveDate, ScoreInfo)> {
        self.scoring().sort_days_by_score(visit, days, plan)
    }

    pub fn get_best_day<V: Visit + Sync>(
        &self,
        visit: &V,
        days: &[NaiveDate],
        plan: &RoutePlan<V>,
    ) -> Option<(NaiveDate, ScoreInfo)> {
        self.scoring().get_best_day(visit, days, plan)
    }
}
