//! Planner configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allocator::AllocatorOptions;
use crate::balance::BalanceOptions;
use crate::cache::CacheOptions;
use crate::calendar::WorkCalendar;
use crate::error::ConfigError;
use crate::matrix::MatrixOptions;
use crate::route::RouteOptions;
use crate::scoring::ScoringOptions;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Time spent at every visit, in seconds.
    pub service_seconds: u32,
    pub cache: CacheOptions,
    pub matrix: MatrixOptions,
    pub route: RouteOptions,
    pub allocator: AllocatorOptions,
    pub balance: BalanceOptions,
    pub scoring: ScoringOptions,
    pub calendar: WorkCalendar,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            service_seconds: 45 * 60,
            cache: CacheOptions::default(),
            matrix: MatrixOptions::default(),
            route: RouteOptions::default(),
            allocator: AllocatorOptions::default(),
            balance: BalanceOptions::default(),
            scoring: ScoringOptions::default(),
            calendar: WorkCalendar::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matrix.batch_size == 0 {
            return Err(ConfigError::Invalid("matrix.batch_size must be positive".into()));
        }
        if self.cache.freshness_days < 0 {
            return Err(ConfigError::Invalid("cache.freshness_days must not be negative".into()));
        }
        let weights = [self.scoring.capacity_weight, self.scoring.proximity_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid("scoring weights must be non-negative".into()));
        }
        if weights.iter().sum::<f64>() > 1.0 + f64::EPSILON {
            return Err(ConfigError::Invalid("scoring weights must not sum above 1".into()));
        }
        if self.balance.underload_threshold > self.balance.overload_threshold {
            return Err(ConfigError::Invalid(
                "balance.underload_threshold exceeds overload_threshold".into(),
            ));
        }
        Ok(())
    }
}
