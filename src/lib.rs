//! visit-planner core
//!
//! Assigns location-based visits to workdays and orders each day to
//! minimize travel, within per-weekday time budgets.

pub mod traits;
pub mod error;
pub mod model;
pub mod config;
pub mod calendar;
pub mod cache;
pub mod sqlite_cache;
pub mod matrix;
pub mod route;
pub mod allocator;
pub mod balance;
pub mod scoring;
pub mod planner;
pub mod distance_api;
pub mod osrm;
pub mod haversine;
