//! Residential utility management: devices, monthly consumption, supplier
//! tariffs, budgets and the cost/alert reports built from them.

pub mod api;
pub mod auth;
pub mod billing;
pub mod config;
pub mod domain;
pub mod repo;
pub mod service;
pub mod telemetry;
