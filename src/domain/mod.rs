//! Core domain types and logic.

pub mod frequency;
pub mod panel;
pub mod series;
pub mod weights;
pub mod signal;
pub mod engine;
pub mod benchmark;
pub mod metrics;
pub mod strategy;
pub mod backtest;
pub mod config_validation;
pub mod error;
