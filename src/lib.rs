//! Stress Engine - Stochastic stress-testing engine for retirement portfolio projections
//!
//! This library provides:
//! - Deterministic, seed-keyed random streams shared by every model
//! - Inflation (AR(1), Ornstein-Uhlenbeck), short-rate (Hull-White, CIR),
//!   longevity (Gompertz-Makeham), and regime-switching multi-asset models
//! - Declarative stress-scenario fan-out with isolated per-scenario streams
//! - Policy-weighted phase outcome scoring and a shortfall chance constraint
//! - Canonically serialized, SHA-256-hashed audit receipts

pub mod config;
pub mod error;
pub mod models;
pub mod receipt;
pub mod rng;
pub mod scenario;
pub mod scoring;

// Re-export commonly used types
pub use config::{ConfigOverride, ModelConfig};
pub use error::EngineError;
pub use models::{InflationEngine, LongevityEngine, RatesEngine, ReturnsEngine};
pub use receipt::{make_outcome_receipt, Receipt, ReceiptBody};
pub use rng::DeterministicRandomStream;
pub use scenario::{RunSettings, StressTestResult, StressTestRunner};
pub use scoring::{enforce_chance_constraint, OutcomeWeights, PhaseMetrics};
