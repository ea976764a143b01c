//! Outcome scoring and the probabilistic shortfall constraint

mod outcome;
mod chance;

pub use outcome::{
    effective_tax_adjusted_yield, liquidity_var, outcome_score, staking_effective_annual_yield,
    OutcomeWeights, PhaseMetrics, StakingParams, TaxRates, TaxYieldComponents,
};
pub use chance::{enforce_chance_constraint, ChanceConstraintResult};
