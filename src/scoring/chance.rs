//! Chance-constraint enforcement
//!
//! A shortfall sample is positive when the outcome fell short of its
//! target. The constraint "shortfall probability at most epsilon" holds
//! when the (1 - epsilon) quantile of the sample set is non-positive.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Result of a chance-constraint check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChanceConstraintResult {
    pub epsilon: f64,
    pub n_samples: usize,
    /// Index selected in the ascending-sorted sample set
    pub quantile_index: usize,
    /// Shortfall value at the quantile
    pub quantile_value: f64,
    /// True when the quantile is non-positive
    pub holds: bool,
}

/// Check that shortfalls occur with probability at most `epsilon`
///
/// Sorts ascending and selects index `floor((1 - epsilon) * n)`, clamped
/// into range. Rejects an empty sample set or an epsilon outside the open
/// interval (0, 1) rather than computing a meaningless quantile.
pub fn enforce_chance_constraint(
    samples: &[f64],
    epsilon: f64,
) -> Result<ChanceConstraintResult, EngineError> {
    if !(epsilon > 0.0 && epsilon < 1.0) {
        return Err(EngineError::InvalidArgument(format!(
            "epsilon must lie in (0, 1), got {}",
            epsilon
        )));
    }
    if samples.is_empty() {
        return Err(EngineError::InvalidArgument(
            "shortfall sample set is empty".into(),
        ));
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let quantile_index = (((1.0 - epsilon) * n as f64).floor() as usize).min(n - 1);
    let quantile_value = sorted[quantile_index];

    Ok(ChanceConstraintResult {
        epsilon,
        n_samples: n,
        quantile_index,
        quantile_value,
        holds: quantile_value <= 0.0,
    })
}
