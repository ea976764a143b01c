//! Policy-weighted outcome scoring
//!
//! Each projection phase gets one immutable `PhaseMetrics` record; the
//! outcome score is a signed weighted sum of its indices (drawdown counts
//! against the score, the rest count for it). The scalar yield formulas
//! used to build the tax-efficiency and liquidity indices live here too.

use serde::{Deserialize, Serialize};

/// Days-per-year convention shared by the yield formulas
const DAYS_PER_YEAR: f64 = 365.0;

/// Weights for the phase outcome score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeWeights {
    pub isp: f64,
    pub dgbp: f64,
    pub ate: f64,
    pub lci: f64,
}

impl Default for OutcomeWeights {
    fn default() -> Self {
        Self {
            isp: 0.35,
            dgbp: 0.25,
            ate: 0.15,
            lci: 0.25,
        }
    }
}

/// Scored metrics for one projection phase
///
/// Computed once after all engines run; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseMetrics {
    pub phase: String,
    /// Income-sufficiency probability index
    pub isp: f64,
    /// Drawdown/guardrail-breach index
    pub dgbp: f64,
    /// After-tax efficiency index
    pub ate: f64,
    /// Liquidity-coverage index
    pub lci: f64,
    /// Weighted outcome score
    pub os: f64,
}

impl PhaseMetrics {
    /// Build a phase record, deriving the outcome score from the weights
    pub fn new(
        phase: impl Into<String>,
        isp: f64,
        dgbp: f64,
        ate: f64,
        lci: f64,
        weights: &OutcomeWeights,
    ) -> Self {
        Self {
            phase: phase.into(),
            isp,
            dgbp,
            ate,
            lci,
            os: outcome_score(isp, dgbp, ate, lci, weights),
        }
    }
}

/// Signed weighted outcome score; drawdown is the only negative term
pub fn outcome_score(isp: f64, dgbp: f64, ate: f64, lci: f64, weights: &OutcomeWeights) -> f64 {
    weights.isp * isp - weights.dgbp * dgbp + weights.ate * ate + weights.lci * lci
}

/// Pre-tax yield components by tax treatment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxYieldComponents {
    pub interest: f64,
    pub qualified_dividends: f64,
    pub long_term_gains: f64,
    pub short_term_gains: f64,
}

/// Marginal tax rates matching `TaxYieldComponents`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRates {
    pub interest: f64,
    pub qualified_dividends: f64,
    pub long_term_gains: f64,
    pub short_term_gains: f64,
}

/// Effective tax-adjusted yield: each component net of its rate, less fees
pub fn effective_tax_adjusted_yield(
    components: &TaxYieldComponents,
    rates: &TaxRates,
    fee_drag: f64,
) -> f64 {
    components.interest * (1.0 - rates.interest)
        + components.qualified_dividends * (1.0 - rates.qualified_dividends)
        + components.long_term_gains * (1.0 - rates.long_term_gains)
        + components.short_term_gains * (1.0 - rates.short_term_gains)
        - fee_drag
}

/// Staking yield inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingParams {
    /// Gross annual staking reward rate
    pub gross_apr: f64,
    pub tax_rate: f64,
    /// Unbonding queue delay during which rewards stop accruing
    pub unbonding_days: f64,
    /// Annual probability of a slashing event
    pub slash_prob: f64,
    /// Fraction of stake lost per slashing event
    pub slash_loss: f64,
}

/// Staking effective annual yield net of tax, unbonding delay, and the
/// slashing expectation
pub fn staking_effective_annual_yield(params: &StakingParams) -> f64 {
    let delay_factor = DAYS_PER_YEAR / (DAYS_PER_YEAR + params.unbonding_days);
    params.gross_apr * (1.0 - params.tax_rate) * delay_factor
        - params.slash_prob * params.slash_loss
}

/// Liquidity value-at-risk: secondary-market haircut plus the expected
/// gated-redemption delay penalty
pub fn liquidity_var(
    haircut: f64,
    gate_prob: f64,
    gate_delay_days: f64,
    penalty_rate: f64,
) -> f64 {
    haircut + gate_prob * (gate_delay_days / DAYS_PER_YEAR) * penalty_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_outcome_score_worked_example() {
        let weights = OutcomeWeights::default();
        let os = outcome_score(1.0, 0.0, 1.0, 1.0, &weights);
        assert_relative_eq!(os, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_drawdown_reduces_score() {
        let weights = OutcomeWeights::default();
        let clean = outcome_score(0.8, 0.0, 0.5, 0.6, &weights);
        let drawn = outcome_score(0.8, 0.4, 0.5, 0.6, &weights);
        assert_relative_eq!(clean - drawn, 0.25 * 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_phase_metrics_score_derived_once() {
        let weights = OutcomeWeights::default();
        let metrics = PhaseMetrics::new("decumulation", 1.0, 0.0, 1.0, 1.0, &weights);
        assert_eq!(metrics.phase, "decumulation");
        assert_relative_eq!(metrics.os, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_effective_tax_adjusted_yield() {
        let components = TaxYieldComponents {
            interest: 0.02,
            qualified_dividends: 0.015,
            long_term_gains: 0.03,
            short_term_gains: 0.005,
        };
        let rates = TaxRates {
            interest: 0.37,
            qualified_dividends: 0.20,
            long_term_gains: 0.20,
            short_term_gains: 0.37,
        };

        let etay = effective_tax_adjusted_yield(&components, &rates, 0.0025);
        let expected = 0.02 * 0.63 + 0.015 * 0.80 + 0.03 * 0.80 + 0.005 * 0.63 - 0.0025;
        assert_relative_eq!(etay, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_staking_yield_penalizes_unbonding_and_slashing() {
        let base = StakingParams {
            gross_apr: 0.06,
            tax_rate: 0.30,
            unbonding_days: 0.0,
            slash_prob: 0.0,
            slash_loss: 0.0,
        };
        assert_relative_eq!(staking_effective_annual_yield(&base), 0.042, epsilon = 1e-12);

        let delayed = StakingParams {
            unbonding_days: 21.0,
            ..base.clone()
        };
        assert!(staking_effective_annual_yield(&delayed) < 0.042);

        let slashed = StakingParams {
            slash_prob: 0.01,
            slash_loss: 0.05,
            ..base
        };
        assert_relative_eq!(
            staking_effective_annual_yield(&slashed),
            0.042 - 0.0005,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_liquidity_var() {
        // 3% haircut, 25% gate chance, 90-day delay, 8% penalty rate
        let var = liquidity_var(0.03, 0.25, 90.0, 0.08);
        assert_relative_eq!(var, 0.03 + 0.25 * (90.0 / 365.0) * 0.08, epsilon = 1e-12);
    }
}
