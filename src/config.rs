//! Model configuration for all stochastic engines
//!
//! The config is the external contract: a JSON-serializable bundle of
//! per-engine parameter groups plus validation. Stress variants never
//! mutate a base config; they are derived through `ConfigOverride::apply`,
//! which clones and adjusts.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tolerance for transition-matrix row sums
const ROW_SUM_TOL: f64 = 1e-9;

/// AR(1) / OU inflation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InflationParams {
    /// Long-run mean inflation rate
    pub mu: f64,
    /// Persistence (AR coefficient); OU mean-reversion speed is 1 - phi
    pub phi: f64,
    /// Annual shock volatility
    pub sigma: f64,
}

/// Short-rate model parameters (Hull-White / CIR)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateParams {
    /// Mean-reversion speed
    pub mean_rev: f64,
    /// Rate volatility
    pub vol: f64,
    /// Long-run rate level
    pub long_run: f64,
    /// Starting short rate
    pub r0: f64,
}

/// Gompertz-Makeham mortality parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongevityParams {
    /// Male mortality adjustment applies when true, female otherwise
    pub male: bool,
    /// Age-independent hazard component
    pub gm_a: f64,
    /// Scale of the age-dependent hazard component
    pub gm_b: f64,
    /// Exponential age slope
    pub gm_c: f64,
}

/// Regime-switching equity parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityParams {
    /// Number of market regimes
    pub regimes: usize,
    /// Row-stochastic regime transition matrix
    pub trans: Vec<Vec<f64>>,
    /// Mean annual return per regime
    pub mu: Vec<f64>,
    /// Annual volatility per regime
    pub sigma: Vec<f64>,
}

/// Private credit parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateCreditParams {
    /// Contractual yield in non-default years
    pub base_yield: f64,
    /// Annual default probability
    pub default_prob: f64,
    /// Fraction of principal recovered on default
    pub recovery: f64,
}

/// Infrastructure parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraParams {
    /// Cash yield component
    pub base_yield: f64,
    /// Return-of-capital share of the yield
    pub roc_pct: f64,
}

/// Crypto parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoParams {
    /// Annual volatility
    pub vol: f64,
    /// Correlation with the equity factor
    pub corr: f64,
}

/// Complete model configuration consumed by every engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub inflation: InflationParams,
    pub rates: RateParams,
    pub longevity: LongevityParams,
    pub equity: EquityParams,
    pub private_credit: PrivateCreditParams,
    pub infra: InfraParams,
    pub crypto: CryptoParams,
}

impl ModelConfig {
    /// In-memory default parameter set for pricing-style runs
    pub fn default_pricing() -> Self {
        Self {
            inflation: InflationParams {
                mu: 0.025,
                phi: 0.7,
                sigma: 0.012,
            },
            rates: RateParams {
                mean_rev: 0.15,
                vol: 0.012,
                long_run: 0.035,
                r0: 0.042,
            },
            longevity: LongevityParams {
                male: true,
                gm_a: 0.0002,
                gm_b: 0.000035,
                gm_c: 0.094,
            },
            equity: EquityParams {
                regimes: 3,
                trans: vec![
                    vec![0.85, 0.12, 0.03],
                    vec![0.25, 0.60, 0.15],
                    vec![0.10, 0.40, 0.50],
                ],
                mu: vec![0.09, 0.03, -0.12],
                sigma: vec![0.12, 0.17, 0.28],
            },
            private_credit: PrivateCreditParams {
                base_yield: 0.085,
                default_prob: 0.03,
                recovery: 0.55,
            },
            infra: InfraParams {
                base_yield: 0.055,
                roc_pct: 0.30,
            },
            crypto: CryptoParams {
                vol: 0.65,
                corr: 0.45,
            },
        }
    }

    /// Validate all parameter groups
    ///
    /// Configuration problems are surfaced here, before any simulation
    /// runs; engines assume a validated config.
    pub fn validate(&self) -> Result<(), EngineError> {
        let eq = &self.equity;
        if eq.regimes == 0 {
            return Err(EngineError::InvalidConfig(
                "equity.regimes must be at least 1".into(),
            ));
        }
        if eq.trans.len() != eq.regimes {
            return Err(EngineError::InvalidConfig(format!(
                "equity.trans has {} rows, expected {}",
                eq.trans.len(),
                eq.regimes
            )));
        }
        if eq.mu.len() != eq.regimes || eq.sigma.len() != eq.regimes {
            return Err(EngineError::InvalidConfig(format!(
                "equity.mu/sigma lengths ({}, {}) must equal regimes ({})",
                eq.mu.len(),
                eq.sigma.len(),
                eq.regimes
            )));
        }
        for (i, row) in eq.trans.iter().enumerate() {
            if row.len() != eq.regimes {
                return Err(EngineError::InvalidConfig(format!(
                    "equity.trans row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    eq.regimes
                )));
            }
            if row.iter().any(|&p| !(0.0..=1.0).contains(&p)) {
                return Err(EngineError::InvalidConfig(format!(
                    "equity.trans row {} has entries outside [0, 1]",
                    i
                )));
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOL {
                return Err(EngineError::InvalidConfig(format!(
                    "equity.trans row {} sums to {}, expected 1.0",
                    i, sum
                )));
            }
        }

        Self::check_unit_interval("privateCredit.defaultProb", self.private_credit.default_prob)?;
        Self::check_unit_interval("privateCredit.recovery", self.private_credit.recovery)?;
        Self::check_unit_interval("infra.rocPct", self.infra.roc_pct)?;
        Self::check_unit_interval("crypto.corr", self.crypto.corr)?;

        for (name, v) in [
            ("inflation.sigma", self.inflation.sigma),
            ("rates.vol", self.rates.vol),
            ("crypto.vol", self.crypto.vol),
        ] {
            if v < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be non-negative, got {}",
                    name, v
                )));
            }
        }

        Ok(())
    }

    fn check_unit_interval(name: &str, v: f64) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&v) {
            return Err(EngineError::InvalidConfig(format!(
                "{} must lie in [0, 1], got {}",
                name, v
            )));
        }
        Ok(())
    }
}

/// Declarative stress-variant deltas applied to a base config
///
/// The runner keeps a table of (scenario name, override) pairs; one generic
/// scenario path consumes them all. Shifts default to 0 and scales to 1, so
/// `ConfigOverride::default()` is the identity (the `base` scenario).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverride {
    /// Added to inflation mu
    pub inflation_mu_shift: f64,
    /// Multiplies inflation sigma
    pub inflation_sigma_scale: f64,
    /// Added to the rates long-run level
    pub rates_long_run_shift: f64,
    /// Multiplies rate volatility
    pub rates_vol_scale: f64,
    /// Multiplies the Gompertz-Makeham A and B components
    pub longevity_gm_scale: f64,
    /// Added to every equity regime mean
    pub equity_mu_shift: f64,
    /// Multiplies the private-credit default probability (capped at 1.0)
    pub default_prob_scale: f64,
    /// Forces the year-0 equity return to this value
    pub equity_year0_return: Option<f64>,
    /// Added to every year's equity and bond return after generation
    pub equity_bond_flat_shift: f64,
}

impl Default for ConfigOverride {
    fn default() -> Self {
        Self {
            inflation_mu_shift: 0.0,
            inflation_sigma_scale: 1.0,
            rates_long_run_shift: 0.0,
            rates_vol_scale: 1.0,
            longevity_gm_scale: 1.0,
            equity_mu_shift: 0.0,
            default_prob_scale: 1.0,
            equity_year0_return: None,
            equity_bond_flat_shift: 0.0,
        }
    }
}

impl ConfigOverride {
    /// Derive a variant config; the base is cloned, never mutated
    pub fn apply(&self, base: &ModelConfig) -> ModelConfig {
        let mut config = base.clone();
        config.inflation.mu += self.inflation_mu_shift;
        config.inflation.sigma *= self.inflation_sigma_scale;
        config.rates.long_run += self.rates_long_run_shift;
        config.rates.vol *= self.rates_vol_scale;
        config.longevity.gm_a *= self.longevity_gm_scale;
        config.longevity.gm_b *= self.longevity_gm_scale;
        for mu in &mut config.equity.mu {
            *mu += self.equity_mu_shift;
        }
        config.private_credit.default_prob =
            (config.private_credit.default_prob * self.default_prob_scale).min(1.0);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(ModelConfig::default_pricing().validate().is_ok());
    }

    #[test]
    fn test_degenerate_transition_row_rejected() {
        let mut config = ModelConfig::default_pricing();
        config.equity.trans[1] = vec![0.5, 0.3, 0.1]; // sums to 0.9

        let err = config.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_mismatched_regime_dimensions_rejected() {
        let mut config = ModelConfig::default_pricing();
        config.equity.mu = vec![0.09, 0.03];

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_probability_range_checked() {
        let mut config = ModelConfig::default_pricing();
        config.private_credit.default_prob = 1.4;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_override_does_not_mutate_base() {
        let base = ModelConfig::default_pricing();
        let base_mu = base.inflation.mu;

        let variant = ConfigOverride {
            inflation_mu_shift: 0.02,
            ..Default::default()
        }
        .apply(&base);

        assert!((base.inflation.mu - base_mu).abs() < 1e-15);
        assert!((variant.inflation.mu - (base_mu + 0.02)).abs() < 1e-12);
    }

    #[test]
    fn test_default_prob_scale_caps_at_one() {
        let mut base = ModelConfig::default_pricing();
        base.private_credit.default_prob = 0.5;

        let variant = ConfigOverride {
            default_prob_scale: 3.0,
            ..Default::default()
        }
        .apply(&base);

        assert!((variant.private_credit.default_prob - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = ModelConfig::default_pricing();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("meanRev"));
        assert!(json.contains("defaultProb"));

        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert!(back.validate().is_ok());
        assert!((back.rates.mean_rev - config.rates.mean_rev).abs() < 1e-15);
    }
}
