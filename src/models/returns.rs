//! Multi-asset return models
//!
//! Equity follows a discrete-time regime-switching Markov chain; bonds use
//! a duration approximation; private credit mixes contractual yield with
//! default losses; infrastructure is yield plus appreciation; crypto is
//! correlated with an implicit equity factor. Combined stress scenarios
//! come from a declarative variant table consumed by one generic runner.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigOverride, ModelConfig};
use crate::error::EngineError;
use crate::rng::DeterministicRandomStream;

/// Bond model: fixed income return on a constant-duration ladder
const BOND_INCOME: f64 = 0.03;
const BOND_DURATION: f64 = 5.0;
const BOND_RATE_CHANGE_VOL: f64 = 0.005;

/// Private credit non-default yield noise
const CREDIT_YIELD_VOL: f64 = 0.02;

/// Infrastructure appreciation component
const INFRA_APPRECIATION_MEAN: f64 = 0.02;
const INFRA_APPRECIATION_VOL: f64 = 0.08;

/// Crypto model: mean offset and the implicit equity-factor volatility
const CRYPTO_MEAN: f64 = 0.08;
const EQUITY_FACTOR_VOL: f64 = 0.16;

/// Equity path with its regime sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPath {
    /// Projection years, 0-based
    pub years: Vec<u32>,
    /// Annual total return per year
    pub returns: Vec<f64>,
    /// Active regime per year; regime 0 is the initial state
    pub regimes: Vec<usize>,
}

/// All asset-class return series for one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAssetScenario {
    pub years: Vec<u32>,
    pub equity: EquityPath,
    pub bonds: Vec<f64>,
    pub private_credit: Vec<f64>,
    pub infrastructure: Vec<f64>,
    pub crypto: Vec<f64>,
}

/// Multi-asset return generator
///
/// Construction validates the config (in particular the regime transition
/// matrix), so path generation never hits a degenerate cumulative walk.
#[derive(Debug, Clone)]
pub struct ReturnsEngine {
    config: ModelConfig,
}

impl ReturnsEngine {
    pub fn new(config: ModelConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Generate a regime-switching equity path
    ///
    /// Year 0 draws from regime 0 with no prior transition; each later
    /// year first walks the cumulative transition row to pick the next
    /// regime, then draws the return.
    pub fn generate_equity_path(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> EquityPath {
        let eq = &self.config.equity;
        let mut regimes = Vec::with_capacity(n_years);
        let mut returns = Vec::with_capacity(n_years);
        let mut regime = 0usize;

        for year in 0..n_years {
            if year > 0 {
                regime = Self::next_regime(&eq.trans[regime], rng.next_uniform());
            }
            regimes.push(regime);
            returns.push(eq.mu[regime] + eq.sigma[regime] * rng.next_gaussian());
        }

        EquityPath {
            years: (0..n_years as u32).collect(),
            returns,
            regimes,
        }
    }

    /// First regime whose cumulative transition probability exceeds the draw
    fn next_regime(row: &[f64], draw: f64) -> usize {
        let mut cumulative = 0.0;
        for (regime, &p) in row.iter().enumerate() {
            cumulative += p;
            if draw < cumulative {
                return regime;
            }
        }
        row.len() - 1
    }

    /// Duration-model bond returns
    pub fn generate_bond_returns(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> Vec<f64> {
        (0..n_years)
            .map(|_| {
                let rate_change = BOND_RATE_CHANGE_VOL * rng.next_gaussian();
                BOND_INCOME - BOND_DURATION * rate_change
            })
            .collect()
    }

    /// Private-credit returns with annual default risk
    pub fn generate_private_credit_returns(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> Vec<f64> {
        let pc = &self.config.private_credit;
        (0..n_years)
            .map(|_| {
                if rng.next_uniform() < pc.default_prob {
                    -(1.0 - pc.recovery)
                } else {
                    pc.base_yield + CREDIT_YIELD_VOL * rng.next_gaussian()
                }
            })
            .collect()
    }

    /// Infrastructure returns: cash yield grossed up for return of capital,
    /// plus an appreciation component
    pub fn generate_infrastructure_returns(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> Vec<f64> {
        let infra = &self.config.infra;
        (0..n_years)
            .map(|_| {
                let appreciation =
                    INFRA_APPRECIATION_MEAN + INFRA_APPRECIATION_VOL * rng.next_gaussian();
                infra.base_yield * (1.0 + infra.roc_pct) + appreciation
            })
            .collect()
    }

    /// Crypto returns correlated with an implicit equity factor
    pub fn generate_crypto_returns(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> Vec<f64> {
        let crypto = &self.config.crypto;
        let idio_weight = (1.0 - crypto.corr * crypto.corr).sqrt();
        (0..n_years)
            .map(|_| {
                let equity_factor = EQUITY_FACTOR_VOL * rng.next_gaussian();
                let crypto_factor = crypto.vol * rng.next_gaussian();
                CRYPTO_MEAN + crypto.corr * equity_factor + idio_weight * crypto_factor
            })
            .collect()
    }

    /// Generate every asset class from a single stream
    pub fn generate_multi_asset_scenario(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> MultiAssetScenario {
        let equity = self.generate_equity_path(n_years, rng);
        let bonds = self.generate_bond_returns(n_years, rng);
        let private_credit = self.generate_private_credit_returns(n_years, rng);
        let infrastructure = self.generate_infrastructure_returns(n_years, rng);
        let crypto = self.generate_crypto_returns(n_years, rng);

        debug!("Multi-asset scenario generated for {} years", n_years);
        MultiAssetScenario {
            years: (0..n_years as u32).collect(),
            equity,
            bonds,
            private_credit,
            infrastructure,
            crypto,
        }
    }

    /// Combined stress scenarios from the declarative variant table
    pub fn generate_stress_scenarios(
        &self,
        seed: &str,
        n_years: usize,
    ) -> Result<BTreeMap<String, MultiAssetScenario>, EngineError> {
        let variants = [
            ("base", ConfigOverride::default()),
            (
                "marketCrash",
                ConfigOverride {
                    equity_year0_return: Some(-0.30),
                    ..Default::default()
                },
            ),
            (
                "lowReturns",
                ConfigOverride {
                    equity_mu_shift: -0.03,
                    ..Default::default()
                },
            ),
            (
                "highInflation",
                ConfigOverride {
                    equity_bond_flat_shift: -0.02,
                    ..Default::default()
                },
            ),
            (
                "creditCrisis",
                ConfigOverride {
                    default_prob_scale: 3.0,
                    ..Default::default()
                },
            ),
        ];

        variants
            .into_iter()
            .map(|(name, adjust)| {
                let engine = ReturnsEngine::new(adjust.apply(&self.config))?;
                let mut rng = DeterministicRandomStream::new(seed, &format!("returns/{}", name));
                let mut scenario = engine.generate_multi_asset_scenario(n_years, &mut rng);
                apply_path_adjustments(&mut scenario, &adjust);

                Ok((name.to_string(), scenario))
            })
            .collect()
    }
}

/// Post-generation adjustments a stress override applies to finished paths
pub(crate) fn apply_path_adjustments(scenario: &mut MultiAssetScenario, adjust: &ConfigOverride) {
    if let Some(forced) = adjust.equity_year0_return {
        if let Some(first) = scenario.equity.returns.first_mut() {
            *first = forced;
        }
    }
    if adjust.equity_bond_flat_shift != 0.0 {
        for r in &mut scenario.equity.returns {
            *r += adjust.equity_bond_flat_shift;
        }
        for r in &mut scenario.bonds {
            *r += adjust.equity_bond_flat_shift;
        }
    }
}

/// Weighted portfolio return over matching asset keys only
///
/// Weights for assets absent from the return map contribute nothing.
pub fn calculate_portfolio_return(
    returns_by_asset: &BTreeMap<String, f64>,
    weights: &BTreeMap<String, f64>,
) -> f64 {
    weights
        .iter()
        .filter_map(|(asset, weight)| returns_by_asset.get(asset).map(|r| weight * r))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine() -> ReturnsEngine {
        ReturnsEngine::new(ModelConfig::default_pricing()).unwrap()
    }

    fn rng(label: &str) -> DeterministicRandomStream {
        DeterministicRandomStream::new("returns-test", label)
    }

    #[test]
    fn test_construction_rejects_degenerate_matrix() {
        let mut config = ModelConfig::default_pricing();
        config.equity.trans[0] = vec![0.5, 0.5, 0.5];

        assert!(matches!(
            ReturnsEngine::new(config),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_multi_asset_scenario_deterministic() {
        let engine = engine();
        let a = engine.generate_multi_asset_scenario(40, &mut rng("det"));
        let b = engine.generate_multi_asset_scenario(40, &mut rng("det"));

        assert_eq!(a.equity.regimes, b.equity.regimes);
        for (x, y) in a.crypto.iter().zip(&b.crypto) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_equity_starts_in_regime_zero() {
        let path = engine().generate_equity_path(30, &mut rng("eq"));

        assert_eq!(path.regimes[0], 0);
        assert_eq!(path.returns.len(), 30);
        assert!(path.regimes.iter().all(|&r| r < 3));
    }

    #[test]
    fn test_absorbing_regime_never_leaves() {
        let mut config = ModelConfig::default_pricing();
        config.equity.trans = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let engine = ReturnsEngine::new(config).unwrap();
        let path = engine.generate_equity_path(50, &mut rng("absorb"));

        assert!(path.regimes.iter().all(|&r| r == 0));
    }

    #[test]
    fn test_forced_transition_moves_to_regime_one() {
        let mut config = ModelConfig::default_pricing();
        config.equity.trans = vec![
            vec![0.0, 1.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 1.0, 0.0],
        ];
        let engine = ReturnsEngine::new(config).unwrap();
        let path = engine.generate_equity_path(10, &mut rng("forced"));

        assert_eq!(path.regimes[0], 0);
        assert!(path.regimes[1..].iter().all(|&r| r == 1));
    }

    #[test]
    fn test_certain_default_returns_loss_given_default() {
        let mut config = ModelConfig::default_pricing();
        config.private_credit.default_prob = 1.0;
        config.private_credit.recovery = 0.55;
        let engine = ReturnsEngine::new(config).unwrap();

        let returns = engine.generate_private_credit_returns(20, &mut rng("pc"));
        for r in returns {
            assert_relative_eq!(r, -0.45, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_market_crash_forces_year_zero() {
        let scenarios = engine().generate_stress_scenarios("seed", 30).unwrap();

        assert_relative_eq!(
            scenarios["marketCrash"].equity.returns[0],
            -0.30,
            epsilon = 1e-12
        );
        for name in ["base", "marketCrash", "lowReturns", "highInflation", "creditCrisis"] {
            assert!(scenarios.contains_key(name), "missing scenario {}", name);
            assert_eq!(scenarios[name].years.len(), 30);
        }
    }

    #[test]
    fn test_high_inflation_shifts_equity_and_bonds() {
        let engine = engine();
        let scenarios = engine.generate_stress_scenarios("seed", 25).unwrap();

        // Replay the highInflation stream without the shift; every year of
        // equity and bonds must differ by exactly -0.02.
        let mut rng = DeterministicRandomStream::new("seed", "returns/highInflation");
        let unshifted = engine.generate_multi_asset_scenario(25, &mut rng);

        let stressed = &scenarios["highInflation"];
        for (s, u) in stressed.equity.returns.iter().zip(&unshifted.equity.returns) {
            assert_relative_eq!(s - u, -0.02, epsilon = 1e-12);
        }
        for (s, u) in stressed.bonds.iter().zip(&unshifted.bonds) {
            assert_relative_eq!(s - u, -0.02, epsilon = 1e-12);
        }
        // Other asset classes are untouched
        for (s, u) in stressed.crypto.iter().zip(&unshifted.crypto) {
            assert_eq!(s.to_bits(), u.to_bits());
        }
    }

    #[test]
    fn test_low_returns_matches_shifted_config_replay() {
        let base = ModelConfig::default_pricing();
        let scenarios = ReturnsEngine::new(base.clone())
            .unwrap()
            .generate_stress_scenarios("seed", 20)
            .unwrap();

        let shifted = ConfigOverride {
            equity_mu_shift: -0.03,
            ..Default::default()
        }
        .apply(&base);
        let mut rng = DeterministicRandomStream::new("seed", "returns/lowReturns");
        let replay = ReturnsEngine::new(shifted)
            .unwrap()
            .generate_multi_asset_scenario(20, &mut rng);

        for (s, r) in scenarios["lowReturns"]
            .equity
            .returns
            .iter()
            .zip(&replay.equity.returns)
        {
            assert_eq!(s.to_bits(), r.to_bits());
        }
    }

    #[test]
    fn test_portfolio_return_matches_keys_only() {
        let returns = BTreeMap::from([
            ("equity".to_string(), 0.10),
            ("bonds".to_string(), 0.05),
        ]);
        let weights = BTreeMap::from([
            ("equity".to_string(), 0.6),
            ("bonds".to_string(), 0.4),
            ("gold".to_string(), 0.2), // no matching return series
        ]);

        assert_relative_eq!(
            calculate_portfolio_return(&returns, &weights),
            0.6 * 0.10 + 0.4 * 0.05,
            epsilon = 1e-12
        );
    }
}
