//! Stress-test runner
//!
//! Fans a validated config out over the declarative scenario table, runs
//! every engine per scenario on isolated streams, scores phase metrics,
//! checks the shortfall chance constraint, and closes the run with an
//! audit receipt. Scenarios are independent pure functions of
//! (config, seed, name), so the rayon fan-out and a sequential loop
//! produce identical results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{ConfigOverride, ModelConfig};
use crate::error::EngineError;
use crate::models::{
    apply_path_adjustments, calculate_portfolio_return, to_real_return, InflationEngine,
    InflationPath, LongevityEngine, MultiAssetScenario, RatePath, RatesEngine, ReturnsEngine,
    SurvivalProjection, DEFAULT_MAX_AGE,
};
use crate::receipt::{canonical_hash, make_outcome_receipt, Receipt, ReceiptBody};
use crate::rng::DeterministicRandomStream;
use crate::scoring::{
    effective_tax_adjusted_yield, enforce_chance_constraint, liquidity_var,
    ChanceConstraintResult, OutcomeWeights, PhaseMetrics, TaxRates, TaxYieldComponents,
};

/// Share of equity return treated as qualified dividends for tax scoring
const DIVIDEND_SHARE: f64 = 0.4;

/// Phase names in projection order
const PHASES: [&str; 3] = ["accumulation", "transition", "decumulation"];

/// Secondary-market liquidity assumptions for the liquidity index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquiditySettings {
    pub haircut: f64,
    pub gate_prob: f64,
    pub gate_delay_days: f64,
    pub penalty_rate: f64,
}

impl Default for LiquiditySettings {
    fn default() -> Self {
        Self {
            haircut: 0.03,
            gate_prob: 0.15,
            gate_delay_days: 60.0,
            penalty_rate: 0.08,
        }
    }
}

/// Configuration for a stress-test run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    /// Projection horizon in years
    pub n_years: usize,
    /// Attained age at the start of the projection
    pub current_age: u32,
    /// Maximum tolerated shortfall probability
    pub epsilon: f64,
    /// Monte Carlo replicas feeding the chance constraint
    pub n_shortfall_samples: usize,
    /// Outcome-score weights
    pub weights: OutcomeWeights,
    /// Portfolio weights by asset key
    pub portfolio_weights: BTreeMap<String, f64>,
    /// Cumulative real-growth target a replica must reach to avoid shortfall
    pub real_growth_target: f64,
    /// Marginal tax rates for the after-tax efficiency index
    pub tax_rates: TaxRates,
    /// Annual fee drag on the tax-adjusted yield
    pub fee_drag: f64,
    pub liquidity: LiquiditySettings,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            n_years: 40,
            current_age: 65,
            epsilon: 0.05,
            n_shortfall_samples: 200,
            weights: OutcomeWeights::default(),
            portfolio_weights: BTreeMap::from([
                ("equity".to_string(), 0.45),
                ("bonds".to_string(), 0.30),
                ("privateCredit".to_string(), 0.10),
                ("infrastructure".to_string(), 0.10),
                ("crypto".to_string(), 0.05),
            ]),
            real_growth_target: 1.0,
            tax_rates: TaxRates {
                interest: 0.32,
                qualified_dividends: 0.15,
                long_term_gains: 0.15,
                short_term_gains: 0.32,
            },
            fee_drag: 0.0025,
            liquidity: LiquiditySettings::default(),
        }
    }
}

/// All engine outputs for one named scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioBundle {
    pub name: String,
    pub inflation: InflationPath,
    pub rates: RatePath,
    pub survival: SurvivalProjection,
    pub assets: MultiAssetScenario,
}

/// Complete output of a stress-test run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressTestResult {
    pub scenarios: BTreeMap<String, ScenarioBundle>,
    pub phase_metrics: Vec<PhaseMetrics>,
    pub shortfall: ChanceConstraintResult,
    pub receipt: Receipt,
}

impl StressTestResult {
    /// Condensed view for logs and CLI output
    pub fn summary(&self) -> RunSummary {
        let mean_os = if self.phase_metrics.is_empty() {
            0.0
        } else {
            self.phase_metrics.iter().map(|m| m.os).sum::<f64>()
                / self.phase_metrics.len() as f64
        };
        RunSummary {
            n_scenarios: self.scenarios.len(),
            mean_outcome_score: mean_os,
            constraint_holds: self.shortfall.holds,
            receipt_hash: self.receipt.hash.clone(),
        }
    }
}

/// Summary statistics for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub n_scenarios: usize,
    pub mean_outcome_score: f64,
    pub constraint_holds: bool,
    pub receipt_hash: String,
}

/// Pre-validated stress-test runner
///
/// Holds the immutable base config; every stress variant derives from it
/// through the scenario table, never by mutation.
#[derive(Debug, Clone)]
pub struct StressTestRunner {
    config: ModelConfig,
    seed: String,
    settings: RunSettings,
}

impl StressTestRunner {
    /// Create a runner, validating config and settings up front
    pub fn new(
        config: ModelConfig,
        seed: impl Into<String>,
        settings: RunSettings,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if settings.n_years == 0 {
            return Err(EngineError::InvalidArgument(
                "projection horizon must be at least 1 year".into(),
            ));
        }
        if !(settings.epsilon > 0.0 && settings.epsilon < 1.0) {
            return Err(EngineError::InvalidArgument(format!(
                "epsilon must lie in (0, 1), got {}",
                settings.epsilon
            )));
        }
        if settings.n_shortfall_samples == 0 {
            return Err(EngineError::InvalidArgument(
                "at least one shortfall sample is required".into(),
            ));
        }
        Ok(Self {
            config,
            seed: seed.into(),
            settings,
        })
    }

    /// The declarative scenario table: (name, override) pairs
    ///
    /// `base` is always present and always the unmodified config.
    fn scenario_table() -> Vec<(&'static str, ConfigOverride)> {
        vec![
            ("base", ConfigOverride::default()),
            (
                "rising",
                ConfigOverride {
                    rates_long_run_shift: 0.02,
                    ..Default::default()
                },
            ),
            (
                "falling",
                ConfigOverride {
                    rates_long_run_shift: -0.015,
                    ..Default::default()
                },
            ),
            (
                "volatile",
                ConfigOverride {
                    inflation_sigma_scale: 2.0,
                    rates_vol_scale: 2.0,
                    ..Default::default()
                },
            ),
            (
                "marketCrash",
                ConfigOverride {
                    equity_year0_return: Some(-0.30),
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
        ]
    }

    /// Run the full stress test with empty audit trade data
    pub fn run(&self, timestamp: DateTime<Utc>) -> Result<StressTestResult, EngineError> {
        self.run_with_audit_data(json!([]), json!([]), timestamp)
    }

    /// Run the full stress test, embedding caller-supplied trades and
    /// tax-lot deltas in the receipt
    pub fn run_with_audit_data(
        &self,
        trades: Value,
        lot_deltas: Value,
        timestamp: DateTime<Utc>,
    ) -> Result<StressTestResult, EngineError> {
        let scenarios: BTreeMap<String, ScenarioBundle> = Self::scenario_table()
            .into_par_iter()
            .map(|(name, adjust)| {
                let bundle = self.run_scenario(name, &adjust)?;
                Ok((name.to_string(), bundle))
            })
            .collect::<Result<_, EngineError>>()?;

        let base = &scenarios["base"];
        let phase_metrics = self.compute_phase_metrics(base);
        let shortfall_samples = self.shortfall_samples()?;
        let shortfall = enforce_chance_constraint(&shortfall_samples, self.settings.epsilon)?;

        let regime_state = base.assets.equity.regimes.last().copied().unwrap_or(0) as u32;
        let policy_hash = canonical_hash(&json!({
            "weights": self.settings.weights,
            "epsilon": self.settings.epsilon,
        }))?;
        let model_hash = canonical_hash(&serde_json::to_value(&self.config)?)?;

        let receipt = make_outcome_receipt(ReceiptBody {
            policy_hash,
            model_hash,
            regime_state,
            phase_metrics: phase_metrics.clone(),
            trades,
            lot_deltas,
            seed: self.seed.clone(),
            timestamp,
        })?;

        info!(
            "Stress test complete: {} scenarios, constraint holds = {}",
            scenarios.len(),
            shortfall.holds
        );
        Ok(StressTestResult {
            scenarios,
            phase_metrics,
            shortfall,
            receipt,
        })
    }

    /// Run every engine for one scenario on isolated labelled streams
    fn run_scenario(
        &self,
        name: &str,
        adjust: &ConfigOverride,
    ) -> Result<ScenarioBundle, EngineError> {
        let config = adjust.apply(&self.config);

        let mut inflation_rng =
            DeterministicRandomStream::new(&self.seed, &format!("inflation/{}", name));
        let inflation = InflationEngine::new(config.inflation.clone())
            .generate_ar1_path(self.settings.n_years, &mut inflation_rng);

        let mut rates_rng = DeterministicRandomStream::new(&self.seed, &format!("rates/{}", name));
        let rates = RatesEngine::new(config.rates.clone())
            .generate_hull_white_path(self.settings.n_years, &mut rates_rng);

        let survival = LongevityEngine::new(config.longevity.clone())
            .project_survival(self.settings.current_age, DEFAULT_MAX_AGE);

        let mut returns_rng =
            DeterministicRandomStream::new(&self.seed, &format!("returns/{}", name));
        let mut assets = ReturnsEngine::new(config)?
            .generate_multi_asset_scenario(self.settings.n_years, &mut returns_rng);
        apply_path_adjustments(&mut assets, adjust);

        info!("Scenario `{}` generated", name);
        Ok(ScenarioBundle {
            name: name.to_string(),
            inflation,
            rates,
            survival,
            assets,
        })
    }

    /// Score the base scenario's phases
    ///
    /// The horizon splits into thirds; short horizons simply drop the
    /// phases that receive no years.
    fn compute_phase_metrics(&self, base: &ScenarioBundle) -> Vec<PhaseMetrics> {
        let n = self.settings.n_years;
        let bounds = [(0, n / 3), (n / 3, 2 * n / 3), (2 * n / 3, n)];

        PHASES
            .iter()
            .zip(bounds)
            .filter(|(_, (start, end))| end > start)
            .map(|(phase, (start, end))| self.score_phase(phase, base, start, end))
            .collect()
    }

    fn score_phase(
        &self,
        phase: &str,
        base: &ScenarioBundle,
        start: usize,
        end: usize,
    ) -> PhaseMetrics {
        let real_returns: Vec<f64> = (start..end)
            .map(|t| {
                let nominal = self.portfolio_return_at(&base.assets, t);
                to_real_return(nominal, base.inflation.rates[t])
            })
            .collect();

        let n = real_returns.len() as f64;
        let isp = real_returns.iter().filter(|&&r| r >= 0.0).count() as f64 / n;

        // Max drawdown of the phase's cumulative real growth
        let mut growth = 1.0_f64;
        let mut peak = 1.0_f64;
        let mut dgbp = 0.0_f64;
        for r in &real_returns {
            growth *= 1.0 + r;
            peak = peak.max(growth);
            dgbp = dgbp.max((peak - growth) / peak);
        }

        let ate = self.after_tax_efficiency(base, start, end);

        let liq = &self.settings.liquidity;
        let lci = (1.0
            - liquidity_var(
                liq.haircut,
                liq.gate_prob,
                liq.gate_delay_days,
                liq.penalty_rate,
            ))
        .clamp(0.0, 1.0);

        PhaseMetrics::new(phase, isp, dgbp, ate, lci, &self.settings.weights)
    }

    /// After-tax efficiency: tax-adjusted yield relative to the gross
    /// yield of the phase's mean asset returns
    fn after_tax_efficiency(&self, base: &ScenarioBundle, start: usize, end: usize) -> f64 {
        let mean = |series: &[f64]| -> f64 {
            series[start..end].iter().sum::<f64>() / (end - start) as f64
        };

        let equity_yield = mean(&base.assets.equity.returns).max(0.0);
        let components = TaxYieldComponents {
            interest: mean(&base.assets.bonds).max(0.0),
            qualified_dividends: DIVIDEND_SHARE * equity_yield,
            long_term_gains: (1.0 - DIVIDEND_SHARE) * equity_yield,
            short_term_gains: mean(&base.assets.crypto).max(0.0),
        };
        let gross = components.interest
            + components.qualified_dividends
            + components.long_term_gains
            + components.short_term_gains;
        if gross <= 0.0 {
            return 0.0;
        }

        let etay = effective_tax_adjusted_yield(
            &components,
            &self.settings.tax_rates,
            self.settings.fee_drag,
        );
        (etay / gross).clamp(0.0, 1.0)
    }

    fn portfolio_return_at(&self, assets: &MultiAssetScenario, t: usize) -> f64 {
        let returns = BTreeMap::from([
            ("equity".to_string(), assets.equity.returns[t]),
            ("bonds".to_string(), assets.bonds[t]),
            ("privateCredit".to_string(), assets.private_credit[t]),
            ("infrastructure".to_string(), assets.infrastructure[t]),
            ("crypto".to_string(), assets.crypto[t]),
        ]);
        calculate_portfolio_return(&returns, &self.settings.portfolio_weights)
    }

    /// One shortfall sample per labelled replica stream
    ///
    /// A replica compounds the real portfolio return over the horizon;
    /// the sample is target minus terminal growth, so positive means
    /// shortfall.
    fn shortfall_samples(&self) -> Result<Vec<f64>, EngineError> {
        let engine = ReturnsEngine::new(self.config.clone())?;
        let inflation_engine = InflationEngine::new(self.config.inflation.clone());

        Ok((0..self.settings.n_shortfall_samples)
            .into_par_iter()
            .map(|i| {
                let mut rng =
                    DeterministicRandomStream::new(&self.seed, &format!("shortfall/{}", i));
                let inflation =
                    inflation_engine.generate_ar1_path(self.settings.n_years, &mut rng);
                let assets = engine.generate_multi_asset_scenario(self.settings.n_years, &mut rng);

                let mut growth = 1.0;
                for t in 0..self.settings.n_years {
                    let nominal = self.portfolio_return_at(&assets, t);
                    growth *= 1.0 + to_real_return(nominal, inflation.rates[t]);
                }
                self.settings.real_growth_target - growth
            })
            .collect())
    }
}
