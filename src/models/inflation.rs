//! CPI inflation models
//!
//! Two path generators share the same output shape:
//! - AR(1): annual steps, persistence phi
//! - Ornstein-Uhlenbeck: monthly Euler-Maruyama steps with annual sampling
//!
//! Both floor the annual rate at -10% and carry a cumulative price-level
//! series used to convert nominal amounts to real terms.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigOverride, InflationParams};
use crate::rng::DeterministicRandomStream;

/// Annual inflation can never fall below -10%
const INFLATION_FLOOR: f64 = -0.10;

/// Monthly Euler step for the OU discretization
const OU_DT: f64 = 1.0 / 12.0;

/// An inflation path over the projection horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationPath {
    /// Projection years, 0-based
    pub years: Vec<u32>,
    /// Annual inflation rate per year
    pub rates: Vec<f64>,
    /// Cumulative price-level factor, (1 + rate) compounded from 1.0
    #[serde(rename = "cumulativeInflation")]
    pub cumulative: Vec<f64>,
}

/// AR(1) / OU inflation path generator
#[derive(Debug, Clone)]
pub struct InflationEngine {
    params: InflationParams,
}

impl InflationEngine {
    pub fn new(params: InflationParams) -> Self {
        Self { params }
    }

    /// Generate an AR(1) path: rate_t = mu + phi*(rate_{t-1} - mu) + sigma*g
    ///
    /// Year 0 is the long-run mean with no shock.
    pub fn generate_ar1_path(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> InflationPath {
        let mut rates = Vec::with_capacity(n_years);
        let mut rate = self.params.mu;
        rates.push(rate);

        for _ in 1..n_years {
            let shock = self.params.sigma * rng.next_gaussian();
            rate = (self.params.mu + self.params.phi * (rate - self.params.mu) + shock)
                .max(INFLATION_FLOOR);
            rates.push(rate);
        }

        debug!("AR(1) inflation path generated for {} years", n_years);
        Self::finish_path(rates)
    }

    /// Generate an OU path via monthly Euler-Maruyama steps, sampled annually
    ///
    /// Mean-reversion speed kappa = 1 - phi, so a high-persistence AR(1)
    /// parameterization maps to slow reversion.
    pub fn generate_ou_path(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> InflationPath {
        let kappa = 1.0 - self.params.phi;
        let sqrt_dt = OU_DT.sqrt();

        let mut rates = Vec::with_capacity(n_years);
        let mut level = self.params.mu;
        rates.push(level);

        for _ in 1..n_years {
            for _ in 0..12 {
                let dw = sqrt_dt * rng.next_gaussian();
                level += kappa * (self.params.mu - level) * OU_DT + self.params.sigma * dw;
                level = level.max(INFLATION_FLOOR);
            }
            rates.push(level);
        }

        debug!("OU inflation path generated for {} years", n_years);
        Self::finish_path(rates)
    }

    /// Generate the base path plus the standard stress variants
    ///
    /// Variants derive from the unmodified base parameters; each scenario
    /// draws from its own labelled stream.
    pub fn generate_stress_scenarios(
        &self,
        seed: &str,
        n_years: usize,
    ) -> BTreeMap<String, InflationPath> {
        let variants = [
            ("base", ConfigOverride::default()),
            (
                "low",
                ConfigOverride {
                    inflation_mu_shift: -0.015,
                    ..Default::default()
                },
            ),
            (
                "high",
                ConfigOverride {
                    inflation_mu_shift: 0.02,
                    ..Default::default()
                },
            ),
            (
                "volatile",
                ConfigOverride {
                    inflation_sigma_scale: 2.0,
                    ..Default::default()
                },
            ),
        ];

        variants
            .into_iter()
            .map(|(name, adjust)| {
                let params = InflationParams {
                    mu: self.params.mu + adjust.inflation_mu_shift,
                    phi: self.params.phi,
                    sigma: self.params.sigma * adjust.inflation_sigma_scale,
                };
                let mut rng =
                    DeterministicRandomStream::new(seed, &format!("inflation/{}", name));
                let path = InflationEngine::new(params).generate_ar1_path(n_years, &mut rng);
                (name.to_string(), path)
            })
            .collect()
    }

    fn finish_path(rates: Vec<f64>) -> InflationPath {
        let years = (0..rates.len() as u32).collect();
        let mut cumulative = Vec::with_capacity(rates.len());
        let mut factor = 1.0;
        for rate in &rates {
            factor *= 1.0 + rate;
            cumulative.push(factor);
        }
        InflationPath {
            years,
            rates,
            cumulative,
        }
    }
}

/// Convert a nominal return to a real return given period inflation
pub fn to_real_return(nominal: f64, inflation: f64) -> f64 {
    (1.0 + nominal) / (1.0 + inflation) - 1.0
}

/// Grow an amount by cumulative inflation to the given year
///
/// Years beyond the path clamp to the last known factor.
pub fn adjust_for_inflation(amount: f64, path: &InflationPath, year: usize) -> f64 {
    match path.cumulative.get(year).or_else(|| path.cumulative.last()) {
        Some(factor) => amount * factor,
        None => amount,
    }
}
