//! Short-rate models and analytic term structures
//!
//! Hull-White (one-factor, constant parameters) and CIR paths share the
//! monthly Euler stepping / annual sampling convention. At every annual
//! point the full yield curve is rebuilt from the model's closed-form bond
//! price over a fixed maturity grid.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigOverride, RateParams};
use crate::rng::DeterministicRandomStream;

/// Short rates and curve yields never fall below 10bp
const RATE_FLOOR: f64 = 0.001;

/// Monthly Euler step
const DT: f64 = 1.0 / 12.0;

/// Maturity grid (in years) for every generated yield curve
pub const YIELD_CURVE_MATURITIES: [f64; 10] =
    [0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 20.0, 30.0];

/// A short-rate path with the term structure at each annual point
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePath {
    /// Projection years, 0-based
    pub years: Vec<u32>,
    /// Annualized short rate per year
    pub rates: Vec<f64>,
    /// Yield per maturity in `YIELD_CURVE_MATURITIES`, one row per year
    pub yield_curves: Vec<Vec<f64>>,
}

/// Hull-White / CIR short-rate path generator
#[derive(Debug, Clone)]
pub struct RatesEngine {
    params: RateParams,
}

impl RatesEngine {
    pub fn new(params: RateParams) -> Self {
        Self { params }
    }

    /// Generate a Hull-White path: dr = a(theta - r)dt + sigma dW
    pub fn generate_hull_white_path(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> RatePath {
        self.generate_path(n_years, rng, false)
    }

    /// Generate a CIR path: dr = a(theta - r)dt + sigma sqrt(r) dW
    ///
    /// The state-dependent diffusion vanishes as r approaches zero, which
    /// keeps the process non-negative before the floor even applies.
    pub fn generate_cir_path(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
    ) -> RatePath {
        self.generate_path(n_years, rng, true)
    }

    fn generate_path(
        &self,
        n_years: usize,
        rng: &mut DeterministicRandomStream,
        cir: bool,
    ) -> RatePath {
        let p = &self.params;
        let sqrt_dt = DT.sqrt();

        let mut rates = Vec::with_capacity(n_years);
        let mut rate = p.r0.max(RATE_FLOOR);
        rates.push(rate);

        for _ in 1..n_years {
            for _ in 0..12 {
                let diffusion = if cir {
                    p.vol * rate.max(0.0).sqrt()
                } else {
                    p.vol
                };
                let dr = p.mean_rev * (p.long_run - rate) * DT
                    + diffusion * sqrt_dt * rng.next_gaussian();
                rate = (rate + dr).max(RATE_FLOOR);
            }
            rates.push(rate);
        }

        let yield_curves = rates
            .iter()
            .map(|&r| {
                if cir {
                    self.cir_yield_curve(r)
                } else {
                    self.hull_white_yield_curve(r)
                }
            })
            .collect();

        debug!(
            "{} rate path generated for {} years",
            if cir { "CIR" } else { "Hull-White" },
            n_years
        );
        RatePath {
            years: (0..rates.len() as u32).collect(),
            rates,
            yield_curves,
        }
    }

    /// Hull-White analytic curve at short rate `r`
    ///
    /// B(T) = (1 - e^{-aT})/a, A(T) per the constant-parameter closed form,
    /// yield = -ln(A e^{-Br})/T.
    pub fn hull_white_yield_curve(&self, r: f64) -> Vec<f64> {
        let a = self.params.mean_rev;
        let sigma = self.params.vol;
        let theta = self.params.long_run;

        YIELD_CURVE_MATURITIES
            .iter()
            .map(|&t| {
                let b = (1.0 - (-a * t).exp()) / a;
                let ln_a = (b - t) * (a * a * theta - sigma * sigma / 2.0) / (a * a)
                    - sigma * sigma * b * b / (4.0 * a);
                let ln_price = ln_a - b * r;
                (-ln_price / t).max(RATE_FLOOR)
            })
            .collect()
    }

    /// CIR analytic curve at short rate `r`, gamma = sqrt(a^2 + 2 sigma^2)
    pub fn cir_yield_curve(&self, r: f64) -> Vec<f64> {
        let kappa = self.params.mean_rev;
        let theta = self.params.long_run;
        // Guards the A(T) exponent as sigma approaches zero
        let sigma2 = (self.params.vol * self.params.vol).max(1e-12);
        let gamma = (kappa * kappa + 2.0 * sigma2).sqrt();

        YIELD_CURVE_MATURITIES
            .iter()
            .map(|&t| {
                let e_gt = (gamma * t).exp();
                let denom = (gamma + kappa) * (e_gt - 1.0) + 2.0 * gamma;
                let b = 2.0 * (e_gt - 1.0) / denom;
                let a_base = 2.0 * gamma * ((kappa + gamma) * t / 2.0).exp() / denom;
                let ln_a = (2.0 * kappa * theta / sigma2) * a_base.ln();
                let ln_price = ln_a - b * r;
                (-ln_price / t).max(RATE_FLOOR)
            })
            .collect()
    }

    /// Generate the base Hull-White path plus the standard stress variants
    pub fn generate_stress_scenarios(
        &self,
        seed: &str,
        n_years: usize,
    ) -> BTreeMap<String, RatePath> {
        let variants = [
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
                    rates_vol_scale: 2.0,
                    ..Default::default()
                },
            ),
        ];

        variants
            .into_iter()
            .map(|(name, adjust)| {
                let params = RateParams {
                    mean_rev: self.params.mean_rev,
                    vol: self.params.vol * adjust.rates_vol_scale,
                    long_run: self.params.long_run + adjust.rates_long_run_shift,
                    r0: self.params.r0,
                };
                let mut rng = DeterministicRandomStream::new(seed, &format!("rates/{}", name));
                let path = RatesEngine::new(params).generate_hull_white_path(n_years, &mut rng);
                (name.to_string(), path)
            })
            .collect()
    }
}

/// Modified-duration approximation of a one-period bond return
pub fn calculate_bond_returns(initial_yield: f64, final_yield: f64, duration: f64) -> f64 {
    initial_yield - duration * (final_yield - initial_yield)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> RateParams {
        RateParams {
            mean_rev: 0.15,
            vol: 0.012,
            long_run: 0.035,
            r0: 0.042,
        }
    }

    fn rng(label: &str) -> DeterministicRandomStream {
        DeterministicRandomStream::new("rates-test", label)
    }

    #[test]
    fn test_hull_white_deterministic() {
        let engine = RatesEngine::new(params());
        let a = engine.generate_hull_white_path(30, &mut rng("hw"));
        let b = engine.generate_hull_white_path(30, &mut rng("hw"));

        for (x, y) in a.rates.iter().zip(&b.rates) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_path_shape_and_floor() {
        let engine = RatesEngine::new(RateParams {
            vol: 0.08, // exaggerated vol to exercise the floor
            ..params()
        });
        let path = engine.generate_hull_white_path(50, &mut rng("floor"));

        assert_eq!(path.rates.len(), 50);
        assert_eq!(path.yield_curves.len(), 50);
        assert!(path.rates.iter().all(|&r| r >= RATE_FLOOR));
        for curve in &path.yield_curves {
            assert_eq!(curve.len(), YIELD_CURVE_MATURITIES.len());
            assert!(curve.iter().all(|&y| y >= RATE_FLOOR));
        }
    }

    #[test]
    fn test_hull_white_curve_flat_at_long_run_with_zero_vol() {
        // With sigma = 0 and r = theta the closed form collapses to a flat
        // curve at theta for every maturity.
        let engine = RatesEngine::new(RateParams {
            mean_rev: 0.2,
            vol: 0.0,
            long_run: 0.04,
            r0: 0.04,
        });
        let curve = engine.hull_white_yield_curve(0.04);

        for y in curve {
            assert_relative_eq!(y, 0.04, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_cir_path_respects_floor() {
        let engine = RatesEngine::new(RateParams {
            r0: 0.002, // start near the floor
            ..params()
        });
        let path = engine.generate_cir_path(40, &mut rng("cir"));

        assert!(path.rates.iter().all(|&r| r >= RATE_FLOOR));
        for curve in &path.yield_curves {
            assert!(curve.iter().all(|&y| y.is_finite() && y >= RATE_FLOOR));
        }
    }

    #[test]
    fn test_cir_curve_reasonable_near_long_run() {
        let engine = RatesEngine::new(params());
        let curve = engine.cir_yield_curve(0.035);

        // Yields should sit in the neighborhood of the long-run level
        for y in curve {
            assert!(y > 0.01 && y < 0.08, "CIR yield out of range: {}", y);
        }
    }

    #[test]
    fn test_stress_scenarios_shift_long_run() {
        let engine = RatesEngine::new(params());
        let scenarios = engine.generate_stress_scenarios("seed", 25);

        for name in ["base", "rising", "falling", "volatile"] {
            assert!(scenarios.contains_key(name), "missing scenario {}", name);
            assert_eq!(scenarios[name].rates.len(), 25);
        }
    }

    #[test]
    fn test_stress_shift_visible_without_noise() {
        // With zero vol the variants become pure mean-reversion toward the
        // shifted long-run levels.
        let engine = RatesEngine::new(RateParams {
            vol: 0.0,
            ..params()
        });
        let scenarios = engine.generate_stress_scenarios("seed", 25);

        let last = |name: &str| *scenarios[name].rates.last().unwrap();
        assert!(last("rising") > last("base"));
        assert!(last("base") > last("falling"));
        assert!((last("rising") - 0.055).abs() < 0.005);
        assert!((last("falling") - 0.02).abs() < 0.005);
    }

    #[test]
    fn test_bond_return_duration_approximation() {
        // Yields rise 50bp: 5-year duration loses 2.5% against 4% income
        let r = calculate_bond_returns(0.04, 0.045, 5.0);
        assert_relative_eq!(r, 0.04 - 0.025, epsilon = 1e-12);

        // Unchanged yields earn the income return only
        assert_relative_eq!(calculate_bond_returns(0.04, 0.04, 5.0), 0.04, epsilon = 1e-12);
    }
}
