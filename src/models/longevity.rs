//! Gompertz-Makeham longevity model
//!
//! Hazard: mu(age) = (A + B e^{C age}) * gender adjustment, capped at 0.99.
//! Built on top of it:
//! - deterministic survival / life-expectancy projection to a maximum age
//! - Monte Carlo death-age paths
//! - joint (couple) survival decomposition
//! - Social-Security claiming-age benefit adjustment

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::LongevityParams;
use crate::rng::DeterministicRandomStream;

/// Default terminal age for projections
pub const DEFAULT_MAX_AGE: u32 = 120;

/// Annual mortality is capped below certainty
const MORTALITY_CAP: f64 = 0.99;

const MALE_ADJUSTMENT: f64 = 1.2;
const FEMALE_ADJUSTMENT: f64 = 0.8;

/// Benefit reduction per month of claiming before full retirement age
const EARLY_REDUCTION_PER_MONTH: f64 = 0.0055;
const MAX_EARLY_REDUCTION: f64 = 0.25;

/// Delayed-retirement credit per year past full retirement age
const DELAYED_CREDIT_PER_YEAR: f64 = 0.08;
const MAX_DELAYED_CREDIT: f64 = 0.32;

/// One age step of a survival projection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalPoint {
    pub age: u32,
    /// Annual mortality hazard at this age
    pub mortality_rate: f64,
    /// Probability of surviving from the start age to this age
    pub survival_probability: f64,
    /// Expected remaining years of life at this age
    pub life_expectancy: f64,
}

/// Survival and life-expectancy projection from a start age
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalProjection {
    pub start_age: u32,
    pub max_age: u32,
    pub points: Vec<SurvivalPoint>,
}

/// One Monte Carlo mortality path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MortalityPath {
    /// Age at death; equals the projection's max age when the path
    /// survives the whole horizon
    pub death_age: u32,
    /// Ages survived, in order
    pub survived_to_age: Vec<u32>,
}

/// Couple survival probabilities over a fixed horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JointSurvival {
    pub person1: f64,
    pub person2: f64,
    pub both_survive: f64,
    pub one_survives: f64,
    pub neither_survives: f64,
}

/// Gompertz-Makeham mortality engine
#[derive(Debug, Clone)]
pub struct LongevityEngine {
    params: LongevityParams,
}

impl LongevityEngine {
    pub fn new(params: LongevityParams) -> Self {
        Self { params }
    }

    /// Annual mortality hazard at an age
    pub fn mortality_rate(&self, age: u32) -> f64 {
        let p = &self.params;
        let adjustment = if p.male {
            MALE_ADJUSTMENT
        } else {
            FEMALE_ADJUSTMENT
        };
        let hazard = (p.gm_a + p.gm_b * (p.gm_c * age as f64).exp()) * adjustment;
        hazard.clamp(0.0, MORTALITY_CAP)
    }

    /// Project survival from `current_age` through `max_age`
    ///
    /// Survival at the start age is 1.0; each later age multiplies in the
    /// prior age's persistency. Life expectancy comes from the backward
    /// recursion e(a) = (1 - mu(a+1)) * (1 + e(a+1)).
    pub fn project_survival(&self, current_age: u32, max_age: u32) -> SurvivalProjection {
        let ages: Vec<u32> = (current_age..=max_age).collect();

        let mut survival = Vec::with_capacity(ages.len());
        let mut running = 1.0;
        survival.push(running);
        for &age in ages.iter().skip(1) {
            running *= 1.0 - self.mortality_rate(age - 1);
            survival.push(running);
        }

        let mut life_expectancy = vec![0.0; ages.len()];
        for i in (0..ages.len().saturating_sub(1)).rev() {
            let p_next = 1.0 - self.mortality_rate(ages[i] + 1);
            life_expectancy[i] = p_next * (1.0 + life_expectancy[i + 1]);
        }

        let points = ages
            .iter()
            .enumerate()
            .map(|(i, &age)| SurvivalPoint {
                age,
                mortality_rate: self.mortality_rate(age),
                survival_probability: survival[i],
                life_expectancy: life_expectancy[i],
            })
            .collect();

        debug!(
            "Survival projection from age {} to {} complete",
            current_age, max_age
        );
        SurvivalProjection {
            start_age: current_age,
            max_age,
            points,
        }
    }

    /// Simulate one death-age path
    pub fn generate_mortality_path(
        &self,
        current_age: u32,
        max_age: u32,
        rng: &mut DeterministicRandomStream,
    ) -> MortalityPath {
        let mut survived_to_age = Vec::new();

        for age in current_age..=max_age {
            if rng.next_uniform() < self.mortality_rate(age) {
                return MortalityPath {
                    death_age: age,
                    survived_to_age,
                };
            }
            survived_to_age.push(age);
        }

        MortalityPath {
            death_age: max_age,
            survived_to_age,
        }
    }

    /// Probability of surviving `years_ahead` more years from `age`
    pub fn survival_over(&self, age: u32, years_ahead: u32) -> f64 {
        (0..years_ahead)
            .map(|i| 1.0 - self.mortality_rate(age + i))
            .product()
    }

    /// Deterministic survival projections for the standard stress variants
    ///
    /// Optimistic scales the A and B hazard components down 20%,
    /// pessimistic scales them up 20%.
    pub fn generate_stress_scenarios(
        &self,
        current_age: u32,
        max_age: u32,
    ) -> BTreeMap<String, SurvivalProjection> {
        [("base", 1.0), ("optimistic", 0.8), ("pessimistic", 1.2)]
            .into_iter()
            .map(|(name, scale)| {
                let params = LongevityParams {
                    gm_a: self.params.gm_a * scale,
                    gm_b: self.params.gm_b * scale,
                    ..self.params.clone()
                };
                let projection =
                    LongevityEngine::new(params).project_survival(current_age, max_age);
                (name.to_string(), projection)
            })
            .collect()
    }
}

/// Joint survival for a couple, assuming independent mortality
pub fn joint_survival(
    person1: &LongevityEngine,
    age1: u32,
    person2: &LongevityEngine,
    age2: u32,
    years_ahead: u32,
) -> JointSurvival {
    let p1 = person1.survival_over(age1, years_ahead);
    let p2 = person2.survival_over(age2, years_ahead);
    let both = p1 * p2;
    JointSurvival {
        person1: p1,
        person2: p2,
        both_survive: both,
        one_survives: p1 + p2 - 2.0 * both,
        neither_survives: 1.0 - p1 - p2 + both,
    }
}

/// Social-Security benefit factor for a claiming age relative to FRA
///
/// Early claims reduce the benefit per month, capped at 25%; delayed claims
/// earn credits per year, capped at 32%.
pub fn social_security_adjustment(claim_age: u32, full_retirement_age: u32) -> f64 {
    if claim_age < full_retirement_age {
        let months_early = ((full_retirement_age - claim_age) * 12) as f64;
        1.0 - (months_early * EARLY_REDUCTION_PER_MONTH).min(MAX_EARLY_REDUCTION)
    } else if claim_age > full_retirement_age {
        let years_delayed = (claim_age - full_retirement_age) as f64;
        1.0 + (years_delayed * DELAYED_CREDIT_PER_YEAR).min(MAX_DELAYED_CREDIT)
    } else {
        1.0
    }
}
