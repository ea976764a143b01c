//! Stochastic models: inflation, interest rates, longevity, asset returns

mod inflation;
mod rates;
mod longevity;
mod returns;

pub use inflation::{adjust_for_inflation, to_real_return, InflationEngine, InflationPath};
pub use rates::{calculate_bond_returns, RatePath, RatesEngine, YIELD_CURVE_MATURITIES};
pub use longevity::{
    joint_survival, social_security_adjustment, JointSurvival, LongevityEngine, MortalityPath,
    SurvivalPoint, SurvivalProjection, DEFAULT_MAX_AGE,
};
pub use returns::{
    calculate_portfolio_return, EquityPath, MultiAssetScenario, ReturnsEngine,
};
pub(crate) use returns::apply_path_adjustments;
