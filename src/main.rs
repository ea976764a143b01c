//! Stress Engine CLI
//!
//! Demo binary: runs the full stress test on the default parameter set and
//! prints scenario results, phase scores, and the audit receipt.

use anyhow::Result;
use chrono::Utc;
use std::time::Instant;
use stress_engine::{ModelConfig, RunSettings, StressTestRunner};

fn main() -> Result<()> {
    env_logger::init();

    println!("Stress Engine v0.1.0");
    println!("====================\n");

    let config = ModelConfig::default_pricing();
    let settings = RunSettings::default();
    let seed = "demo-run-2026";

    println!("Run configuration:");
    println!("  Seed: {}", seed);
    println!("  Horizon: {} years", settings.n_years);
    println!("  Current age: {}", settings.current_age);
    println!("  Shortfall epsilon: {:.3}", settings.epsilon);
    println!("  Shortfall samples: {}", settings.n_shortfall_samples);
    println!();

    let start = Instant::now();
    let runner = StressTestRunner::new(config, seed, settings)?;
    let result = runner.run(Utc::now())?;
    println!("Run complete in {:?}\n", start.elapsed());

    // Per-scenario terminal values
    println!("Scenarios:");
    println!(
        "{:>14} {:>10} {:>10} {:>10} {:>12}",
        "Name", "Infl[0]", "Rate[0]", "FinalRate", "EqMean"
    );
    println!("{}", "-".repeat(60));
    for (name, bundle) in &result.scenarios {
        let eq_mean: f64 = bundle.assets.equity.returns.iter().sum::<f64>()
            / bundle.assets.equity.returns.len() as f64;
        println!(
            "{:>14} {:>10.4} {:>10.4} {:>10.4} {:>12.4}",
            name,
            bundle.inflation.rates[0],
            bundle.rates.rates[0],
            bundle.rates.rates.last().copied().unwrap_or(0.0),
            eq_mean,
        );
    }

    // Phase scores
    println!("\nPhase metrics:");
    println!(
        "{:>14} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Phase", "ISP", "DGBP", "ATE", "LCI", "OS"
    );
    println!("{}", "-".repeat(60));
    for m in &result.phase_metrics {
        println!(
            "{:>14} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
            m.phase, m.isp, m.dgbp, m.ate, m.lci, m.os
        );
    }

    // Constraint and receipt
    println!("\nChance constraint:");
    println!(
        "  P(shortfall) <= {:.3}: {} (quantile {:.4} at index {}/{})",
        result.shortfall.epsilon,
        if result.shortfall.holds { "HOLDS" } else { "VIOLATED" },
        result.shortfall.quantile_value,
        result.shortfall.quantile_index,
        result.shortfall.n_samples,
    );

    let summary = result.summary();
    println!("\nSummary:");
    println!("  Scenarios: {}", summary.n_scenarios);
    println!("  Mean outcome score: {:.4}", summary.mean_outcome_score);
    println!("  Receipt hash: {}", summary.receipt_hash);

    Ok(())
}
