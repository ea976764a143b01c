//! Auditable outcome receipts
//!
//! A receipt proves exactly which inputs produced a run's outputs: the
//! body carries the policy and model hashes, the final regime state, the
//! scored phase metrics, caller-supplied trade data, the seed, and the
//! run timestamp; the hash is SHA-256 of the body's canonical form.
//! Receipts are created once at the end of a run and never mutated.

mod canonical;

pub use canonical::{canonical_hash, canonicalize};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::scoring::PhaseMetrics;

/// Receipt body; every field participates in the hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptBody {
    /// Canonical hash of the scoring policy (weights and epsilon)
    pub policy_hash: String,
    /// Canonical hash of the model configuration
    pub model_hash: String,
    /// Final equity regime of the base scenario
    pub regime_state: u32,
    /// Scored metrics per projection phase
    pub phase_metrics: Vec<PhaseMetrics>,
    /// Caller-supplied trade records (opaque to the engine)
    pub trades: Value,
    /// Caller-supplied tax-lot deltas (opaque to the engine)
    pub lot_deltas: Value,
    /// Run seed
    pub seed: String,
    /// Run timestamp, supplied by the caller
    pub timestamp: DateTime<Utc>,
}

/// A hashed, immutable audit receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub body: ReceiptBody,
    /// `sha256:` hash of the body's canonical serialization
    pub hash: String,
}

/// Build the outcome receipt for a completed run
///
/// Non-finite metric values are a fatal construction error; JSON-to-value
/// conversion would otherwise silently turn them into nulls and the hash
/// would cover a body that never existed.
pub fn make_outcome_receipt(body: ReceiptBody) -> Result<Receipt, EngineError> {
    for metrics in &body.phase_metrics {
        for (name, v) in [
            ("isp", metrics.isp),
            ("dgbp", metrics.dgbp),
            ("ate", metrics.ate),
            ("lci", metrics.lci),
            ("os", metrics.os),
        ] {
            if !v.is_finite() {
                return Err(EngineError::NonFiniteValue {
                    field: format!("phaseMetrics[{}].{}", metrics.phase, name),
                });
            }
        }
    }

    let value = serde_json::to_value(&body)?;
    let hash = canonical_hash(&value)?;
    Ok(Receipt { body, hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::OutcomeWeights;
    use chrono::TimeZone;
    use serde_json::json;

    fn body() -> ReceiptBody {
        let weights = OutcomeWeights::default();
        ReceiptBody {
            policy_hash: "sha256:aaaa".into(),
            model_hash: "sha256:bbbb".into(),
            regime_state: 1,
            phase_metrics: vec![
                PhaseMetrics::new("accumulation", 0.9, 0.1, 0.8, 0.7, &weights),
                PhaseMetrics::new("decumulation", 0.7, 0.3, 0.8, 0.6, &weights),
            ],
            trades: json!([]),
            lot_deltas: json!([]),
            seed: "run-42".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_receipt_hash_stable_for_identical_bodies() {
        let a = make_outcome_receipt(body()).unwrap();
        let b = make_outcome_receipt(body()).unwrap();
        assert_eq!(a.hash, b.hash);
        assert!(a.hash.starts_with("sha256:"));
    }

    #[test]
    fn test_receipt_hash_changes_with_body() {
        let a = make_outcome_receipt(body()).unwrap();

        let mut changed = body();
        changed.seed = "run-43".into();
        let b = make_outcome_receipt(changed).unwrap();

        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_non_finite_metric_is_fatal() {
        let mut bad = body();
        bad.phase_metrics[0].isp = f64::NAN;

        let err = make_outcome_receipt(bad).unwrap_err();
        assert!(matches!(err, EngineError::NonFiniteValue { .. }));
    }

    #[test]
    fn test_receipt_json_shape() {
        let receipt = make_outcome_receipt(body()).unwrap();
        let value = serde_json::to_value(&receipt).unwrap();

        assert!(value["body"]["policyHash"].is_string());
        assert!(value["body"]["phaseMetrics"].is_array());
        assert!(value["body"]["lotDeltas"].is_array());
        assert!(value["hash"].as_str().unwrap().starts_with("sha256:"));
    }

    #[test]
    fn test_hash_matches_recomputed_canonical_hash() {
        let receipt = make_outcome_receipt(body()).unwrap();
        let value = serde_json::to_value(&receipt.body).unwrap();
        assert_eq!(receipt.hash, canonical_hash(&value).unwrap());
    }
}
