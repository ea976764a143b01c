//! Canonical JSON serialization for receipt hashing
//!
//! The canonical form is bit-exact across implementations:
//! - object keys sorted alphabetically, recursively
//! - strings normalized to Unicode NFC
//! - integer-valued numbers emitted as integers, everything else rounded
//!   to 6 decimal places
//! - arrays keep their order; null stays null
//!
//! The UTF-8 canonical string feeds SHA-256; digests carry a `sha256:`
//! prefix.

use serde_json::Value;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::error::EngineError;

/// Decimal places kept for non-integer numbers
const ROUNDING_SCALE: f64 = 1e6;

/// Largest magnitude at which every f64 integer value is exact
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Produce the canonical string form of a JSON value
pub fn canonicalize(value: &Value) -> Result<String, EngineError> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// Hash the canonical form: `sha256:<64 hex chars>`
pub fn canonical_hash(value: &Value) -> Result<String, EngineError> {
    let canonical = canonicalize(value)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(format!("sha256:{}", hex::encode(digest)))
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), EngineError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out)?;
                out.push(':');
                write_canonical(&map[*key], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_number(n: &serde_json::Number, out: &mut String) -> Result<(), EngineError> {
    if n.is_i64() || n.is_u64() {
        out.push_str(&n.to_string());
        return Ok(());
    }

    // serde_json numbers are always finite, but the receipt contract treats
    // anything else as fatal rather than trusting upstream construction
    let f = n.as_f64().ok_or_else(|| EngineError::NonFiniteValue {
        field: n.to_string(),
    })?;
    if !f.is_finite() {
        return Err(EngineError::NonFiniteValue {
            field: n.to_string(),
        });
    }

    let rounded = (f * ROUNDING_SCALE).round() / ROUNDING_SCALE;
    if rounded.fract() == 0.0 && rounded.abs() <= MAX_EXACT_INT {
        out.push_str(&format!("{}", rounded as i64));
    } else {
        out.push_str(&format!("{}", rounded));
    }
    Ok(())
}

fn write_string(s: &str, out: &mut String) -> Result<(), EngineError> {
    let normalized: String = s.nfc().collect();
    // serde_json handles JSON escaping deterministically
    let quoted = serde_json::to_string(&normalized)?;
    out.push_str(&quoted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_recursively() {
        let value = json!({
            "zulu": {"beta": 1, "alpha": 2},
            "alpha": [3, 2, 1],
        });
        let canonical = canonicalize(&value).unwrap();
        assert_eq!(
            canonical,
            r#"{"alpha":[3,2,1],"zulu":{"alpha":2,"beta":1}}"#
        );
    }

    #[test]
    fn test_canonicalization_idempotent() {
        let value = json!({
            "b": 0.12345678,
            "a": {"y": [1.5, 2, null], "x": "text"},
        });
        let once = canonicalize(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        let twice = canonicalize(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_integers_pass_through() {
        let value = json!({"n": 42, "big": 9007199254740991i64, "neg": -7});
        let canonical = canonicalize(&value).unwrap();
        assert_eq!(canonical, r#"{"big":9007199254740991,"n":42,"neg":-7}"#);
    }

    #[test]
    fn test_non_integers_round_to_six_places() {
        let value = json!({"x": 0.123456789, "y": 1.0000004, "z": 2.5});
        let canonical = canonicalize(&value).unwrap();
        assert_eq!(canonical, r#"{"x":0.123457,"y":1,"z":2.5}"#);
    }

    #[test]
    fn test_integer_valued_float_emitted_as_integer() {
        let value = json!({"x": 3.0});
        assert_eq!(canonicalize(&value).unwrap(), r#"{"x":3}"#);
    }

    #[test]
    fn test_nfc_normalization_unifies_equivalent_strings() {
        // "é" precomposed vs "e" + combining acute
        let precomposed = json!({"name": "caf\u{00e9}"});
        let decomposed = json!({"name": "cafe\u{0301}"});

        let a = canonicalize(&precomposed).unwrap();
        let b = canonicalize(&decomposed).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            canonical_hash(&precomposed).unwrap(),
            canonical_hash(&decomposed).unwrap()
        );
    }

    #[test]
    fn test_null_preserved() {
        let value = json!({"missing": null});
        assert_eq!(canonicalize(&value).unwrap(), r#"{"missing":null}"#);
    }

    #[test]
    fn test_hash_format_and_stability() {
        let value = json!({"seed": "abc", "score": 0.75});
        let h1 = canonical_hash(&value).unwrap();
        let h2 = canonical_hash(&value).unwrap();

        assert_eq!(h1, h2);
        let hex_part = h1.strip_prefix("sha256:").expect("missing prefix");
        assert_eq!(hex_part.len(), 64);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_order_does_not_change_hash() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": 2, "x": 1}"#).unwrap();
        assert_eq!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }
}
