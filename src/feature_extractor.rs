//! Feature vector assembly for churn model inference.
//!
//! Lays out the encoded record in the exact column order the scaler and the
//! model were fit on. Reordering the slots silently corrupts predictions, so
//! the order comes from [`FEATURE_ORDER`] and nothing else.

use crate::encoders::{integral, EncodedCategoricals};
use crate::error::{ChurnError, Result};
use crate::types::record::{ColumnKind, RawRecord, FEATURE_ORDER};
use serde_json::Value;

/// Ordered numeric features, one slot per training column
pub type FeatureVector = Vec<f64>;

/// Transforms encoded records into model input features.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Build the feature vector for a record whose categoricals are already encoded.
    ///
    /// Every missing column is reported in a single error.
    pub fn extract(&self, codes: &EncodedCategoricals, record: &RawRecord) -> Result<FeatureVector> {
        let missing: Vec<&str> = FEATURE_ORDER
            .iter()
            .filter(|c| match c.kind {
                ColumnKind::Categorical => !codes.contains_key(c.name),
                _ => !record.contains_key(c.name),
            })
            .map(|c| c.name)
            .collect();
        if !missing.is_empty() {
            return Err(ChurnError::invalid_input(format!(
                "missing columns: {missing:?}"
            )));
        }

        let mut features = Vec::with_capacity(FEATURE_ORDER.len());
        for column in FEATURE_ORDER.iter() {
            let slot = match column.kind {
                ColumnKind::Categorical => codes[column.name] as f64,
                ColumnKind::Integer => coerce_integer(column.name, &record[column.name])? as f64,
                ColumnKind::Float => coerce_float(column.name, &record[column.name])?,
            };
            features.push(slot);
        }

        Ok(features)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_ORDER.len()
    }

    /// Get feature names in slot order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        FEATURE_ORDER.iter().map(|c| c.name).collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn coerce_integer(column: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        other => integral(other),
    };
    parsed.ok_or_else(|| {
        ChurnError::invalid_input(format!("'{column}' must be an integer, got {value}"))
    })
}

fn coerce_float(column: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).ok_or_else(|| {
        ChurnError::invalid_input(format!("'{column}' must be a number, got {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codes() -> EncodedCategoricals {
        EncodedCategoricals::from([("state", 10), ("international_plan", 1), ("voice_mail_plan", 0)])
    }

    fn record() -> RawRecord {
        serde_json::from_value(json!({
            "customer_service_calls": 1,
            "total_intl_charge": 2.7,
            "total_intl_calls": 3,
            "total_intl_minutes": 10.0,
            "total_night_charge": 11.01,
            "total_night_calls": 91,
            "total_night_minutes": 244.7,
            "total_eve_charge": 16.78,
            "total_eve_calls": 99,
            "total_eve_minutes": 197.4,
            "total_day_charge": 45.07,
            "total_day_calls": 110,
            "total_day_minutes": 265.1,
            "number_vmail_messages": 25,
            "area_code": 415,
            "account_length": 120,
            "state": "10",
            "international_plan": "1",
            "voice_mail_plan": "0"
        }))
        .unwrap()
    }

    #[test]
    fn test_feature_extraction_order() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&codes(), &record()).unwrap();

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(features[0], 10.0); // state
        assert_eq!(features[1], 120.0); // account_length
        assert_eq!(features[2], 415.0); // area_code
        assert_eq!(features[3], 1.0); // international_plan
        assert_eq!(features[4], 0.0); // voice_mail_plan
        assert_eq!(features[6], 265.1); // total_day_minutes
        assert_eq!(features[18], 1.0); // customer_service_calls
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), 19);
        assert_eq!(extractor.feature_names().len(), 19);
        assert_eq!(extractor.feature_names()[0], "state");
    }

    #[test]
    fn test_missing_columns_are_all_named() {
        let mut record = record();
        record.remove("total_day_calls");
        record.remove("area_code");

        let err = FeatureExtractor::new()
            .extract(&codes(), &record)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"missing columns: ["area_code", "total_day_calls"]"#
        );
    }

    #[test]
    fn test_missing_categorical_code_reported() {
        let mut codes = codes();
        codes.remove("state");
        let err = FeatureExtractor::new().extract(&codes, &record()).unwrap_err();
        assert!(err.to_string().contains("\"state\""));
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut record = record();
        record.insert("account_length".into(), json!("77"));
        record.insert("total_day_minutes".into(), json!("12.5"));
        record.insert("total_day_calls".into(), json!(80.0));

        let features = FeatureExtractor::new().extract(&codes(), &record).unwrap();
        assert_eq!(features[1], 77.0);
        assert_eq!(features[6], 12.5);
        assert_eq!(features[7], 80.0);
    }

    #[test]
    fn test_bad_numeric_values_rejected() {
        let cases = [
            ("account_length", json!(1.5)),
            ("account_length", json!(1e30)),
            ("number_vmail_messages", json!(-1e30)),
            ("account_length", json!("many")),
            ("total_day_minutes", json!(null)),
            ("total_day_minutes", json!(true)),
            ("total_eve_charge", json!([1.0])),
        ];
        for (column, value) in cases {
            let mut record = record();
            record.insert(column.into(), value);
            let err = FeatureExtractor::new().extract(&codes(), &record).unwrap_err();
            assert!(err.is_client_error());
            assert!(err.to_string().contains(column), "{err}");
        }
    }

    #[test]
    fn test_float_slots_keep_double_precision() {
        let features = FeatureExtractor::new().extract(&codes(), &record()).unwrap();
        assert_eq!(features[8], 45.07); // total_day_charge
        assert_eq!(features[17], 2.7); // total_intl_charge
    }

    #[test]
    fn test_extra_fields_ignored() {
        let mut record = record();
        record.insert("customer_id".into(), json!("abc"));
        let features = FeatureExtractor::new().extract(&codes(), &record).unwrap();
        assert_eq!(features.len(), 19);
    }
}
