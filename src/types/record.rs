//! Customer record and the canonical column schema

use serde::{Deserialize, Serialize};

/// Raw request body as received on the wire.
///
/// Kept untyped so that missing or mistyped fields can be reported per column.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// How a column is coerced into its feature slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Replaced by its encoder code
    Categorical,
    /// Whole number (counts, codes, durations in days)
    Integer,
    /// Minutes and charges
    Float,
}

/// A named slot of the feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

/// Exact training-time column order expected by the scaler and the model.
pub const FEATURE_ORDER: [Column; 19] = [
    col("state", ColumnKind::Categorical),
    col("account_length", ColumnKind::Integer),
    col("area_code", ColumnKind::Integer),
    col("international_plan", ColumnKind::Categorical),
    col("voice_mail_plan", ColumnKind::Categorical),
    col("number_vmail_messages", ColumnKind::Integer),
    col("total_day_minutes", ColumnKind::Float),
    col("total_day_calls", ColumnKind::Integer),
    col("total_day_charge", ColumnKind::Float),
    col("total_eve_minutes", ColumnKind::Float),
    col("total_eve_calls", ColumnKind::Integer),
    col("total_eve_charge", ColumnKind::Float),
    col("total_night_minutes", ColumnKind::Float),
    col("total_night_calls", ColumnKind::Integer),
    col("total_night_charge", ColumnKind::Float),
    col("total_intl_minutes", ColumnKind::Float),
    col("total_intl_calls", ColumnKind::Integer),
    col("total_intl_charge", ColumnKind::Float),
    col("customer_service_calls", ColumnKind::Integer),
];

/// Record field → key of its fitted encoder in the encoders artifact.
///
/// The plan encoders were fit on the original dataset headers, which contain spaces.
pub const CATEGORICAL_COLUMNS: [(&str, &str); 3] = [
    ("state", "state"),
    ("international_plan", "international plan"),
    ("voice_mail_plan", "voice mail plan"),
];

/// Typed customer record, as produced by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Region code (label-encoded state)
    pub state: String,
    pub account_length: i64,
    pub area_code: i64,
    /// "1" when the customer has an international plan
    pub international_plan: String,
    /// "1" when the customer has a voice mail plan
    pub voice_mail_plan: String,
    pub number_vmail_messages: i64,
    pub total_day_minutes: f64,
    pub total_day_calls: i64,
    pub total_day_charge: f64,
    pub total_eve_minutes: f64,
    pub total_eve_calls: i64,
    pub total_eve_charge: f64,
    pub total_night_minutes: f64,
    pub total_night_calls: i64,
    pub total_night_charge: f64,
    pub total_intl_minutes: f64,
    pub total_intl_calls: i64,
    pub total_intl_charge: f64,
    pub customer_service_calls: i64,
}

impl CustomerRecord {
    /// Convert to the untyped wire representation.
    pub fn to_raw(&self) -> RawRecord {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            // A struct of scalars always serializes to an object
            _ => RawRecord::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_feature_order_is_unique() {
        let names: HashSet<&str> = FEATURE_ORDER.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), FEATURE_ORDER.len());
        assert_eq!(FEATURE_ORDER.len(), 19);
    }

    #[test]
    fn test_categorical_columns_match_schema() {
        let categorical: Vec<&str> = FEATURE_ORDER
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
            .map(|c| c.name)
            .collect();
        let mapped: Vec<&str> = CATEGORICAL_COLUMNS.iter().map(|(f, _)| *f).collect();
        assert_eq!(categorical, mapped);
    }

    #[test]
    fn test_to_raw_has_every_column() {
        let record = CustomerRecord {
            state: "10".to_string(),
            account_length: 120,
            area_code: 415,
            international_plan: "0".to_string(),
            voice_mail_plan: "1".to_string(),
            number_vmail_messages: 25,
            total_day_minutes: 265.1,
            total_day_calls: 110,
            total_day_charge: 45.07,
            total_eve_minutes: 197.4,
            total_eve_calls: 99,
            total_eve_charge: 16.78,
            total_night_minutes: 244.7,
            total_night_calls: 91,
            total_night_charge: 11.01,
            total_intl_minutes: 10.0,
            total_intl_calls: 3,
            total_intl_charge: 2.7,
            customer_service_calls: 1,
        };

        let raw = record.to_raw();
        assert_eq!(raw.len(), 19);
        for column in FEATURE_ORDER.iter() {
            assert!(raw.contains_key(column.name), "missing {}", column.name);
        }
        assert_eq!(raw["state"], serde_json::json!("10"));
        assert_eq!(raw["area_code"], serde_json::json!(415));
    }
}
