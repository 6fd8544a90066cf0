//! Categorical feature encoding.
//!
//! Each categorical column has a fitted encoder table loaded from the encoders
//! artifact. The artifact is a JSON object mapping an encoder key to the sorted
//! list of classes seen at fit time:
//!
//! ```json
//! { "state": [0, 1, 2], "international plan": ["no", "yes"] }
//! ```
//!
//! Whether a table is string-coded or integer-coded is decided once, when the
//! artifact is loaded, from the type of its classes.

use crate::error::{ChurnError, Result};
use crate::types::record::{RawRecord, CATEGORICAL_COLUMNS};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Fitted mapping from raw categorical values to integer codes
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderTable {
    /// Fit on strings; the code is the class index in sorted order.
    StringCoded {
        classes: Vec<String>,
        code_of: HashMap<String, i64>,
    },
    /// Fit on integer codes; the code is the value itself.
    IntCoded { classes: BTreeSet<i64> },
}

impl EncoderTable {
    /// Build a string-coded table. Classes are sorted and deduplicated.
    pub fn string_coded<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: BTreeSet<String> = classes.into_iter().map(Into::into).collect();
        let classes: Vec<String> = classes.into_iter().collect();
        let code_of = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i as i64))
            .collect();
        Self::StringCoded { classes, code_of }
    }

    /// Build an integer-coded table.
    pub fn int_coded<I: IntoIterator<Item = i64>>(classes: I) -> Self {
        Self::IntCoded {
            classes: classes.into_iter().collect(),
        }
    }

    /// Resolve the table variant from the artifact's class list.
    pub fn from_classes(key: &str, classes: &[Value]) -> Result<Self> {
        if classes.is_empty() {
            return Err(ChurnError::ArtifactLoad(format!(
                "encoder '{key}' has no classes"
            )));
        }

        if classes.iter().all(Value::is_string) {
            return Ok(Self::string_coded(
                classes.iter().filter_map(|v| v.as_str().map(str::to_string)),
            ));
        }

        let codes: Option<Vec<i64>> = classes.iter().map(integral).collect();
        match codes {
            Some(codes) => Ok(Self::int_coded(codes)),
            None => Err(ChurnError::ArtifactLoad(format!(
                "encoder '{key}' mixes class types; expected all strings or all integers"
            ))),
        }
    }

    /// Encode one raw value for `column`.
    pub fn encode(&self, column: &str, value: &Value) -> Result<i64> {
        match self {
            Self::StringCoded { classes, code_of } => {
                let raw = match value {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                };
                raw.as_ref()
                    .and_then(|s| code_of.get(s).copied())
                    .ok_or_else(|| {
                        ChurnError::invalid_input(format!(
                            "unknown value for '{column}': {value}. expected one of: {classes:?}"
                        ))
                    })
            }
            Self::IntCoded { classes } => {
                let code = to_code(value).ok_or_else(|| {
                    ChurnError::invalid_input(format!(
                        "'{column}' must be an integer code among: {:?}",
                        self.int_codes()
                    ))
                })?;
                if classes.contains(&code) {
                    Ok(code)
                } else {
                    Err(ChurnError::invalid_input(format!(
                        "unknown code for '{column}': {code}. expected one of: {:?}",
                        self.int_codes()
                    )))
                }
            }
        }
    }

    /// Known raw values, as they appear on the wire.
    pub fn classes(&self) -> Vec<Value> {
        match self {
            Self::StringCoded { classes, .. } => {
                classes.iter().cloned().map(Value::String).collect()
            }
            Self::IntCoded { classes } => classes.iter().map(|&c| Value::from(c)).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::StringCoded { classes, .. } => classes.len(),
            Self::IntCoded { classes } => classes.len(),
        }
    }

    fn int_codes(&self) -> Vec<i64> {
        match self {
            Self::IntCoded { classes } => classes.iter().copied().collect(),
            Self::StringCoded { .. } => Vec::new(),
        }
    }
}

/// Integer value of a JSON number with no fractional part.
///
/// Numbers outside the `i64` range are rejected rather than saturated.
pub(crate) fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

/// Convert a wire value to an integer code: integral numbers or integer strings.
fn to_code(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        other => integral(other),
    }
}

/// Codes of the categorical columns present in a record, keyed by field name
pub type EncodedCategoricals = HashMap<&'static str, i64>;

/// All encoder tables of the service, keyed by encoder name
#[derive(Debug, Clone, Default)]
pub struct EncoderSet {
    tables: BTreeMap<String, EncoderTable>,
}

impl EncoderSet {
    pub fn new(tables: BTreeMap<String, EncoderTable>) -> Self {
        Self { tables }
    }

    /// Load the encoders artifact from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::ArtifactLoad(format!("cannot read encoders {}: {e}", path.display()))
        })?;
        let set = Self::from_json_str(&text)?;

        info!(
            path = %path.display(),
            encoders = ?set.keys().collect::<Vec<_>>(),
            "Encoder tables loaded"
        );
        for (key, table) in &set.tables {
            debug!(encoder = %key, classes = table.len(), "Encoder table size");
        }
        Ok(set)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<Value>> = serde_json::from_str(text)
            .map_err(|e| ChurnError::ArtifactLoad(format!("malformed encoders artifact: {e}")))?;

        let mut tables = BTreeMap::new();
        for (key, classes) in raw {
            let table = EncoderTable::from_classes(&key, &classes)?;
            tables.insert(key, table);
        }
        Ok(Self { tables })
    }

    /// Check that every categorical column of the schema has an encoder.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = CATEGORICAL_COLUMNS
            .iter()
            .filter(|(_, key)| !self.tables.contains_key(*key))
            .map(|(_, key)| *key)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ChurnError::ArtifactLoad(format!(
                "encoders artifact lacks tables for {missing:?}"
            )))
        }
    }

    pub fn get(&self, key: &str) -> Option<&EncoderTable> {
        self.tables.get(key)
    }

    /// Encoder names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Encode every categorical column present in `record`.
    ///
    /// Absent columns are skipped here and reported by the schema orderer.
    pub fn encode_record(&self, record: &RawRecord) -> Result<EncodedCategoricals> {
        let mut codes = EncodedCategoricals::with_capacity(CATEGORICAL_COLUMNS.len());
        for (field, key) in CATEGORICAL_COLUMNS.iter() {
            let table = self
                .tables
                .get(*key)
                .ok_or_else(|| ChurnError::internal(format!("encoder missing for '{key}'")))?;
            if let Some(value) = record.get(*field) {
                codes.insert(*field, table.encode(field, value)?);
            }
        }
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoders() -> EncoderSet {
        EncoderSet::from_json_str(
            r#"{
                "state": [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
                "international plan": ["0", "1"],
                "voice mail plan": ["no", "yes"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_table_variant_resolved_from_classes() {
        let set = encoders();
        assert!(matches!(set.get("state"), Some(EncoderTable::IntCoded { .. })));
        assert!(matches!(
            set.get("voice mail plan"),
            Some(EncoderTable::StringCoded { .. })
        ));
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_string_coded_uses_sorted_index() {
        let table = EncoderTable::string_coded(["yes", "no", "maybe"]);
        assert_eq!(table.encode("plan", &json!("maybe")).unwrap(), 0);
        assert_eq!(table.encode("plan", &json!("no")).unwrap(), 1);
        assert_eq!(table.encode("plan", &json!("yes")).unwrap(), 2);
    }

    #[test]
    fn test_string_coded_is_case_sensitive() {
        let table = EncoderTable::string_coded(["no", "yes"]);
        let err = table.encode("voice_mail_plan", &json!("Yes")).unwrap_err();
        let msg = err.to_string();
        assert!(err.is_client_error());
        assert!(msg.contains("voice_mail_plan"));
        assert!(msg.contains(r#"["no", "yes"]"#));
    }

    #[test]
    fn test_string_coded_accepts_numeric_wire_value() {
        let table = EncoderTable::string_coded(["0", "1"]);
        assert_eq!(table.encode("international_plan", &json!(1)).unwrap(), 1);
    }

    #[test]
    fn test_int_coded_accepts_strings_and_numbers() {
        let table = EncoderTable::int_coded([0, 5, 10]);
        assert_eq!(table.encode("state", &json!("10")).unwrap(), 10);
        assert_eq!(table.encode("state", &json!(" 5 ")).unwrap(), 5);
        assert_eq!(table.encode("state", &json!(5)).unwrap(), 5);
        assert_eq!(table.encode("state", &json!(5.0)).unwrap(), 5);
    }

    #[test]
    fn test_int_coded_rejects_non_integer() {
        let table = EncoderTable::int_coded([0, 1]);
        for bad in [json!("CA"), json!(0.5), json!(true), json!(null)] {
            let err = table.encode("state", &bad).unwrap_err();
            assert!(err.to_string().contains("must be an integer code among: [0, 1]"));
        }
    }

    #[test]
    fn test_int_coded_rejects_unknown_code() {
        let table = EncoderTable::int_coded([2, 0, 1]);
        let err = table.encode("state", &json!("51")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown code for 'state': 51. expected one of: [0, 1, 2]"
        );
    }

    #[test]
    fn test_int_coded_rejects_out_of_range_numbers() {
        let table = EncoderTable::int_coded([0, 1]);
        for bad in [json!(1e30), json!(-1e30), json!(9.3e18)] {
            let err = table.encode("state", &bad).unwrap_err();
            assert!(err.is_client_error());
            assert!(err.to_string().contains("must be an integer code"), "{err}");
        }
    }

    #[test]
    fn test_integral_bounds() {
        assert_eq!(integral(&json!(i64::MAX)), Some(i64::MAX));
        assert_eq!(integral(&json!(-9.0e18)), Some(-9_000_000_000_000_000_000));
        assert_eq!(integral(&json!(1e19)), None);
        assert_eq!(integral(&json!(u64::MAX)), None);
    }

    #[test]
    fn test_table_sizes() {
        let set = encoders();
        assert_eq!(set.get("state").map(EncoderTable::len), Some(11));
        assert_eq!(set.get("voice mail plan").map(EncoderTable::len), Some(2));
    }

    #[test]
    fn test_mixed_classes_rejected_at_load() {
        let err = EncoderSet::from_json_str(r#"{"state": [0, "CA"]}"#).unwrap_err();
        assert!(matches!(err, ChurnError::ArtifactLoad(_)));
    }

    #[test]
    fn test_validate_reports_missing_tables() {
        let set = EncoderSet::from_json_str(r#"{"state": [0, 1]}"#).unwrap();
        let err = set.validate().unwrap_err().to_string();
        assert!(err.contains("international plan"));
        assert!(err.contains("voice mail plan"));
    }

    #[test]
    fn test_encode_record_skips_absent_columns() {
        let set = encoders();
        let record: RawRecord = serde_json::from_value(json!({
            "state": "3",
            "voice_mail_plan": "yes"
        }))
        .unwrap();

        let codes = set.encode_record(&record).unwrap();
        assert_eq!(codes.get("state"), Some(&3));
        assert_eq!(codes.get("voice_mail_plan"), Some(&1));
        assert!(!codes.contains_key("international_plan"));
    }

    #[test]
    fn test_known_values_round_trip_through_listing() {
        let set = encoders();
        for key in set.keys() {
            let table = set.get(key).unwrap();
            for class in table.classes() {
                assert!(table.encode(key, &class).is_ok());
            }
        }
    }
}
