//! HTTP client for the churn service and the form model behind `churn_client`

use crate::types::{CustomerRecord, Label, PredictionResult, Threshold};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Errors seen by the client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("cannot reach the API at {0}; check that it is running and the URL is right")]
    Unreachable(String),

    #[error("the API took too long to answer")]
    Timeout,

    /// Non-success status, with the service's `detail` message when it sent one
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Prediction with the round-trip latency observed by the client
#[derive(Debug, Clone)]
pub struct PredictOutcome {
    pub result: PredictionResult,
    pub latency: Duration,
}

/// Client for the churn prediction API
#[derive(Clone)]
pub struct ChurnClient {
    http: HttpClient,
    base_url: String,
}

impl ChurnClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Readiness message of the root endpoint
    pub async fn health(&self) -> Result<String, ClientError> {
        let body = self.get_json("/").await?;
        body.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Decode("missing 'message'".to_string()))
    }

    /// Known encoder names
    pub async fn encoders(&self) -> Result<Vec<String>, ClientError> {
        let body = self.get_json("/encoders").await?;
        serde_json::from_value(body["encoders"].clone()).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Known raw values of one encoder
    pub async fn encoder_classes(&self, column: &str) -> Result<Vec<Value>, ClientError> {
        let body = self.get_json(&format!("/encoders/{column}")).await?;
        match body.get("classes") {
            Some(Value::Array(classes)) => Ok(classes.clone()),
            _ => Err(ClientError::Decode("missing 'classes'".to_string())),
        }
    }

    /// Score a record at the given threshold
    pub async fn predict(
        &self,
        record: &CustomerRecord,
        threshold: Threshold,
    ) -> Result<PredictOutcome, ClientError> {
        let url = format!("{}/predict", self.base_url);
        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .query(&[("threshold", threshold.value())])
            .json(record)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = Self::read_json(response).await?;
        let latency = start.elapsed();

        let result: PredictionResult =
            serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        debug!(prediction = %result.prediction, latency_ms = latency.as_millis() as u64, "Prediction received");
        Ok(PredictOutcome { result, latency })
    }

    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("detail").map(detail_text))
                .unwrap_or(text);
            return Err(ClientError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Unreachable(self.base_url.clone())
        }
    }
}

fn detail_text(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Input form with the defaults offered to users
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerForm {
    pub state: i64,
    pub international_plan: bool,
    pub voice_mail_plan: bool,
    pub account_length: i64,
    pub area_code: i64,
    pub number_vmail_messages: i64,
    pub customer_service_calls: i64,
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
}

impl Default for CustomerForm {
    fn default() -> Self {
        Self {
            state: 10,
            international_plan: false,
            voice_mail_plan: true,
            account_length: 120,
            area_code: 415,
            number_vmail_messages: 25,
            customer_service_calls: 1,
            total_day_minutes: 265.10,
            total_day_calls: 110,
            total_day_charge: 45.07,
            total_eve_minutes: 197.40,
            total_eve_calls: 99,
            total_eve_charge: 16.78,
            total_night_minutes: 244.70,
            total_night_calls: 91,
            total_night_charge: 11.01,
            total_intl_minutes: 10.00,
            total_intl_calls: 3,
            total_intl_charge: 2.70,
        }
    }
}

/// Parse a yes/no answer
pub fn parse_yes_no(answer: &str) -> Result<bool, String> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" => Ok(true),
        "no" | "n" => Ok(false),
        other => Err(format!("expected 'yes' or 'no', got '{other}'")),
    }
}

/// Parse a count, minutes or charge value; negatives are rejected
pub fn parse_non_negative(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if parsed.is_finite() && parsed >= 0.0 {
        Ok(parsed)
    } else {
        Err(format!("must be a non-negative number, got {value}"))
    }
}

fn plan_code(enabled: bool) -> String {
    let code = if enabled { "1" } else { "0" };
    code.to_string()
}

impl CustomerForm {
    /// Convert to the wire record. Plan answers travel as "1"/"0" codes.
    pub fn to_record(&self) -> CustomerRecord {
        CustomerRecord {
            state: self.state.to_string(),
            account_length: self.account_length,
            area_code: self.area_code,
            international_plan: plan_code(self.international_plan),
            voice_mail_plan: plan_code(self.voice_mail_plan),
            number_vmail_messages: self.number_vmail_messages,
            total_day_minutes: self.total_day_minutes,
            total_day_calls: self.total_day_calls,
            total_day_charge: self.total_day_charge,
            total_eve_minutes: self.total_eve_minutes,
            total_eve_calls: self.total_eve_calls,
            total_eve_charge: self.total_eve_charge,
            total_night_minutes: self.total_night_minutes,
            total_night_calls: self.total_night_calls,
            total_night_charge: self.total_night_charge,
            total_intl_minutes: self.total_intl_minutes,
            total_intl_calls: self.total_intl_calls,
            total_intl_charge: self.total_intl_charge,
            customer_service_calls: self.customer_service_calls,
        }
    }
}

/// Text rendering of a prediction for the terminal
pub fn render_decision(outcome: &PredictOutcome) -> String {
    let result = &outcome.result;
    let marker = match result.prediction {
        Label::Churn => "[!]",
        Label::NoChurn => "[ok]",
    };
    let filled = (result.prob_churn.clamp(0.0, 1.0) * 20.0).round() as usize;

    format!(
        "{marker} {label}\nChurn probability: {pct:.1}%\n[{bar}{rest}]\nlatency: {ms} ms | decision threshold: {th:.2}",
        label = result.prediction,
        pct = result.prob_churn * 100.0,
        bar = "#".repeat(filled),
        rest = "-".repeat(20 - filled),
        ms = outcome.latency.as_millis(),
        th = result.decision_threshold,
    )
}
