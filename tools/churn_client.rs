//! Churn Prediction Client
//!
//! Collects customer features from the command line, sends them to the churn
//! API and prints the decision.

use anyhow::Result;
use churn_service::client::{
    parse_non_negative, parse_yes_no, render_decision, ChurnClient, ClientError, CustomerForm,
};
use churn_service::Threshold;
use clap::{ArgAction, Parser};
use std::time::Duration;
use tracing::warn;

/// Customer churn prediction client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the API
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    api: String,

    /// Decision threshold (Churn when probability >= threshold)
    #[arg(short, long, default_value = "0.5")]
    threshold: f64,

    /// Request timeout in seconds
    #[arg(long, default_value = "15")]
    timeout: u64,

    /// List the accepted state codes and exit
    #[arg(long)]
    list_states: bool,

    /// Print the request payload and raw response
    #[arg(short, long)]
    verbose: bool,

    /// State (encoded region code)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(i64).range(0..))]
    state: i64,

    /// International plan (yes/no)
    #[arg(long, default_value = "no", action = ArgAction::Set, value_parser = parse_yes_no)]
    international_plan: bool,

    /// Voice mail plan (yes/no)
    #[arg(long, default_value = "yes", action = ArgAction::Set, value_parser = parse_yes_no)]
    voice_mail_plan: bool,

    #[arg(long, default_value = "120", value_parser = clap::value_parser!(i64).range(0..))]
    account_length: i64,

    #[arg(long, default_value = "415", value_parser = clap::value_parser!(i64).range(100..=999))]
    area_code: i64,

    #[arg(long, default_value = "25", value_parser = clap::value_parser!(i64).range(0..))]
    number_vmail_messages: i64,

    #[arg(long, default_value = "1", value_parser = clap::value_parser!(i64).range(0..))]
    customer_service_calls: i64,

    #[arg(long, default_value = "265.10", value_parser = parse_non_negative)]
    total_day_minutes: f64,

    #[arg(long, default_value = "110", value_parser = clap::value_parser!(i64).range(0..))]
    total_day_calls: i64,

    #[arg(long, default_value = "45.07", value_parser = parse_non_negative)]
    total_day_charge: f64,

    #[arg(long, default_value = "197.40", value_parser = parse_non_negative)]
    total_eve_minutes: f64,

    #[arg(long, default_value = "99", value_parser = clap::value_parser!(i64).range(0..))]
    total_eve_calls: i64,

    #[arg(long, default_value = "16.78", value_parser = parse_non_negative)]
    total_eve_charge: f64,

    #[arg(long, default_value = "244.70", value_parser = parse_non_negative)]
    total_night_minutes: f64,

    #[arg(long, default_value = "91", value_parser = clap::value_parser!(i64).range(0..))]
    total_night_calls: i64,

    #[arg(long, default_value = "11.01", value_parser = parse_non_negative)]
    total_night_charge: f64,

    #[arg(long, default_value = "10.00", value_parser = parse_non_negative)]
    total_intl_minutes: f64,

    #[arg(long, default_value = "3", value_parser = clap::value_parser!(i64).range(0..))]
    total_intl_calls: i64,

    #[arg(long, default_value = "2.70", value_parser = parse_non_negative)]
    total_intl_charge: f64,
}

impl Args {
    fn form(&self) -> CustomerForm {
        CustomerForm {
            state: self.state,
            international_plan: self.international_plan,
            voice_mail_plan: self.voice_mail_plan,
            account_length: self.account_length,
            area_code: self.area_code,
            number_vmail_messages: self.number_vmail_messages,
            customer_service_calls: self.customer_service_calls,
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
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("churn_service=warn".parse()?),
        )
        .init();

    let args = Args::parse();
    let threshold = Threshold::new(args.threshold)?;
    let client = ChurnClient::new(&args.api, Duration::from_secs(args.timeout))?;

    let status = match client.health().await {
        Ok(_) => "up",
        Err(e) => {
            warn!(error = %e, "Health check failed");
            "down"
        }
    };
    println!("API status: {status} ({})", client.base_url());

    if args.list_states {
        let states = client.encoder_classes("state").await?;
        let states: Vec<String> = states.iter().map(|s| s.to_string()).collect();
        println!("Accepted state codes: {}", states.join(", "));
        return Ok(());
    }

    let record = args.form().to_record();
    if args.verbose {
        println!("Request:\n{}", serde_json::to_string_pretty(&record)?);
    }

    match client.predict(&record, threshold).await {
        Ok(outcome) => {
            println!("{}", render_decision(&outcome));
            if args.verbose {
                println!("Response:\n{}", serde_json::to_string_pretty(&outcome.result)?);
            }
            Ok(())
        }
        Err(e @ ClientError::Http { .. }) => {
            eprintln!("Request rejected: {e}");
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
