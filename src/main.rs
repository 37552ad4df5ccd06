use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use delivery_quotes::{
    app::{fetch_calculation, fetch_tracking},
    config::load_settings,
    domain::{CalculationItem, CalculationRequest, DeliveryState, Location},
    infra::delivery_api::DeliveryApiClient,
};

#[derive(Parser)]
#[command(name = "delivery-quotes", version, about = "Quote and track marketplace deliveries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare provider quotes for a single parcel and pick the cheapest.
    Quote {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Parcel weight in kilograms.
        #[arg(long)]
        weight: f64,
        #[arg(long, default_value = "RS")]
        country: String,
        /// Storefront the selection is recorded for.
        #[arg(long, default_value = "default")]
        storefront: String,
    },
    /// Look up shipment status by tracking number.
    Track { tracking_number: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "failed to load settings");
            return ExitCode::FAILURE;
        }
    };

    let client = match DeliveryApiClient::build(
        &settings.api_base_url,
        settings.request_timeout(),
    ) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "failed to initialise delivery client");
            return ExitCode::FAILURE;
        }
    };
    let mut state = DeliveryState::with_calculation_ttl(settings.calculation_ttl());

    match cli.command {
        Command::Quote {
            from,
            to,
            weight,
            country,
            storefront,
        } => {
            let request = CalculationRequest::new(
                Location::new(from, None, country.clone()),
                Location::new(to, None, country),
                vec![CalculationItem::with_weight(weight)],
            );
            let Some(response) = fetch_calculation(&client, &mut state, &request).await else {
                let message = state
                    .calculation_error(&request.cache_key())
                    .unwrap_or("unknown error");
                eprintln!("Calculation failed: {message}");
                return ExitCode::FAILURE;
            };

            for quote in response.quotes() {
                println!(
                    "{:<16} {:>10.2} {}  {}",
                    quote.provider_name,
                    quote.total_cost,
                    quote.currency,
                    quote.estimated_delivery.as_deref().unwrap_or("-")
                );
            }

            let pick = response.recommended().or_else(|| response.cheapest()).cloned();
            if let Some(quote) = pick {
                println!("Selected {} for storefront {storefront}", quote.provider_name);
                state.select_quote(storefront, quote);
            }
            ExitCode::SUCCESS
        }
        Command::Track { tracking_number } => {
            let Some(info) = fetch_tracking(&client, &mut state, &tracking_number).await else {
                let message = state
                    .tracking_error(tracking_number.trim())
                    .unwrap_or("tracking number is empty");
                eprintln!("Tracking failed: {message}");
                return ExitCode::FAILURE;
            };

            println!(
                "{}: {} ({}%)",
                info.tracking_number,
                info.status,
                info.status.progress_percent()
            );
            if let Some(location) = info.current_location.as_deref() {
                println!("Current location: {location}");
            }
            for event in &info.events {
                println!(
                    "  {}  {:<18} {}",
                    event.timestamp,
                    event.status,
                    event.description.as_deref().unwrap_or("")
                );
            }
            ExitCode::SUCCESS
        }
    }
}
