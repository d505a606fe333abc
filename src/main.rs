use anyhow::Context;
use clap::Parser;
use log::info;
use serde::Serialize;

use teslarest::cli::{ApplyArgs, Cli, Commands};
use teslarest::config::{ClientConfig, load_configuration};
use teslarest::http::TeslaClient;
use teslarest::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_logging()?;
    let cli = Cli::parse();

    let cfg = load_configuration(&cli.config)?;
    let mut config = ClientConfig::from_config(&cfg).context("Invalid configuration")?;
    config.apply_connection(&cli.connection);
    config.validate()?;
    info!(vehicle_id = config.vehicle_id.as_str(); "Configuration loaded");

    let client = TeslaClient::with_config(&config)?;

    match cli.command {
        Commands::ChargeState => print_json(&client.get_charge_state().await?),
        Commands::VehicleData => print_json(&client.get_vehicle_data().await?),
        Commands::ChargeStart => print_json(&client.start_charging().await?),
        Commands::ChargeStop => print_json(&client.stop_charging().await?),
        Commands::SetChargingAmps { amps } => print_json(&client.set_charging_amps(amps).await?),
        Commands::WakeUp { wait: false } => print_json(&client.wake_up().await?),
        Commands::WakeUp { wait: true } => {
            client.wake_and_wait().await?;
            println!("Vehicle {} is online", client.vehicle_id());
            Ok(())
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), anyhow::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
