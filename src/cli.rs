use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "teslarest")]
#[command(about = "Read telemetry from and send commands to a Tesla vehicle", long_about = None)]
pub struct Cli {
    #[arg(
        short,
        long,
        global = true,
        help = "Path to the configuration file",
        default_value = "data/config.toml"
    )]
    pub config: PathBuf,
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the charge state
    ChargeState,
    /// Show all vehicle data
    VehicleData,
    /// Start charging
    ChargeStart,
    /// Stop charging
    ChargeStop,
    /// Set the charging current
    SetChargingAmps {
        #[arg(short, long, help = "Charging current in amperes")]
        amps: u32,
    },
    /// Wake the vehicle up
    WakeUp {
        #[arg(
            short,
            long,
            help = "Keep polling until the vehicle is online or the wake-up budget is spent"
        )]
        wait: bool,
    },
}

/// Connection settings that override the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    #[arg(short, long, global = true, help = "Identifier of the vehicle")]
    pub vehicle_id: Option<String>,
    #[arg(short, long, global = true, help = "Long-lived refresh token")]
    pub refresh_token: Option<String>,
    #[arg(long, global = true, help = "Base URL of the vehicles endpoint")]
    pub api_base_url: Option<String>,
    #[arg(long, global = true, help = "URL of the token endpoint")]
    pub auth_url: Option<String>,
}

pub trait ApplyArgs {
    fn apply_connection(&mut self, args: &ConnectionArgs);
}
