// SPDX-License-Identifier: MIT

//! talonctl: thin command-line client for the talond telescope control
//! daemon. One subcommand per dispatcher operation (§4.5); this binary
//! owns no state of its own beyond the control socket path.

mod client;
mod env;

use anyhow::Result;
use clap::{Parser, Subcommand};
use talond_core::ResultCode;
use talond_daemon::{Request, Response};

use client::DaemonClient;

#[derive(Parser)]
#[command(name = "talonctl", version, about = "Control the talon telescope daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Spawn the controller and wait for it to come up
    Initialize,
    /// Send SIGINT to the controller process
    Shutdown,
    /// Home the HA, Dec, and (if present) focus axes
    Home,
    /// Run the HA/Dec/focus limit-finding sequence
    Limits,
    /// Slew to an altitude/azimuth target, in degrees
    SlewAltaz { alt_deg: f64, az_deg: f64 },
    /// Slew to an hour-angle/declination target, in degrees
    SlewHadec { ha_deg: f64, dec_deg: f64 },
    /// Slew to a J2000 RA/Dec target, in degrees
    SlewRadec { ra_deg: f64, dec_deg: f64 },
    /// Slew to and track a J2000 RA/Dec target, in degrees
    TrackRadec { ra_deg: f64, dec_deg: f64 },
    /// Apply a differential RA/Dec offset, in degrees
    Offset { d_ra_deg: f64, d_dec_deg: f64 },
    /// Move to a named park position
    Park { name: String },
    /// Move the focus axis to an absolute position, in microns
    Focus { target_um: f64 },
    /// Force-stop all motion
    Stop,
    /// Health check
    Ping,
    /// Print the current status report as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = DaemonClient::connect_config()?;
    let caller = env::caller_identity();

    let request = match cli.command {
        Command::Initialize => Request::Initialize { caller },
        Command::Shutdown => Request::Shutdown { caller },
        Command::Home => Request::Home { caller },
        Command::Limits => Request::Limits { caller },
        Command::SlewAltaz { alt_deg, az_deg } => Request::SlewAltAz { caller, alt_deg, az_deg },
        Command::SlewHadec { ha_deg, dec_deg } => Request::SlewHaDec { caller, ha_deg, dec_deg },
        Command::SlewRadec { ra_deg, dec_deg } => Request::SlewRaDec { caller, ra_deg, dec_deg },
        Command::TrackRadec { ra_deg, dec_deg } => Request::TrackRaDec { caller, ra_deg, dec_deg },
        Command::Offset { d_ra_deg, d_dec_deg } => Request::OffsetRaDec { caller, d_ra_deg, d_dec_deg },
        Command::Park { name } => Request::Park { caller, name },
        Command::Focus { target_um } => Request::Focus { caller, target_um },
        Command::Stop => Request::Stop { caller },
        Command::Ping => Request::Ping { caller },
        Command::Status => Request::Status,
    };

    match client.send(request).await? {
        Response::Ack => {
            println!("ok");
            Ok(())
        }
        Response::Status(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Response::Error { code, message } => {
            eprintln!("error: {message}");
            std::process::exit(exit_code_for(code));
        }
    }
}

fn exit_code_for(code: ResultCode) -> i32 {
    match code {
        ResultCode::Succeeded => 0,
        other => other as i32,
    }
}
