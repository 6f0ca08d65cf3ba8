use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use secrecy::SecretString;
use serde_json::to_string_pretty;

use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

use orb_netsurvey::{
    modem::AtModem,
    network::UratSetting,
    survey::{self, SurveyConfig},
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(
        short = 'm',
        long = "modem",
        default_value = "/dev/ttyACM1",
        help = "Path to the modem serial device"
    )]
    modem: String,

    #[arg(
        short = 'b',
        long = "baud",
        default_value_t = 115_200,
        help = "Baud rate of the modem serial device"
    )]
    baud: u32,

    #[arg(
        long = "pin",
        env = "ORB_NETSURVEY_SIM_PIN",
        hide_env_values = true,
        help = "SIM PIN, only used if the SIM asks for one"
    )]
    pin: Option<String>,

    #[arg(
        long = "settle-secs",
        default_value_t = 5,
        help = "Seconds to wait after deregistering before selecting the next network"
    )]
    settle_secs: u64,

    #[arg(
        long = "coverage-timeout-secs",
        default_value_t = 20,
        help = "Seconds to wait for registration and signal after a manual selection"
    )]
    coverage_timeout_secs: u64,

    #[arg(
        long = "samples",
        default_value_t = 20,
        help = "Signal quality samples taken per network"
    )]
    samples: usize,

    #[arg(
        long = "sample-interval-ms",
        default_value_t = 1000,
        help = "Milliseconds between two signal quality samples"
    )]
    sample_interval_ms: u64,

    #[arg(long = "json", help = "Print the survey report as JSON once done")]
    json: bool,
}

impl Cli {
    fn survey_config(&self) -> SurveyConfig {
        SurveyConfig {
            pin: self.pin.clone().map(SecretString::new),
            default_urat: UratSetting::DEFAULT,
            settle_delay: Duration::from_secs(self.settle_secs),
            coverage_timeout: Duration::from_secs(self.coverage_timeout_secs),
            samples: self.samples,
            sample_interval: Duration::from_millis(self.sample_interval_ms),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "Initializing modem...")?;
    info!("Initializing modem on {}", cli.modem);
    let mut modem = AtModem::open(&cli.modem, cli.baud)?;

    let config = cli.survey_config();
    debug!(?config, "Survey configuration");
    let report = survey::run(&mut modem, &config, &mut out)?;

    info!(
        device = modem.device(),
        networks = report.networks.len(),
        "Survey finished"
    );

    if cli.json {
        writeln!(out, "{}", to_string_pretty(&report)?)?;
    }

    Ok(())
}
