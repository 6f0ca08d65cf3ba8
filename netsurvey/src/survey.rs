//! Walks every network the modem can see, pins the radio access technology
//! the network was reported on, registers manually and samples the extended
//! signal quality for a while.

use crate::modem::{CellularModem, Registration, SignalQuality};
use crate::network::{AccessTechnology, Network, UratSetting};
use color_eyre::{eyre::WrapErr, Result};
use secrecy::SecretString;
use serde::Serialize;
use std::io::Write;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub pin: Option<SecretString>,
    /// Restored before the scan and once the survey is done.
    pub default_urat: UratSetting,
    /// Pause after deregistering, so the modem and the network agree on the
    /// selection state before the next manual selection.
    pub settle_delay: Duration,
    pub coverage_timeout: Duration,
    pub samples: usize,
    pub sample_interval: Duration,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            pin: None,
            default_urat: UratSetting::DEFAULT,
            settle_delay: Duration::from_secs(5),
            coverage_timeout: Duration::from_secs(20),
            samples: 20,
            sample_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SurveyReport {
    pub networks: Vec<Network>,
    pub results: Vec<NetworkResult>,
}

#[derive(Debug, Serialize)]
pub struct NetworkResult {
    pub operator: String,
    pub access_technology: Option<AccessTechnology>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    Forbidden {
        error_report: String,
    },
    UnsupportedAccessTechnology,
    SelectionFailed {
        error: String,
        error_report: String,
    },
    RegistrationFailed {
        error: String,
        error_report: String,
    },
    Measured {
        network_name: Option<String>,
        registration: Registration,
        samples: Vec<SignalQuality>,
    },
}

/// Runs the survey, writing progress to `out`.
///
/// Once connected, the modem is always deregistered and set back to
/// `config.default_urat` before returning, even when the survey fails.
pub fn run<M, W>(modem: &mut M, config: &SurveyConfig, out: &mut W) -> Result<SurveyReport>
where
    M: CellularModem + ?Sized,
    W: Write,
{
    modem
        .connect(config.pin.clone())
        .wrap_err("failed to connect to modem")?;

    let surveyed = survey_networks(modem, config, out);
    let restored = restore(modem, config);

    match (surveyed, restored) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), restored) => {
            if let Err(restore_err) = restored {
                warn!(error = ?restore_err, "failed to restore modem after survey error");
            }
            Err(e)
        }
    }
}

fn survey_networks<M, W>(
    modem: &mut M,
    config: &SurveyConfig,
    out: &mut W,
) -> Result<SurveyReport>
where
    M: CellularModem + ?Sized,
    W: Write,
{
    modem.disconnect_network()?;
    modem.set_radio_access_technology(config.default_urat)?;

    info!("Scanning for available networks");
    let networks = modem
        .available_networks()
        .wrap_err("failed to list available networks")?;

    writeln!(out, "Available networks: ")?;
    for network in &networks {
        writeln!(out, "{network}")?;
    }

    let mut results = Vec::with_capacity(networks.len());
    for network in &networks {
        let outcome = survey_network(modem, network, config, out)?;
        results.push(NetworkResult {
            operator: network.operator_numeric.clone(),
            access_technology: network.access_technology,
            outcome,
        });
    }

    Ok(SurveyReport { networks, results })
}

fn survey_network<M, W>(
    modem: &mut M,
    network: &Network,
    config: &SurveyConfig,
    out: &mut W,
) -> Result<Outcome>
where
    M: CellularModem + ?Sized,
    W: Write,
{
    let operator = network.operator_numeric.as_str();
    let act = network.act_code();

    if network.is_forbidden() {
        warn!(operator, act = %act, "Skipping forbidden network");
        writeln!(out, "✗ Skipping forbidden network {operator} on AcT {act}")?;
        let error_report = report_extended_error(modem, out)?;
        return Ok(Outcome::Forbidden { error_report });
    }

    let Some(selection) = network
        .access_technology
        .and_then(AccessTechnology::urat_selection)
    else {
        warn!(operator, act = %act, "No radio access technology to pin, skipping");
        writeln!(
            out,
            "✗ Skipping {operator}. No radio access technology to force for AcT {act}"
        )?;
        return Ok(Outcome::UnsupportedAccessTechnology);
    };

    modem.disconnect_network()?;
    thread::sleep(config.settle_delay);

    // keep the modem on the reported technology, e.g. not reselecting LTE
    modem.set_radio_access_technology(UratSetting::only(selection))?;
    info!(operator, act = %act, urat = %selection, "Running measurements");
    writeln!(out, "Running measurements for {operator} on AcT {act}")?;

    if let Err(e) = modem.manual_network_selection(operator, network.access_technology) {
        warn!(operator, error = ?e, "Manual network selection failed");
        writeln!(out, "✗ Skipping {operator} error: {e:#}")?;
        let error_report = report_extended_error(modem, out)?;
        return Ok(Outcome::SelectionFailed {
            error: format!("{e:#}"),
            error_report,
        });
    }

    let registration = match await_registration(modem, config.coverage_timeout) {
        Ok(registration) => registration,
        Err(e) => {
            warn!(operator, error = ?e, "Unable to register on network");
            writeln!(
                out,
                "✗ Skipping {operator}. Unable to register on network ({e:#})."
            )?;
            let error_report = report_extended_error(modem, out)?;
            return Ok(Outcome::RegistrationFailed {
                error: format!("{e:#}"),
                error_report,
            });
        }
    };
    writeln!(out, "Network registration status: {registration}")?;

    let network_name = modem.network_name()?;
    writeln!(
        out,
        "✓ Connected to network {}",
        network_name.as_deref().unwrap_or("<unknown>")
    )?;

    writeln!(out, "{}", SignalQuality::HEADER)?;
    let mut samples = Vec::with_capacity(config.samples);
    for _ in 0..config.samples {
        let sample = modem.signal_strength_extended()?;
        writeln!(out, "{sample}")?;
        samples.push(sample);
        thread::sleep(config.sample_interval);
    }

    Ok(Outcome::Measured {
        network_name,
        registration,
        samples,
    })
}

fn await_registration<M>(modem: &mut M, timeout: Duration) -> Result<Registration>
where
    M: CellularModem + ?Sized,
{
    modem.wait_for_network_coverage(timeout)?;
    modem.network_registration_status()
}

/// Prints the modem's extended error report. A report that cannot be read is
/// printed as unavailable rather than failing the survey.
fn report_extended_error<M, W>(modem: &mut M, out: &mut W) -> Result<String>
where
    M: CellularModem + ?Sized,
    W: Write,
{
    let report = match modem.extended_error_report() {
        Ok(report) => report,
        Err(e) => {
            warn!(error = ?e, "Failed to read extended error report");
            format!("unavailable ({e})")
        }
    };
    writeln!(out, "└→ Extended error report: {report}")?;

    Ok(report)
}

fn restore<M>(modem: &mut M, config: &SurveyConfig) -> Result<()>
where
    M: CellularModem + ?Sized,
{
    info!(urat = %config.default_urat, "Restoring default radio access technology");
    let disconnected = modem.disconnect_network();
    let restored = modem
        .set_radio_access_technology(config.default_urat)
        .wrap_err("failed to restore default radio access technology");

    disconnected.and(restored)
}
