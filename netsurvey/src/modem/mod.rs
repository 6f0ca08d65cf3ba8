pub mod at_modem;
pub mod parser;
pub mod types;

pub use at_modem::AtModem;
pub use types::{Registration, RegistrationState, SignalQuality, SimState};

use crate::network::{AccessTechnology, Network, UratSetting};
use color_eyre::Result;
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;

/// Modem control operations needed to survey cellular networks.
pub trait CellularModem {
    /// Brings the modem into a usable state, unlocking the SIM with `pin` if
    /// it asks for one.
    fn connect(&mut self, pin: Option<SecretString>) -> Result<()>;

    /// Deregisters from the current network.
    fn disconnect_network(&mut self) -> Result<()>;

    fn set_radio_access_technology(&mut self, setting: UratSetting) -> Result<()>;

    /// Scans for networks. Can take minutes.
    fn available_networks(&mut self) -> Result<Vec<Network>>;

    fn manual_network_selection(
        &mut self,
        operator_numeric: &str,
        access_technology: Option<AccessTechnology>,
    ) -> Result<()>;

    /// Blocks until the modem is registered and reports a usable signal,
    /// returning the `+CSQ` rssi.
    fn wait_for_network_coverage(&mut self, timeout: Duration) -> Result<u8>;

    fn network_registration_status(&mut self) -> Result<Registration>;

    /// Reason of the last failed registration or call, as told by the modem.
    fn extended_error_report(&mut self) -> Result<String>;

    /// Name of the operator the modem is registered on.
    fn network_name(&mut self) -> Result<Option<String>>;

    fn signal_strength_extended(&mut self) -> Result<SignalQuality>;
}

#[derive(Debug, Error)]
pub enum ModemError {
    #[error("SIM requires a PIN but none was configured")]
    PinRequired,
    #[error("SIM is not ready: {0}")]
    SimNotReady(String),
    #[error("network registration denied")]
    RegistrationDenied,
    #[error("modem is not registered and not searching for an operator")]
    NotSearching,
    #[error("no network coverage after {0:?}")]
    CoverageTimeout(Duration),
}
