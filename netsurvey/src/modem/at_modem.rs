use super::{
    parser, CellularModem, ModemError, Registration, RegistrationState, SignalQuality,
    SimState,
};
use crate::at::AtPort;
use crate::network::{AccessTechnology, Network, UratSetting};
use color_eyre::{eyre::WrapErr, Result};
use secrecy::{ExposeSecret, SecretString};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Read timeout of the serial port itself. Commands have their own deadline.
const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(100);
/// `AT+COPS=?` scans all bands.
const NETWORK_SCAN_TIMEOUT: Duration = Duration::from_secs(180);
const NETWORK_SELECTION_TIMEOUT: Duration = Duration::from_secs(180);
const DEREGISTRATION_TIMEOUT: Duration = Duration::from_secs(30);
const SIM_READY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A modem driven through 3GPP TS 27.007 AT commands, plus the u-blox
/// `+URAT` extension for radio access technology selection.
pub struct AtModem<T> {
    device: String,
    port: AtPort<T>,
    poll_interval: Duration,
}

impl AtModem<Box<dyn SerialPort>> {
    /// Opens the specified serial device.
    pub fn open(device: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(device, baud_rate)
            .timeout(SERIAL_READ_TIMEOUT)
            .open()
            .wrap_err_with(|| format!("Failed to open serial port '{}'", device))?;

        Ok(Self::new(device, port))
    }
}

impl<T: Read + Write> AtModem<T> {
    pub fn new(device: impl Into<String>, port: T) -> Self {
        Self {
            device: device.into(),
            port: AtPort::new(port),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How often registration, signal and SIM state are polled while waiting.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Name of the device the modem is attached to, e.g. `/dev/ttyACM1`.
    pub fn device(&self) -> &str {
        &self.device
    }

    fn command(&mut self, command: &str) -> Result<Vec<String>> {
        Ok(self.port.command(command)?)
    }

    fn sim_state(&mut self) -> Result<SimState> {
        let lines = self.command("AT+CPIN?")?;
        Ok(parser::parse_sim_state(&lines)?)
    }

    fn unlock_sim(&mut self, pin: SecretString) -> Result<()> {
        let command = format!("AT+CPIN=\"{}\"", pin.expose_secret());
        self.port
            .sensitive_command(&command, "AT+CPIN=<redacted>")
            .wrap_err("SIM rejected the PIN")?;

        let deadline = Instant::now() + SIM_READY_TIMEOUT;
        loop {
            match self.sim_state() {
                Ok(SimState::Ready) => return Ok(()),
                // the SIM may answer with an error while it is busy unlocking
                Ok(_) | Err(_) if Instant::now() < deadline => {
                    thread::sleep(self.poll_interval)
                }
                Ok(state) => return Err(ModemError::SimNotReady(state.to_string()).into()),
                Err(e) => return Err(e.wrap_err("SIM did not become ready after unlock")),
            }
        }
    }

    fn rssi(&mut self) -> Result<Option<u8>> {
        let lines = self.command("AT+CSQ")?;
        Ok(parser::parse_rssi(&lines)?)
    }
}

impl<T: Read + Write> CellularModem for AtModem<T> {
    fn connect(&mut self, pin: Option<SecretString>) -> Result<()> {
        info!(device = %self.device, "Connecting to modem");
        self.command("AT").wrap_err("modem does not respond to AT")?;
        self.command("ATE0")?;
        // numeric +CME ERROR codes instead of a bare ERROR
        self.command("AT+CMEE=1")?;

        match self.sim_state()? {
            SimState::Ready => debug!("SIM ready"),
            SimState::PinRequired => {
                let pin = pin.ok_or(ModemError::PinRequired)?;
                info!("Unlocking SIM");
                self.unlock_sim(pin)?;
            }
            other => return Err(ModemError::SimNotReady(other.to_string()).into()),
        }

        // long alphanumeric operator names in +COPS?
        self.command("AT+COPS=3,0")?;

        Ok(())
    }

    fn disconnect_network(&mut self) -> Result<()> {
        self.port
            .command_with_timeout("AT+COPS=2", DEREGISTRATION_TIMEOUT)
            .wrap_err("failed to deregister from network")?;

        Ok(())
    }

    fn set_radio_access_technology(&mut self, setting: UratSetting) -> Result<()> {
        debug!(%setting, "Setting radio access technology");
        self.command(&format!("AT+URAT={}", setting.to_at_args()))
            .wrap_err_with(|| format!("failed to set radio access technology {setting}"))?;

        Ok(())
    }

    fn available_networks(&mut self) -> Result<Vec<Network>> {
        let lines = self
            .port
            .command_with_timeout("AT+COPS=?", NETWORK_SCAN_TIMEOUT)?;
        let networks = parser::parse_operator_list(&lines)?;
        debug!(network_count = networks.len(), "Parsed operator list");

        Ok(networks)
    }

    fn manual_network_selection(
        &mut self,
        operator_numeric: &str,
        access_technology: Option<AccessTechnology>,
    ) -> Result<()> {
        let command = match access_technology {
            Some(act) => format!("AT+COPS=1,2,\"{operator_numeric}\",{}", act.code()),
            None => format!("AT+COPS=1,2,\"{operator_numeric}\""),
        };
        self.port
            .command_with_timeout(&command, NETWORK_SELECTION_TIMEOUT)?;

        Ok(())
    }

    fn wait_for_network_coverage(&mut self, timeout: Duration) -> Result<u8> {
        let deadline = Instant::now() + timeout;

        loop {
            let registration = self.network_registration_status()?;
            match registration.state {
                state if state.is_registered() => break,
                RegistrationState::Denied => {
                    return Err(ModemError::RegistrationDenied.into());
                }
                RegistrationState::NotSearching => {
                    return Err(ModemError::NotSearching.into());
                }
                state => debug!(%state, "Waiting for registration"),
            }
            if Instant::now() >= deadline {
                return Err(ModemError::CoverageTimeout(timeout).into());
            }
            thread::sleep(self.poll_interval);
        }

        loop {
            if let Some(rssi) = self.rssi()?.filter(|rssi| *rssi > 0) {
                return Ok(rssi);
            }
            if Instant::now() >= deadline {
                return Err(ModemError::CoverageTimeout(timeout).into());
            }
            thread::sleep(self.poll_interval);
        }
    }

    fn network_registration_status(&mut self) -> Result<Registration> {
        let lines = self.command("AT+CREG?")?;
        Ok(parser::parse_registration(&lines)?)
    }

    fn extended_error_report(&mut self) -> Result<String> {
        let lines = self.command("AT+CEER")?;
        Ok(parser::parse_error_report(&lines))
    }

    fn network_name(&mut self) -> Result<Option<String>> {
        let lines = self.command("AT+COPS?")?;
        Ok(parser::parse_operator_name(&lines)?)
    }

    fn signal_strength_extended(&mut self) -> Result<SignalQuality> {
        let lines = self.command("AT+CESQ")?;
        Ok(parser::parse_signal_quality(&lines)?)
    }
}
