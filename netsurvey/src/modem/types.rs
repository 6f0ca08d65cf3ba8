use crate::network::AccessTechnology;
use derive_more::Display;
use serde::Serialize;
use std::fmt;

/// `<stat>` of `+CREG` / `+CEREG`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationState {
    #[display("not registered, not searching")]
    NotSearching,
    #[display("registered, home network")]
    Home,
    #[display("not registered, searching")]
    Searching,
    #[display("registration denied")]
    Denied,
    #[display("unknown")]
    Unknown,
    #[display("registered, roaming")]
    Roaming,
    #[display("stat {_0}")]
    Other(u8),
}

impl From<u8> for RegistrationState {
    fn from(stat: u8) -> Self {
        match stat {
            0 => RegistrationState::NotSearching,
            1 => RegistrationState::Home,
            2 => RegistrationState::Searching,
            3 => RegistrationState::Denied,
            4 => RegistrationState::Unknown,
            5 => RegistrationState::Roaming,
            other => RegistrationState::Other(other),
        }
    }
}

impl RegistrationState {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationState::Home | RegistrationState::Roaming)
    }
}

/// Network registration as reported by `AT+CREG?`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// Unsolicited result code mode `<n>`.
    pub mode: u8,
    pub state: RegistrationState,
    pub lac: Option<String>,
    pub cell_id: Option<String>,
    pub access_technology: Option<AccessTechnology>,
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)?;
        if let Some(lac) = &self.lac {
            write!(f, ", lac {lac}")?;
        }
        if let Some(ci) = &self.cell_id {
            write!(f, ", ci {ci}")?;
        }
        if let Some(act) = self.access_technology {
            write!(f, ", AcT {}", act.code())?;
        }
        Ok(())
    }
}

/// Extended signal quality as reported by `AT+CESQ`.
///
/// Every field is the raw 3GPP TS 27.007 index, `None` when the modem reports
/// it as not known or not detectable (99 for rxlev/ber, 255 for the rest).
/// Only the fields of the serving access technology are ever known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalQuality {
    /// GSM received signal strength, 0..=63.
    pub rxlev: Option<u8>,
    /// GSM bit error rate, 0..=7.
    pub ber: Option<u8>,
    /// UTRA received signal code power, 0..=96.
    pub rscp: Option<u8>,
    /// UTRA Ec/No, 0..=49.
    pub ecno: Option<u8>,
    /// E-UTRA reference signal received quality, 0..=34.
    pub rsrq: Option<u8>,
    /// E-UTRA reference signal received power, 0..=97.
    pub rsrp: Option<u8>,
}

impl SignalQuality {
    pub const HEADER: &'static str = "(rxlev, ber, rscp, ecno, rsrq, rsrp)";

    pub fn from_raw([rxlev, ber, rscp, ecno, rsrq, rsrp]: [u8; 6]) -> Self {
        let known = |value: u8, unknown: u8| (value != unknown).then_some(value);
        Self {
            rxlev: known(rxlev, 99),
            ber: known(ber, 99),
            rscp: known(rscp, 255),
            ecno: known(ecno, 255),
            rsrq: known(rsrq, 255),
            rsrp: known(rsrp, 255),
        }
    }
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            self.rxlev, self.ber, self.rscp, self.ecno, self.rsrq, self.rsrp,
        ]
        .map(|v| v.map_or_else(|| "-".to_string(), |v| v.to_string()));

        write!(f, "({})", fields.join(", "))
    }
}

/// Answer to `AT+CPIN?`.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum SimState {
    #[display("READY")]
    Ready,
    #[display("SIM PIN")]
    PinRequired,
    #[display("SIM PUK")]
    PukRequired,
    #[display("{_0}")]
    Other(String),
}

impl From<&str> for SimState {
    fn from(value: &str) -> Self {
        match value {
            "READY" => SimState::Ready,
            "SIM PIN" => SimState::PinRequired,
            "SIM PUK" => SimState::PukRequired,
            other => SimState::Other(other.to_string()),
        }
    }
}
