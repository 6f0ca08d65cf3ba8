use derive_more::Display;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::Serialize;
use std::fmt;

/// Operator status as reported in a `+COPS=?` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum NetworkStatus {
    Unknown = 0,
    Available = 1,
    Current = 2,
    Forbidden = 3,
}

/// 3GPP TS 27.007 `<AcT>` as reported by `+COPS`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum AccessTechnology {
    #[display("GSM")]
    Gsm = 0,
    #[display("GSM compact")]
    GsmCompact = 1,
    #[display("UTRAN")]
    Utran = 2,
    #[display("GSM w/EGPRS")]
    GsmEgprs = 3,
    #[display("UTRAN w/HSDPA")]
    UtranHsdpa = 4,
    #[display("UTRAN w/HSUPA")]
    UtranHsupa = 5,
    #[display("UTRAN w/HSDPA and HSUPA")]
    UtranHsdpaHsupa = 6,
    #[display("E-UTRAN")]
    EUtran = 7,
    #[display("EC-GSM-IoT")]
    EcGsmIot = 8,
    #[display("E-UTRAN NB-S1")]
    EUtranNbS1 = 9,
}

impl AccessTechnology {
    pub fn from_code(code: u8) -> Option<Self> {
        Self::from_u8(code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// The URAT value that pins the modem to this access technology, so that
    /// it does not reselect (e.g. from GSM up to LTE) on its own.
    ///
    /// Access technologies the survey does not know how to pin return `None`.
    pub fn urat_selection(self) -> Option<Urat> {
        match self {
            AccessTechnology::Gsm
            | AccessTechnology::GsmCompact
            | AccessTechnology::GsmEgprs => Some(Urat::Gsm),
            AccessTechnology::EUtran => Some(Urat::Lte),
            _ => None,
        }
    }
}

/// u-blox `AT+URAT` radio access technology values.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum Urat {
    #[display("GSM")]
    Gsm = 0,
    #[display("GSM/UMTS")]
    GsmUmts = 1,
    #[display("UMTS")]
    Umts = 2,
    #[display("LTE")]
    Lte = 3,
    #[display("GSM/UMTS/LTE")]
    GsmUmtsLte = 4,
    #[display("GSM/LTE")]
    GsmLte = 5,
    #[display("UMTS/LTE")]
    UmtsLte = 6,
}

impl Urat {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Selected radio access technology plus, for multi mode selections, the
/// preferred one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UratSetting {
    pub selected: Urat,
    pub preferred: Option<Urat>,
}

impl UratSetting {
    /// GSM/LTE dual mode with LTE preferred.
    pub const DEFAULT: Self = Self {
        selected: Urat::GsmLte,
        preferred: Some(Urat::Lte),
    };

    pub const fn only(selected: Urat) -> Self {
        Self {
            selected,
            preferred: None,
        }
    }

    /// Arguments of `AT+URAT=`.
    pub fn to_at_args(&self) -> String {
        match self.preferred {
            Some(preferred) => format!("{},{}", self.selected.code(), preferred.code()),
            None => self.selected.code().to_string(),
        }
    }
}

impl Default for UratSetting {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for UratSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.preferred {
            Some(preferred) => write!(f, "{} ({preferred} preferred)", self.selected),
            None => write!(f, "{}", self.selected),
        }
    }
}

/// One entry of the operator list returned by `AT+COPS=?`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub operator_long: String,
    pub operator_short: String,
    pub operator_numeric: String,
    pub access_technology: Option<AccessTechnology>,
    pub status: NetworkStatus,
}

impl Network {
    pub fn is_forbidden(&self) -> bool {
        self.status == NetworkStatus::Forbidden
    }

    /// Raw `<AcT>` code for display, `-` when the modem did not report one.
    pub fn act_code(&self) -> String {
        self.access_technology
            .map(|act| act.code().to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.operator_long,
            self.operator_numeric,
            self.act_code()
        )
    }
}
