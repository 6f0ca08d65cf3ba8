use super::types::{Registration, RegistrationState, SignalQuality, SimState};
use crate::at::{information, ParseError};
use crate::network::{AccessTechnology, Network, NetworkStatus};
use num_traits::FromPrimitive;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// `(stat,"long","short","numeric"[,AcT])` entries of `+COPS=?`.
static OPERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\((?P<stat>\d+),"(?P<long>[^"]*)","(?P<short>[^"]*)","(?P<numeric>[^"]*)"(?:,(?P<act>\d+))?\)"#)
        .unwrap()
});

/// `<mode>[,<format>,"<oper>"[,<AcT>]]` of `+COPS?`.
static CURRENT_OPERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\d+(?:,\d+,"(?P<oper>[^"]*)")?"#).unwrap()
});

/// Quoted strings of a `+CEER` report.
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]*)""#).unwrap());

fn fields(payload: &str) -> Vec<&str> {
    payload.split(',').map(|f| f.trim().trim_matches('"')).collect()
}

fn number(field: Option<&&str>, prefix: &'static str, payload: &str) -> Result<u8, ParseError> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| ParseError::new(prefix, payload))
}

/// Parses the operator list of `AT+COPS=?`, e.g.
/// `+COPS: (2,"Telekom.de","TDG","26201",7),(3,"o2 - de","o2 - de","26203",0),,(0-4),(0-2)`.
///
/// Entries with a status or access technology outside of 3GPP TS 27.007 are
/// dropped.
pub fn parse_operator_list(lines: &[String]) -> Result<Vec<Network>, ParseError> {
    const PREFIX: &str = "+COPS:";
    let payload =
        information(lines, PREFIX).ok_or_else(|| ParseError::new(PREFIX, lines.join("\n")))?;

    let networks = OPERATOR_RE
        .captures_iter(payload)
        .filter_map(|captures| {
            let entry = captures.get(0)?.as_str();
            let stat: u8 = captures.name("stat")?.as_str().parse().ok()?;
            let Some(status) = NetworkStatus::from_u8(stat) else {
                warn!(entry, "ignoring operator with unknown status");
                return None;
            };

            let access_technology = match captures.name("act") {
                None => None,
                Some(act) => {
                    let act = act.as_str().parse().ok().and_then(AccessTechnology::from_code);
                    if act.is_none() {
                        warn!(entry, "ignoring operator with unknown access technology");
                        return None;
                    }
                    act
                }
            };

            Some(Network {
                operator_long: captures.name("long")?.as_str().to_string(),
                operator_short: captures.name("short")?.as_str().to_string(),
                operator_numeric: captures.name("numeric")?.as_str().to_string(),
                access_technology,
                status,
            })
        })
        .collect();

    Ok(networks)
}

/// Parses the operator name of `AT+COPS?`, `None` when not registered.
pub fn parse_operator_name(lines: &[String]) -> Result<Option<String>, ParseError> {
    const PREFIX: &str = "+COPS:";
    let payload =
        information(lines, PREFIX).ok_or_else(|| ParseError::new(PREFIX, lines.join("\n")))?;

    let captures = CURRENT_OPERATOR_RE
        .captures(payload)
        .ok_or_else(|| ParseError::new(PREFIX, payload))?;

    Ok(captures.name("oper").map(|oper| oper.as_str().to_string()))
}

/// Parses `+CREG: <n>,<stat>[,<lac>,<ci>[,<AcT>]]`.
pub fn parse_registration(lines: &[String]) -> Result<Registration, ParseError> {
    const PREFIX: &str = "+CREG:";
    let payload =
        information(lines, PREFIX).ok_or_else(|| ParseError::new(PREFIX, lines.join("\n")))?;
    let fields = fields(payload);

    let mode = number(fields.first(), PREFIX, payload)?;
    let stat = number(fields.get(1), PREFIX, payload)?;
    let non_empty = |idx: usize| {
        fields
            .get(idx)
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string())
    };

    Ok(Registration {
        mode,
        state: RegistrationState::from(stat),
        lac: non_empty(2),
        cell_id: non_empty(3),
        access_technology: fields
            .get(4)
            .and_then(|f| f.parse().ok())
            .and_then(AccessTechnology::from_code),
    })
}

/// Parses `+CESQ: <rxlev>,<ber>,<rscp>,<ecno>,<rsrq>,<rsrp>`.
pub fn parse_signal_quality(lines: &[String]) -> Result<SignalQuality, ParseError> {
    const PREFIX: &str = "+CESQ:";
    let payload =
        information(lines, PREFIX).ok_or_else(|| ParseError::new(PREFIX, lines.join("\n")))?;
    let fields = fields(payload);
    if fields.len() != 6 {
        return Err(ParseError::new(PREFIX, payload));
    }

    let mut raw = [0u8; 6];
    for (slot, field) in raw.iter_mut().zip(&fields) {
        *slot = number(Some(field), PREFIX, payload)?;
    }

    Ok(SignalQuality::from_raw(raw))
}

/// Parses the `<rssi>` of `+CSQ: <rssi>,<ber>`, `None` when not known (99).
pub fn parse_rssi(lines: &[String]) -> Result<Option<u8>, ParseError> {
    const PREFIX: &str = "+CSQ:";
    let payload =
        information(lines, PREFIX).ok_or_else(|| ParseError::new(PREFIX, lines.join("\n")))?;
    let rssi = number(fields(payload).first(), PREFIX, payload)?;

    Ok((rssi != 99).then_some(rssi))
}

/// Text of `+CEER: <report>`, empty when the modem has nothing to report.
///
/// Reports made of several quoted fields, e.g.
/// `+CEER: "Location update failure","PLMN not allowed"`, are joined with
/// `, `. Unquoted reports are returned as is.
pub fn parse_error_report(lines: &[String]) -> String {
    let Some(payload) = information(lines, "+CEER:") else {
        return String::new();
    };

    let quoted: Vec<&str> = QUOTED_RE
        .captures_iter(payload)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .collect();
    if quoted.is_empty() {
        payload.to_string()
    } else {
        quoted.join(", ")
    }
}

/// Parses `+CPIN: <code>`.
pub fn parse_sim_state(lines: &[String]) -> Result<SimState, ParseError> {
    const PREFIX: &str = "+CPIN:";
    let payload =
        information(lines, PREFIX).ok_or_else(|| ParseError::new(PREFIX, lines.join("\n")))?;

    Ok(SimState::from(payload))
}
