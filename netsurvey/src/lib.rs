//! Cellular network survey over an AT command modem.
//!
//! For every operator the modem can see, the survey pins the radio access
//! technology the operator was reported on, registers manually and samples
//! the extended signal quality. See [`survey::run`].

pub mod at;
pub mod modem;
pub mod network;
pub mod survey;
