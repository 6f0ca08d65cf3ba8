use common::ScriptedPort;
use orb_netsurvey::{
    modem::{AtModem, CellularModem, ModemError, RegistrationState, SimState},
    network::{AccessTechnology, NetworkStatus, Urat, UratSetting},
};
use secrecy::SecretString;
use std::time::Duration;
use test_log::test;

mod common;

fn modem(port: &ScriptedPort) -> AtModem<ScriptedPort> {
    AtModem::new("/dev/ttyACM1", port.clone()).with_poll_interval(Duration::ZERO)
}

#[test]
fn it_connects_to_a_modem_with_ready_sim() {
    // Arrange
    let port = ScriptedPort::new()
        .ok("AT", &[])
        .ok("ATE0", &[])
        .ok("AT+CMEE=1", &[])
        .ok("AT+CPIN?", &["+CPIN: READY"])
        .ok("AT+COPS=3,0", &[]);
    let mut modem = modem(&port);

    // Act
    modem.connect(None).unwrap();

    // Assert
    port.assert_done();
    assert_eq!(modem.device(), "/dev/ttyACM1");
}

#[test]
fn it_unlocks_the_sim_with_the_configured_pin() {
    // Arrange
    let port = ScriptedPort::new()
        .ok("AT", &[])
        .ok("ATE0", &[])
        .ok("AT+CMEE=1", &[])
        .ok("AT+CPIN?", &["+CPIN: SIM PIN"])
        .ok("AT+CPIN=\"1234\"", &[])
        .fail("AT+CPIN?", "+CME ERROR: 14")
        .ok("AT+CPIN?", &["+CPIN: READY"])
        .ok("AT+COPS=3,0", &[]);
    let mut modem = modem(&port);

    // Act
    modem
        .connect(Some(SecretString::new("1234".to_string())))
        .unwrap();

    // Assert
    port.assert_done();
}

#[test]
fn it_fails_to_connect_when_the_sim_needs_a_missing_pin() {
    // Arrange
    let port = ScriptedPort::new()
        .ok("AT", &[])
        .ok("ATE0", &[])
        .ok("AT+CMEE=1", &[])
        .ok("AT+CPIN?", &["+CPIN: SIM PIN"]);
    let mut modem = modem(&port);

    // Act
    let err = modem.connect(None).unwrap_err();

    // Assert
    assert!(
        matches!(err.downcast_ref::<ModemError>(), Some(ModemError::PinRequired)),
        "{err:?}"
    );
    port.assert_done();
}

#[test]
fn it_refuses_a_puk_locked_sim() {
    let port = ScriptedPort::new()
        .ok("AT", &[])
        .ok("ATE0", &[])
        .ok("AT+CMEE=1", &[])
        .ok("AT+CPIN?", &["+CPIN: SIM PUK"]);
    let mut modem = modem(&port);

    let err = modem
        .connect(Some(SecretString::new("1234".to_string())))
        .unwrap_err();

    assert!(
        matches!(
            err.downcast_ref::<ModemError>(),
            Some(ModemError::SimNotReady(state)) if *state == SimState::PukRequired.to_string()
        ),
        "{err:?}"
    );
}

#[test]
fn it_sets_radio_access_technology() {
    let port = ScriptedPort::new()
        .ok("AT+URAT=5,3", &[])
        .ok("AT+URAT=0", &[])
        .fail("AT+URAT=3", "ERROR");
    let mut modem = modem(&port);

    modem
        .set_radio_access_technology(UratSetting::DEFAULT)
        .unwrap();
    modem
        .set_radio_access_technology(UratSetting::only(Urat::Gsm))
        .unwrap();
    let err = modem
        .set_radio_access_technology(UratSetting::only(Urat::Lte))
        .unwrap_err();

    assert!(err.to_string().contains("LTE"), "{err}");
    port.assert_done();
}

#[test]
fn it_lists_available_networks() {
    let port = ScriptedPort::new().ok(
        "AT+COPS=?",
        &[
            r#"+COPS: (2,"Telekom.de","TDG","26201",7),(3,"Vodafone.de","Vodafone","26202",0),,(0-4),(0-2)"#,
        ],
    );
    let mut modem = modem(&port);

    let networks = modem.available_networks().unwrap();

    assert_eq!(networks.len(), 2);
    assert_eq!(networks[0].operator_numeric, "26201");
    assert_eq!(networks[0].status, NetworkStatus::Current);
    assert_eq!(networks[1].access_technology, Some(AccessTechnology::Gsm));
    assert!(networks[1].is_forbidden());
}

#[test]
fn it_selects_a_network_manually() {
    let port = ScriptedPort::new()
        .ok("AT+COPS=1,2,\"26201\",7", &[])
        .ok("AT+COPS=1,2,\"26202\"", &[])
        .fail("AT+COPS=1,2,\"26203\",0", "+CME ERROR: 30")
        .ok("AT+CEER", &["+CEER: \"No network service\""]);
    let mut modem = modem(&port);

    modem
        .manual_network_selection("26201", Some(AccessTechnology::EUtran))
        .unwrap();
    modem.manual_network_selection("26202", None).unwrap();
    let err = modem
        .manual_network_selection("26203", Some(AccessTechnology::Gsm))
        .unwrap_err();
    let report = modem.extended_error_report().unwrap();

    assert!(err.to_string().contains("+CME ERROR: 30"), "{err}");
    assert_eq!(report, "No network service");
    port.assert_done();
}

#[test]
fn it_waits_for_registration_and_signal() {
    // Arrange
    let port = ScriptedPort::new()
        .ok("AT+CREG?", &["+CREG: 0,2"])
        .ok("AT+CREG?", &["+CREG: 0,4"])
        .ok("AT+CREG?", &["+CREG: 0,1"])
        .ok("AT+CSQ", &["+CSQ: 99,99"])
        .ok("AT+CSQ", &["+CSQ: 0,99"])
        .ok("AT+CSQ", &["+CSQ: 17,99"]);
    let mut modem = modem(&port);

    // Act
    let rssi = modem
        .wait_for_network_coverage(Duration::from_secs(20))
        .unwrap();

    // Assert
    assert_eq!(rssi, 17);
    port.assert_done();
}

#[test]
fn it_fails_coverage_wait_when_registration_is_denied() {
    let port = ScriptedPort::new()
        .ok("AT+CREG?", &["+CREG: 0,2"])
        .ok("AT+CREG?", &["+CREG: 0,3"]);
    let mut modem = modem(&port);

    let err = modem
        .wait_for_network_coverage(Duration::from_secs(20))
        .unwrap_err();

    assert!(
        matches!(
            err.downcast_ref::<ModemError>(),
            Some(ModemError::RegistrationDenied)
        ),
        "{err:?}"
    );
    port.assert_done();
}

#[test]
fn it_fails_coverage_wait_when_the_modem_stops_searching() {
    let port = ScriptedPort::new().ok("AT+CREG?", &["+CREG: 0,0"]);
    let mut modem = modem(&port);

    let err = modem
        .wait_for_network_coverage(Duration::from_secs(20))
        .unwrap_err();

    assert!(
        matches!(
            err.downcast_ref::<ModemError>(),
            Some(ModemError::NotSearching)
        ),
        "{err:?}"
    );
    port.assert_done();
}

#[test]
fn it_times_out_waiting_for_coverage() {
    let port = ScriptedPort::new().ok("AT+CREG?", &["+CREG: 0,2"]);
    let mut modem = modem(&port);

    let err = modem
        .wait_for_network_coverage(Duration::ZERO)
        .unwrap_err();

    assert!(
        matches!(
            err.downcast_ref::<ModemError>(),
            Some(ModemError::CoverageTimeout(_))
        ),
        "{err:?}"
    );
    port.assert_done();
}

#[test]
fn it_reads_registration_name_and_signal() {
    let port = ScriptedPort::new()
        .ok("AT+CREG?", &[r#"+CREG: 2,1,"1A2B","01C3D4E5",0"#])
        .ok("AT+COPS?", &[r#"+COPS: 1,0,"Telekom.de",0"#])
        .ok("AT+CESQ", &["+CESQ: 42,0,255,255,255,255"]);
    let mut modem = modem(&port);

    let registration = modem.network_registration_status().unwrap();
    let name = modem.network_name().unwrap();
    let signal = modem.signal_strength_extended().unwrap();

    assert_eq!(registration.state, RegistrationState::Home);
    assert_eq!(registration.access_technology, Some(AccessTechnology::Gsm));
    assert_eq!(name.as_deref(), Some("Telekom.de"));
    assert_eq!(signal.rxlev, Some(42));
    assert_eq!(signal.ber, Some(0));
    assert_eq!(signal.rsrp, None);
    assert_eq!(
        port.sent(),
        vec!["AT+CREG?", "AT+COPS?", "AT+CESQ"]
    );
}

#[test]
fn it_deregisters_from_the_network() {
    let port = ScriptedPort::new().ok("AT+COPS=2", &[]);
    let mut modem = modem(&port);

    modem.disconnect_network().unwrap();

    port.assert_done();
}
