#![cfg(feature = "mock")]

use libcanbus::data_link::{dlc_from_length, length_from_dlc};
use libcanbus::driver::{Handle, Parameter, Status};
use libcanbus::error::CanBusError;
use libcanbus::physical::enumerate::{attached_channel_names, shutdown_all};
use libcanbus::physical::mock::MockDriver;
use libcanbus::types::{BusMode, FilterMode, FrameKind, Message};
use libcanbus::{Bus, BusConfig, PcanBus};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn config_from_json(json: &str) -> BusConfig {
    serde_json::from_str(json).unwrap()
}

/// Sends `msg` and waits for it to come back on `bus`.
fn exchange(bus: &mut dyn Bus, msg: &Message) -> Option<Message> {
    bus.send(msg).unwrap();
    bus.recv(200).unwrap()
}

#[test]
fn test_json_config_to_echo() {
    let driver = Arc::new(MockDriver::with_channels(&[Handle::USBBUS1]));
    let config = config_from_json(
        r#"{
            "channel": "PCAN_USBBUS1",
            "baudRate": 250000,
            "busMode": "active",
            "recvEchoFrames": true
        }"#,
    );
    let mut bus = PcanBus::open(driver, config).unwrap();

    let msg = Message::new_standard(0x123, &[0x55; 8]);
    assert_eq!(dlc_from_length(msg.data.len()), 8);

    let echo = exchange(&mut bus, &msg).unwrap();
    assert_eq!(echo.id, msg.id);
    assert_eq!(echo.data, msg.data);
    assert_eq!(echo.is_extended, msg.is_extended);
    assert_eq!(echo.dlc, 8);
    assert_eq!(length_from_dlc(echo.dlc), echo.data.len());

    bus.shutdown().unwrap();
}

#[test]
fn test_two_channels_exchange_fd_frames() {
    let driver = Arc::new(MockDriver::with_channels(&[
        Handle::USBBUS1,
        Handle::USBBUS2,
    ]));
    let fd = |channel: &str| BusConfig {
        channel: channel.to_string(),
        is_fd: true,
        fd_bitrate: Some("f_clock=80000000,nom_brp=10,nom_tseg1=12,nom_tseg2=3,nom_sjw=1".into()),
        ..BusConfig::default()
    };
    let mut tester = PcanBus::open(Arc::clone(&driver), fd("PCAN_USBBUS1")).unwrap();
    let mut ecu = PcanBus::open(Arc::clone(&driver), fd("PCAN_USBBUS2")).unwrap();

    let request = Message::new_extended(0x18DA_10F1, &[0x22; 48]).with_fd();
    tester.send(&request).unwrap();

    let received = ecu.recv(200).unwrap().unwrap();
    assert_eq!(received.id, request.id);
    assert_eq!(received.data, request.data);
    assert!(received.is_fd);
    assert!(received.is_extended);
    assert_eq!(received.kind, FrameKind::DataFrame);
    assert_eq!(received.channel, "PCAN_USBBUS2");

    // without echo the sender sees nothing
    assert!(tester.recv(10).unwrap().is_none());
}

#[test]
fn test_filter_and_reset_through_trait() {
    let driver = Arc::new(MockDriver::with_channels(&[Handle::USBBUS1]));
    let config = BusConfig {
        recv_echo_frames: true,
        ..BusConfig::default()
    };
    let mut bus: Box<dyn Bus> = Box::new(PcanBus::open(driver, config).unwrap());

    bus.set_filter(0x100, 0x200, FilterMode::Extended).unwrap();
    assert!(exchange(bus.as_mut(), &Message::new_standard(0x050, &[1])).is_none());

    bus.reset_filter().unwrap();
    let echo = exchange(bus.as_mut(), &Message::new_standard(0x050, &[1])).unwrap();
    assert_eq!(echo.id, 0x050);
}

#[test]
fn test_recv_timeout_is_not_an_error() {
    let driver = Arc::new(MockDriver::with_channels(&[Handle::USBBUS1]));
    let mut bus = PcanBus::open(driver, BusConfig::default()).unwrap();

    let start = Instant::now();
    assert!(bus.recv(50).unwrap().is_none());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(45));
    assert!(elapsed < Duration::from_millis(500));
}

#[test]
fn test_listen_only_bus() {
    let driver = Arc::new(MockDriver::with_channels(&[
        Handle::USBBUS1,
        Handle::USBBUS2,
    ]));
    let mut active = PcanBus::open(Arc::clone(&driver), BusConfig::default()).unwrap();
    let mut passive = PcanBus::open(
        Arc::clone(&driver),
        config_from_json(r#"{ "channel": "PCAN_USBBUS2", "busMode": "passive" }"#),
    )
    .unwrap();
    assert_eq!(passive.bus_mode(), BusMode::Passive);

    active.send(&Message::new_standard(0x7E8, &[0x02, 0x50, 0x01])).unwrap();
    assert_eq!(passive.recv(100).unwrap().unwrap().id, 0x7E8);

    let err = passive
        .send(&Message::new_standard(0x7E0, &[0x02, 0x10, 0x01]))
        .unwrap_err();
    assert_eq!(err.status(), Some(Status::ILLOPERATION));
}

#[test]
fn test_enumerate_and_shutdown_all() {
    let driver = Arc::new(MockDriver::with_channels(&[
        Handle::USBBUS2,
        Handle::USBBUS5,
    ]));
    let bus = PcanBus::open(
        Arc::clone(&driver),
        BusConfig {
            channel: "PCAN_USBBUS5".into(),
            ..BusConfig::default()
        },
    )
    .unwrap();

    assert_eq!(
        attached_channel_names(driver.as_ref()).unwrap(),
        vec!["PCAN_USBBUS2", "PCAN_USBBUS5"]
    );

    shutdown_all(driver.as_ref()).unwrap();
    assert!(matches!(bus.status(), Err(CanBusError::Driver { .. })));
}

#[test]
fn test_unsupported_parameter_is_distinguishable() {
    let driver = Arc::new(MockDriver::with_channels(&[Handle::USBBUS1]));
    driver.mark_unsupported(Parameter::ALLOW_ECHO_FRAMES);

    let config = BusConfig {
        recv_echo_frames: true,
        ..BusConfig::default()
    };
    let mut bus = PcanBus::open(driver, config).unwrap();

    match bus.set_parameter(Parameter::ALLOW_ECHO_FRAMES, 1) {
        Err(err @ CanBusError::UnsupportedParameter { .. }) => assert!(err.is_retryable()),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(bus.status_is_okay().unwrap());
}
