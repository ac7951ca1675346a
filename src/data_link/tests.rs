use super::native::{FrameFormat, MessageType, NativeFrame, NativeTimestamp};
use super::*;

#[test]
fn test_dlc_table_round_trip() {
    for dlc in 0..=15u8 {
        assert_eq!(dlc_from_length(length_from_dlc(dlc)), dlc);
    }
}

#[test]
fn test_dlc_from_length_covers_length() {
    for len in 0..=64usize {
        assert!(length_from_dlc(dlc_from_length(len)) >= len);
    }
}

#[test]
fn test_dlc_from_length_picks_smallest_code() {
    assert_eq!(dlc_from_length(8), 8);
    assert_eq!(dlc_from_length(9), 9);
    assert_eq!(dlc_from_length(12), 9);
    assert_eq!(dlc_from_length(13), 10);
    assert_eq!(dlc_from_length(33), 14);
    assert_eq!(dlc_from_length(64), 15);
    assert_eq!(dlc_from_length(65), 15);
}

#[test]
fn test_fd_lengths() {
    assert_eq!(length_from_dlc(9), 12);
    assert_eq!(length_from_dlc(10), 16);
    assert_eq!(length_from_dlc(11), 20);
    assert_eq!(length_from_dlc(12), 24);
    assert_eq!(length_from_dlc(13), 32);
    assert_eq!(length_from_dlc(14), 48);
    assert_eq!(length_from_dlc(15), 64);
}

#[test]
#[should_panic]
fn test_length_from_dlc_out_of_range() {
    length_from_dlc(16);
}

#[test]
fn test_classify_fd_brs_extended() {
    let msg_type = MessageType::FD | MessageType::BRS | MessageType::EXTENDED;
    let frame = NativeFrame::new(FrameFormat::Fd, 0x18DA_F110, msg_type, 9, &[0; 12]).unwrap();
    let msg = decode(&frame, 0, "PCAN_USBBUS1");

    assert_eq!(msg.kind, FrameKind::DataFrame);
    assert!(msg.is_extended);
    assert!(msg.is_fd);
}

#[test]
fn test_classify_kinds() {
    assert_eq!(classify(MessageType::STANDARD), FrameKind::DataFrame);
    assert_eq!(classify(MessageType::RTR), FrameKind::RemoteFrame);
    assert_eq!(classify(MessageType::ERRFRAME), FrameKind::ErrorFrame);
    assert_eq!(classify(MessageType::STATUS), FrameKind::ErrorFrame);
    assert_eq!(classify(MessageType::BRS), FrameKind::FdBitRateSwitch);
    assert_eq!(classify(MessageType::ESI), FrameKind::FdErrorStateIndicator);
    assert_eq!(classify(MessageType::ECHO), FrameKind::DataFrame);
    assert_eq!(
        classify(MessageType::ECHO | MessageType::RTR),
        FrameKind::RemoteFrame
    );
}

#[test]
fn test_decode_only_rtr() {
    let frame = NativeFrame::new(FrameFormat::Classic, 0x321, MessageType::RTR, 2, &[]).unwrap();
    let msg = decode(&frame, 0, "PCAN_USBBUS1");
    assert_eq!(msg.kind, FrameKind::RemoteFrame);
    assert!(!msg.is_extended);
    assert!(!msg.is_fd);
}

#[test]
fn test_decode_truncates_trailing_bytes() {
    let frame = NativeFrame::new(
        FrameFormat::Classic,
        0x100,
        MessageType::STANDARD,
        3,
        &[1, 2, 3, 0xDE, 0xAD, 0xBE, 0xEF, 0xFF],
    )
    .unwrap();

    let msg = decode(&frame, 42, "PCAN_USBBUS2");
    assert_eq!(msg.data, vec![1, 2, 3]);
    assert_eq!(msg.dlc, 3);
    assert_eq!(msg.timestamp, 42);
    assert_eq!(msg.channel, "PCAN_USBBUS2");
}

#[test]
fn test_decode_classic_dlc_above_eight() {
    // classic controllers report 8 bytes for any dlc past 8
    let frame =
        NativeFrame::new(FrameFormat::Classic, 0x100, MessageType::STANDARD, 12, &[9; 8]).unwrap();
    let msg = decode(&frame, 0, "");
    assert_eq!(msg.data.len(), 8);
    assert_eq!(msg.dlc, 8);
    assert_eq!(length_from_dlc(msg.dlc), msg.data.len());
}

#[test]
fn test_decode_fd_qualifier_bits() {
    for msg_type in [MessageType::BRS, MessageType::ESI] {
        let frame = NativeFrame::new(FrameFormat::Fd, 0x42, msg_type, 9, &[7; 12]).unwrap();
        let msg = decode(&frame, 0, "PCAN_USBBUS1");
        assert!(msg.is_fd, "{:?}", msg_type);
        assert!(!msg.is_extended);
        assert_eq!(msg.data.len(), 12);
    }

    let esi = NativeFrame::new(FrameFormat::Fd, 0x42, MessageType::ESI, 0, &[]).unwrap();
    assert_eq!(decode(&esi, 0, "").kind, FrameKind::FdErrorStateIndicator);
    let brs = NativeFrame::new(FrameFormat::Fd, 0x42, MessageType::BRS, 0, &[]).unwrap();
    assert_eq!(decode(&brs, 0, "").kind, FrameKind::FdBitRateSwitch);
}

#[test]
fn test_encode_standard() {
    let msg = Message::new_standard(0x123, &[0x55; 8]);
    let frame = encode(&msg, FrameFormat::Classic).unwrap();

    assert_eq!(frame.id(), 0x123);
    assert_eq!(frame.msg_type(), MessageType::STANDARD);
    assert_eq!(frame.dlc(), 8);
    assert_eq!(frame.raw_data(), &[0x55; 8]);
}

#[test]
fn test_encode_zero_extends() {
    let msg = Message::new_extended(0x1ABC_DEF0, &[1; 10]).with_fd();
    let frame = encode(&msg, FrameFormat::Fd).unwrap();

    assert_eq!(frame.msg_type(), MessageType::EXTENDED | MessageType::FD);
    assert_eq!(frame.dlc(), 9);
    assert_eq!(&frame.raw_data()[..10], &[1; 10]);
    assert!(frame.raw_data()[10..].iter().all(|&b| b == 0));

    let decoded = decode(&frame, 0, "");
    assert_eq!(decoded.data.len(), 12);
    assert_eq!(&decoded.data[..10], &msg.data[..]);
}

#[test]
fn test_encode_flags() {
    let remote = Message::new_standard(0x10, &[]).with_kind(FrameKind::RemoteFrame);
    let frame = encode(&remote, FrameFormat::Classic).unwrap();
    assert_eq!(frame.msg_type(), MessageType::RTR);

    let brs = Message::new_standard(0x10, &[0; 16])
        .with_fd()
        .with_kind(FrameKind::FdBitRateSwitch);
    let frame = encode(&brs, FrameFormat::Fd).unwrap();
    assert_eq!(frame.msg_type(), MessageType::FD | MessageType::BRS);
    assert_eq!(frame.dlc(), 10);
}

#[test]
fn test_encode_rejections() {
    let too_long = Message::new_standard(0x10, &[0; 65]).with_fd();
    assert!(matches!(
        encode(&too_long, FrameFormat::Fd),
        Err(CanBusError::PayloadTooLarge { len: 65, max: 64 })
    ));

    let classic_overflow = Message::new_standard(0x10, &[0; 9]);
    assert!(matches!(
        encode(&classic_overflow, FrameFormat::Classic),
        Err(CanBusError::PayloadTooLarge { len: 9, max: 8 })
    ));

    let classic_on_fd = Message::new_standard(0x10, &[0xAB; 12]);
    assert!(matches!(
        encode(&classic_on_fd, FrameFormat::Fd),
        Err(CanBusError::PayloadTooLarge { len: 12, max: 8 })
    ));
    let classic_fits = Message::new_standard(0x10, &[0xAB; 8]);
    let frame = encode(&classic_fits, FrameFormat::Fd).unwrap();
    assert_eq!(frame.msg_type(), MessageType::STANDARD);
    assert_eq!(frame.dlc(), 8);

    let wide_id = Message::new_standard(0x800, &[]);
    assert!(matches!(
        encode(&wide_id, FrameFormat::Classic),
        Err(CanBusError::InvalidId { id: 0x800, extended: false })
    ));

    let fd_on_classic = Message::new_standard(0x10, &[]).with_fd();
    assert!(matches!(
        encode(&fd_on_classic, FrameFormat::Classic),
        Err(CanBusError::InvalidFrame(_))
    ));
}

#[test]
fn test_status_frame_state() {
    let frame = NativeFrame::new(
        FrameFormat::Classic,
        0,
        MessageType::STATUS,
        4,
        &[0, 0, 0, 0x04],
    )
    .unwrap();
    assert_eq!(status_frame_state(&frame), Some(Status::BUSLIGHT));

    let data = NativeFrame::new(FrameFormat::Classic, 0, MessageType::STANDARD, 4, &[0; 4]).unwrap();
    assert_eq!(status_frame_state(&data), None);
}

#[test]
fn test_bus_status() {
    assert_eq!(BusStatus::from_status(Status::OK), BusStatus::Active);
    assert_eq!(BusStatus::from_status(Status::BUSHEAVY), BusStatus::Warning);
    assert_eq!(
        BusStatus::from_status(Status::BUSPASSIVE | Status::BUSLIGHT),
        BusStatus::ErrorPassive
    );
    assert_eq!(
        BusStatus::from_status(Status::BUSOFF | Status::BUSPASSIVE),
        BusStatus::BusOff
    );
}

#[test]
fn test_decode_uses_classic_timestamp() {
    let ts = NativeTimestamp {
        millis: 10,
        millis_overflow: 0,
        micros: 5,
    };
    let frame = NativeFrame::new(FrameFormat::Classic, 1, MessageType::STANDARD, 0, &[]).unwrap();
    assert_eq!(decode(&frame, ts.as_micros(), "").timestamp, 10_005);
}
