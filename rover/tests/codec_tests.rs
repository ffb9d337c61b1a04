use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, Datelike, Timelike, Utc};
use proptest::prelude::*;
use rtk_rover::{
    cfg_name_to_key, parser::ubx_checksum, CfgKeyRef, CfgLayerGet, CodecError, ErrorPolicy,
    MsgMode, RtcmReader, UbxMessage, Value,
};

static FULL_ACK_ACK_PACK: [u8; 10] = [0xb5, 0x62, 0x5, 0x1, 0x2, 0x0, 0x6, 0x1, 0xf, 0x38];

fn frame(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let mut core = vec![class, id];
    core.write_u16::<LittleEndian>(payload.len() as u16).unwrap();
    core.extend_from_slice(payload);
    let ck = ubx_checksum(&core);
    let mut out = vec![0xb5, 0x62];
    out.extend_from_slice(&core);
    out.extend_from_slice(&ck);
    out
}

#[test]
fn test_ack_ack_known_vector() {
    let ack = UbxMessage::builder("ACK-ACK", MsgMode::Get)
        .set("clsID", 0x06u8)
        .set("msgID", 0x01u8)
        .build()
        .unwrap();
    assert_eq!(ack.serialize(), FULL_ACK_ACK_PACK);
    assert_eq!(ack.checksum(), [0x0f, 0x38]);
    assert_eq!(ubx_checksum(&FULL_ACK_ACK_PACK[2..8]), [0x0f, 0x38]);
    assert_eq!(ack.to_string(), "<UBX(ACK-ACK, clsID=CFG, msgID=CFG-MSG)>");
}

#[test]
fn test_cfg_valget_three_pairs_mixed_widths() {
    let mut payload = vec![0x01, 0x00, 0x00, 0x00];
    payload.write_u32::<LittleEndian>(0x30210001).unwrap(); // CFG_RATE_MEAS, 2 bytes
    payload.write_u16::<LittleEndian>(1000).unwrap();
    payload.write_u32::<LittleEndian>(0x10930006).unwrap(); // CFG_NMEA_HIGHPREC, 1 bit
    payload.write_u8(1).unwrap();
    payload.write_u32::<LittleEndian>(0x40520001).unwrap(); // CFG_UART1_BAUDRATE, 4 bytes
    payload.write_u32::<LittleEndian>(460_800).unwrap();

    let msg = UbxMessage::decode(&frame(0x06, 0x8b, &payload)).unwrap();
    assert_eq!(msg.identity(), "CFG-VALGET");
    let cfg: Vec<_> = msg.fields().filter(|(name, _)| name.starts_with("CFG_")).collect();
    assert_eq!(
        cfg,
        [
            ("CFG_RATE_MEAS", &Value::Unsigned(1000)),
            ("CFG_NMEA_HIGHPREC", &Value::Bool(true)),
            ("CFG_UART1_BAUDRATE", &Value::Unsigned(460_800)),
        ]
    );
}

#[test]
fn test_cfg_valget_unknown_key_uses_size_class() {
    let mut payload = vec![0x01, 0x00, 0x00, 0x00];
    payload.write_u32::<LittleEndian>(0x40990001).unwrap();
    payload.write_u32::<LittleEndian>(0xdeadbeef).unwrap();
    let msg = UbxMessage::decode(&frame(0x06, 0x8b, &payload)).unwrap();
    assert_eq!(
        msg.get("CFG_0x40990001"),
        Some(&Value::Unsigned(0xdeadbeef))
    );
}

#[test]
fn test_config_poll_frame() {
    let poll = UbxMessage::config_poll(
        CfgLayerGet::Ram,
        0,
        &[CfgKeyRef::Name("CFG_SIGNAL_GPS_ENA"), CfgKeyRef::Id(0x10310021)],
    )
    .unwrap();
    let bytes = poll.serialize();
    assert_eq!(&bytes[2..6], &[0x06, 0x8b, 12, 0]);
    let gps = cfg_name_to_key("CFG_SIGNAL_GPS_ENA").unwrap().id.0;
    assert_eq!(&bytes[10..14], &gps.to_le_bytes());
    assert_eq!(&bytes[14..18], &0x10310021u32.to_le_bytes());
}

#[test]
fn test_decode_checks_frame() {
    let mut bad = FULL_ACK_ACK_PACK;
    bad[7] = 0x02;
    assert!(matches!(
        UbxMessage::decode(&bad),
        Err(CodecError::InvalidChecksum { .. })
    ));
    assert!(matches!(
        UbxMessage::decode(&FULL_ACK_ACK_PACK[..9]),
        Err(CodecError::InvalidPacketLen { .. })
    ));
}

#[test]
fn test_unknown_message_is_nominal() {
    let msg = UbxMessage::decode(&frame(0x02, 0x99, &[1, 2])).unwrap();
    assert!(msg.identity().ends_with("-NOMINAL"));
    assert_eq!(msg.get("data_01"), Some(&Value::Bytes(vec![1])));
    assert_eq!(msg.get("data_02"), Some(&Value::Bytes(vec![2])));
}

#[test]
fn test_nav_pvt_date_time() {
    let mut payload = vec![0u8; 92];
    payload[4..6].copy_from_slice(&2024u16.to_le_bytes());
    payload[6] = 2;
    payload[7] = 29;
    payload[8] = 23;
    payload[9] = 59;
    payload[10] = 58;
    payload[16..20].copy_from_slice(&500_000_000i32.to_le_bytes());
    let msg = UbxMessage::decode(&frame(0x01, 0x07, &payload)).unwrap();
    let dt = DateTime::<Utc>::try_from(&msg).unwrap();
    assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 2, 29));
    assert_eq!((dt.hour(), dt.minute(), dt.second()), (23, 59, 58));
    assert_eq!(dt.nanosecond(), 500_000_000);
}

#[tokio::test]
async fn test_rtcm_stream_after_caster_header() {
    let mut stream = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();
    let first = [0xd3, 0x00, 0x02, 0xaa, 0xbb, 0x00, 0x00, 0x00];
    let second = [0xd3, 0x00, 0x01, 0xcc, 0x12, 0x34, 0x56];
    stream.extend_from_slice(&first);
    stream.extend_from_slice(&second);
    let mut reader = RtcmReader::new(stream.as_slice(), ErrorPolicy::Ignore);
    assert_eq!(reader.read_one().await.unwrap().unwrap(), first);
    assert_eq!(reader.read_one().await.unwrap().unwrap(), second);
    assert_eq!(reader.read_one().await.unwrap(), None);
}

/// NAV-PVT payload with the given position and accuracy, everything else zero
fn nav_pvt_payload(lon: i32, lat: i32, h_acc: u32, v_acc: u32) -> Vec<u8> {
    let mut wtr = vec![0u8; 24];
    wtr.write_i32::<LittleEndian>(lon).unwrap();
    wtr.write_i32::<LittleEndian>(lat).unwrap();
    wtr.extend_from_slice(&[0u8; 8]); // height, hMSL
    wtr.write_u32::<LittleEndian>(h_acc).unwrap();
    wtr.write_u32::<LittleEndian>(v_acc).unwrap();
    wtr.resize(92, 0);
    wtr
}

proptest! {
    #[test]
    fn test_nav_pvt_generated_frames(
        lon in -1_800_000_000i32..=1_800_000_000,
        lat in -900_000_000i32..=900_000_000,
        h_acc in any::<u32>(),
        v_acc in any::<u32>(),
    ) {
        let raw = frame(0x01, 0x07, &nav_pvt_payload(lon, lat, h_acc, v_acc));
        let msg = UbxMessage::decode(&raw).unwrap();
        prop_assert_eq!(msg.identity(), "NAV-PVT");
        prop_assert_eq!(msg.get("hAcc"), Some(&Value::Unsigned(u64::from(h_acc))));
        prop_assert_eq!(msg.get("vAcc"), Some(&Value::Unsigned(u64::from(v_acc))));
        let got_lat = msg.get("lat").and_then(Value::as_f64).unwrap();
        prop_assert!((got_lat - f64::from(lat) * 1e-7).abs() < 1e-9);
        let got_lon = msg.get("lon").and_then(Value::as_f64).unwrap();
        prop_assert!((got_lon - f64::from(lon) * 1e-7).abs() < 1e-9);
    }

    #[test]
    fn test_cfg_rate_round_trip(meas in any::<u16>(), nav in any::<u16>(), time_ref in 0u16..6) {
        let msg = UbxMessage::builder("CFG-RATE", MsgMode::Set)
            .set("measRate", meas)
            .set("navRate", nav)
            .set("timeRef", time_ref)
            .build()
            .unwrap();
        let back = UbxMessage::decode_with_mode(&msg.serialize(), MsgMode::Set).unwrap();
        prop_assert_eq!(&back, &msg);
        prop_assert_eq!(back.get("measRate"), Some(&Value::Unsigned(u64::from(meas))));
        prop_assert_eq!(back.get("navRate"), Some(&Value::Unsigned(u64::from(nav))));
        prop_assert_eq!(back.get("timeRef"), Some(&Value::Unsigned(u64::from(time_ref))));
    }

    #[test]
    fn test_cfg_msg_unset_rates_are_nominal(class in any::<u8>(), id in any::<u8>(), rate in any::<u8>()) {
        let msg = UbxMessage::builder("CFG-MSG", MsgMode::Set)
            .set("msgClass", class)
            .set("msgID", id)
            .set("rateUART1", rate)
            .build()
            .unwrap();
        let back = UbxMessage::decode_with_mode(&msg.serialize(), MsgMode::Set).unwrap();
        prop_assert_eq!(back.get("rateUART1"), Some(&Value::Unsigned(u64::from(rate))));
        prop_assert_eq!(back.get("rateUSB"), Some(&Value::Unsigned(0)));
        prop_assert_eq!(back.payload().len(), 8);
    }
}
