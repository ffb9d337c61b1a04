use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};
use rtk_rover::{
    parser::ubx_checksum, serial::run_reader, FixType, RoverConfig, RoverContext, Value,
};
use tokio::io::AsyncWriteExt;

const GGA: &[u8] = b"$GNGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*68\r\n";
static FULL_ACK_ACK_PACK: [u8; 10] = [0xb5, 0x62, 0x5, 0x1, 0x2, 0x0, 0x6, 0x1, 0xf, 0x38];

fn nav_pvt_frame(itow: u32) -> Vec<u8> {
    let mut core = vec![0x01, 0x07];
    WriteBytesExt::write_u16::<LittleEndian>(&mut core, 92).unwrap();
    WriteBytesExt::write_u32::<LittleEndian>(&mut core, itow).unwrap();
    core.resize(4 + 92, 0);
    let ck = ubx_checksum(&core);
    let mut frame = vec![0xb5, 0x62];
    frame.extend_from_slice(&core);
    frame.extend_from_slice(&ck);
    frame
}

/// Same fix as [GGA] but RTK fixed, checksum recomputed
fn gga_rtk_fixed() -> Vec<u8> {
    let body = "GNGGA,092751.000,5321.6802,N,00630.3372,W,4,8,1.03,61.7,M,55.2,M,,";
    let ck = body.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("${}*{:02X}\r\n", body, ck).into_bytes()
}

#[tokio::test]
async fn test_gga_then_ack_ack_end_to_end() {
    let ctx = Arc::new(RoverContext::default());
    let (mut uart, rover_side) = tokio::io::duplex(256);
    let reader = {
        let ctx = ctx.clone();
        tokio::spawn(async move { run_reader(&ctx, rover_side).await })
    };

    uart.write_all(b"\x00\x17garbage").await.unwrap();
    uart.write_all(GGA).await.unwrap();
    uart.write_all(&FULL_ACK_ACK_PACK).await.unwrap();
    drop(uart);
    reader.await.unwrap().unwrap();

    let snapshot = ctx.position_snapshot().await;
    assert_eq!(snapshot.time, "092750.000");
    assert_eq!(snapshot.lat, "5321.6802");
    assert_eq!(snapshot.lon, "00630.3372");
    assert_eq!(snapshot.elev, "61.7");
    assert_eq!(snapshot.fix_type, FixType::Autonomous);
    assert_eq!(ctx.position.recv().await.unwrap(), snapshot);

    assert_eq!(ctx.ack_nack.len(), 1);
    let ack = ctx.ack_nack.recv().await.unwrap();
    assert_eq!(ack.class(), 0x05);
    assert_eq!(ack.identity(), "ACK-ACK");
    assert!(ctx.cfg_response.is_empty());
    assert!(ctx.nav_response.is_empty());
}

#[tokio::test]
async fn test_position_channel_keeps_first_until_consumed() {
    let ctx = RoverContext::default();
    let mut stream = GGA.to_vec();
    stream.extend_from_slice(&gga_rtk_fixed());
    run_reader(&ctx, stream.as_slice()).await.unwrap();

    // the snapshot follows every sentence, the channel holds the first one
    assert_eq!(ctx.position_snapshot().await.fix_type, FixType::RtkFixed);
    assert_eq!(ctx.position.len(), 1);
    assert_eq!(
        ctx.position.recv().await.unwrap().fix_type,
        FixType::Autonomous
    );
}

#[tokio::test]
async fn test_full_response_channel_drops_newest() {
    let ctx = RoverContext::new(&RoverConfig::default());
    let mut stream = Vec::new();
    for itow in 0..7 {
        stream.extend_from_slice(&nav_pvt_frame(itow));
    }
    run_reader(&ctx, stream.as_slice()).await.unwrap();

    assert!(ctx.nav_response.is_full());
    assert_eq!(ctx.nav_response.len(), 5);
    for itow in 0..5 {
        let msg = ctx.nav_response.recv().await.unwrap();
        assert_eq!(msg.get("iTOW"), Some(&Value::Unsigned(itow)));
    }
}

#[tokio::test]
async fn test_gga_for_relay_latest_wins() {
    let ctx = RoverContext::default();
    ctx.want_gga.set();
    let second = gga_rtk_fixed();
    let mut stream = GGA.to_vec();
    stream.extend_from_slice(&second);
    run_reader(&ctx, stream.as_slice()).await.unwrap();

    assert_eq!(ctx.gga.len(), 1);
    assert_eq!(ctx.gga.recv().await.unwrap(), second);
}

#[tokio::test]
async fn test_truncated_frame_ends_cleanly() {
    let ctx = RoverContext::default();
    let frame = nav_pvt_frame(1);
    run_reader(&ctx, &frame[..40]).await.unwrap();
    assert!(ctx.nav_response.is_empty());
}
