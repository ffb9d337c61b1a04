//! Tasks on the receiver's serial link: the dispatcher sorting incoming frames
//! into channels and the writer draining the outgoing channel.

use std::io;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, trace, warn};

use crate::{
    constants::{
        NMEA_SYNC_CHAR, NMEA_TALKER_CHARS, RTCM_SYNC_CHAR, UBX_CLASS_ACK, UBX_CLASS_CFG,
        UBX_CLASS_NAV, UBX_SYNC_CHAR_1, UBX_SYNC_CHAR_2,
    },
    context::RoverContext,
    parser::{parse_gga, sentence_id, validate_checksum},
    ubx_packets::UbxMessage,
};

/// Sentence type carrying the position fix
const GGA: &str = "GGA";

/// Map end of stream to `None`
fn eof_to_none<T>(res: io::Result<T>) -> io::Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read frames from the receiver until the stream ends.
///
/// GGA sentences update the position snapshot and feed the position and
/// relay channels, UBX frames are decoded and routed by class. Nothing here
/// waits on a consumer: full channels drop the new item. Unrecognised bytes
/// are skipped one at a time until a preamble shows up again.
pub async fn run_reader<R>(ctx: &RoverContext, reader: R) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let Some(byte1) = eof_to_none(reader.read_u8().await)? else {
            break;
        };
        if !matches!(byte1, UBX_SYNC_CHAR_1 | NMEA_SYNC_CHAR | RTCM_SYNC_CHAR) {
            continue;
        }
        let Some(byte2) = eof_to_none(reader.read_u8().await)? else {
            break;
        };
        let more = match (byte1, byte2) {
            (NMEA_SYNC_CHAR, b) if NMEA_TALKER_CHARS.contains(&b) => {
                read_nmea(ctx, &mut reader, [byte1, byte2]).await?
            },
            (UBX_SYNC_CHAR_1, UBX_SYNC_CHAR_2) => read_ubx(ctx, &mut reader).await?,
            _ => true,
        };
        if !more {
            break;
        }
    }
    debug!("serial stream closed");
    Ok(())
}

/// Returns `false` on end of stream
async fn read_nmea<R>(ctx: &RoverContext, reader: &mut R, header: [u8; 2]) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = header.to_vec();
    if reader.read_until(b'\n', &mut raw).await? == 0 {
        return Ok(false);
    }
    let sentence = String::from_utf8_lossy(&raw);
    match sentence_id(&sentence) {
        Ok(GGA) => {},
        Ok(_) => return Ok(true),
        Err(e) => {
            debug!(sentence = %sentence.trim_end(), "unreadable NMEA sentence: {}", e);
            return Ok(true);
        },
    }
    if let Err(e) = validate_checksum(&sentence) {
        warn!(sentence = %sentence.trim_end(), "NMEA sentence corrupted: {}", e);
        return Ok(true);
    }
    let position = match parse_gga(&sentence) {
        Ok(position) => position,
        Err(e) => {
            warn!(sentence = %sentence.trim_end(), "badly formed GGA: {}", e);
            return Ok(true);
        },
    };
    trace!(sentence = %sentence.trim_end(), "GGA received");
    ctx.update_position(position.clone()).await;
    if ctx.position.is_empty() {
        ctx.position.try_push(position);
    }
    if ctx.want_gga.is_set() {
        ctx.gga.publish_latest(raw);
    }
    Ok(true)
}

/// Returns `false` on end of stream
async fn read_ubx<R>(ctx: &RoverContext, reader: &mut R) -> io::Result<bool>
where
    R: AsyncRead + Unpin,
{
    // class, id, 2 bytes length
    let mut head = [0u8; 4];
    if eof_to_none(reader.read_exact(&mut head).await)?.is_none() {
        return Ok(false);
    }
    let len = usize::from(u16::from_le_bytes([head[2], head[3]]));
    let mut raw = Vec::with_capacity(len + 8);
    raw.extend_from_slice(&[UBX_SYNC_CHAR_1, UBX_SYNC_CHAR_2]);
    raw.extend_from_slice(&head);
    raw.resize(len + 8, 0);
    if eof_to_none(reader.read_exact(&mut raw[6..]).await)?.is_none() {
        return Ok(false);
    }
    let msg = match UbxMessage::decode(&raw) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(class = head[0], id = head[1], "dropping UBX frame: {}", e);
            return Ok(true);
        },
    };
    let channel = match msg.class() {
        UBX_CLASS_ACK => &ctx.ack_nack,
        UBX_CLASS_CFG => &ctx.cfg_response,
        UBX_CLASS_NAV => &ctx.nav_response,
        _ => {
            trace!(identity = msg.identity(), "no consumer for UBX message");
            return Ok(true);
        },
    };
    trace!(channel = channel.name(), "parsed {}", msg);
    if !channel.try_push(msg) {
        debug!(channel = channel.name(), "response channel full, message dropped");
    }
    Ok(true)
}

/// Write every queued frame to the receiver, in order, flushing after each.
/// Returns when the outgoing channel closes.
pub async fn run_writer<W>(ctx: &RoverContext, mut writer: W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = ctx.outgoing.recv().await {
        trace!(len = frame.len(), "writing to receiver");
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }
    Ok(())
}
