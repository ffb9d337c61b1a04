//! RTCM3 frame reader for correction streams

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

use crate::{
    constants::{
        NMEA_SYNC_CHAR, RTCM_CRC_LEN, RTCM_RESERVED_MASK, RTCM_SYNC_CHAR, UBX_SYNC_CHAR_1,
    },
    error::RtcmError,
};

/// What to do with a header that is not a valid RTCM3 preamble
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Skip the header and keep scanning
    #[default]
    Ignore,
    /// Log the header and hand it back to the caller
    Log,
    /// Fail with [RtcmError::UnknownProtocol]
    Raise,
}

/// Reads one RTCM3 frame at a time from an async byte stream.
///
/// The 3 byte CRC trailer is returned as is and never verified.
pub struct RtcmReader<R> {
    stream: R,
    policy: ErrorPolicy,
}

impl<R: AsyncRead + Unpin> RtcmReader<R> {
    pub fn new(stream: R, policy: ErrorPolicy) -> Self {
        Self { stream, policy }
    }

    /// Next frame (header, payload and trailer), or `None` at end of stream.
    ///
    /// Bytes that cannot start a UBX, NMEA or RTCM3 frame are discarded one
    /// at a time.
    pub async fn read_one(&mut self) -> Result<Option<Vec<u8>>, RtcmError> {
        match self.read_frame().await {
            Err(RtcmError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            other => other,
        }
    }

    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, RtcmError> {
        loop {
            let byte1 = self.stream.read_u8().await?;
            if ![UBX_SYNC_CHAR_1, NMEA_SYNC_CHAR, RTCM_SYNC_CHAR].contains(&byte1) {
                continue;
            }
            let byte2 = self.stream.read_u8().await?;
            if byte1 == RTCM_SYNC_CHAR && byte2 & RTCM_RESERVED_MASK == 0 {
                return self.read_rtcm3([byte1, byte2]).await.map(Some);
            }
            match self.policy {
                ErrorPolicy::Raise => return Err(RtcmError::UnknownProtocol([byte1, byte2])),
                ErrorPolicy::Log => {
                    warn!(header = ?[byte1, byte2], "Unknown protocol in correction stream");
                    return Ok(Some(vec![byte1, byte2]));
                },
                ErrorPolicy::Ignore => continue,
            }
        }
    }

    async fn read_rtcm3(&mut self, hdr: [u8; 2]) -> Result<Vec<u8>, RtcmError> {
        let byte3 = self.stream.read_u8().await?;
        let size = usize::from(byte3) | (usize::from(hdr[1]) << 8);
        let mut frame = Vec::with_capacity(3 + size + RTCM_CRC_LEN);
        frame.extend_from_slice(&[hdr[0], hdr[1], byte3]);
        frame.resize(3 + size + RTCM_CRC_LEN, 0);
        self.stream.read_exact(&mut frame[3..]).await?;
        Ok(frame)
    }
}
