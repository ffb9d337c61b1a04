//! NTRIP client relaying RTCM3 corrections from a caster to the receiver.
//!
//! The relay runs while [RoverContext::relay_stop] is cleared. It reports the
//! rover position to the caster with GGA sentences requested from the serial
//! dispatcher through [RoverContext::want_gga].

use std::{future::Future, sync::Arc, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::{sleep, timeout, Instant},
};
use tracing::{debug, info, trace, warn};

use crate::{
    config::NtripSettings,
    context::RoverContext,
    error::RelayError,
    parser::{ErrorPolicy, RtcmReader},
};

pub const USER_AGENT: &str = "HHN BW NTRIP Client/0.1.0";

/// Pause after a session ended without error, before the next connection
const SESSION_END_PAUSE: Duration = Duration::from_secs(1);

pub struct NtripClient {
    ctx: Arc<RoverContext>,
    settings: NtripSettings,
}

impl NtripClient {
    pub fn new(ctx: Arc<RoverContext>, settings: NtripSettings) -> Self {
        Self { ctx, settings }
    }

    /// HTTP request opening a session on the configured mountpoint
    pub fn request(&self) -> String {
        let s = &self.settings;
        let credentials = STANDARD.encode(format!("{}:{}", s.user, s.password));
        format!(
            "GET /{} HTTP/1.1\r\n\
             User-Agent: {}\r\n\
             Host: {}:{}\r\n\
             Authorization: Basic {}\r\n\
             Ntrip-Version: Ntrip/{}\r\n\
             \r\n",
            s.mountpoint, USER_AGENT, s.server, s.port, credentials, s.version
        )
    }

    /// Supervise sessions forever.
    ///
    /// The context starts with the relay paused. While paused the relay only
    /// reports itself inactive. A failed session pauses the relay again; it
    /// reconnects once re-enabled.
    pub async fn run(&self) {
        info!(
            server = %self.settings.server,
            mountpoint = %self.settings.mountpoint,
            "starting NTRIP relay"
        );
        loop {
            if self.ctx.relay_stop.is_set() {
                sleep(self.ctx.relay_idle_pause).await;
                self.ctx.set_relay_active(false).await;
                continue;
            }
            match self.session().await {
                Ok(()) => {
                    sleep(SESSION_END_PAUSE).await;
                },
                Err(e) => {
                    warn!("NTRIP session failed: {}", e);
                    self.ctx.relay_stop.set();
                },
            }
            self.ctx.want_gga.clear();
            self.ctx.set_relay_active(false).await;
        }
    }

    /// One connection to the caster, from request to teardown
    pub async fn session(&self) -> Result<(), RelayError> {
        let s = &self.settings;
        let limit = s.socket_timeout;
        let stream = within(limit, TcpStream::connect((s.server.as_str(), s.port))).await?;
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(self.request().as_bytes()).await?;
        write_half.flush().await?;

        let mut reader = BufReader::new(read_half);
        within(limit, read_response_header(&mut reader)).await?;
        self.ctx.set_relay_active(true).await;
        info!(server = %s.server, port = s.port, "connected to caster");
        if s.mountpoint.is_empty() {
            return Ok(());
        }

        let Some(mut last_gga) = self.send_gga(&mut write_half).await? else {
            debug!("NTRIP relay paused");
            return Ok(());
        };
        let mut rtcm = RtcmReader::new(reader, ErrorPolicy::Ignore);
        while !self.ctx.relay_stop.is_set() {
            let frame = tokio::select! {
                frame = within(limit, rtcm.read_one()) => frame?,
                _ = self.ctx.relay_stop.wait_set() => break,
            };
            let Some(frame) = frame else {
                return Err(RelayError::UnexpectedEof);
            };
            trace!(len = frame.len(), "RTCM3 frame");
            self.ctx
                .outgoing
                .push(frame)
                .await
                .map_err(|_| RelayError::ChannelClosed)?;
            if last_gga.elapsed() >= s.gga_interval {
                match self.send_gga(&mut write_half).await? {
                    Some(sent) => last_gga = sent,
                    None => break,
                }
            }
        }
        debug!("NTRIP relay paused");
        Ok(())
    }

    /// Ask the dispatcher for the next GGA sentence and send it to the caster.
    ///
    /// Returns `None` when the relay is paused before a sentence arrives.
    async fn send_gga<W>(&self, writer: &mut W) -> Result<Option<Instant>, RelayError>
    where
        W: AsyncWrite + Unpin,
    {
        self.ctx.gga.drain();
        self.ctx.want_gga.set();
        let gga = tokio::select! {
            gga = self.ctx.gga.recv() => gga,
            _ = self.ctx.relay_stop.wait_set() => {
                self.ctx.want_gga.clear();
                return Ok(None);
            },
        };
        self.ctx.want_gga.clear();
        let gga = gga.ok_or(RelayError::ChannelClosed)?;
        writer.write_all(&gga).await?;
        writer.flush().await?;
        debug!(sentence = %String::from_utf8_lossy(&gga).trim_end(), "sent GGA to caster");
        Ok(Some(Instant::now()))
    }
}

/// Run a socket operation, failing with [RelayError::Timeout] once `limit` passes
async fn within<T, E, F>(limit: Duration, op: F) -> Result<T, RelayError>
where
    F: Future<Output = Result<T, E>>,
    RelayError: From<E>,
{
    match timeout(limit, op).await {
        Ok(res) => res.map_err(RelayError::from),
        Err(_) => Err(RelayError::Timeout(limit)),
    }
}

/// Consume the caster's answer up to the start of the correction stream.
///
/// NTRIP 2 casters answer with an HTTP header ending in a blank line,
/// NTRIP 1 casters with a single `ICY 200 OK` line.
async fn read_response_header<R>(reader: &mut R) -> Result<(), RelayError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(RelayError::UnexpectedEof);
    }
    let status = line.trim_end().to_string();
    if status.split_whitespace().nth(1) != Some("200") {
        return Err(RelayError::Rejected(status));
    }
    debug!(%status, "caster accepted request");
    if !status.starts_with("HTTP/") {
        return Ok(());
    }
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(RelayError::UnexpectedEof);
        }
        if line.trim_end().is_empty() {
            return Ok(());
        }
        trace!(header = %line.trim_end(), "caster header");
    }
}
