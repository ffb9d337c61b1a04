//! High level receiver operations built on the request/response protocol:
//! flush stale replies, send one command, wait for the reply on the channel of
//! the command's class and interpret it.
//!
//! No operation has a timeout. If the receiver never answers the caller stays
//! suspended.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    channel::Channel,
    constants::{UBX_CLASS_NMEA, UBX_ID_ACK_ACK},
    context::RoverContext,
    error::HandlerError,
    position::{Accuracy, PositionData, RealTimeMessage},
    ubx_packets::{
        cfg_val::{
            CFG_NMEA_HIGHPREC, CFG_SIGNAL_BDS_ENA, CFG_SIGNAL_GAL_ENA, CFG_SIGNAL_GLO_ENA,
            CFG_SIGNAL_GPS_ENA,
        },
        schema::UBX_MSGIDS,
        CfgKeyRef, CfgLayerGet, CfgLayerSet, MsgMode, Transaction, UbxMessage, Value,
    },
};

pub const UPDATE_RATE_MIN_MS: u16 = 50;
pub const UPDATE_RATE_MAX_MS: u16 = 5000;

/// NMEA standard message id of GGA
const NMEA_ID_GGA: u8 = 0x00;

/// Constellations used in the navigation solution
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SatelliteSystems {
    pub gps: bool,
    pub gal: bool,
    pub glo: bool,
    pub bds: bool,
}

/// Request/response front end of the receiver
#[derive(Debug, Clone)]
pub struct GnssHandler {
    ctx: Arc<RoverContext>,
}

impl GnssHandler {
    pub fn new(ctx: Arc<RoverContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<RoverContext> {
        &self.ctx
    }

    async fn send(&self, msg: &UbxMessage) -> Result<(), HandlerError> {
        debug!("sending {}", msg);
        self.ctx
            .outgoing
            .push(msg.serialize())
            .await
            .map_err(|_| HandlerError::ChannelClosed)
    }

    async fn reply(channel: &Channel<UbxMessage>) -> Result<UbxMessage, HandlerError> {
        channel.recv().await.ok_or(HandlerError::ChannelClosed)
    }

    /// Send a command and report whether it was acknowledged
    async fn command(&self, msg: &UbxMessage) -> Result<bool, HandlerError> {
        self.ctx.flush_responses();
        self.send(msg).await?;
        let ack = Self::reply(&self.ctx.ack_nack).await?;
        Ok(ack.msg_id() == UBX_ID_ACK_ACK)
    }

    /// Send a poll and wait for the answer on `channel`
    async fn query(
        &self,
        msg: &UbxMessage,
        channel: &Channel<UbxMessage>,
    ) -> Result<UbxMessage, HandlerError> {
        self.ctx.flush_responses();
        self.send(msg).await?;
        Self::reply(channel).await
    }

    /// Set the navigation measurement period in milliseconds, clamped to
    /// 50..=5000. Returns `false` if the receiver answered with a NAK.
    pub async fn set_update_rate(&self, rate_ms: u16) -> Result<bool, HandlerError> {
        let rate = rate_ms.clamp(UPDATE_RATE_MIN_MS, UPDATE_RATE_MAX_MS);
        let msg = UbxMessage::builder("CFG-RATE", MsgMode::Set)
            .set("measRate", rate)
            .set("navRate", 1u16)
            .set("timeRef", 1u16)
            .build()?;
        self.command(&msg).await
    }

    pub async fn get_update_rate(&self) -> Result<u16, HandlerError> {
        let msg = UbxMessage::poll("CFG-RATE")?;
        let cfg = self.query(&msg, &self.ctx.cfg_response).await?;
        let rate = field(&cfg, "measRate")?
            .as_u64()
            .and_then(|v| u16::try_from(v).ok())
            .ok_or_else(|| missing(&cfg, "measRate"))?;
        Ok(rate)
    }

    /// Enable or disable constellations in the RAM layer
    pub async fn set_satellite_systems(
        &self,
        systems: SatelliteSystems,
    ) -> Result<bool, HandlerError> {
        let msg = UbxMessage::config_set(
            CfgLayerSet::RAM,
            Transaction::None,
            &[
                (CfgKeyRef::Name(CFG_SIGNAL_GPS_ENA), Value::Bool(systems.gps)),
                (CfgKeyRef::Name(CFG_SIGNAL_GAL_ENA), Value::Bool(systems.gal)),
                (CfgKeyRef::Name(CFG_SIGNAL_GLO_ENA), Value::Bool(systems.glo)),
                (CfgKeyRef::Name(CFG_SIGNAL_BDS_ENA), Value::Bool(systems.bds)),
            ],
        )?;
        self.command(&msg).await
    }

    pub async fn get_satellite_systems(&self) -> Result<SatelliteSystems, HandlerError> {
        let msg = UbxMessage::config_poll(
            CfgLayerGet::Ram,
            0,
            &[
                CfgKeyRef::Name(CFG_SIGNAL_GPS_ENA),
                CfgKeyRef::Name(CFG_SIGNAL_GAL_ENA),
                CfgKeyRef::Name(CFG_SIGNAL_GLO_ENA),
                CfgKeyRef::Name(CFG_SIGNAL_BDS_ENA),
            ],
        )?;
        let cfg = self.query(&msg, &self.ctx.cfg_response).await?;
        Ok(SatelliteSystems {
            gps: flag(&cfg, CFG_SIGNAL_GPS_ENA)?,
            gal: flag(&cfg, CFG_SIGNAL_GAL_ENA)?,
            glo: flag(&cfg, CFG_SIGNAL_GLO_ENA)?,
            bds: flag(&cfg, CFG_SIGNAL_BDS_ENA)?,
        })
    }

    pub async fn set_high_precision_mode(&self, enable: bool) -> Result<bool, HandlerError> {
        let msg = UbxMessage::config_set(
            CfgLayerSet::RAM,
            Transaction::None,
            &[(CfgKeyRef::Name(CFG_NMEA_HIGHPREC), Value::Bool(enable))],
        )?;
        self.command(&msg).await
    }

    pub async fn get_high_precision_mode(&self) -> Result<bool, HandlerError> {
        let msg =
            UbxMessage::config_poll(CfgLayerGet::Ram, 0, &[CfgKeyRef::Name(CFG_NMEA_HIGHPREC)])?;
        let cfg = self.query(&msg, &self.ctx.cfg_response).await?;
        flag(&cfg, CFG_NMEA_HIGHPREC)
    }

    /// Horizontal and vertical accuracy from NAV-PVT.
    ///
    /// A reading younger than the configured TTL is served from cache unless
    /// `realtime` asks for a fresh one.
    pub async fn get_precision(&self, realtime: bool) -> Result<Accuracy, HandlerError> {
        let mut cache = self.ctx.accuracy.lock().await;
        if !realtime && cache.is_fresh(self.ctx.accuracy_ttl) {
            return Ok(cache.value);
        }
        let msg = UbxMessage::poll("NAV-PVT")?;
        let nav = self.query(&msg, &self.ctx.nav_response).await?;
        let value = Accuracy {
            h_acc: field(&nav, "hAcc")?
                .as_u64()
                .ok_or_else(|| missing(&nav, "hAcc"))?,
            v_acc: field(&nav, "vAcc")?
                .as_u64()
                .ok_or_else(|| missing(&nav, "vAcc"))?,
        };
        cache.value = value;
        cache.refreshed = Some(Instant::now());
        Ok(value)
    }

    /// NAV-SAT reply listing the tracked satellites
    pub async fn get_satellites_in_use(&self) -> Result<UbxMessage, HandlerError> {
        let msg = UbxMessage::poll("NAV-SAT")?;
        self.query(&msg, &self.ctx.nav_response).await
    }

    /// Wait for the next position published by the serial dispatcher
    pub async fn get_position(&self) -> Result<PositionData, HandlerError> {
        self.ctx.flush_responses();
        self.ctx
            .position
            .recv()
            .await
            .ok_or(HandlerError::ChannelClosed)
    }

    /// Switch off every NMEA sentence on UART1 except GGA.
    ///
    /// Commands are not acknowledged one by one; the ACK channel is drained
    /// once after all of them are queued.
    pub async fn set_minimum_nmea_msgs(&self) -> Result<(), HandlerError> {
        self.ctx.flush_responses();
        let mut sent = 0;
        for ident in UBX_MSGIDS.iter().filter(|i| i.class == UBX_CLASS_NMEA) {
            let rate = u8::from(ident.id == NMEA_ID_GGA);
            let msg = UbxMessage::builder("CFG-MSG", MsgMode::Set)
                .set("msgClass", ident.class)
                .set("msgID", ident.id)
                .set("rateUART1", rate)
                .set("rateUSB", 0u8)
                .build()?;
            self.send(&msg).await?;
            sent += 1;
        }
        self.ctx.ack_nack.drain();
        info!(sent, "NMEA output reduced to GGA");
        Ok(())
    }

    /// Resume (`true`) or pause (`false`) the correction relay
    pub fn set_relay_enabled(&self, enable: bool) {
        if enable {
            self.ctx.relay_stop.clear();
        } else {
            self.ctx.relay_stop.set();
        }
    }

    pub fn relay_enabled(&self) -> bool {
        !self.ctx.relay_stop.is_set()
    }

    /// Whether the relay currently holds an open correction session
    pub async fn get_relay_status(&self) -> bool {
        self.ctx.relay_active().await
    }

    /// Latest position with (possibly cached) accuracy and relay state
    pub async fn real_time_message(&self) -> Result<RealTimeMessage, HandlerError> {
        let position = self.ctx.position_snapshot().await;
        let accuracy = self.get_precision(false).await?;
        let rtcm_enabled = self.get_relay_status().await;
        Ok(RealTimeMessage::new(position, accuracy, rtcm_enabled))
    }
}

fn missing(msg: &UbxMessage, field: &'static str) -> HandlerError {
    HandlerError::MissingField {
        identity: msg.identity().to_string(),
        field,
    }
}

fn field<'a>(msg: &'a UbxMessage, name: &'static str) -> Result<&'a Value, HandlerError> {
    msg.get(name).ok_or_else(|| missing(msg, name))
}

fn flag(msg: &UbxMessage, name: &'static str) -> Result<bool, HandlerError> {
    field(msg, name)?
        .as_bool()
        .ok_or_else(|| missing(msg, name))
}
