use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

use crate::{
    channel::{Channel, Signal},
    config::RoverConfig,
    position::{Accuracy, PositionData},
    ubx_packets::UbxMessage,
};

/// Last accuracy reading and when it was taken
#[derive(Debug, Default)]
pub(crate) struct AccuracyCache {
    pub(crate) value: Accuracy,
    pub(crate) refreshed: Option<Instant>,
}

impl AccuracyCache {
    pub(crate) fn is_fresh(&self, ttl: Duration) -> bool {
        self.refreshed.is_some_and(|at| at.elapsed() < ttl)
    }
}

/// State shared by the serial tasks, the request/response handler and the
/// correction relay. Create one per receiver and share it behind an `Arc`.
#[derive(Debug)]
pub struct RoverContext {
    /// Serialised frames waiting for the serial writer
    pub outgoing: Channel<Vec<u8>>,
    /// Class 0x05 replies
    pub ack_nack: Channel<UbxMessage>,
    /// Class 0x06 replies
    pub cfg_response: Channel<UbxMessage>,
    /// Class 0x01 replies
    pub nav_response: Channel<UbxMessage>,
    pub position: Channel<PositionData>,
    /// Raw GGA sentences for the correction service
    pub gga: Channel<Vec<u8>>,
    /// Set while the relay waits for a GGA sentence
    pub want_gga: Signal,
    /// Set means the relay is paused
    pub relay_stop: Signal,
    relay_active: Mutex<bool>,
    snapshot: Mutex<PositionData>,
    pub(crate) accuracy: Mutex<AccuracyCache>,
    pub(crate) accuracy_ttl: Duration,
    pub(crate) relay_idle_pause: Duration,
}

impl RoverContext {
    pub fn new(config: &RoverConfig) -> Self {
        let caps = &config.channels;
        Self {
            outgoing: Channel::new("outgoing", caps.outgoing),
            ack_nack: Channel::new("ack_nack", caps.ack_nack),
            cfg_response: Channel::new("cfg_response", caps.cfg_response),
            nav_response: Channel::new("nav_response", caps.nav_response),
            position: Channel::new("position", caps.position),
            gga: Channel::new("gga", caps.gga),
            want_gga: Signal::new(false),
            relay_stop: Signal::new(true),
            relay_active: Mutex::new(false),
            snapshot: Mutex::new(PositionData::default()),
            accuracy: Mutex::new(AccuracyCache::default()),
            accuracy_ttl: config.accuracy_ttl,
            relay_idle_pause: config.relay_idle_pause,
        }
    }

    pub async fn relay_active(&self) -> bool {
        *self.relay_active.lock().await
    }

    pub(crate) async fn set_relay_active(&self, active: bool) {
        *self.relay_active.lock().await = active;
    }

    /// Most recent position, updated by every valid GGA sentence
    pub async fn position_snapshot(&self) -> PositionData {
        self.snapshot.lock().await.clone()
    }

    pub(crate) async fn update_position(&self, position: PositionData) {
        *self.snapshot.lock().await = position;
    }

    /// Discard stale replies on all three response channels
    pub fn flush_responses(&self) {
        self.ack_nack.drain();
        self.nav_response.drain();
        self.cfg_response.drain();
    }
}

impl Default for RoverContext {
    fn default() -> Self {
        Self::new(&RoverConfig::default())
    }
}
