use std::time::Duration;

/// Correction service (NTRIP caster) connection settings
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtripSettings {
    pub server: String,
    pub port: u16,
    /// Empty means connect and authenticate only, no correction stream
    pub mountpoint: String,
    pub user: String,
    pub password: String,
    /// Value of the `Ntrip-Version` header, without the `Ntrip/` prefix
    pub version: String,
    /// Interval between position reports to the caster
    #[cfg_attr(feature = "serde", serde(with = "secs"))]
    pub gga_interval: Duration,
    /// Limit for connecting, the response header and each correction frame
    #[cfg_attr(feature = "serde", serde(with = "secs"))]
    pub socket_timeout: Duration,
}

impl Default for NtripSettings {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: 2101,
            mountpoint: String::new(),
            user: String::new(),
            password: String::new(),
            version: "2.0".to_string(),
            gga_interval: Duration::from_secs(5),
            socket_timeout: Duration::from_secs(10),
        }
    }
}

/// Capacities of the bounded channels between the tasks
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCapacities {
    pub outgoing: usize,
    pub ack_nack: usize,
    pub cfg_response: usize,
    pub nav_response: usize,
    pub position: usize,
    pub gga: usize,
}

impl Default for ChannelCapacities {
    fn default() -> Self {
        Self {
            outgoing: 5,
            ack_nack: 20,
            cfg_response: 5,
            nav_response: 5,
            position: 1,
            gga: 1,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoverConfig {
    pub ntrip: NtripSettings,
    /// How long a cached accuracy reading is served without a new poll
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub accuracy_ttl: Duration,
    /// Pause between checks while the relay is disabled
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub relay_idle_pause: Duration,
    pub channels: ChannelCapacities,
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self {
            ntrip: NtripSettings::default(),
            accuracy_ttl: Duration::from_millis(5000),
            relay_idle_pause: Duration::from_secs(1),
            channels: ChannelCapacities::default(),
        }
    }
}

#[cfg(feature = "serde")]
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(feature = "serde")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_startup_values() {
        let cfg = RoverConfig::default();
        assert_eq!(cfg.ntrip.port, 2101);
        assert_eq!(cfg.ntrip.version, "2.0");
        assert_eq!(cfg.ntrip.gga_interval, Duration::from_secs(5));
        assert_eq!(cfg.ntrip.socket_timeout, Duration::from_secs(10));
        assert_eq!(cfg.accuracy_ttl, Duration::from_millis(5000));
        assert_eq!(cfg.channels.ack_nack, 20);
        assert_eq!(cfg.channels.position, 1);
        assert_eq!(cfg.channels.gga, 1);
    }
}
