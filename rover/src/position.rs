use chrono::NaiveTime;

use crate::ubx_packets::FixType;

/// Last known position, as carried by the most recent GGA sentence.
///
/// Coordinates are kept exactly as received (`ddmm.mmmm` / `dddmm.mmmm`);
/// use [PositionData::latitude] and [PositionData::longitude] for decimal
/// degrees.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionData {
    /// UTC time of fix, `hhmmss.ss`
    pub time: String,
    pub fix_type: FixType,
    pub lat: String,
    pub lat_hemisphere: String,
    pub lon: String,
    pub lon_hemisphere: String,
    /// Altitude above mean sea level in metres
    pub elev: String,
}

impl PositionData {
    /// Latitude in decimal degrees, negative in the southern hemisphere
    pub fn latitude(&self) -> Option<f64> {
        let deg = ddmm_to_degrees(&self.lat)?;
        Some(if self.lat_hemisphere == "S" { -deg } else { deg })
    }

    /// Longitude in decimal degrees, negative in the western hemisphere
    pub fn longitude(&self) -> Option<f64> {
        let deg = ddmm_to_degrees(&self.lon)?;
        Some(if self.lon_hemisphere == "W" { -deg } else { deg })
    }

    pub fn elevation(&self) -> Option<f64> {
        self.elev.parse().ok()
    }

    pub fn utc_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.time, "%H%M%S%.f").ok()
    }
}

fn ddmm_to_degrees(value: &str) -> Option<f64> {
    let dot = value.find('.').unwrap_or(value.len());
    if dot < 2 {
        return None;
    }
    let (deg, min) = value.split_at(dot - 2);
    let deg: f64 = if deg.is_empty() { 0.0 } else { deg.parse().ok()? };
    let min: f64 = min.parse().ok()?;
    Some(deg + min / 60.0)
}

/// Horizontal and vertical accuracy estimates in millimetres
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accuracy {
    pub h_acc: u64,
    pub v_acc: u64,
}

/// Snapshot pushed to real time clients: position, accuracy and relay state
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealTimeMessage {
    pub time: String,
    pub fix_type: FixType,
    pub lat: String,
    pub lon: String,
    pub elev: String,
    pub h_acc: u64,
    pub v_acc: u64,
    pub rtcm_enabled: bool,
}

impl RealTimeMessage {
    pub fn new(position: PositionData, accuracy: Accuracy, rtcm_enabled: bool) -> Self {
        Self {
            time: position.time,
            fix_type: position.fix_type,
            lat: position.lat,
            lon: position.lon,
            elev: position.elev,
            h_acc: accuracy.h_acc,
            v_acc: accuracy.v_acc,
            rtcm_enabled,
        }
    }
}
