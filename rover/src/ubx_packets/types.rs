use crate::error::{CodecError, DateTimeError, TypeErrorKind};
use chrono::prelude::*;
use core::fmt;

use super::UbxMessage;

/// Direction of a message, selecting which payload definition applies
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgMode {
    /// Output from the receiver (periodic data, poll responses)
    Get = 0,
    /// Input to the receiver (configuration commands)
    Set = 1,
    /// Poll request to the receiver
    Poll = 2,
}

impl TryFrom<u8> for MsgMode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MsgMode::Get),
            1 => Ok(MsgMode::Set),
            2 => Ok(MsgMode::Poll),
            _ => Err(CodecError::InvalidMode(value)),
        }
    }
}

/// Wire type of a single payload attribute.
///
/// The numeric parameter is the attribute width in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// Unsigned little-endian integer
    U(usize),
    /// Signed two's complement little-endian integer
    I(usize),
    /// Bitfield, exposed as raw bytes unless a sub-field map is given
    X(usize),
    /// Unsigned enumeration
    E(usize),
    /// IEEE 754 float, 4 or 8 bytes
    R(usize),
    /// Fixed length ISO 8859-1 string
    C(usize),
    /// Variable length ISO 8859-1 string taking the rest of the payload
    Ch,
    /// Boolean stored in one byte
    L,
    /// Raw byte array
    A(usize),
}

impl AttrType {
    /// Width in bytes, zero for variable length strings
    pub const fn size(self) -> usize {
        match self {
            AttrType::U(n)
            | AttrType::I(n)
            | AttrType::X(n)
            | AttrType::E(n)
            | AttrType::R(n)
            | AttrType::C(n)
            | AttrType::A(n) => n,
            AttrType::L => 1,
            AttrType::Ch => 0,
        }
    }

    /// Value given to attributes the caller did not supply
    pub fn nominal(self) -> Value {
        match self {
            AttrType::U(n) | AttrType::E(n) if n > 8 => Value::Bytes(vec![0; n]),
            AttrType::I(n) if n > 8 => Value::Bytes(vec![0; n]),
            AttrType::U(_) | AttrType::E(_) => Value::Unsigned(0),
            AttrType::I(_) => Value::Signed(0),
            AttrType::R(_) => Value::Float(0.0),
            AttrType::C(n) => Value::Text(" ".repeat(n)),
            AttrType::Ch => Value::Text(String::new()),
            AttrType::L => Value::Bool(false),
            AttrType::X(n) | AttrType::A(n) => Value::Bytes(vec![0; n]),
        }
    }

    /// Convert a value to its wire representation
    pub fn encode(self, value: &Value) -> Result<Vec<u8>, TypeErrorKind> {
        match self {
            AttrType::U(n) | AttrType::E(n) => match value {
                Value::Bytes(b) if b.len() == n => Ok(b.clone()),
                _ => unsigned_bytes(unsigned_of(value)?, n),
            },
            AttrType::I(n) => match value {
                Value::Bytes(b) if b.len() == n => Ok(b.clone()),
                _ => signed_bytes(signed_of(value)?, n),
            },
            AttrType::X(n) | AttrType::A(n) => match value {
                Value::Bytes(b) if b.len() == n => Ok(b.clone()),
                Value::Bytes(_) => Err(TypeErrorKind::Incompatible),
                _ => unsigned_bytes(unsigned_of(value)?, n),
            },
            AttrType::R(4) => {
                let v = value.as_f64().ok_or(TypeErrorKind::Incompatible)?;
                Ok((v as f32).to_le_bytes().to_vec())
            },
            AttrType::R(8) => {
                let v = value.as_f64().ok_or(TypeErrorKind::Incompatible)?;
                Ok(v.to_le_bytes().to_vec())
            },
            AttrType::R(_) => Err(TypeErrorKind::Incompatible),
            AttrType::C(n) => {
                let mut bytes = latin1_bytes(value)?;
                if bytes.len() > n {
                    return Err(TypeErrorKind::Overflow);
                }
                bytes.resize(n, b' ');
                Ok(bytes)
            },
            AttrType::Ch => latin1_bytes(value),
            AttrType::L => match value {
                Value::Bool(b) => Ok(vec![u8::from(*b)]),
                Value::Unsigned(v @ (0 | 1)) => Ok(vec![*v as u8]),
                Value::Unsigned(_) => Err(TypeErrorKind::Overflow),
                _ => Err(TypeErrorKind::Incompatible),
            },
        }
    }

    /// Interpret wire bytes. `bytes` must hold exactly `size()` bytes
    /// (or the remaining payload for `Ch`).
    pub fn decode(self, bytes: &[u8]) -> Value {
        match self {
            AttrType::U(n) | AttrType::E(n) if n <= 8 => Value::Unsigned(le_u64(bytes)),
            AttrType::I(n) if (1..=8).contains(&n) => {
                let shift = 64 - 8 * n as u32;
                Value::Signed(((le_u64(bytes) << shift) as i64) >> shift)
            },
            AttrType::U(_) | AttrType::E(_) | AttrType::I(_) => Value::Bytes(bytes.to_vec()),
            AttrType::X(_) | AttrType::A(_) => Value::Bytes(bytes.to_vec()),
            AttrType::R(4) if bytes.len() == 4 => Value::Float(f64::from(f32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
            AttrType::R(_) => {
                let mut buf = [0u8; 8];
                let len = bytes.len().min(8);
                buf[..len].copy_from_slice(&bytes[..len]);
                Value::Float(f64::from_le_bytes(buf))
            },
            AttrType::C(_) | AttrType::Ch => Value::Text(bytes.iter().map(|&b| char::from(b)).collect()),
            AttrType::L => Value::Bool(bytes.first().is_some_and(|&b| b != 0)),
        }
    }
}

fn le_u64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i)))
}

fn unsigned_of(value: &Value) -> Result<u64, TypeErrorKind> {
    match value {
        Value::Unsigned(v) => Ok(*v),
        Value::Signed(v) => u64::try_from(*v).map_err(|_| TypeErrorKind::Overflow),
        Value::Bool(b) => Ok(u64::from(*b)),
        _ => Err(TypeErrorKind::Incompatible),
    }
}

fn signed_of(value: &Value) -> Result<i64, TypeErrorKind> {
    match value {
        Value::Signed(v) => Ok(*v),
        Value::Unsigned(v) => i64::try_from(*v).map_err(|_| TypeErrorKind::Overflow),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(TypeErrorKind::Incompatible),
    }
}

fn unsigned_bytes(v: u64, n: usize) -> Result<Vec<u8>, TypeErrorKind> {
    if n < 8 && (v >> (8 * n)) != 0 {
        return Err(TypeErrorKind::Overflow);
    }
    let mut bytes = v.to_le_bytes().to_vec();
    bytes.resize(n, 0);
    Ok(bytes)
}

fn signed_bytes(v: i64, n: usize) -> Result<Vec<u8>, TypeErrorKind> {
    if n == 0 {
        return Err(TypeErrorKind::Overflow);
    }
    if n < 8 {
        let bound = 1i64 << (8 * n - 1);
        if v < -bound || v >= bound {
            return Err(TypeErrorKind::Overflow);
        }
    }
    let mut bytes = v.to_le_bytes().to_vec();
    bytes.resize(n, if v < 0 { 0xff } else { 0 });
    Ok(bytes)
}

fn latin1_bytes(value: &Value) -> Result<Vec<u8>, TypeErrorKind> {
    match value {
        Value::Text(s) => s
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| TypeErrorKind::Incompatible))
            .collect(),
        _ => Err(TypeErrorKind::Incompatible),
    }
}

/// A decoded (or to be encoded) attribute value
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Unsigned(v) => Some(*v),
            Value::Signed(v) => u64::try_from(*v).ok(),
            Value::Bool(b) => Some(u64::from(*b)),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Signed(v) => Some(*v),
            Value::Unsigned(v) => i64::try_from(*v).ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Unsigned(v) => Some(*v as f64),
            Value::Signed(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Unsigned(v) => Some(*v != 0),
            Value::Signed(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) => write!(f, "{}", v),
            Value::Signed(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => {
                f.write_str("0x")?;
                for b in v {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            },
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $target:ty, $($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(<$target>::from(v))
                }
            }
        )+
    };
}

value_from!(Unsigned, u64, u8, u16, u32, u64);
value_from!(Signed, i64, i8, i16, i32, i64);
value_from!(Float, f64, f32, f64);
value_from!(Bool, bool, bool);
value_from!(Text, String, &str, String);
value_from!(Bytes, Vec<u8>, Vec<u8>, &[u8]);

/// GNSS identifiers used by `gnssId` attributes
pub fn gnss_name(gnss_id: u64) -> Option<&'static str> {
    match gnss_id {
        0 => Some("GPS"),
        1 => Some("SBAS"),
        2 => Some("Galileo"),
        3 => Some("BeiDou"),
        4 => Some("IMES"),
        5 => Some("QZSS"),
        6 => Some("GLONASS"),
        _ => None,
    }
}

/// Quality of a position solution, as reported by the GGA quality indicator
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixType {
    #[default]
    Invalid = 0,
    Autonomous = 1,
    Dgnss = 2,
    Pps = 3,
    RtkFixed = 4,
    RtkFloat = 5,
    DeadReckoning = 6,
    Manual = 7,
    Simulation = 8,
    Waas = 9,
}

impl FixType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => FixType::Invalid,
            1 => FixType::Autonomous,
            2 => FixType::Dgnss,
            3 => FixType::Pps,
            4 => FixType::RtkFixed,
            5 => FixType::RtkFloat,
            6 => FixType::DeadReckoning,
            7 => FixType::Manual,
            8 => FixType::Simulation,
            9 => FixType::Waas,
            _ => return None,
        })
    }

    pub const fn description(self) -> &'static str {
        match self {
            FixType::Invalid => "Invalid, no position available",
            FixType::Autonomous => "Autonomous GNSS fix, no correction data used",
            FixType::Dgnss => "DGNSS fix, using a local DGNSS base station or correction service",
            FixType::Pps => "PPS fix",
            FixType::RtkFixed => "RTK fix, high accuracy Real Time Kinematic",
            FixType::RtkFloat => "RTK Float, better than DGNSS, but not as accurate as RTK fix",
            FixType::DeadReckoning => "Estimated fix (dead reckoning)",
            FixType::Manual => "Manual input mode",
            FixType::Simulation => "Simulation mode",
            FixType::Waas => "WAAS fix (not NMEA standard, but NotAvel receivers report this instead of a 2)",
        }
    }
}

impl fmt::Display for FixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl TryFrom<&UbxMessage> for DateTime<Utc> {
    type Error = DateTimeError;

    /// Solution time of a decoded NAV-PVT message
    fn try_from(sol: &UbxMessage) -> Result<Self, Self::Error> {
        let field = |name: &str| sol.get(name).and_then(Value::as_u64).unwrap_or(0);
        let date = NaiveDate::from_ymd_opt(
            i32::try_from(field("year")).map_err(|_| DateTimeError::InvalidDate)?,
            u32::try_from(field("month")).map_err(|_| DateTimeError::InvalidDate)?,
            u32::try_from(field("day")).map_err(|_| DateTimeError::InvalidDate)?,
        )
        .ok_or(DateTimeError::InvalidDate)?;
        let time = NaiveTime::from_hms_opt(
            u32::try_from(field("hour")).map_err(|_| DateTimeError::InvalidTime)?,
            u32::try_from(field("min")).map_err(|_| DateTimeError::InvalidTime)?,
            u32::try_from(field("second")).map_err(|_| DateTimeError::InvalidTime)?,
        )
        .ok_or(DateTimeError::InvalidTime)?;
        let nano = sol.get("nano").and_then(Value::as_i64).unwrap_or(0);
        const NANOS_LIM: i64 = 1_000_000_000;
        if nano.abs() >= NANOS_LIM {
            return Err(DateTimeError::InvalidNanoseconds);
        }

        let dt = NaiveDateTime::new(date, time) + chrono::Duration::nanoseconds(nano);

        Ok(DateTime::from_naive_utc_and_offset(dt, Utc))
    }
}
