use std::{fmt, io, time::Duration};

/// Error raised while building or decoding a UBX message
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Class/id pair or identity string with no entry in the identity tables
    UnknownIdentity(String),
    /// The identity is known but has no payload definition for this mode
    UnsupportedMode {
        identity: String,
        mode: u8,
    },
    /// A field value could not be coerced to (or read as) its wire type
    TypeError {
        identity: String,
        field: String,
        reason: TypeErrorKind,
    },
    InvalidHeader {
        got: [u8; 2],
    },
    InvalidPacketLen {
        expect: usize,
        got: usize,
    },
    InvalidChecksum {
        expect: u16,
        got: u16,
    },
    /// Mode byte outside GET (0), SET (1) and POLL (2)
    InvalidMode(u8),
    /// The definition can only be walked against a raw payload
    PayloadRequired(String),
    /// CFG-VAL* messages carry at most 64 keys
    TooManyCfgKeys(usize),
    UnknownCfgKey(String),
}

/// What went wrong with a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeErrorKind {
    /// The supplied value variant does not fit the attribute type
    Incompatible,
    /// The value does not fit into the attribute width
    Overflow,
    /// The payload ended before the field
    Truncated,
}

impl fmt::Display for TypeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeErrorKind::Incompatible => f.write_str("Incorrect type"),
            TypeErrorKind::Overflow => f.write_str("Overflow error"),
            TypeErrorKind::Truncated => f.write_str("Truncated payload"),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnknownIdentity(identity) => {
                write!(f, "Unknown message identity {}", identity)
            },
            CodecError::UnsupportedMode { identity, mode } => write!(
                f,
                "No payload definition for {} in mode {} - check msgmode is appropriate for message category",
                identity, mode
            ),
            CodecError::TypeError {
                identity,
                field,
                reason,
            } => write!(
                f,
                "{} for attribute '{}' in {} message",
                reason, field, identity
            ),
            CodecError::InvalidHeader { got } => write!(
                f,
                "Invalid message header {:02x}{:02x} - should be b562",
                got[0], got[1]
            ),
            CodecError::InvalidPacketLen { expect, got } => write!(
                f,
                "Invalid payload length, expect {}, got {}",
                expect, got
            ),
            CodecError::InvalidChecksum { expect, got } => write!(
                f,
                "Not valid packet's checksum, expect {:x}, got {:x}",
                expect, got
            ),
            CodecError::InvalidMode(mode) => {
                write!(f, "Invalid msgmode {} - must be 0, 1 or 2", mode)
            },
            CodecError::PayloadRequired(identity) => {
                write!(f, "{} message definitions must include a payload", identity)
            },
            CodecError::TooManyCfgKeys(num) => write!(
                f,
                "Number of configuration items {} exceeds maximum of 64",
                num
            ),
            CodecError::UnknownCfgKey(name) => write!(f, "Unknown configuration key {}", name),
        }
    }
}

impl std::error::Error for CodecError {}

/// Error raised while validating or parsing an NMEA sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NmeaError {
    Malformed,
    InvalidChecksum { expect: String, got: String },
}

impl fmt::Display for NmeaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NmeaError::Malformed => f.write_str("Badly formed NMEA sentence"),
            NmeaError::InvalidChecksum { expect, got } => write!(
                f,
                "NMEA sentence corrupted, checksum {} - should be {}",
                got, expect
            ),
        }
    }
}

impl std::error::Error for NmeaError {}

/// Error raised by the RTCM3 framer
#[derive(Debug)]
pub enum RtcmError {
    /// Leading bytes did not belong to a recognised protocol
    UnknownProtocol([u8; 2]),
    Io(io::Error),
}

impl fmt::Display for RtcmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcmError::UnknownProtocol(hdr) => {
                write!(f, "Unknown protocol {:02x}{:02x}", hdr[0], hdr[1])
            },
            RtcmError::Io(e) => write!(f, "RTCM stream error: {}", e),
        }
    }
}

impl std::error::Error for RtcmError {}

impl From<io::Error> for RtcmError {
    fn from(e: io::Error) -> Self {
        RtcmError::Io(e)
    }
}

/// Error ending a correction service session
#[derive(Debug)]
pub enum RelayError {
    Io(io::Error),
    /// The caster answered with something other than 200
    Rejected(String),
    UnexpectedEof,
    /// The caster stayed silent for longer than the socket timeout
    Timeout(Duration),
    Stream(RtcmError),
    /// The outgoing serial channel has no consumer left
    ChannelClosed,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Io(e) => write!(f, "NTRIP socket error: {}", e),
            RelayError::Rejected(status) => write!(f, "NTRIP caster rejected request: {}", status),
            RelayError::UnexpectedEof => f.write_str("NTRIP caster closed the stream"),
            RelayError::Timeout(limit) => write!(f, "NTRIP caster silent for {:?}", limit),
            RelayError::Stream(e) => write!(f, "{}", e),
            RelayError::ChannelClosed => f.write_str("Outgoing serial channel closed"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<io::Error> for RelayError {
    fn from(e: io::Error) -> Self {
        RelayError::Io(e)
    }
}

impl From<RtcmError> for RelayError {
    fn from(e: RtcmError) -> Self {
        match e {
            RtcmError::Io(e) => RelayError::Io(e),
            e => RelayError::Stream(e),
        }
    }
}

/// Error returned by the request/response operations
#[derive(Debug)]
pub enum HandlerError {
    Codec(CodecError),
    ChannelClosed,
    /// The reply did not carry a field the operation needs
    MissingField {
        identity: String,
        field: &'static str,
    },
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Codec(e) => write!(f, "{}", e),
            HandlerError::ChannelClosed => f.write_str("Receiver channel closed"),
            HandlerError::MissingField { identity, field } => {
                write!(f, "Reply {} has no field {}", identity, field)
            },
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<CodecError> for HandlerError {
    fn from(e: CodecError) -> Self {
        HandlerError::Codec(e)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DateTimeError {
    InvalidDate,
    InvalidTime,
    InvalidNanoseconds,
}

impl fmt::Display for DateTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateTimeError::InvalidDate => f.write_str("invalid date"),
            DateTimeError::InvalidTime => f.write_str("invalid time"),
            DateTimeError::InvalidNanoseconds => f.write_str("invalid nanoseconds"),
        }
    }
}

impl std::error::Error for DateTimeError {}
