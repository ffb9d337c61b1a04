//! # rtk_rover
//!
//! Core of a GNSS RTK rover built around a u-blox receiver: a schema driven UBX
//! codec, an RTCM3 framer, the serial dispatcher sorting receiver output into
//! channels, request/response operations on top of them and an NTRIP client
//! relaying corrections from a caster to the receiver.
//!
//! Constructing Packets
//! ====================
//!
//! Messages are built by identity and mode. Fields that are not set take their
//! nominal value, a builder without values produces a poll:
//! ```
//! use rtk_rover::{MsgMode, UbxMessage};
//!
//! let msg = UbxMessage::builder("CFG-RATE", MsgMode::Set)
//!     .set("measRate", 200u16)
//!     .set("navRate", 1u16)
//!     .set("timeRef", 1u16)
//!     .build()
//!     .unwrap();
//! let bytes = msg.serialize();
//! assert_eq!(&bytes[..6], &[0xb5, 0x62, 0x06, 0x08, 0x06, 0x00]);
//!
//! let poll = UbxMessage::poll("NAV-PVT").unwrap();
//! assert_eq!(poll.serialize(), [0xb5, 0x62, 0x01, 0x07, 0x00, 0x00, 0x08, 0x19]);
//! ```
//!
//! Parsing Packets
//! ===============
//!
//! Complete frames are decoded with [UbxMessage::decode]. Unknown messages
//! decode to a nominal payload instead of failing:
//! ```
//! use rtk_rover::{UbxMessage, Value};
//!
//! let ack = UbxMessage::decode(&[0xb5, 0x62, 0x05, 0x01, 0x02, 0x00, 0x06, 0x01, 0x0f, 0x38])
//!     .unwrap();
//! assert_eq!(ack.identity(), "ACK-ACK");
//! assert_eq!(ack.get("msgID"), Some(&Value::Unsigned(0x01)));
//! ```
//!
//! Running the rover
//! =================
//!
//! All tasks share one [RoverContext]. The serial dispatcher
//! ([serial::run_reader]) and writer ([serial::run_writer]) own the receiver
//! link, [GnssHandler] offers the request/response operations and
//! [NtripClient] relays corrections while enabled.

pub use crate::{
    channel::{Channel, Signal},
    config::{ChannelCapacities, NtripSettings, RoverConfig},
    context::RoverContext,
    error::{CodecError, DateTimeError, HandlerError, NmeaError, RelayError, RtcmError},
    ntrip::NtripClient,
    orchestrator::{GnssHandler, SatelliteSystems},
    parser::{ErrorPolicy, RtcmReader},
    position::{Accuracy, PositionData, RealTimeMessage},
    ubx_packets::*,
};

pub mod channel;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod ntrip;
pub mod orchestrator;
pub mod parser;
pub mod position;
pub mod serial;
pub mod ubx_packets;
