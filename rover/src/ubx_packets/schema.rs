//! Static payload definitions and identity tables.
//!
//! Every supported message is described once as a tree of [Field]s; the same
//! tree drives both encoding and decoding.

use super::types::{AttrType, MsgMode};

/// How often a repeating group occurs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepeatCount {
    Fixed(usize),
    /// Remaining payload divided by the group width
    FillRemaining,
    /// Value of an earlier attribute (or bitfield sub-field)
    Field(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Descriptor {
    Scalar(AttrType),
    /// Integer on the wire, decimal value times the scale factor for callers
    Scaled(AttrType, f64),
    /// Underlying integer plus ordered (name, width in bits) sub-fields
    Bitfield(AttrType, &'static [(&'static str, u8)]),
    Group(RepeatCount, &'static [Field]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub desc: Descriptor,
}

impl Field {
    /// Width in bytes of one occurrence, used to size fill-remaining groups
    pub fn width(&self) -> usize {
        match self.desc {
            Descriptor::Scalar(t) | Descriptor::Scaled(t, _) | Descriptor::Bitfield(t, _) => {
                t.size()
            },
            Descriptor::Group(RepeatCount::Fixed(n), fields) => {
                n * fields.iter().map(Field::width).sum::<usize>()
            },
            Descriptor::Group(..) => 0,
        }
    }
}

pub type Schema = &'static [Field];

pub const U1: AttrType = AttrType::U(1);
pub const U2: AttrType = AttrType::U(2);
pub const U3: AttrType = AttrType::U(3);
pub const U4: AttrType = AttrType::U(4);
pub const U6: AttrType = AttrType::U(6);
pub const U12: AttrType = AttrType::U(12);
pub const I1: AttrType = AttrType::I(1);
pub const I2: AttrType = AttrType::I(2);
pub const I4: AttrType = AttrType::I(4);
pub const X1: AttrType = AttrType::X(1);
pub const X2: AttrType = AttrType::X(2);
pub const X4: AttrType = AttrType::X(4);
pub const C2: AttrType = AttrType::C(2);

pub const SCAL1: f64 = 1e-1;
pub const SCAL2: f64 = 1e-2;
pub const SCAL5: f64 = 1e-5;
pub const SCAL7: f64 = 1e-7;

const fn f(name: &'static str, t: AttrType) -> Field {
    Field {
        name,
        desc: Descriptor::Scalar(t),
    }
}

const fn scaled(name: &'static str, t: AttrType, scale: f64) -> Field {
    Field {
        name,
        desc: Descriptor::Scaled(t, scale),
    }
}

const fn bits(name: &'static str, t: AttrType, sub: &'static [(&'static str, u8)]) -> Field {
    Field {
        name,
        desc: Descriptor::Bitfield(t, sub),
    }
}

const fn group(count: RepeatCount, fields: &'static [Field]) -> Field {
    Field {
        name: "group",
        desc: Descriptor::Group(count, fields),
    }
}

pub static UBX_CLASSES: &[(u8, &str)] = &[
    (0x01, "NAV"),
    (0x02, "RXM"),
    (0x04, "INF"),
    (0x05, "ACK"),
    (0x06, "CFG"),
    (0x09, "UPD"),
    (0x0a, "MON"),
    (0x0d, "TIM"),
    (0x10, "ESF"),
    (0x13, "MGA"),
    (0x21, "LOG"),
    (0x27, "SEC"),
];

/// Known identity: class, id and, for the MGA family, the payload sub-type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgIdentity {
    pub class: u8,
    pub id: u8,
    pub subtype: Option<u8>,
    pub name: &'static str,
}

const fn ident(class: u8, id: u8, name: &'static str) -> MsgIdentity {
    MsgIdentity {
        class,
        id,
        subtype: None,
        name,
    }
}

const fn ident_sub(class: u8, id: u8, subtype: u8, name: &'static str) -> MsgIdentity {
    MsgIdentity {
        class,
        id,
        subtype: Some(subtype),
        name,
    }
}

pub static UBX_MSGIDS: &[MsgIdentity] = &[
    ident(0x05, 0x01, "ACK-ACK"),
    ident(0x05, 0x00, "ACK-NAK"),
    ident(0x06, 0x09, "CFG-CFG"),
    ident(0x06, 0x17, "CFG-NMEA"),
    ident(0x06, 0x00, "CFG-PRT"),
    ident(0x06, 0x08, "CFG-RATE"),
    ident(0x06, 0x01, "CFG-MSG"),
    ident(0x06, 0x8c, "CFG-VALDEL"),
    ident(0x06, 0x8b, "CFG-VALGET"),
    ident(0x06, 0x8a, "CFG-VALSET"),
    ident(0x10, 0x02, "ESF-MEAS"),
    ident_sub(0x13, 0x40, 0x10, "MGA-INI-TIME-UTC"),
    ident_sub(0x13, 0x60, 0x01, "MGA-ACK-DATA0"),
    ident(0x13, 0x80, "MGA-DBD"),
    ident(0x01, 0x07, "NAV-PVT"),
    ident(0x01, 0x35, "NAV-SAT"),
    ident(0x01, 0x43, "NAV-SIG"),
    ident(0x01, 0x03, "NAV-STATUS"),
    ident(0x01, 0x3b, "NAV-SVIN"),
    ident(0x09, 0x14, "UPD-SOS"),
    // NMEA standard messages, addressable through CFG-MSG only
    ident(0xf0, 0x0a, "DTM"),
    ident(0xf0, 0x45, "GAQ"),
    ident(0xf0, 0x44, "GBQ"),
    ident(0xf0, 0x09, "GBS"),
    ident(0xf0, 0x00, "GGA"),
    ident(0xf0, 0x01, "GLL"),
    ident(0xf0, 0x43, "GLQ"),
    ident(0xf0, 0x42, "GNQ"),
    ident(0xf0, 0x0d, "GNS"),
    ident(0xf0, 0x40, "GPQ"),
    ident(0xf0, 0x47, "GQQ"),
    ident(0xf0, 0x06, "GRS"),
    ident(0xf0, 0x02, "GSA"),
    ident(0xf0, 0x07, "GST"),
    ident(0xf0, 0x03, "GSV"),
    ident(0xf0, 0x0b, "RLM"),
    ident(0xf0, 0x04, "RMC"),
    ident(0xf0, 0x0e, "THS"),
    ident(0xf0, 0x41, "TXT"),
    ident(0xf0, 0x0f, "VLW"),
    ident(0xf0, 0x05, "VTG"),
    ident(0xf0, 0x08, "ZDA"),
];

pub fn class_name(class: u8) -> Option<&'static str> {
    UBX_CLASSES
        .iter()
        .find(|(c, _)| *c == class)
        .map(|(_, name)| *name)
}

/// Name of a class/id pair, ignoring sub-typed identities
pub fn msg_name(class: u8, id: u8) -> Option<&'static str> {
    UBX_MSGIDS
        .iter()
        .find(|m| m.class == class && m.id == id && m.subtype.is_none())
        .map(|m| m.name)
}

pub fn find_by_name(name: &str) -> Option<&'static MsgIdentity> {
    UBX_MSGIDS.iter().find(|m| m.name == name)
}

/// Resolve the identity string of a message.
///
/// All MGA messages except MGA-DBD are told apart by the first payload
/// byte. Unknown messages are named `{CLASS}-{class:02x}{id:02x}-NOMINAL`.
pub fn identity_of(class: u8, id: u8, payload: &[u8]) -> String {
    let subtype = if class == 0x13 && id != 0x80 {
        payload.first().copied()
    } else {
        None
    };
    let known = UBX_MSGIDS.iter().find(|m| {
        m.class == class
            && m.id == id
            && match (m.subtype, subtype) {
                (None, None) => true,
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    });
    match known {
        Some(m) => m.name.to_string(),
        None => format!(
            "{}-{:02x}{:02x}-NOMINAL",
            class_name(class).unwrap_or("UNKNOWN"),
            class,
            id
        ),
    }
}

pub fn is_nominal(identity: &str) -> bool {
    identity.ends_with("NOMINAL")
}

static ACK: &[Field] = &[f("clsID", U1), f("msgID", U1)];

static CFG_CFG: &[Field] = &[
    f("clearMask", X4),
    f("saveMask", X4),
    f("loadMask", X4),
    bits(
        "deviceMask",
        X1,
        &[
            ("devBBR", 1),
            ("devFlash", 1),
            ("devEEPROM", 1),
            ("reserved1", 1),
            ("devSpiFlash", 1),
        ],
    ),
];

static CFG_MSG: &[Field] = &[
    f("msgClass", U1),
    f("msgID", U1),
    f("rateDDC", U1),
    f("rateUART1", U1),
    f("rateUART2", U1),
    f("rateUSB", U1),
    f("rateSPI", U1),
    f("reserved", U1),
];

static CFG_NMEA: &[Field] = &[
    bits(
        "filter",
        X1,
        &[
            ("posFilt", 1),
            ("mskPosFilt", 1),
            ("timeFilt", 1),
            ("dateFilt", 1),
            ("gpsOnlyFilter", 1),
            ("trackFilt", 1),
        ],
    ),
    f("nmeaVersion", U1),
    f("numSV", U1),
    bits(
        "flags",
        X1,
        &[
            ("compat", 1),
            ("consider", 1),
            ("limit82", 1),
            ("highPrec", 1),
        ],
    ),
    bits(
        "gnssToFilter",
        X4,
        &[
            ("gps", 1),
            ("sbas", 1),
            ("galileo", 1),
            ("reserved2", 1),
            ("qzss", 1),
            ("glonass", 1),
            ("beidou", 1),
        ],
    ),
    f("svNumbering", U1),
    f("mainTalkerId", U1),
    f("gsvTalkerId", U1),
    f("version", U1),
    f("bdsTalkerId", C2),
    f("reserved1", U6),
];

static CFG_PRT: &[Field] = &[
    f("portID", U1),
    f("reserved0", U1),
    bits(
        "txReady",
        X2,
        &[("enable", 1), ("pol", 1), ("pin", 5), ("thres", 9)],
    ),
    bits(
        "UARTmode",
        X4,
        &[
            ("reserved2", 6),
            ("charLen", 2),
            ("reserved3", 1),
            ("parity", 3),
            ("nStopBits", 2),
        ],
    ),
    f("baudRate", U4),
    bits(
        "inProtoMask",
        X2,
        &[
            ("inUBX", 1),
            ("inNMEA", 1),
            ("inRTCM", 1),
            ("reserved4", 2),
            ("inRTCM3", 1),
        ],
    ),
    bits(
        "outProtoMask",
        X2,
        &[
            ("outUBX", 1),
            ("outNMEA", 1),
            ("reserved5", 3),
            ("outRTCM3", 1),
        ],
    ),
    bits("flags", X2, &[("reserved6", 1), ("extendedTxTimeout", 1)]),
    f("reserved1", U2),
];

static CFG_RATE: &[Field] = &[f("measRate", U2), f("navRate", U2), f("timeRef", U2)];

static CFG_VALGET_GET: &[Field] = &[
    f("version", U1),
    f("layer", U1),
    f("position", U2),
    group(RepeatCount::FillRemaining, &[f("cfgData", U1)]),
];

static CFG_VALGET_POLL: &[Field] = &[
    f("version", U1),
    f("layer", U1),
    f("position", U2),
    group(RepeatCount::FillRemaining, &[f("keys", U4)]),
];

static CFG_VALDEL: &[Field] = &[
    f("version", U1),
    bits("layers", X1, &[("reserved1", 1), ("bbr", 1), ("flash", 1)]),
    bits("transaction", X1, &[("action", 2)]),
    f("reserved0", U1),
    group(RepeatCount::FillRemaining, &[f("keys", U4)]),
];

static CFG_VALSET: &[Field] = &[
    f("version", U1),
    bits("layers", X1, &[("ram", 1), ("bbr", 1), ("flash", 1)]),
    bits("transaction", X1, &[("action", 2)]),
    f("reserved0", U1),
    group(RepeatCount::FillRemaining, &[f("cfgData", U1)]),
];

static ESF_MEAS: &[Field] = &[
    f("timeTag", U4),
    bits(
        "flags",
        X2,
        &[
            ("timeMarkSent", 2),
            ("timeMarkEdge", 1),
            ("calibTtagValid", 1),
            ("reserved1", 7),
            ("numMeas", 5),
        ],
    ),
    f("id", U2),
    group(
        RepeatCount::Field("numMeas"),
        &[bits("data", X4, &[("dataField", 24), ("dataType", 6)])],
    ),
];

static MGA_INI_TIME_UTC: &[Field] = &[
    f("type", U1),
    f("version", U1),
    bits("ref", X1, &[("source", 4), ("fall", 1), ("last", 1)]),
    f("leapSecs", I1),
    f("year", U2),
    f("month", U1),
    f("day", U1),
    f("hour", U1),
    f("minute", U1),
    f("second", U1),
    f("reserved0", U1),
    f("ns", U4),
    f("tAccS", U2),
    f("reserved1", U2),
    f("tAccNs", U4),
];

static MGA_ACK_DATA0: &[Field] = &[
    f("type", U1),
    f("version", U1),
    f("infoCode", U1),
    f("msgId", U1),
    f("msgPayloadStart", U4),
];

static MGA_DBD: &[Field] = &[
    f("reserved1", U12),
    group(RepeatCount::FillRemaining, &[f("data", U1)]),
];

static NAV_PVT: &[Field] = &[
    f("iTOW", U4),
    f("year", U2),
    f("month", U1),
    f("day", U1),
    f("hour", U1),
    f("min", U1),
    f("second", U1),
    bits(
        "valid",
        X1,
        &[
            ("validDate", 1),
            ("validTime", 1),
            ("fullyResolved", 1),
            ("validMag", 1),
        ],
    ),
    f("tAcc", U4),
    f("nano", I4),
    f("fixType", U1),
    bits(
        "flags",
        X1,
        &[
            ("gnssFixOk", 1),
            ("difSoln", 1),
            ("psmState", 3),
            ("headVehValid", 1),
            ("carrSoln", 2),
        ],
    ),
    bits(
        "flags2",
        X1,
        &[
            ("reserved", 5),
            ("confirmedAvai", 1),
            ("confirmedDate", 1),
            ("confirmedTime", 1),
        ],
    ),
    f("numSV", U1),
    scaled("lon", I4, SCAL7),
    scaled("lat", I4, SCAL7),
    f("height", I4),
    f("hMSL", I4),
    f("hAcc", U4),
    f("vAcc", U4),
    f("velN", I4),
    f("velE", I4),
    f("velD", I4),
    f("gSpeed", I4),
    scaled("headMot", I4, SCAL5),
    f("sAcc", U4),
    scaled("headAcc", U4, SCAL5),
    scaled("pDOP", U2, SCAL2),
    bits(
        "flags3",
        X2,
        &[("invalidLlh", 1), ("lastCorrectionAge", 4)],
    ),
    f("reserved0", U4),
    scaled("headVeh", I4, SCAL5),
    scaled("magDec", I2, SCAL2),
    scaled("magAcc", U2, SCAL2),
];

static NAV_SAT: &[Field] = &[
    f("iTOW", U4),
    f("version", U1),
    f("numSvs", U1),
    f("reserved0", U2),
    group(
        RepeatCount::Field("numSvs"),
        &[
            f("gnssId", U1),
            f("svId", U1),
            f("cno", U1),
            f("elev", I1),
            f("azim", I2),
            scaled("prRes", I2, SCAL1),
            bits(
                "flags",
                X4,
                &[
                    ("qualityInd", 3),
                    ("svUsed", 1),
                    ("health", 2),
                    ("diffCorr", 1),
                    ("smoothed", 1),
                    ("orbitSource", 3),
                    ("ephAvail", 1),
                    ("almAvail", 1),
                    ("anoAvail", 1),
                    ("aopAvail", 1),
                    ("reserved13", 1),
                    ("sbasCorrUsed", 1),
                    ("rtcmCorrUsed", 1),
                    ("slasCorrUsed", 1),
                    ("spartnCorrUsed", 1),
                    ("prCorrUsed", 1),
                    ("crCorrUsed", 1),
                    ("doCorrUsed", 1),
                ],
            ),
        ],
    ),
];

static NAV_STATUS: &[Field] = &[
    f("iTOW", U4),
    f("gpsFix", U1),
    bits(
        "flags",
        X1,
        &[
            ("gpsFixOk", 1),
            ("diffSoln", 1),
            ("wknSet", 1),
            ("towSet", 1),
        ],
    ),
    bits(
        "fixStat",
        X1,
        &[
            ("diffCorr", 1),
            ("carrSolnValid", 1),
            ("reserved0", 4),
            ("mapMatching", 2),
        ],
    ),
    bits(
        "flags2",
        X1,
        &[
            ("psmState", 2),
            ("reserved1", 1),
            ("spoofDetState", 2),
            ("reserved2", 1),
            ("carrSoln", 2),
        ],
    ),
    f("ttff", U4),
    f("msss", U4),
];

static UPD_SOS_GET: &[Field] = &[
    f("cmd", U1),
    f("reserved0", U3),
    f("response", U1),
    f("reserved1", U3),
];

static UPD_SOS_SET: &[Field] = &[f("cmd", U1), f("reserved0", U3)];

static CFG_MSG_POLL: &[Field] = &[f("msgClass", U1), f("msgID", U1)];

static EMPTY: &[Field] = &[];

/// Fallback definition for messages without a documented payload
pub static UBX_NOMINAL: &[Field] = &[group(RepeatCount::FillRemaining, &[f("data", X1)])];

/// Payload definition for an identity in the given mode
pub fn payload_schema(identity: &str, mode: MsgMode) -> Option<Schema> {
    let schema = match mode {
        MsgMode::Get => match identity {
            "ACK-ACK" | "ACK-NAK" => ACK,
            "CFG-CFG" => CFG_CFG,
            "CFG-MSG" => CFG_MSG,
            "CFG-NMEA" => CFG_NMEA,
            "CFG-PRT" => CFG_PRT,
            "CFG-RATE" => CFG_RATE,
            "CFG-VALGET" => CFG_VALGET_GET,
            "ESF-MEAS" => ESF_MEAS,
            "MGA-ACK-DATA0" => MGA_ACK_DATA0,
            "MGA-DBD" => MGA_DBD,
            "NAV-PVT" => NAV_PVT,
            "NAV-SAT" => NAV_SAT,
            "NAV-STATUS" => NAV_STATUS,
            "UPD-SOS" => UPD_SOS_GET,
            id if is_nominal(id) => UBX_NOMINAL,
            _ => return None,
        },
        MsgMode::Set => match identity {
            "CFG-CFG" => CFG_CFG,
            "CFG-MSG" => CFG_MSG,
            "CFG-NMEA" => CFG_NMEA,
            "CFG-RATE" => CFG_RATE,
            "CFG-VALDEL" => CFG_VALDEL,
            "CFG-VALSET" => CFG_VALSET,
            "ESF-MEAS" => ESF_MEAS,
            "MGA-DBD" => MGA_DBD,
            "MGA-INI-TIME-UTC" => MGA_INI_TIME_UTC,
            "UPD-SOS" => UPD_SOS_SET,
            _ => return None,
        },
        MsgMode::Poll => match identity {
            "CFG-MSG" => CFG_MSG_POLL,
            "CFG-VALGET" => CFG_VALGET_POLL,
            "CFG-NMEA" | "CFG-PRT" | "CFG-RATE" | "MGA-DBD" | "NAV-PVT" | "NAV-SAT"
            | "NAV-SIG" | "NAV-STATUS" | "NAV-SVIN" | "UPD-SOS" => EMPTY,
            _ => return None,
        },
    };
    Some(schema)
}
