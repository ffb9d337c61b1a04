use std::{collections::HashMap, fmt};

use num_traits::ToPrimitive;
use tracing::trace;

use super::{
    cfg_val::{
        cfg_key_to_name, CfgKeyRef, CfgLayerGet, CfgLayerSet, KeyId, Transaction, MAX_CFG_KEYS,
    },
    schema::{
        class_name, find_by_name, identity_of, msg_name, payload_schema, Descriptor, Field,
        RepeatCount, Schema, UBX_NOMINAL,
    },
    types::{gnss_name, AttrType, MsgMode, Value},
};
use crate::{
    constants::{
        SCALE_ROUND_DIGITS, UBX_CHECKSUM_LEN, UBX_CLASS_OFFSET, UBX_HEADER_LEN,
        UBX_LENGTH_OFFSET, UBX_MSG_ID_OFFSET, UBX_SYNC_CHAR_1, UBX_SYNC_CHAR_2,
    },
    error::{CodecError, TypeErrorKind},
    parser::checksum::UbxChecksumCalc,
};

/// A UBX message. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct UbxMessage {
    class: u8,
    id: u8,
    mode: MsgMode,
    identity: String,
    payload: Vec<u8>,
    checksum: [u8; 2],
    fields: Vec<(String, Value)>,
}

/// Collects attribute values for a new [UbxMessage].
///
/// Attributes inside repeating groups are addressed with a `_NN` suffix per
/// nesting level (`gnssId_01`, `gnssId_02`, ...). Attributes left unset take
/// their nominal value. A builder with no attributes at all produces an
/// empty payload, which is how polls are sent.
#[derive(Debug, Clone)]
pub struct UbxMessageBuilder {
    identity: String,
    mode: MsgMode,
    values: HashMap<String, Value>,
}

impl UbxMessageBuilder {
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn build(mut self) -> Result<UbxMessage, CodecError> {
        let ident = find_by_name(&self.identity)
            .ok_or_else(|| CodecError::UnknownIdentity(self.identity.clone()))?;
        if self.values.is_empty() {
            return UbxMessage::finish(ident.class, ident.id, self.mode, Vec::new(), Vec::new());
        }
        let schema =
            payload_schema(ident.name, self.mode).ok_or_else(|| CodecError::UnsupportedMode {
                identity: self.identity.clone(),
                mode: self.mode as u8,
            })?;
        if let Some(subtype) = ident.subtype {
            self.values
                .entry("type".to_string())
                .or_insert(Value::Unsigned(u64::from(subtype)));
        }
        let mut walker = Walker::new(
            ident.name,
            ident.class,
            ident.id,
            self.mode,
            Source::Values(&self.values),
        );
        walker.walk(schema)?;
        let Walker { out, fields, .. } = walker;
        UbxMessage::finish(ident.class, ident.id, self.mode, out, fields)
    }
}

impl UbxMessage {
    pub fn builder(identity: impl Into<String>, mode: MsgMode) -> UbxMessageBuilder {
        UbxMessageBuilder {
            identity: identity.into(),
            mode,
            values: HashMap::new(),
        }
    }

    /// Poll request with an empty payload
    pub fn poll(identity: &str) -> Result<Self, CodecError> {
        Self::builder(identity, MsgMode::Poll).build()
    }

    /// Build a message around a complete raw payload
    pub fn from_payload(identity: &str, mode: MsgMode, payload: &[u8]) -> Result<Self, CodecError> {
        let ident =
            find_by_name(identity).ok_or_else(|| CodecError::UnknownIdentity(identity.into()))?;
        let schema = payload_schema(ident.name, mode).ok_or_else(|| CodecError::UnsupportedMode {
            identity: identity.into(),
            mode: mode as u8,
        })?;
        Self::parse(ident.class, ident.id, mode, payload, schema)
    }

    /// Decode a complete frame received from the receiver
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        Self::decode_with_mode(raw, MsgMode::Get)
    }

    /// Decode a complete frame using the definitions of the given mode.
    ///
    /// Header, declared length and checksum are validated first. In GET mode
    /// messages without a payload definition fall back to the nominal one.
    pub fn decode_with_mode(raw: &[u8], mode: MsgMode) -> Result<Self, CodecError> {
        if raw.len() < UBX_HEADER_LEN + UBX_CHECKSUM_LEN {
            return Err(CodecError::InvalidPacketLen {
                expect: UBX_HEADER_LEN + UBX_CHECKSUM_LEN,
                got: raw.len(),
            });
        }
        if raw[0] != UBX_SYNC_CHAR_1 || raw[1] != UBX_SYNC_CHAR_2 {
            return Err(CodecError::InvalidHeader {
                got: [raw[0], raw[1]],
            });
        }
        let class = raw[UBX_CLASS_OFFSET];
        let id = raw[UBX_MSG_ID_OFFSET];
        let declared =
            usize::from(u16::from_le_bytes([raw[UBX_LENGTH_OFFSET], raw[UBX_LENGTH_OFFSET + 1]]));
        let got = raw.len() - UBX_HEADER_LEN - UBX_CHECKSUM_LEN;
        if declared != got {
            return Err(CodecError::InvalidPacketLen {
                expect: declared,
                got,
            });
        }
        let ck_offset = UBX_HEADER_LEN + declared;
        let mut calc = UbxChecksumCalc::new();
        calc.update(&raw[UBX_CLASS_OFFSET..ck_offset]);
        calc.validate_result(raw[ck_offset], raw[ck_offset + 1])?;

        let payload = &raw[UBX_HEADER_LEN..ck_offset];
        let identity = identity_of(class, id, payload);
        let schema = match payload_schema(&identity, mode) {
            Some(schema) => schema,
            None if mode == MsgMode::Get => {
                trace!(identity = %identity, "no payload definition, parsing as nominal");
                UBX_NOMINAL
            },
            None => {
                return Err(CodecError::UnsupportedMode {
                    identity,
                    mode: mode as u8,
                })
            },
        };
        Self::parse(class, id, mode, payload, schema)
    }

    fn parse(
        class: u8,
        id: u8,
        mode: MsgMode,
        payload: &[u8],
        schema: Schema,
    ) -> Result<Self, CodecError> {
        let identity = identity_of(class, id, payload);
        let mut walker = Walker::new(&identity, class, id, mode, Source::Payload(payload));
        walker.walk(schema)?;
        let fields = walker.fields;
        Self::finish(class, id, mode, payload.to_vec(), fields)
    }

    fn finish(
        class: u8,
        id: u8,
        mode: MsgMode,
        payload: Vec<u8>,
        fields: Vec<(String, Value)>,
    ) -> Result<Self, CodecError> {
        let len = u16::try_from(payload.len()).map_err(|_| CodecError::InvalidPacketLen {
            expect: usize::from(u16::MAX),
            got: payload.len(),
        })?;
        let mut calc = UbxChecksumCalc::new();
        calc.update(&[class, id]);
        calc.update(&len.to_le_bytes());
        calc.update(&payload);
        let (ck_a, ck_b) = calc.result();
        Ok(Self {
            class,
            id,
            mode,
            identity: identity_of(class, id, &payload),
            payload,
            checksum: [ck_a, ck_b],
            fields,
        })
    }

    /// CFG-VALSET from (key, value) pairs, keys by name or id
    pub fn config_set(
        layers: CfgLayerSet,
        transaction: Transaction,
        cfg_data: &[(CfgKeyRef<'_>, Value)],
    ) -> Result<Self, CodecError> {
        if cfg_data.len() > MAX_CFG_KEYS {
            return Err(CodecError::TooManyCfgKeys(cfg_data.len()));
        }
        let mut payload = cfg_header(layers, transaction);
        for (key, value) in cfg_data {
            let (id, attr) = key.resolve()?;
            let bytes = attr.encode(value).map_err(|reason| CodecError::TypeError {
                identity: "CFG-VALSET".into(),
                field: cfg_key_to_name(id)
                    .map(|(name, _)| name.into_owned())
                    .unwrap_or_default(),
                reason,
            })?;
            payload.extend_from_slice(&id.to_le_bytes());
            payload.extend_from_slice(&bytes);
        }
        Self::from_payload("CFG-VALSET", MsgMode::Set, &payload)
    }

    /// CFG-VALDEL for the given keys
    pub fn config_del(
        layers: CfgLayerSet,
        transaction: Transaction,
        keys: &[CfgKeyRef<'_>],
    ) -> Result<Self, CodecError> {
        if keys.len() > MAX_CFG_KEYS {
            return Err(CodecError::TooManyCfgKeys(keys.len()));
        }
        let mut payload = cfg_header(layers, transaction);
        for key in keys {
            let (id, _) = key.resolve()?;
            payload.extend_from_slice(&id.to_le_bytes());
        }
        Self::from_payload("CFG-VALDEL", MsgMode::Set, &payload)
    }

    /// CFG-VALGET poll for the given keys
    pub fn config_poll(
        layer: CfgLayerGet,
        position: u16,
        keys: &[CfgKeyRef<'_>],
    ) -> Result<Self, CodecError> {
        if keys.len() > MAX_CFG_KEYS {
            return Err(CodecError::TooManyCfgKeys(keys.len()));
        }
        let mut payload = vec![0, layer as u8];
        payload.extend_from_slice(&position.to_le_bytes());
        for key in keys {
            let (id, _) = key.resolve()?;
            payload.extend_from_slice(&id.to_le_bytes());
        }
        Self::from_payload("CFG-VALGET", MsgMode::Poll, &payload)
    }

    pub fn class(&self) -> u8 {
        self.class
    }

    pub fn msg_id(&self) -> u8 {
        self.id
    }

    pub fn mode(&self) -> MsgMode {
        self.mode
    }

    /// Plain text identity, e.g. `CFG-MSG`
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn length(&self) -> u16 {
        // checked in finish
        self.payload.len() as u16
    }

    pub fn checksum(&self) -> [u8; 2] {
        self.checksum
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Attributes in payload order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Complete frame: preamble, class, id, length, payload, checksum
    pub fn serialize(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(UBX_HEADER_LEN + self.payload.len() + UBX_CHECKSUM_LEN);
        v.push(UBX_SYNC_CHAR_1);
        v.push(UBX_SYNC_CHAR_2);
        v.push(self.class);
        v.push(self.id);
        v.extend_from_slice(&self.length().to_le_bytes());
        v.extend_from_slice(&self.payload);
        v.extend_from_slice(&self.checksum);
        v
    }
}

fn cfg_header(layers: CfgLayerSet, transaction: Transaction) -> Vec<u8> {
    let version = u8::from(transaction != Transaction::None);
    vec![version, layers.bits(), transaction as u8, 0]
}

impl fmt::Display for UbxMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "<UBX({})>", self.identity);
        }
        write!(f, "<UBX({}", self.identity)?;
        let names_ids = self.class == 0x05 || (self.class == 0x06 && self.id == 0x01);
        let mut clsid = None;
        for (name, value) in &self.fields {
            write!(f, ", {}=", name)?;
            let num = value.as_u64();
            if name.starts_with("gnssId") {
                if let Some(gnss) = num.and_then(gnss_name) {
                    f.write_str(gnss)?;
                    continue;
                }
            }
            if names_ids {
                if let Some(v) = num.and_then(|v| u8::try_from(v).ok()) {
                    if name == "clsID" || name == "msgClass" {
                        clsid = Some(v);
                        if let Some(cls) = class_name(v) {
                            f.write_str(cls)?;
                            continue;
                        }
                    } else if name == "msgID" {
                        if let Some(msg) = clsid.and_then(|c| msg_name(c, v)) {
                            f.write_str(msg)?;
                            continue;
                        }
                    }
                }
            }
            write!(f, "{}", value)?;
        }
        f.write_str(")>")
    }
}

enum Source<'a> {
    Payload(&'a [u8]),
    Values(&'a HashMap<String, Value>),
}

/// One pass over a payload definition, either reading attributes out of a
/// raw payload or writing caller values into a new one.
struct Walker<'a> {
    identity: &'a str,
    class: u8,
    id: u8,
    mode: MsgMode,
    source: Source<'a>,
    out: Vec<u8>,
    offset: usize,
    index: Vec<usize>,
    fields: Vec<(String, Value)>,
}

impl<'a> Walker<'a> {
    fn new(identity: &'a str, class: u8, id: u8, mode: MsgMode, source: Source<'a>) -> Self {
        Self {
            identity,
            class,
            id,
            mode,
            source,
            out: Vec::new(),
            offset: 0,
            index: Vec::new(),
            fields: Vec::new(),
        }
    }

    fn walk(&mut self, schema: Schema) -> Result<(), CodecError> {
        for field in schema {
            self.field(field)?;
        }
        Ok(())
    }

    fn field(&mut self, field: &Field) -> Result<(), CodecError> {
        match field.desc {
            Descriptor::Scalar(t) => self.scalar(field.name, t, None),
            Descriptor::Scaled(t, scale) => self.scalar(field.name, t, Some(scale)),
            Descriptor::Bitfield(t, sub) => self.bitfield(field.name, t, sub),
            Descriptor::Group(count, fields) => self.group(count, fields),
        }
    }

    fn suffixed(&self, name: &str) -> String {
        let mut key = name.to_string();
        for i in self.index.iter().filter(|i| **i > 0) {
            key.push_str(&format!("_{:02}", i));
        }
        key
    }

    fn type_error(&self, field: &str, reason: TypeErrorKind) -> CodecError {
        CodecError::TypeError {
            identity: self.identity.to_string(),
            field: field.to_string(),
            reason,
        }
    }

    fn take(&self, payload: &'a [u8], len: usize, field: &str) -> Result<&'a [u8], CodecError> {
        payload
            .get(self.offset..self.offset + len)
            .ok_or_else(|| self.type_error(field, TypeErrorKind::Truncated))
    }

    fn scalar(&mut self, name: &str, t: AttrType, scale: Option<f64>) -> Result<(), CodecError> {
        let key = self.suffixed(name);
        let (value, size) = match self.source {
            Source::Payload(payload) => {
                let size = match t {
                    AttrType::Ch => payload.len().saturating_sub(self.offset),
                    t => t.size(),
                };
                let raw = t.decode(self.take(payload, size, &key)?);
                let value = match scale {
                    None => raw,
                    Some(scale) => {
                        let raw = raw
                            .as_f64()
                            .ok_or_else(|| self.type_error(&key, TypeErrorKind::Incompatible))?;
                        Value::Float(round_scaled(raw * scale))
                    },
                };
                (value, size)
            },
            Source::Values(values) => {
                let value = values.get(&key).cloned().unwrap_or_else(|| t.nominal());
                let encoded = match scale {
                    None => t.encode(&value),
                    Some(scale) => value
                        .as_f64()
                        .ok_or(TypeErrorKind::Incompatible)
                        .and_then(|v| (v / scale).trunc().to_i64().ok_or(TypeErrorKind::Overflow))
                        .and_then(|raw| t.encode(&Value::Signed(raw))),
                };
                let bytes = encoded.map_err(|reason| self.type_error(&key, reason))?;
                let size = bytes.len();
                self.out.extend_from_slice(&bytes);
                (value, size)
            },
        };
        self.fields.push((key, value));
        self.offset += size;
        Ok(())
    }

    fn bitfield(
        &mut self,
        name: &str,
        t: AttrType,
        sub: &[(&'static str, u8)],
    ) -> Result<(), CodecError> {
        let size = t.size();
        let mut buf = match self.source {
            Source::Payload(payload) => self.take(payload, size, &self.suffixed(name))?.to_vec(),
            Source::Values(_) => vec![0; size],
        };
        let mut bit_offset = 0usize;
        for (sub_name, width) in sub {
            let width = usize::from(*width);
            let key = self.suffixed(sub_name);
            if bit_offset + width > size * 8 {
                return Err(self.type_error(&key, TypeErrorKind::Overflow));
            }
            let value = match self.source {
                Source::Payload(_) => get_bits(&buf, bit_offset, width),
                Source::Values(values) => {
                    let v = match values.get(&key) {
                        Some(v) => v
                            .as_u64()
                            .ok_or_else(|| self.type_error(&key, TypeErrorKind::Incompatible))?,
                        None => 0,
                    };
                    if width < 64 && v >> width != 0 {
                        return Err(self.type_error(&key, TypeErrorKind::Overflow));
                    }
                    set_bits(&mut buf, bit_offset, width, v);
                    v
                },
            };
            if !sub_name.starts_with("reserved") {
                self.fields.push((key, Value::Unsigned(value)));
            }
            bit_offset += width;
        }
        if let Source::Values(_) = self.source {
            self.out.extend_from_slice(&buf);
        }
        self.offset += size;
        Ok(())
    }

    fn group(&mut self, count: RepeatCount, fields: &[Field]) -> Result<(), CodecError> {
        if self.class == 0x06 && self.id == 0x8b && self.mode == MsgMode::Get {
            return self.cfg_values();
        }
        let reps = match count {
            RepeatCount::Fixed(n) => n,
            RepeatCount::FillRemaining => match self.source {
                Source::Payload(payload) => {
                    let width: usize = fields.iter().map(Field::width).sum();
                    if width == 0 {
                        0
                    } else {
                        payload.len().saturating_sub(self.offset) / width
                    }
                },
                Source::Values(values) => self.highest_index(values, fields),
            },
            RepeatCount::Field(name) => {
                let mut reps = self.counted(name)?;
                // ESF-MEAS carries one extra block when the calibration tag is valid
                if self.class == 0x10 && self.id == 0x02 && self.mode == MsgMode::Set {
                    if let Some(true) = self.value_of("calibTtagValid").and_then(Value::as_bool) {
                        reps += 1;
                    }
                }
                reps
            },
        };
        self.index.push(0);
        for i in 0..reps {
            if let Some(last) = self.index.last_mut() {
                *last = i + 1;
            }
            for field in fields {
                self.field(field)?;
            }
        }
        self.index.pop();
        Ok(())
    }

    fn value_of(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn counted(&self, name: &str) -> Result<usize, CodecError> {
        self.value_of(name)
            .and_then(Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| self.type_error(name, TypeErrorKind::Incompatible))
    }

    /// Number of repetitions implied by the highest `_NN` suffix supplied for
    /// any attribute of the group
    fn highest_index(&self, values: &HashMap<String, Value>, fields: &[Field]) -> usize {
        let mut names = Vec::new();
        collect_names(fields, &mut names);
        let prefixes: Vec<String> = names
            .iter()
            .map(|n| format!("{}_", self.suffixed(n)))
            .collect();
        values
            .keys()
            .filter_map(|key| {
                prefixes.iter().find_map(|p| {
                    let rest = key.strip_prefix(p.as_str())?;
                    let digits = rest.split('_').next()?;
                    if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                        return None;
                    }
                    digits.parse::<usize>().ok()
                })
            })
            .max()
            .unwrap_or(0)
    }

    /// Scan a CFG-VALGET response as (key id, value) pairs, each value sized
    /// by the storage size class of its key id.
    fn cfg_values(&mut self) -> Result<(), CodecError> {
        let payload = match self.source {
            Source::Payload(payload) => payload,
            Source::Values(_) => return Err(CodecError::PayloadRequired(self.identity.into())),
        };
        while self.offset + KeyId::SIZE <= payload.len() {
            let key_bytes = self.take(payload, KeyId::SIZE, "keyId")?;
            let key = u32::from_le_bytes([key_bytes[0], key_bytes[1], key_bytes[2], key_bytes[3]]);
            let (name, attr) = cfg_key_to_name(key).ok_or_else(|| {
                self.type_error(&format!("CFG_0x{:08X}", key), TypeErrorKind::Incompatible)
            })?;
            self.offset += KeyId::SIZE;
            let value = attr.decode(self.take(payload, attr.size(), &name)?);
            self.fields.push((name.into_owned(), value));
            self.offset += attr.size();
        }
        Ok(())
    }
}

fn collect_names(fields: &[Field], names: &mut Vec<&'static str>) {
    for field in fields {
        match field.desc {
            Descriptor::Scalar(_) | Descriptor::Scaled(..) => names.push(field.name),
            Descriptor::Bitfield(_, sub) => names.extend(sub.iter().map(|(n, _)| *n)),
            Descriptor::Group(_, nested) => collect_names(nested, names),
        }
    }
}

fn round_scaled(v: f64) -> f64 {
    let p = 10f64.powi(SCALE_ROUND_DIGITS);
    (v * p).round() / p
}

/// Read `width` bits starting at `offset` (LSB first, little-endian bytes)
fn get_bits(buf: &[u8], offset: usize, width: usize) -> u64 {
    (0..width.min(64)).fold(0u64, |acc, i| {
        let bit = offset + i;
        let set = (buf[bit / 8] >> (bit % 8)) & 1;
        acc | (u64::from(set) << i)
    })
}

fn set_bits(buf: &mut [u8], offset: usize, width: usize, value: u64) {
    for i in 0..width.min(64) {
        let bit = offset + i;
        if (value >> i) & 1 == 1 {
            buf[bit / 8] |= 1 << (bit % 8);
        } else {
            buf[bit / 8] &= !(1 << (bit % 8));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ACK-ACK for CFG-MSG (class 0x06, id 0x01)
    const ACK_ACK_CFG_MSG: [u8; 10] = [0xb5, 0x62, 0x05, 0x01, 0x02, 0x00, 0x06, 0x01, 0x0f, 0x38];

    #[test]
    fn ack_ack_known_vector() {
        let msg = UbxMessage::builder("ACK-ACK", MsgMode::Get)
            .set("clsID", 0x06u8)
            .set("msgID", 0x01u8)
            .build()
            .unwrap();
        assert_eq!(msg.serialize(), ACK_ACK_CFG_MSG);
        assert_eq!(msg.length(), 2);
        assert_eq!(msg.checksum(), [0x0f, 0x38]);
    }

    #[test]
    fn decode_ack_ack() {
        let msg = UbxMessage::decode(&ACK_ACK_CFG_MSG).unwrap();
        assert_eq!(msg.identity(), "ACK-ACK");
        assert_eq!(msg.class(), 0x05);
        assert_eq!(msg.get("clsID"), Some(&Value::Unsigned(6)));
        assert_eq!(msg.get("msgID"), Some(&Value::Unsigned(1)));
        assert_eq!(msg.to_string(), "<UBX(ACK-ACK, clsID=CFG, msgID=CFG-MSG)>");
    }

    #[test]
    fn decode_rejects_corrupt_frames() {
        let mut bad = ACK_ACK_CFG_MSG;
        bad[9] ^= 0xff;
        assert!(matches!(
            UbxMessage::decode(&bad),
            Err(CodecError::InvalidChecksum { .. })
        ));
        let mut bad = ACK_ACK_CFG_MSG;
        bad[1] = 0x63;
        assert_eq!(
            UbxMessage::decode(&bad),
            Err(CodecError::InvalidHeader { got: [0xb5, 0x63] })
        );
        assert!(matches!(
            UbxMessage::decode(&ACK_ACK_CFG_MSG[..9]),
            Err(CodecError::InvalidPacketLen { expect: 2, got: 1 })
        ));
    }

    #[test]
    fn unset_attributes_are_nominal() {
        let msg = UbxMessage::builder("CFG-RATE", MsgMode::Set)
            .set("measRate", 1000u16)
            .build()
            .unwrap();
        assert_eq!(msg.payload(), &[0xe8, 0x03, 0, 0, 0, 0]);
        assert_eq!(msg.get("navRate"), Some(&Value::Unsigned(0)));
    }

    #[test]
    fn empty_builder_is_a_poll() {
        let msg = UbxMessage::poll("NAV-PVT").unwrap();
        assert_eq!(msg.serialize(), [0xb5, 0x62, 0x01, 0x07, 0x00, 0x00, 0x08, 0x19]);
        assert_eq!(msg.to_string(), "<UBX(NAV-PVT)>");
    }

    #[test]
    fn unknown_identity_and_mode() {
        assert_eq!(
            UbxMessage::poll("NAV-NOPE"),
            Err(CodecError::UnknownIdentity("NAV-NOPE".into()))
        );
        assert!(matches!(
            UbxMessage::builder("NAV-PVT", MsgMode::Set)
                .set("iTOW", 1u32)
                .build(),
            Err(CodecError::UnsupportedMode { mode: 1, .. })
        ));
    }

    #[test]
    fn type_errors_name_the_field() {
        let err = UbxMessage::builder("CFG-RATE", MsgMode::Set)
            .set("measRate", 70000u32)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeError {
                identity: "CFG-RATE".into(),
                field: "measRate".into(),
                reason: TypeErrorKind::Overflow,
            }
        );
        let err = UbxMessage::builder("CFG-RATE", MsgMode::Set)
            .set("navRate", "one")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeError { reason: TypeErrorKind::Incompatible, .. }
        ));
    }

    #[test]
    fn truncated_payload_is_a_type_error() {
        assert!(matches!(
            UbxMessage::from_payload("CFG-RATE", MsgMode::Get, &[1, 2, 3]),
            Err(CodecError::TypeError { reason: TypeErrorKind::Truncated, .. })
        ));
    }

    #[test]
    fn scaled_attributes() {
        let msg = UbxMessage::builder("NAV-SAT", MsgMode::Get)
            .set("numSvs", 1u8)
            .set("prRes_01", -1.5f64)
            .build()
            .unwrap();
        // prRes is I2 scaled by 0.1
        assert_eq!(&msg.payload()[14..16], &(-15i16).to_le_bytes());
        let decoded = UbxMessage::from_payload("NAV-SAT", MsgMode::Get, msg.payload()).unwrap();
        assert_eq!(decoded.get("prRes_01"), Some(&Value::Float(-1.5)));

        let mut payload = vec![0u8; 92];
        payload[24..28].copy_from_slice(&123_456_789i32.to_le_bytes());
        let pvt = UbxMessage::from_payload("NAV-PVT", MsgMode::Get, &payload).unwrap();
        assert_eq!(pvt.get("lon"), Some(&Value::Float(12.3456789)));
    }

    #[test]
    fn bitfields_pack_at_offsets() {
        let msg = UbxMessage::builder("CFG-PRT", MsgMode::Get)
            .set("enable", 1u8)
            .set("pin", 0b10101u8)
            .set("thres", 0x1ffu16)
            .set("charLen", 3u8)
            .build()
            .unwrap();
        let tx_ready = u16::from_le_bytes([msg.payload()[2], msg.payload()[3]]);
        assert_eq!(tx_ready, 1 | (0b10101 << 2) | (0x1ff << 7));
        let mode = u32::from_le_bytes([
            msg.payload()[4],
            msg.payload()[5],
            msg.payload()[6],
            msg.payload()[7],
        ]);
        assert_eq!(mode, 3 << 6);

        let decoded = UbxMessage::from_payload("CFG-PRT", MsgMode::Get, msg.payload()).unwrap();
        assert_eq!(decoded.get("thres"), Some(&Value::Unsigned(0x1ff)));
        assert_eq!(decoded.get("pin"), Some(&Value::Unsigned(0b10101)));
        // reserved sub-fields occupy space but are not exposed
        assert_eq!(decoded.get("reserved2"), None);
    }

    #[test]
    fn bitfield_overflow() {
        let err = UbxMessage::builder("CFG-PRT", MsgMode::Get)
            .set("pin", 32u8)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeError { reason: TypeErrorKind::Overflow, ref field, .. } if field == "pin"
        ));
    }

    #[test]
    fn counted_group_suffixes_every_repetition() {
        let msg = UbxMessage::builder("NAV-SAT", MsgMode::Get)
            .set("numSvs", 2u8)
            .set("gnssId_01", 0u8)
            .set("svId_01", 12u8)
            .set("gnssId_02", 6u8)
            .set("svId_02", 3u8)
            .set("svUsed_02", 1u8)
            .build()
            .unwrap();
        assert_eq!(msg.length(), 8 + 2 * 12);
        let decoded = UbxMessage::decode(&msg.serialize()).unwrap();
        assert_eq!(decoded.get("svId_01"), Some(&Value::Unsigned(12)));
        assert_eq!(decoded.get("svId_02"), Some(&Value::Unsigned(3)));
        assert_eq!(decoded.get("svUsed_02"), Some(&Value::Unsigned(1)));
        assert_eq!(decoded.get("svId"), None);
        assert!(decoded.to_string().contains("gnssId_02=GLONASS"));
    }

    #[test]
    fn esf_meas_calibration_tag_adds_a_block() {
        let msg = UbxMessage::builder("ESF-MEAS", MsgMode::Set)
            .set("numMeas", 1u8)
            .set("calibTtagValid", 1u8)
            .set("dataField_01", 100u32)
            .set("dataField_02", 200u32)
            .build()
            .unwrap();
        assert_eq!(msg.length(), 8 + 2 * 4);
        let decoded = UbxMessage::from_payload("ESF-MEAS", MsgMode::Set, msg.payload()).unwrap();
        assert_eq!(decoded.get("dataField_02"), Some(&Value::Unsigned(200)));

        let plain = UbxMessage::from_payload("ESF-MEAS", MsgMode::Get, msg.payload()).unwrap();
        assert_eq!(plain.get("dataField_02"), None);
    }

    #[test]
    fn fill_remaining_group_sized_by_highest_index() {
        let msg = UbxMessage::builder("CFG-VALDEL", MsgMode::Set)
            .set("keys_03", 0x10310021u32)
            .build()
            .unwrap();
        assert_eq!(msg.length(), 4 + 3 * 4);
        let decoded = UbxMessage::from_payload("CFG-VALDEL", MsgMode::Set, msg.payload()).unwrap();
        assert_eq!(decoded.get("keys_01"), Some(&Value::Unsigned(0)));
        assert_eq!(decoded.get("keys_03"), Some(&Value::Unsigned(0x10310021)));
    }

    #[test]
    fn mga_subtype_is_defaulted() {
        let msg = UbxMessage::builder("MGA-INI-TIME-UTC", MsgMode::Set)
            .set("year", 2024u16)
            .build()
            .unwrap();
        assert_eq!(msg.identity(), "MGA-INI-TIME-UTC");
        assert_eq!(msg.payload()[0], 0x10);
        assert_eq!(msg.length(), 24);
    }

    #[test]
    fn unknown_messages_decode_nominally() {
        let mut frame = vec![0xb5, 0x62, 0x0a, 0x04, 0x03, 0x00, 0x41, 0x42, 0x43];
        let mut calc = UbxChecksumCalc::new();
        calc.update(&frame[2..]);
        let (a, b) = calc.result();
        frame.extend_from_slice(&[a, b]);
        let msg = UbxMessage::decode(&frame).unwrap();
        assert_eq!(msg.identity(), "MON-0a04-NOMINAL");
        assert_eq!(msg.get("data_01"), Some(&Value::Bytes(vec![0x41])));
        assert_eq!(msg.get("data_03"), Some(&Value::Bytes(vec![0x43])));
    }

    #[test]
    fn cfg_msg_display_names_nmea_ids() {
        let msg = UbxMessage::builder("CFG-MSG", MsgMode::Set)
            .set("msgClass", 0xf0u8)
            .set("msgID", 0x00u8)
            .set("rateUART1", 1u8)
            .build()
            .unwrap();
        assert!(msg.to_string().starts_with("<UBX(CFG-MSG, msgClass=240, msgID=GGA, "));
    }

    #[test]
    fn config_set_payload() {
        let msg = UbxMessage::config_set(
            CfgLayerSet::RAM,
            Transaction::None,
            &[
                (CfgKeyRef::from("CFG_SIGNAL_GPS_ENA"), Value::Bool(true)),
                (CfgKeyRef::from(0x40530001), Value::Unsigned(115_200)),
            ],
        )
        .unwrap();
        assert_eq!(msg.identity(), "CFG-VALSET");
        assert_eq!(msg.mode(), MsgMode::Set);
        let mut expect = vec![0x00, 0x01, 0x00, 0x00];
        expect.extend_from_slice(&0x1031001fu32.to_le_bytes());
        expect.push(1);
        expect.extend_from_slice(&0x40530001u32.to_le_bytes());
        expect.extend_from_slice(&115_200u32.to_le_bytes());
        assert_eq!(msg.payload(), expect.as_slice());
        assert_eq!(msg.get("ram"), Some(&Value::Unsigned(1)));
        assert_eq!(msg.get("cfgData_13"), Some(&Value::Unsigned(0)));
    }

    #[test]
    fn config_transaction_sets_version() {
        let msg = UbxMessage::config_del(
            CfgLayerSet::BBR,
            Transaction::Start,
            &[CfgKeyRef::from("CFG_NMEA_HIGHPREC")],
        )
        .unwrap();
        assert_eq!(&msg.payload()[..4], &[1, 2, 1, 0]);
        assert_eq!(msg.get("keys_01"), Some(&Value::Unsigned(0x10930006)));
    }

    #[test]
    fn config_limits() {
        let keys: Vec<CfgKeyRef> = (0..65).map(|_| CfgKeyRef::from("CFG_RATE_MEAS")).collect();
        assert_eq!(
            UbxMessage::config_poll(CfgLayerGet::Ram, 0, &keys),
            Err(CodecError::TooManyCfgKeys(65))
        );
        assert!(matches!(
            UbxMessage::config_poll(CfgLayerGet::Ram, 0, &[CfgKeyRef::from("CFG_NOPE")]),
            Err(CodecError::UnknownCfgKey(_))
        ));
        let poll = UbxMessage::config_poll(CfgLayerGet::Default, 2, &keys[..64]).unwrap();
        assert_eq!(poll.length(), 4 + 64 * 4);
        assert_eq!(poll.get("layer"), Some(&Value::Unsigned(7)));
        assert_eq!(poll.get("position"), Some(&Value::Unsigned(2)));
    }

    #[test]
    fn cfg_valget_scan_needs_payload() {
        assert_eq!(
            UbxMessage::builder("CFG-VALGET", MsgMode::Get)
                .set("layer", 0u8)
                .build(),
            Err(CodecError::PayloadRequired("CFG-VALGET".into()))
        );
    }

    #[test]
    fn bit_helpers() {
        let mut buf = [0u8; 3];
        set_bits(&mut buf, 6, 5, 0b10111);
        assert_eq!(buf, [0b1100_0000, 0b0000_0101, 0]);
        assert_eq!(get_bits(&buf, 6, 5), 0b10111);
        set_bits(&mut buf, 6, 5, 0);
        assert_eq!(buf, [0; 3]);
    }
}
