//! Configuration database keys used by CFG-VALGET, CFG-VALSET and CFG-VALDEL

use bitflags::bitflags;
use std::borrow::Cow;

use super::types::AttrType;
use crate::error::CodecError;

/// Maximum number of keys carried by one CFG-VAL* message
pub const MAX_CFG_KEYS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageSize {
    OneBit,
    OneByte,
    TwoBytes,
    FourBytes,
    EightBytes,
}

impl StorageSize {
    pub const fn to_usize(self) -> usize {
        match self {
            Self::OneBit | Self::OneByte => 1,
            Self::TwoBytes => 2,
            Self::FourBytes => 4,
            Self::EightBytes => 8,
        }
    }

    /// Type given to keys that are not in the registry
    pub const fn attr_type(self) -> AttrType {
        match self {
            Self::OneBit => AttrType::L,
            size => AttrType::U(size.to_usize()),
        }
    }
}

impl KeyId {
    pub(crate) const SIZE: usize = 4;

    /// Storage size class, bits 28..30 of the key id.
    ///
    /// Returns `None` for the reserved size classes 0, 6 and 7.
    pub const fn value_size(&self) -> Option<StorageSize> {
        match (self.0 >> 28) & 0b111 {
            1 => Some(StorageSize::OneBit),
            2 => Some(StorageSize::OneByte),
            3 => Some(StorageSize::TwoBytes),
            4 => Some(StorageSize::FourBytes),
            5 => Some(StorageSize::EightBytes),
            _ => None,
        }
    }
}

/// A named entry of the configuration database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfgKey {
    pub name: &'static str,
    pub id: KeyId,
    pub attr: AttrType,
}

const fn key(name: &'static str, id: u32, attr: AttrType) -> CfgKey {
    CfgKey {
        name,
        id: KeyId(id),
        attr,
    }
}

// Hyphens in the receiver documentation are underscores here.
// Keep sorted by name.
pub static CONFIG_DATABASE: &[CfgKey] = &[
    key("CFG_MSGOUT_NMEA_ID_GGA_UART1", 0x209100bb, AttrType::U(1)),
    key("CFG_NMEA_HIGHPREC", 0x10930006, AttrType::L),
    key("CFG_RATE_MEAS", 0x30210001, AttrType::U(2)),
    key("CFG_RATE_NAV", 0x30210002, AttrType::U(2)),
    key("CFG_SIGNAL_BDS_ENA", 0x10310022, AttrType::L),
    key("CFG_SIGNAL_GAL_ENA", 0x10310021, AttrType::L),
    key("CFG_SIGNAL_GLO_ENA", 0x10310025, AttrType::L),
    key("CFG_SIGNAL_GPS_ENA", 0x1031001f, AttrType::L),
    key("CFG_SIGNAL_IMES_ENA", 0x10310023, AttrType::L),
    key("CFG_SIGNAL_QZSS_ENA", 0x10310024, AttrType::L),
    key("CFG_SIGNAL_SBAS_ENA", 0x10310020, AttrType::L),
    key("CFG_UART1_BAUDRATE", 0x40520001, AttrType::U(4)),
    key("CFG_UART2_BAUDRATE", 0x40530001, AttrType::U(4)),
];

pub const CFG_SIGNAL_GPS_ENA: &str = "CFG_SIGNAL_GPS_ENA";
pub const CFG_SIGNAL_GAL_ENA: &str = "CFG_SIGNAL_GAL_ENA";
pub const CFG_SIGNAL_GLO_ENA: &str = "CFG_SIGNAL_GLO_ENA";
pub const CFG_SIGNAL_BDS_ENA: &str = "CFG_SIGNAL_BDS_ENA";
pub const CFG_NMEA_HIGHPREC: &str = "CFG_NMEA_HIGHPREC";

/// Look up key id and value type by symbolic name
pub fn cfg_name_to_key(name: &str) -> Result<CfgKey, CodecError> {
    CONFIG_DATABASE
        .iter()
        .find(|k| k.name == name)
        .copied()
        .ok_or_else(|| CodecError::UnknownCfgKey(name.to_string()))
}

/// Look up name and value type by key id.
///
/// Ids missing from the registry get the name `CFG_0x{id:08X}` and a type
/// derived from their storage size class alone.
pub fn cfg_key_to_name(id: u32) -> Option<(Cow<'static, str>, AttrType)> {
    if let Some(k) = CONFIG_DATABASE.iter().find(|k| k.id.0 == id) {
        return Some((Cow::Borrowed(k.name), k.attr));
    }
    let size = KeyId(id).value_size()?;
    Some((Cow::Owned(format!("CFG_0x{:08X}", id)), size.attr_type()))
}

/// Key addressed either by symbolic name or by numeric id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgKeyRef<'a> {
    Name(&'a str),
    Id(u32),
}

impl CfgKeyRef<'_> {
    /// Resolve to the numeric id and its value type
    pub fn resolve(&self) -> Result<(u32, AttrType), CodecError> {
        match self {
            CfgKeyRef::Name(name) => {
                let k = cfg_name_to_key(name)?;
                Ok((k.id.0, k.attr))
            },
            CfgKeyRef::Id(id) => cfg_key_to_name(*id)
                .map(|(_, attr)| (*id, attr))
                .ok_or_else(|| CodecError::UnknownCfgKey(format!("0x{:08x}", id))),
        }
    }
}

impl<'a> From<&'a str> for CfgKeyRef<'a> {
    fn from(name: &'a str) -> Self {
        CfgKeyRef::Name(name)
    }
}

impl From<u32> for CfgKeyRef<'_> {
    fn from(id: u32) -> Self {
        CfgKeyRef::Id(id)
    }
}

/// The [CfgLayerGet] enum is used to specify the configuration layer to read from.
/// The configuration system in the ublox device is stacked, so a property
/// may be empty for a particular layer and you will receive a NAK.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CfgLayerGet {
    /// Read from RAM
    Ram = 0,
    /// Read from BBR (battery backed RAM)
    Bbr = 1,
    /// Read from Flash, if available
    Flash = 2,
    /// Read the current configuration from the active source
    Default = 7,
}

bitflags! {
    /// A mask describing where configuration is applied.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CfgLayerSet: u8 {
        const RAM = 0b001;
        const BBR = 0b010;
        const FLASH = 0b100;
    }
}

impl Default for CfgLayerSet {
    fn default() -> Self {
        Self::RAM | Self::BBR | Self::FLASH
    }
}

/// Transaction state of a CFG-VALSET or CFG-VALDEL sequence
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Transaction {
    #[default]
    None = 0,
    Start = 1,
    Ongoing = 2,
    Commit = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_from_key_id() {
        assert_eq!(KeyId(0x10310022).value_size(), Some(StorageSize::OneBit));
        assert_eq!(KeyId(0x209100bb).value_size(), Some(StorageSize::OneByte));
        assert_eq!(KeyId(0x30210001).value_size(), Some(StorageSize::TwoBytes));
        assert_eq!(KeyId(0x40520001).value_size(), Some(StorageSize::FourBytes));
        assert_eq!(KeyId(0x50000001).value_size(), Some(StorageSize::EightBytes));
        assert_eq!(KeyId(0x00000001).value_size(), None);
    }

    #[test]
    fn registry_is_unique() {
        for (i, a) in CONFIG_DATABASE.iter().enumerate() {
            for b in &CONFIG_DATABASE[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.id, b.id);
            }
            // registry types agree with the size class of the id
            let size = a.id.value_size().unwrap();
            assert_eq!(size.to_usize(), a.attr.size(), "{}", a.name);
        }
    }

    #[test]
    fn lookup_both_ways() {
        let k = cfg_name_to_key("CFG_UART2_BAUDRATE").unwrap();
        assert_eq!(k.id, KeyId(0x40530001));
        assert_eq!(k.attr, AttrType::U(4));
        let (name, attr) = cfg_key_to_name(0x10930006).unwrap();
        assert_eq!(name, "CFG_NMEA_HIGHPREC");
        assert_eq!(attr, AttrType::L);
        assert!(matches!(
            cfg_name_to_key("CFG_NOPE"),
            Err(CodecError::UnknownCfgKey(_))
        ));
    }

    #[test]
    fn unknown_ids_are_named_from_size_class() {
        let (name, attr) = cfg_key_to_name(0x30aa0001).unwrap();
        assert_eq!(name, "CFG_0x30AA0001");
        assert_eq!(attr, AttrType::U(2));
        assert!(cfg_key_to_name(0x70000000).is_none());
    }

    #[test]
    fn key_refs() {
        assert_eq!(
            CfgKeyRef::from("CFG_RATE_MEAS").resolve().unwrap(),
            (0x30210001, AttrType::U(2))
        );
        assert_eq!(
            CfgKeyRef::from(0x10310021).resolve().unwrap(),
            (0x10310021, AttrType::L)
        );
    }
}
