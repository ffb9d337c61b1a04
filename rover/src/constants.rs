pub const UBX_SYNC_CHAR_1: u8 = 0xb5;
pub const UBX_SYNC_CHAR_2: u8 = 0x62;
pub(crate) const UBX_SYNC_SIZE: usize = 2;
pub(crate) const UBX_PAYLOAD_SIZE_LEN: usize = 2;
pub(crate) const UBX_CLASS_LEN: usize = 1;
pub(crate) const UBX_ID_LEN: usize = 1;
pub(crate) const UBX_HEADER_LEN: usize =
    UBX_SYNC_SIZE + UBX_PAYLOAD_SIZE_LEN + UBX_CLASS_LEN + UBX_ID_LEN;
pub(crate) const UBX_CHECKSUM_LEN: usize = 2;

pub(crate) const UBX_CLASS_OFFSET: usize = 2; // After SYNC_CHAR_1, SYNC_CHAR_2
pub(crate) const UBX_MSG_ID_OFFSET: usize = 3; // After CLASS
pub(crate) const UBX_LENGTH_OFFSET: usize = 4; // After MSG_ID

pub const UBX_CLASS_NAV: u8 = 0x01;
pub const UBX_CLASS_ACK: u8 = 0x05;
pub const UBX_CLASS_CFG: u8 = 0x06;
pub const UBX_CLASS_MGA: u8 = 0x13;
pub const UBX_CLASS_NMEA: u8 = 0xf0;

pub const UBX_ID_ACK_ACK: u8 = 0x01;

pub const NMEA_SYNC_CHAR: u8 = 0x24; // '$'
/// Second header byte of standard ('$G') and proprietary ('$P') sentences
pub const NMEA_TALKER_CHARS: [u8; 2] = [b'G', b'P'];
pub const NMEA_END_CHAR_1: u8 = 0x0d; // '\r' (<CR>)
pub const NMEA_END_CHAR_2: u8 = 0x0a; // '\n' (<LF>)

pub const RTCM_SYNC_CHAR: u8 = 0xd3;
pub(crate) const RTCM_RESERVED_MASK: u8 = !0x03; // 6 reserved bits of the second header byte
pub(crate) const RTCM_CRC_LEN: usize = 3;

/// Number of decimal places scaled attributes are rounded to
pub(crate) const SCALE_ROUND_DIGITS: i32 = 12;
