pub(crate) mod checksum;
pub mod nmea;
pub mod rtcm;

pub use checksum::ubx_checksum;
pub use nmea::{nmea_checksum, parse_gga, sentence_id, validate_checksum};
pub use rtcm::{ErrorPolicy, RtcmReader};
