//! NMEA sentence checksum and GGA position extraction

use crate::{error::NmeaError, position::PositionData, ubx_packets::FixType};

/// Everything between the leading `$` and the `*`
fn content(sentence: &str) -> Result<(&str, &str), NmeaError> {
    sentence
        .trim_matches(|c| c == '$' || c == '\r' || c == '\n')
        .split_once('*')
        .ok_or(NmeaError::Malformed)
}

/// XOR of all characters between `$` and `*`, as 2 uppercase hex digits
pub fn nmea_checksum(sentence: &str) -> Result<String, NmeaError> {
    let (body, _) = content(sentence)?;
    let ck = body.bytes().fold(0u8, |acc, b| acc ^ b);
    Ok(format!("{:02X}", ck))
}

pub fn validate_checksum(sentence: &str) -> Result<(), NmeaError> {
    let (_, received) = content(sentence)?;
    let expect = nmea_checksum(sentence)?;
    if received.eq_ignore_ascii_case(&expect) {
        Ok(())
    } else {
        Err(NmeaError::InvalidChecksum {
            expect,
            got: received.to_string(),
        })
    }
}

/// Sentence type: `GGA` for `$GNGGA`, `RLM` for proprietary `$PRLM`
pub fn sentence_id(sentence: &str) -> Result<&str, NmeaError> {
    let (body, _) = content(sentence)?;
    let hdr = body.split(',').next().ok_or(NmeaError::Malformed)?;
    let id = match hdr.strip_prefix('P') {
        Some(id) => id,
        None => hdr.get(2..).ok_or(NmeaError::Malformed)?,
    };
    Ok(id)
}

/// Extract time, coordinates, fix quality and altitude from a GGA sentence
pub fn parse_gga(sentence: &str) -> Result<PositionData, NmeaError> {
    let (body, _) = content(sentence)?;
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < 10 {
        return Err(NmeaError::Malformed);
    }
    let fix = fields[6].parse::<u8>().map_err(|_| NmeaError::Malformed)?;
    Ok(PositionData {
        time: fields[1].to_string(),
        fix_type: FixType::from_u8(fix).ok_or(NmeaError::Malformed)?,
        lat: fields[2].to_string(),
        lat_hemisphere: fields[3].to_string(),
        lon: fields[4].to_string(),
        lon_hemisphere: fields[5].to_string(),
        elev: fields[9].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str =
        "$GNGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*68\r\n";

    #[test]
    fn checksum_of_known_sentence() {
        assert_eq!(nmea_checksum(GGA).unwrap(), "68");
        assert_eq!(validate_checksum(GGA), Ok(()));
    }

    #[test]
    fn corrupted_sentence() {
        let bad = GGA.replace("61.7", "61.8");
        assert!(matches!(
            validate_checksum(&bad),
            Err(NmeaError::InvalidChecksum { ref got, .. }) if got == "68"
        ));
        assert_eq!(validate_checksum("$GNGGA,1,2,3"), Err(NmeaError::Malformed));
    }

    #[test]
    fn ids() {
        assert_eq!(sentence_id(GGA).unwrap(), "GGA");
        assert_eq!(sentence_id("$PUBX,00*33").unwrap(), "UBX");
    }

    #[test]
    fn gga_fields() {
        let pos = parse_gga(GGA).unwrap();
        assert_eq!(pos.time, "092750.000");
        assert_eq!(pos.lat, "5321.6802");
        assert_eq!(pos.lat_hemisphere, "N");
        assert_eq!(pos.lon, "00630.3372");
        assert_eq!(pos.lon_hemisphere, "W");
        assert_eq!(pos.fix_type, FixType::Autonomous);
        assert_eq!(pos.elev, "61.7");
    }

    #[test]
    fn gga_without_fix_quality() {
        let sentence = "$GNGGA,092750.000,,,,,,0,,,,M,,M,,*00";
        assert_eq!(parse_gga(sentence), Err(NmeaError::Malformed));
    }
}
