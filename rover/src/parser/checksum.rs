use crate::error::CodecError;

/// UBX [Fletcher-16 checksum](https://en.wikipedia.org/wiki/Fletcher%27s_checksum) calculator supporting both streaming and single-shot use
#[derive(Default)]
pub(crate) struct UbxChecksumCalc {
    ck_a: u8,
    ck_b: u8,
}

impl UbxChecksumCalc {
    pub(crate) const fn new() -> Self {
        Self { ck_a: 0, ck_b: 0 }
    }

    /// Update checksum with new bytes
    pub(crate) const fn update(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            self.update_byte(bytes[i]);
            i += 1;
        }
    }

    /// Update checksum with a single byte
    pub(crate) const fn update_byte(&mut self, byte: u8) {
        self.ck_a = self.ck_a.wrapping_add(byte);
        self.ck_b = self.ck_b.wrapping_add(self.ck_a);
    }

    /// Get the current checksum result
    pub(crate) const fn result(self) -> (u8, u8) {
        (self.ck_a, self.ck_b)
    }

    /// Validate checksum and return result
    pub(crate) const fn validate_result(
        self,
        received_ck_a: u8,
        received_ck_b: u8,
    ) -> Result<(), CodecError> {
        if self.ck_a == received_ck_a && self.ck_b == received_ck_b {
            Ok(())
        } else {
            Err(CodecError::InvalidChecksum {
                expect: u16::from_le_bytes([received_ck_a, received_ck_b]),
                got: u16::from_le_bytes([self.ck_a, self.ck_b]),
            })
        }
    }
}

/// Checksum over class, id, length and payload
pub fn ubx_checksum(data: &[u8]) -> [u8; 2] {
    let mut calc = UbxChecksumCalc::new();
    calc.update(data);
    let (ck_a, ck_b) = calc.result();
    [ck_a, ck_b]
}
