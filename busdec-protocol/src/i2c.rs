use crate::decoder::Decoder;
use crate::result::{DecodeResult, Value, FRAME_TOO_SHORT};
use crate::settings::I2cSettings;

const MIN_FRAME_LEN: usize = 2;
const READ_BIT: u8 = 0x01;

/// I2C transaction decoder.
///
/// The first byte is the address byte: a 7-bit address followed by the R/W
/// bit. A 10-bit `address_size` is reported by [`Decoder::describe`] but the
/// address is still taken from the first byte only.
#[derive(Debug, Clone, Default)]
pub struct I2cDecoder {
    settings: I2cSettings,
}

impl I2cDecoder {
    pub fn new(settings: I2cSettings) -> Self {
        Self { settings }
    }
}

impl Decoder for I2cDecoder {
    fn decode(&self, frame: &[u8]) -> DecodeResult {
        if frame.len() < MIN_FRAME_LEN {
            return DecodeResult::failure(FRAME_TOO_SHORT);
        }

        let operation = if frame[0] & READ_BIT == READ_BIT {
            "read"
        } else {
            "write"
        };

        DecodeResult::ok()
            .with_field("address", frame[0] >> 1)
            .with_field("operation", operation)
            .with_field("data", Value::bytes(&frame[1..]))
            .with_raw(frame)
    }

    fn describe(&self) -> String {
        format!("I2C Parser ({}-bit address)", self.settings.address_size.bits())
    }

    fn protocol(&self) -> &'static str {
        "I2C"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AddressSize;

    #[test]
    fn test_read_transaction() {
        let result = I2cDecoder::default().decode(&[0b1010_0001, 0x55]);
        assert!(result.valid);
        assert_eq!(result.field("address"), Some(&Value::Int(0x50)));
        assert_eq!(result.field("operation"), Some(&Value::from("read")));
        assert_eq!(result.field("data"), Some(&Value::bytes(&[0x55])));
        assert_eq!(result.field("raw"), Some(&Value::bytes(&[0xA1, 0x55])));
    }

    #[test]
    fn test_write_transaction() {
        let result = I2cDecoder::default().decode(&[0x3C << 1, 0x00, 0xAF]);
        assert_eq!(result.field("address"), Some(&Value::Int(0x3C)));
        assert_eq!(result.field("operation"), Some(&Value::from("write")));
        assert_eq!(result.field("data"), Some(&Value::bytes(&[0x00, 0xAF])));
    }

    #[test]
    fn test_short_frames() {
        let decoder = I2cDecoder::default();
        assert_eq!(decoder.decode(&[]).error.as_deref(), Some(FRAME_TOO_SHORT));
        assert_eq!(decoder.decode(&[0xA1]).error.as_deref(), Some(FRAME_TOO_SHORT));
        assert!(decoder.decode(&[0xA1, 0x00]).valid);
    }

    #[test]
    fn test_ten_bit_setting_keeps_seven_bit_extraction() {
        let decoder = I2cDecoder::new(I2cSettings { address_size: AddressSize::Ten });
        let result = decoder.decode(&[0b1111_0001, 0x23]);
        assert_eq!(result.field("address"), Some(&Value::Int(0x78)));
        assert_eq!(decoder.describe(), "I2C Parser (10-bit address)");
    }
}
