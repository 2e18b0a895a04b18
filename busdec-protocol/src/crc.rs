const CRC16_INIT: u16 = 0xFFFF;
const CRC16_POLY: u16 = 0xA001;

/// CRC-16/MODBUS (reflected polynomial 0xA001, initial value 0xFFFF).
pub fn crc16<'a>(bytes: impl IntoIterator<Item = &'a u8>) -> u16 {
    let mut crc = CRC16_INIT;
    for b in bytes.into_iter() {
        crc ^= *b as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16(&[] as &[u8]), 0xFFFF);
    }

    #[test]
    fn test_crc16_reference_frames() {
        // Read Holding Registers request, slave 1, address 0, quantity 1.
        // On the wire the CRC trailer is 0x84 0x0A (low byte first).
        assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);

        // Check value of the CRC-16/MODBUS catalogue entry.
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_crc16_over_frame_with_trailer_is_zero() {
        assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]), 0x0000);
    }
}
