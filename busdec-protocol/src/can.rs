use crate::decoder::Decoder;
use crate::result::{DecodeResult, Value, FRAME_TOO_SHORT};
use crate::settings::CanSettings;

const MIN_FRAME_LEN: usize = 3;
const DLC_MASK: u8 = 0x0F;
const RTR_BIT: u8 = 0x10;

/// CAN frame decoder.
///
/// Standard frames carry the 11-bit identifier in the first two bytes, extended
/// frames the 29-bit identifier in the first four. The byte just before the
/// data holds the DLC in its low nibble and the RTR flag in bit 4.
#[derive(Debug, Clone, Default)]
pub struct CanDecoder {
    settings: CanSettings,
}

impl CanDecoder {
    pub fn new(settings: CanSettings) -> Self {
        Self { settings }
    }
}

impl Decoder for CanDecoder {
    fn decode(&self, frame: &[u8]) -> DecodeResult {
        if frame.len() < MIN_FRAME_LEN {
            return DecodeResult::failure(FRAME_TOO_SHORT);
        }

        // Missing trailing header bytes read as zero.
        let byte = |i: usize| frame.get(i).copied().unwrap_or(0) as u32;

        let (identifier, format, data_start) = if self.settings.extended {
            let id = (byte(0) << 21) | (byte(1) << 13) | (byte(2) << 5) | (byte(3) >> 3);
            (id, "extended", 4)
        } else {
            let id = (byte(0) << 3) | (byte(1) >> 5);
            (id, "standard", 2)
        };

        let control = byte(data_start - 1) as u8;
        let dlc = (control & DLC_MASK) as usize;
        let start = data_start.min(frame.len());
        let end = (data_start + dlc).min(frame.len());

        DecodeResult::ok()
            .with_field("identifier", identifier)
            .with_field("format", format)
            .with_field("isRemoteFrame", control & RTR_BIT != 0)
            .with_field("dlc", dlc)
            .with_field("data", Value::bytes(&frame[start..end]))
            .with_raw(frame)
    }

    fn describe(&self) -> String {
        if self.settings.extended {
            "CAN Parser (Extended 29-bit ID)".to_string()
        } else {
            "CAN Parser (Standard 11-bit ID)".to_string()
        }
    }

    fn protocol(&self) -> &'static str {
        "CAN"
    }
}
