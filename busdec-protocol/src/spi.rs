use crate::decoder::Decoder;
use crate::result::{DecodeResult, Value};
use crate::settings::SpiSettings;

/// SPI has no framing of its own, every frame is passed through as data.
#[derive(Debug, Clone, Default)]
pub struct SpiDecoder {
    settings: SpiSettings,
}

impl SpiDecoder {
    pub fn new(settings: SpiSettings) -> Self {
        Self { settings }
    }
}

impl Decoder for SpiDecoder {
    fn decode(&self, frame: &[u8]) -> DecodeResult {
        DecodeResult::ok()
            .with_field("data", Value::bytes(frame))
            .with_raw(frame)
    }

    fn describe(&self) -> String {
        let mode = self.settings.mode;
        format!(
            "SPI Parser (Mode {}, CPOL={}, CPHA={})",
            mode.number(),
            mode.cpol(),
            mode.cpha()
        )
    }

    fn protocol(&self) -> &'static str {
        "SPI"
    }
}
