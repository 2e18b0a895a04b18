use tracing::trace;

use crate::can::CanDecoder;
use crate::custom::CustomDecoder;
use crate::i2c::I2cDecoder;
use crate::modbus::ModbusDecoder;
use crate::result::DecodeResult;
use crate::spi::SpiDecoder;

/// Turns captured frames into [`DecodeResult`]s.
///
/// Implementations hold no per-frame state: decoding the same frame twice
/// yields the same result, and a decoder can be shared between threads.
pub trait Decoder: Send + Sync {
    fn decode(&self, frame: &[u8]) -> DecodeResult;

    /// Human-readable label including the active settings.
    fn describe(&self) -> String;

    /// Short protocol name (e.g. "MODBUS").
    fn protocol(&self) -> &'static str;
}

/// One of the built-in decoders, or a wrapped custom function.
#[derive(Debug, Clone)]
pub enum ProtocolDecoder {
    Modbus(ModbusDecoder),
    I2c(I2cDecoder),
    Spi(SpiDecoder),
    Can(CanDecoder),
    Custom(CustomDecoder),
}

impl ProtocolDecoder {
    fn inner(&self) -> &dyn Decoder {
        match self {
            ProtocolDecoder::Modbus(d) => d,
            ProtocolDecoder::I2c(d) => d,
            ProtocolDecoder::Spi(d) => d,
            ProtocolDecoder::Can(d) => d,
            ProtocolDecoder::Custom(d) => d,
        }
    }
}

impl Decoder for ProtocolDecoder {
    fn decode(&self, frame: &[u8]) -> DecodeResult {
        let result = self.inner().decode(frame);
        trace!("Decoded {} frame {:02X?}: {:?}", self.protocol(), frame, result);
        result
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }

    fn protocol(&self) -> &'static str {
        self.inner().protocol()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Value;
    use crate::settings::CanSettings;

    #[test]
    fn test_dispatches_to_inner_decoder() {
        let decoder = ProtocolDecoder::Can(CanDecoder::new(CanSettings { extended: false }));
        let frame = [0x24, 0x64, 0x12, 0x03];
        assert_eq!(decoder.decode(&frame), CanDecoder::default().decode(&frame));
        assert_eq!(decoder.protocol(), "CAN");
        assert_eq!(
            decoder.decode(&frame).field("identifier"),
            Some(&Value::Int(0x123))
        );
    }
}
