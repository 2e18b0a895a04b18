use thiserror::Error;
use tracing::debug;

use crate::can::CanDecoder;
use crate::custom::CustomDecoder;
use crate::decoder::{Decoder, ProtocolDecoder};
use crate::i2c::I2cDecoder;
use crate::modbus::ModbusDecoder;
use crate::settings::{DecoderConfig, DecoderSettings};
use crate::spi::SpiDecoder;

const CUSTOM_KIND: &str = "custom";

/// Configuration mistakes caught while building a decoder.
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("Unknown parser type: {0}")]
    UnknownKind(String),

    #[error("Custom parser function not provided")]
    MissingCustomFunction,

    #[error("Invalid {kind} settings: {source}")]
    InvalidSettings {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Builds the decoder named by `config.kind`.
pub fn create_decoder(config: DecoderConfig) -> Result<ProtocolDecoder, FactoryError> {
    let DecoderConfig {
        kind,
        settings,
        custom_decode_fn,
    } = config;

    if kind == CUSTOM_KIND && custom_decode_fn.is_none() {
        return Err(FactoryError::MissingCustomFunction);
    }

    let decoder = match DecoderSettings::parse(&kind, settings)? {
        DecoderSettings::Modbus(s) => ProtocolDecoder::Modbus(ModbusDecoder::new(s)),
        DecoderSettings::I2c(s) => ProtocolDecoder::I2c(I2cDecoder::new(s)),
        DecoderSettings::Spi(s) => ProtocolDecoder::Spi(SpiDecoder::new(s)),
        DecoderSettings::Can(s) => ProtocolDecoder::Can(CanDecoder::new(s)),
        DecoderSettings::Custom(s) => {
            let decode_fn = custom_decode_fn.ok_or(FactoryError::MissingCustomFunction)?;
            ProtocolDecoder::Custom(CustomDecoder::new(decode_fn, s))
        }
    };

    debug!("Created decoder {:?} ({})", kind, decoder.describe());
    Ok(decoder)
}
