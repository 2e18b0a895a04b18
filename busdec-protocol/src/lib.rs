//! Decoders for raw frames captured from a serial link.
//!
//! A [`DecoderConfig`] is turned into a [`ProtocolDecoder`] by [`create_decoder`];
//! every frame fed to [`Decoder::decode`] yields a [`DecodeResult`]. Malformed
//! wire data is reported in the result, never as an error.

pub use can::CanDecoder;
pub use crc::crc16;
pub use custom::{BoxError, CustomDecodeFn, CustomDecoder, CustomOutput, CUSTOM_PARSER_ERROR};
pub use decoder::{Decoder, ProtocolDecoder};
pub use factory::{create_decoder, FactoryError};
pub use i2c::I2cDecoder;
pub use modbus::{exception_message, function_name, ModbusDecoder};
pub use result::{DecodeResult, Value, FRAME_TOO_SHORT};
pub use settings::{
    AddressSize, CanSettings, CustomSettings, DecoderConfig, DecoderSettings, I2cSettings,
    ModbusMode, ModbusSettings, SpiMode, SpiSettings,
};
pub use spi::SpiDecoder;

mod can;
mod crc;
mod custom;
mod decoder;
mod factory;
mod i2c;
mod modbus;
mod result;
mod settings;
mod spi;
