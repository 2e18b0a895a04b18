#![no_main]

use busdec_protocol::{
    CanDecoder, CanSettings, Decoder, I2cDecoder, ModbusDecoder, ProtocolDecoder, SpiDecoder,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decoders = [
        ProtocolDecoder::Modbus(ModbusDecoder::default()),
        ProtocolDecoder::I2c(I2cDecoder::default()),
        ProtocolDecoder::Spi(SpiDecoder::default()),
        ProtocolDecoder::Can(CanDecoder::default()),
        ProtocolDecoder::Can(CanDecoder::new(CanSettings { extended: true })),
    ];

    for decoder in decoders {
        let result = decoder.decode(data);
        assert_eq!(result.valid, result.error.is_none());
    }
});
