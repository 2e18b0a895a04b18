use nom::{
    multi::count,
    number::complete::{be_u16, be_u8, le_u16},
    IResult, Parser,
};
use tracing::debug;

use crate::crc::crc16;
use crate::decoder::Decoder;
use crate::result::{DecodeResult, Value, FRAME_TOO_SHORT};
use crate::settings::{ModbusMode, ModbusSettings};

const EXCEPTION_FLAG: u8 = 0x80;
/// Slave address, function code and exception code.
const MIN_EXCEPTION_LEN: usize = 3;
const MIN_FRAME_LEN: usize = 4;
const CRC_LEN: usize = 2;

const READ_COILS: u8 = 0x01;
const READ_DISCRETE_INPUTS: u8 = 0x02;
const READ_HOLDING_REGISTERS: u8 = 0x03;
const READ_INPUT_REGISTERS: u8 = 0x04;
const WRITE_SINGLE_COIL: u8 = 0x05;
const WRITE_SINGLE_REGISTER: u8 = 0x06;
const WRITE_MULTIPLE_COILS: u8 = 0x0F;
const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Text for a MODBUS exception code.
pub fn exception_message(code: u8) -> &'static str {
    match code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Device Failed to Respond",
        _ => "Unknown Error",
    }
}

/// Name of a public MODBUS function code, if it is one this decoder knows.
pub fn function_name(code: u8) -> Option<&'static str> {
    let name = match code {
        READ_COILS => "Read Coils",
        READ_DISCRETE_INPUTS => "Read Discrete Inputs",
        READ_HOLDING_REGISTERS => "Read Holding Registers",
        READ_INPUT_REGISTERS => "Read Input Registers",
        WRITE_SINGLE_COIL => "Write Single Coil",
        WRITE_SINGLE_REGISTER => "Write Single Register",
        WRITE_MULTIPLE_COILS => "Write Multiple Coils",
        WRITE_MULTIPLE_REGISTERS => "Write Multiple Registers",
        _ => return None,
    };
    Some(name)
}

fn header(i: &[u8]) -> IResult<&[u8], (u8, u8)> {
    (be_u8, be_u8).parse(i)
}

fn word_pair(i: &[u8]) -> IResult<&[u8], (u16, u16)> {
    (be_u16, be_u16).parse(i)
}

fn registers<'a>(n: usize) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Vec<u16>> {
    move |i: &'a [u8]| count(be_u16, n).parse(i)
}

fn crc_trailer(i: &[u8]) -> IResult<&[u8], u16> {
    le_u16(i)
}

/// Unpacks coil/input status bytes, least significant bit first.
fn unpack_bits(bytes: &[u8]) -> Vec<Value> {
    bytes
        .iter()
        .flat_map(|&b| (0..8).map(move |bit| Value::Int(((b >> bit) & 1) as i64)))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ModbusDecoder {
    settings: ModbusSettings,
}

impl ModbusDecoder {
    pub fn new(settings: ModbusSettings) -> Self {
        Self { settings }
    }

    fn decode_exception(&self, slave_address: u8, function_code: u8, frame: &[u8]) -> DecodeResult {
        let error_code = frame[2];
        DecodeResult::ok()
            .with_field("slaveAddress", slave_address)
            .with_field("functionCode", function_code)
            .with_field("isError", true)
            .with_field("errorCode", error_code)
            .with_field("errorMessage", exception_message(error_code))
            .with_raw(frame)
    }

    fn decode_body(&self, function_code: u8, frame: &[u8], result: &mut DecodeResult) {
        match function_code {
            READ_COILS | READ_DISCRETE_INPUTS => {
                let byte_count = frame[2] as usize;
                let status = &frame[3..];
                let status = &status[..byte_count.min(status.len())];
                result.push_field("byteCount", byte_count);
                result.push_field("values", unpack_bits(status));
            }
            READ_HOLDING_REGISTERS | READ_INPUT_REGISTERS => {
                let byte_count = frame[2] as usize;
                let data = &frame[3..];
                let n = (byte_count / 2).min(data.len() / 2);
                let mut parse_registers = registers(n);
                let values = parse_registers(data).map(|(_, r)| r).unwrap_or_default();
                result.push_field("byteCount", byte_count);
                result.push_field(
                    "registers",
                    values.into_iter().map(Value::from).collect::<Vec<_>>(),
                );
                if n < byte_count / 2 {
                    result.push_field("registersTruncated", true);
                }
            }
            WRITE_SINGLE_COIL | WRITE_SINGLE_REGISTER => {
                if let Ok((_, (address, value))) = word_pair(&frame[2..]) {
                    result.push_field("address", address);
                    result.push_field("value", value);
                }
            }
            WRITE_MULTIPLE_COILS | WRITE_MULTIPLE_REGISTERS => {
                if let Ok((_, (address, quantity))) = word_pair(&frame[2..]) {
                    result.push_field("address", address);
                    result.push_field("quantity", quantity);
                }
            }
            _ => {
                result.push_field("data", Value::bytes(&frame[2..frame.len() - CRC_LEN]));
            }
        }
    }

    fn check_crc(&self, frame: &[u8], result: &mut DecodeResult) {
        let (payload, trailer) = frame.split_at(frame.len() - CRC_LEN);
        let Ok((_, received)) = crc_trailer(trailer) else {
            return;
        };
        let computed = crc16(payload);
        if computed != received {
            debug!(
                "CRC mismatch: computed {:#06x}, received {:#06x}",
                computed, received
            );
        }
        result.push_field("crc", received);
        result.push_field("crcValid", computed == received);
    }
}

impl Decoder for ModbusDecoder {
    fn decode(&self, frame: &[u8]) -> DecodeResult {
        let Ok((_, (slave_address, function_code))) = header(frame) else {
            return DecodeResult::failure(FRAME_TOO_SHORT);
        };
        if frame.len() < MIN_EXCEPTION_LEN {
            return DecodeResult::failure(FRAME_TOO_SHORT);
        }
        if function_code > EXCEPTION_FLAG {
            return self.decode_exception(slave_address, function_code, frame);
        }
        if frame.len() < MIN_FRAME_LEN {
            return DecodeResult::failure(FRAME_TOO_SHORT);
        }

        let mut result = DecodeResult::ok()
            .with_field("slaveAddress", slave_address)
            .with_field("functionCode", function_code)
            .with_field("functionName", function_name(function_code))
            .with_field("isError", false);

        self.decode_body(function_code, frame, &mut result);

        if self.settings.mode == ModbusMode::Rtu {
            self.check_crc(frame, &mut result);
        }

        result.with_raw(frame)
    }

    fn describe(&self) -> String {
        format!(
            "MODBUS {} Parser",
            self.settings.mode.to_string().to_uppercase()
        )
    }

    fn protocol(&self) -> &'static str {
        "MODBUS"
    }
}
