use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

use crate::custom::{BoxError, CustomDecodeFn, CustomOutput};
use crate::factory::FactoryError;

/// Loosely typed decoder configuration, as supplied by the host application.
///
/// `settings` is interpreted per protocol by [`DecoderSettings::parse`]; keys
/// a protocol does not know are ignored.
#[derive(Clone, Default, Deserialize)]
pub struct DecoderConfig {
    pub kind: String,
    #[serde(default)]
    pub settings: Map<String, JsonValue>,
    #[serde(skip)]
    pub custom_decode_fn: Option<CustomDecodeFn>,
}

impl DecoderConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_custom_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<CustomOutput, BoxError> + Send + Sync + 'static,
    {
        self.custom_decode_fn = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for DecoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderConfig")
            .field("kind", &self.kind)
            .field("settings", &self.settings)
            .field("custom_decode_fn", &self.custom_decode_fn.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Typed settings, one variant per protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderSettings {
    Modbus(ModbusSettings),
    I2c(I2cSettings),
    Spi(SpiSettings),
    Can(CanSettings),
    Custom(CustomSettings),
}

impl DecoderSettings {
    pub fn parse(kind: &str, settings: Map<String, JsonValue>) -> Result<Self, FactoryError> {
        let settings = match kind {
            "modbus" => DecoderSettings::Modbus(from_map(kind, settings)?),
            "i2c" => DecoderSettings::I2c(from_map(kind, settings)?),
            "spi" => DecoderSettings::Spi(from_map(kind, settings)?),
            "can" => DecoderSettings::Can(from_map(kind, settings)?),
            "custom" => DecoderSettings::Custom(from_map(kind, settings)?),
            _ => return Err(FactoryError::UnknownKind(kind.to_string())),
        };
        Ok(settings)
    }
}

fn from_map<T>(kind: &str, settings: Map<String, JsonValue>) -> Result<T, FactoryError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(JsonValue::Object(settings)).map_err(|source| {
        FactoryError::InvalidSettings {
            kind: kind.to_string(),
            source,
        }
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModbusMode {
    #[default]
    Rtu,
    Ascii,
    Tcp,
}

impl fmt::Display for ModbusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModbusMode::Rtu => "rtu",
            ModbusMode::Ascii => "ascii",
            ModbusMode::Tcp => "tcp",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModbusSettings {
    pub mode: ModbusMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum AddressSize {
    #[default]
    Seven,
    Ten,
}

impl AddressSize {
    pub fn bits(self) -> u8 {
        match self {
            AddressSize::Seven => 7,
            AddressSize::Ten => 10,
        }
    }
}

impl TryFrom<u8> for AddressSize {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            7 => Ok(AddressSize::Seven),
            10 => Ok(AddressSize::Ten),
            _ => Err(format!("address size must be 7 or 10 bits, got {}", bits)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct I2cSettings {
    pub address_size: AddressSize,
}

/// SPI clock mode; bit 1 is CPOL, bit 0 is CPHA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub struct SpiMode(u8);

impl SpiMode {
    pub fn number(self) -> u8 {
        self.0
    }

    pub fn cpol(self) -> u8 {
        (self.0 >> 1) & 1
    }

    pub fn cpha(self) -> u8 {
        self.0 & 1
    }
}

impl TryFrom<u8> for SpiMode {
    type Error = String;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        if mode <= 3 {
            Ok(SpiMode(mode))
        } else {
            Err(format!("SPI mode must be between 0 and 3, got {}", mode))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpiSettings {
    pub mode: SpiMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanSettings {
    pub extended: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomSettings {
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_defaults_when_settings_empty() -> Result<(), FactoryError> {
        assert_eq!(
            DecoderSettings::parse("modbus", Map::new())?,
            DecoderSettings::Modbus(ModbusSettings { mode: ModbusMode::Rtu })
        );
        assert_eq!(
            DecoderSettings::parse("i2c", Map::new())?,
            DecoderSettings::I2c(I2cSettings { address_size: AddressSize::Seven })
        );
        assert_eq!(
            DecoderSettings::parse("spi", Map::new())?,
            DecoderSettings::Spi(SpiSettings { mode: SpiMode(0) })
        );
        assert_eq!(
            DecoderSettings::parse("can", Map::new())?,
            DecoderSettings::Can(CanSettings { extended: false })
        );
        Ok(())
    }

    #[test]
    fn test_settings_are_camel_case_and_ignore_unknown_keys() -> Result<(), FactoryError> {
        let settings = map(json!({ "addressSize": 10, "clockStretching": true }));
        assert_eq!(
            DecoderSettings::parse("i2c", settings)?,
            DecoderSettings::I2c(I2cSettings { address_size: AddressSize::Ten })
        );

        let settings = map(json!({ "mode": "ascii", "baudRate": 9600 }));
        assert_eq!(
            DecoderSettings::parse("modbus", settings)?,
            DecoderSettings::Modbus(ModbusSettings { mode: ModbusMode::Ascii })
        );
        Ok(())
    }

    #[test]
    fn test_out_of_range_settings_are_rejected() {
        let err = DecoderSettings::parse("i2c", map(json!({ "addressSize": 9 }))).unwrap_err();
        assert!(matches!(err, FactoryError::InvalidSettings { ref kind, .. } if kind == "i2c"));

        let err = DecoderSettings::parse("spi", map(json!({ "mode": 4 }))).unwrap_err();
        assert!(matches!(err, FactoryError::InvalidSettings { .. }));

        let err = DecoderSettings::parse("can", map(json!({ "extended": "yes" }))).unwrap_err();
        assert!(matches!(err, FactoryError::InvalidSettings { .. }));
    }

    #[test]
    fn test_spi_mode_bits() -> Result<(), String> {
        let mode = SpiMode::try_from(2)?;
        assert_eq!((mode.cpol(), mode.cpha()), (1, 0));
        let mode = SpiMode::try_from(3)?;
        assert_eq!((mode.cpol(), mode.cpha()), (1, 1));
        Ok(())
    }

    #[test]
    fn test_config_deserializes_without_custom_fn() -> Result<(), serde_json::Error> {
        let config: DecoderConfig =
            serde_json::from_str(r#"{ "kind": "can", "settings": { "extended": true } }"#)?;
        assert_eq!(config.kind, "can");
        assert_eq!(config.settings.get("extended"), Some(&JsonValue::Bool(true)));
        assert!(config.custom_decode_fn.is_none());
        Ok(())
    }
}
