use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

use crate::decoder::Decoder;
use crate::result::{DecodeResult, Value};
use crate::settings::CustomSettings;

pub const CUSTOM_PARSER_ERROR: &str = "Custom parser error";
const DEFAULT_DESCRIPTION: &str = "Custom Parser";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Caller supplied decode function.
pub type CustomDecodeFn = Arc<dyn Fn(&[u8]) -> Result<CustomOutput, BoxError> + Send + Sync>;

/// What a custom decode function hands back: either a complete result, passed
/// through untouched, or a bare value that gets wrapped as `result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomOutput {
    Result(DecodeResult),
    Value(Value),
}

impl From<DecodeResult> for CustomOutput {
    fn from(result: DecodeResult) -> Self {
        CustomOutput::Result(result)
    }
}

impl From<Value> for CustomOutput {
    fn from(value: Value) -> Self {
        CustomOutput::Value(value)
    }
}

/// Rebuilds a result from a map that already carries a boolean `valid` entry.
fn result_from_map(entries: Vec<(String, Value)>) -> DecodeResult {
    let mut result = DecodeResult::ok();
    for (key, value) in entries {
        match value {
            Value::Bool(valid) if key == "valid" => result.valid = valid,
            Value::Str(error) if key == "error" => result.error = Some(error),
            value => result.push_field(key, value),
        }
    }
    result
}

#[derive(Clone)]
pub struct CustomDecoder {
    decode_fn: CustomDecodeFn,
    settings: CustomSettings,
}

impl CustomDecoder {
    pub fn new(decode_fn: CustomDecodeFn, settings: CustomSettings) -> Self {
        Self {
            decode_fn,
            settings,
        }
    }
}

impl fmt::Debug for CustomDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDecoder")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Decoder for CustomDecoder {
    fn decode(&self, frame: &[u8]) -> DecodeResult {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.decode_fn)(frame))) {
            Ok(Ok(CustomOutput::Result(result))) => result,
            Ok(Ok(CustomOutput::Value(Value::Map(entries))))
                if entries.iter().any(|(k, v)| k == "valid" && matches!(v, Value::Bool(_))) =>
            {
                result_from_map(entries)
            }
            Ok(Ok(CustomOutput::Value(value))) => DecodeResult::ok()
                .with_field("result", value)
                .with_raw(frame),
            Ok(Err(err)) => {
                warn!("Custom decoder failed: {}", err);
                DecodeResult::failure(CUSTOM_PARSER_ERROR)
            }
            Err(_) => {
                warn!("Custom decoder panicked");
                DecodeResult::failure(CUSTOM_PARSER_ERROR)
            }
        }
    }

    fn describe(&self) -> String {
        self.settings
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
    }

    fn protocol(&self) -> &'static str {
        "Custom"
    }
}
