//! Per-method message size configuration
//!
//! A method configuration document may carry two optional fields:
//!
//! ```json
//! { "maxRequestMessageBytes": 1024, "maxResponseMessageBytes": "4096" }
//! ```
//!
//! Each value is a non-negative integer, given either as a number or as a
//! string of decimal digits. A missing field means unlimited.

use std::{any::Any, sync::{Arc, OnceLock}};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use crate::{
    channel::CallContext,
    limits::{MessageSizeLimit, MessageSizeLimits},
    service_config::{
        ConfigError,
        FieldError,
        ParsedConfig,
        ParserIndex,
        ParserRegistry,
        ServiceConfigParser
    }
};

const MAX_REQUEST_MESSAGE_BYTES: &str = "maxRequestMessageBytes";
const MAX_RESPONSE_MESSAGE_BYTES: &str = "maxResponseMessageBytes";
const PARSER_ERROR_CONTEXT: &str = "Message size parser";

/// Message size limits configured for one method
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MessageSizeParsedConfig {
    max_request_message_bytes: MessageSizeLimit,
    max_response_message_bytes: MessageSizeLimit,
}

impl ParsedConfig for MessageSizeParsedConfig {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl MessageSizeParsedConfig {
    /// Creates a new config
    #[inline]
    pub fn new(max_request_message_bytes: MessageSizeLimit, max_response_message_bytes: MessageSizeLimit) -> Self {
        Self { max_request_message_bytes, max_response_message_bytes }
    }

    /// Largest request the method accepts
    #[inline]
    pub fn max_request_message_bytes(&self) -> MessageSizeLimit {
        self.max_request_message_bytes
    }

    /// Largest response the method produces
    #[inline]
    pub fn max_response_message_bytes(&self) -> MessageSizeLimit {
        self.max_response_message_bytes
    }

    /// Returns the config as send/receive limits of the calling side.
    ///
    /// Method configs are only resolvable on the client, which sends
    /// requests and receives responses.
    #[inline]
    pub fn limits(&self) -> MessageSizeLimits {
        MessageSizeLimits::new(
            self.max_request_message_bytes,
            self.max_response_message_bytes)
    }

    /// Looks up the config of the called method in `context`
    pub fn from_call_context(context: &CallContext, index: ParserIndex) -> Option<&Self> {
        context
            .service_config_call_data()?
            .method_parsed_config(index)?
            .as_any()
            .downcast_ref::<Self>()
    }
}

/// Parses the message size fields of a method configuration document
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageSizeParser;

impl MessageSizeParser {
    /// Name the parser is registered under
    pub const NAME: &'static str = "message_size";

    /// Registers the parser in `registry` and returns its index
    #[inline]
    pub fn register(registry: &mut ParserRegistry) -> ParserIndex {
        registry.register(Self)
    }

    /// Returns the index of this parser in [`ParserRegistry::global`]
    #[inline]
    pub fn parser_index() -> ParserIndex {
        builtin().message_size
    }

    /// Parses one method configuration document.
    ///
    /// Every invalid field is reported; the document is rejected if any is.
    pub fn parse(json: &Value) -> Result<MessageSizeParsedConfig, ConfigError> {
        let raw = RawMessageSizeConfig::deserialize(json).map_err(|err| {
            ConfigError::new(PARSER_ERROR_CONTEXT, vec![FieldError::Malformed(err.to_string().into())])
        })?;

        let mut errors = Vec::new();
        let max_request_message_bytes = parse_field(
            MAX_REQUEST_MESSAGE_BYTES,
            raw.max_request_message_bytes.as_ref(),
            &mut errors);
        let max_response_message_bytes = parse_field(
            MAX_RESPONSE_MESSAGE_BYTES,
            raw.max_response_message_bytes.as_ref(),
            &mut errors);

        if !errors.is_empty() {
            return Err(ConfigError::new(PARSER_ERROR_CONTEXT, errors));
        }

        Ok(MessageSizeParsedConfig::new(max_request_message_bytes, max_response_message_bytes))
    }
}

/// Registry with the built-in parsers, created once per process
struct BuiltinParsers {
    registry: ParserRegistry,
    message_size: ParserIndex,
}

fn builtin() -> &'static BuiltinParsers {
    static BUILTIN: OnceLock<BuiltinParsers> = OnceLock::new();
    BUILTIN.get_or_init(|| {
        let mut registry = ParserRegistry::new();
        let message_size = MessageSizeParser::register(&mut registry);
        BuiltinParsers { registry, message_size }
    })
}

impl ParserRegistry {
    /// Returns the process-wide registry with all built-in parsers registered.
    ///
    /// It is initialized on first use and never changes afterwards.
    #[inline]
    pub fn global() -> &'static ParserRegistry {
        &builtin().registry
    }
}

impl ServiceConfigParser for MessageSizeParser {
    #[inline]
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse_per_method_params(&self, json: &Value) -> Result<Option<Arc<dyn ParsedConfig>>, ConfigError> {
        let config = Self::parse(json)?;
        Ok(Some(Arc::new(config)))
    }
}

#[derive(Deserialize)]
struct RawMessageSizeConfig {
    #[serde(rename = "maxRequestMessageBytes", default, deserialize_with = "present")]
    max_request_message_bytes: Option<Value>,

    #[serde(rename = "maxResponseMessageBytes", default, deserialize_with = "present")]
    max_response_message_bytes: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it is reported as a wrong type
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>
{
    Value::deserialize(deserializer).map(Some)
}

fn parse_field(field: &'static str, value: Option<&Value>, errors: &mut Vec<FieldError>) -> MessageSizeLimit {
    let Some(value) = value else {
        return MessageSizeLimit::unlimited();
    };

    let parsed = match value {
        Value::String(text) => parse_non_negative_int(text),
        Value::Number(number) => parse_non_negative_int(&number.to_string()),
        _ => {
            errors.push(FieldError::InvalidType { field, expected: "number" });
            return MessageSizeLimit::unlimited();
        }
    };

    match parsed {
        Some(max) => MessageSizeLimit::from_raw(i64::from(max)),
        None => {
            errors.push(FieldError::Negative { field });
            MessageSizeLimit::unlimited()
        }
    }
}

/// Parses a string of decimal digits that fits a non-negative `i32`
fn parse_non_negative_int(text: &str) -> Option<i32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
