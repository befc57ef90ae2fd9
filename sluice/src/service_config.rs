//! Per-method service configuration.
//!
//! Filters that read per-method settings register a [`ServiceConfigParser`]
//! with a [`ParserRegistry`] and receive a [`ParserIndex`] in return.
//! Parsing a method's configuration document runs every registered parser
//! and produces a [`ParsedConfigVector`] in which each parser's result sits
//! at its index. A call carries the vector for its method as
//! [`ServiceConfigCallData`], and a filter looks up its own entry with the
//! index it was given at registration.
//!
//! The process-wide registry with the built-in parsers is available through
//! [`ParserRegistry::global`].

use std::{any::Any, fmt, sync::Arc};
use serde_json::Value;

pub use self::{
    error::{ConfigError, FieldError},
    registry::ParserRegistry
};

pub mod error;
pub mod registry;

/// A parsed, immutable per-method configuration
pub trait ParsedConfig: Any + fmt::Debug + Send + Sync {
    /// Returns `self` as [`Any`] to allow downcasting to the concrete config
    fn as_any(&self) -> &dyn Any;
}

/// Parses one aspect of a method's configuration document
pub trait ServiceConfigParser: Send + Sync {
    /// Unique name of the parser
    fn name(&self) -> &'static str;

    /// Parses the per-method parameters this parser is responsible for.
    ///
    /// Returns `Ok(None)` if the document carries nothing for this parser.
    fn parse_per_method_params(&self, json: &Value) -> Result<Option<Arc<dyn ParsedConfig>>, ConfigError>;
}

/// Position of a parser in a [`ParserRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParserIndex(pub(crate) usize);

impl ParserIndex {
    /// Returns the raw position
    #[inline]
    pub fn get(&self) -> usize {
        self.0
    }
}

/// Results of all registered parsers for one method, addressed by [`ParserIndex`]
#[derive(Debug, Clone, Default)]
pub struct ParsedConfigVector {
    configs: Vec<Option<Arc<dyn ParsedConfig>>>,
}

impl ParsedConfigVector {
    #[inline]
    pub(crate) fn new(configs: Vec<Option<Arc<dyn ParsedConfig>>>) -> Self {
        Self { configs }
    }

    /// Returns the config produced by the parser at `index`
    #[inline]
    pub fn get(&self, index: ParserIndex) -> Option<&dyn ParsedConfig> {
        self.configs
            .get(index.0)?
            .as_deref()
    }

    /// Returns the number of parser slots
    #[inline]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Returns `true` if there are no parser slots
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Service configuration attached to a single call
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigCallData {
    method_configs: ParsedConfigVector,
}

impl ServiceConfigCallData {
    /// Creates call data from the parsed configs of the called method
    #[inline]
    pub fn new(method_configs: ParsedConfigVector) -> Self {
        Self { method_configs }
    }

    /// Returns the parsed config registered at `index` for the called method
    #[inline]
    pub fn method_parsed_config(&self, index: ParserIndex) -> Option<&dyn ParsedConfig> {
        self.method_configs.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker(u8);

    impl ParsedConfig for Marker {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn it_looks_up_config_by_index() {
        let configs = ParsedConfigVector::new(vec![
            None,
            Some(Arc::new(Marker(7))),
        ]);
        let call_data = ServiceConfigCallData::new(configs);

        let config = call_data
            .method_parsed_config(ParserIndex(1))
            .and_then(|c| c.as_any().downcast_ref::<Marker>());

        assert_eq!(config, Some(&Marker(7)));
        assert!(call_data.method_parsed_config(ParserIndex(0)).is_none());
    }

    #[test]
    fn it_returns_none_for_unknown_index() {
        let call_data = ServiceConfigCallData::default();

        assert!(call_data.method_parsed_config(ParserIndex(3)).is_none());
    }
}
