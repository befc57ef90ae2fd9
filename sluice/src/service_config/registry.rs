//! Registry of per-method service configuration parsers

use std::{fmt, sync::Arc};
use indexmap::IndexMap;
use serde_json::Value;
use crate::error::Error;
use super::{ParsedConfigVector, ParserIndex, ServiceConfigParser};

const METHOD_PARAMS_ERROR: &str = "methodConfig";

/// Holds the registered parsers in registration order.
///
/// The position of a parser is its [`ParserIndex`].
#[derive(Default)]
pub struct ParserRegistry {
    parsers: IndexMap<&'static str, Arc<dyn ServiceConfigParser>>,
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ParserRegistry {
    /// Creates an empty registry
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parser` and returns its index.
    ///
    /// Registering a parser under a name that is already taken replaces
    /// the previous parser and keeps its index.
    pub fn register<P>(&mut self, parser: P) -> ParserIndex
    where
        P: ServiceConfigParser + 'static
    {
        let (index, _) = self.parsers.insert_full(parser.name(), Arc::new(parser));
        ParserIndex(index)
    }

    /// Returns the index of the parser registered under `name`
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<ParserIndex> {
        self.parsers
            .get_index_of(name)
            .map(ParserIndex)
    }

    /// Returns the number of registered parsers
    #[inline]
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Returns `true` if no parser is registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Runs every registered parser over one method's configuration document.
    ///
    /// Failures from all parsers are collected into a single error;
    /// the document is rejected if any parser fails.
    pub fn parse_per_method_params(&self, json: &Value) -> Result<ParsedConfigVector, Error> {
        let mut configs = Vec::with_capacity(self.parsers.len());
        let mut errors: Vec<Error> = Vec::new();

        for parser in self.parsers.values() {
            match parser.parse_per_method_params(json) {
                Ok(config) => configs.push(config),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(parser = parser.name(), "rejected method config: {err}");
                    errors.push(err.into());
                }
            }
        }

        if errors.is_empty() {
            Ok(ParsedConfigVector::new(configs))
        } else {
            Err(Error::from_vec(METHOD_PARAMS_ERROR, errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_config::{ConfigError, FieldError, ParsedConfig};
    use serde_json::json;
    use std::any::Any;

    #[derive(Debug)]
    struct Flag;

    impl ParsedConfig for Flag {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Accepts `true` under `field`, ignores documents without it
    struct FlagParser {
        name: &'static str,
        field: &'static str,
    }

    const FAST: FlagParser = FlagParser { name: "fast", field: "fast" };
    const SAFE: FlagParser = FlagParser { name: "safe", field: "safe" };

    impl ServiceConfigParser for FlagParser {
        fn name(&self) -> &'static str {
            self.name
        }

        fn parse_per_method_params(&self, json: &Value) -> Result<Option<Arc<dyn ParsedConfig>>, ConfigError> {
            match json.get(self.field) {
                None => Ok(None),
                Some(Value::Bool(true)) => Ok(Some(Arc::new(Flag))),
                Some(_) => Err(ConfigError::new("Flag parser", vec![
                    FieldError::InvalidType { field: self.field, expected: "boolean" }
                ])),
            }
        }
    }

    #[test]
    fn it_assigns_indices_in_registration_order() {
        let mut registry = ParserRegistry::new();

        let first = registry.register(FAST);
        let second = registry.register(SAFE);

        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
        assert_eq!(registry.index_of("fast"), Some(first));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn it_keeps_index_when_parser_is_replaced() {
        let mut registry = ParserRegistry::new();

        let first = registry.register(FAST);
        let again = registry.register(FAST);

        assert_eq!(first, again);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn it_places_each_result_at_its_index() {
        let mut registry = ParserRegistry::new();
        let fast = registry.register(FAST);
        let safe = registry.register(SAFE);

        let configs = registry
            .parse_per_method_params(&json!({ "safe": true }))
            .unwrap();

        assert_eq!(configs.len(), 2);
        assert!(configs.get(fast).is_none());
        assert!(configs.get(safe).is_some());
    }

    #[test]
    fn it_aggregates_errors_from_all_parsers() {
        let mut registry = ParserRegistry::new();
        registry.register(FAST);
        registry.register(SAFE);

        let err = registry
            .parse_per_method_params(&json!({ "fast": 1, "safe": "yes" }))
            .unwrap_err();

        assert_eq!(err.message(), "methodConfig");
        assert_eq!(err.children().len(), 2);
        assert!(err.contains_message("field:fast error:should be of type boolean"));
        assert!(err.contains_message("field:safe error:should be of type boolean"));
    }
}
