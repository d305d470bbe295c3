//! Transformer type registry.
//!
//! Maps the `type` string of a pipeline declaration to a factory that
//! builds a configured instance from the declaration's JSON `config`.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{TransformError, Transformer, builtin};

type Factory = Box<dyn Fn(&Value) -> Result<Arc<dyn Transformer>, TransformError> + Send + Sync>;

/// Type name → factory.
#[derive(Default)]
pub struct TransformerRegistry {
    factories: FxHashMap<String, Factory>,
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.factories.keys().collect();
        types.sort();
        f.debug_struct("TransformerRegistry")
            .field("types", &types)
            .finish()
    }
}

impl TransformerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in transformers (`Copy`, `Command`, `Minify`, `Texture`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a factory. A later registration of the same type replaces the earlier one.
    pub fn register<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn Transformer>, TransformError> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.to_string(), Box::new(factory));
    }

    /// Register a transformer whose configuration is its serde representation.
    pub fn register_typed<T>(&mut self, type_name: &str)
    where
        T: Transformer + DeserializeOwned + 'static,
    {
        let name = type_name.to_string();
        self.register(type_name, move |config| {
            let invalid = |message: String| TransformError::InvalidConfig {
                type_name: name.clone(),
                message,
            };
            let transformer: T =
                serde_json::from_value(config.clone()).map_err(|e| invalid(e.to_string()))?;
            transformer.validate().map_err(invalid)?;
            Ok(Arc::new(transformer))
        });
    }

    /// Build a configured instance. A `null` config is treated as `{}`.
    pub fn create(
        &self,
        type_name: &str,
        config: &Value,
    ) -> Result<Arc<dyn Transformer>, TransformError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| TransformError::UnknownType(type_name.to_string()))?;

        if config.is_null() {
            factory(&Value::Object(serde_json::Map::new()))
        } else {
            factory(config)
        }
    }

    #[cfg(test)]
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }
}
