//! Routes tool names to the providers that registered them

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use engram_provider::{Tool, ToolContent, ToolError, ToolProvider, ToolSpec};

/// Name-keyed routing over registered providers. Re-registering a name
/// overwrites the route; the latest provider wins.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    routes: HashMap<String, usize>,
    specs: Vec<ToolSpec>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider and route every tool it advertises
    pub fn register(&mut self, provider: Arc<dyn ToolProvider>) {
        let index = self.providers.len();
        for spec in provider.list_tools() {
            if self.routes.insert(spec.name.clone(), index).is_some() {
                debug!(tool = %spec.name, "tool route overwritten");
                self.specs.retain(|s| s.name != spec.name);
            }
            self.specs.push(spec);
        }
        self.providers.push(provider);
    }

    pub fn has(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    /// Model-facing definitions for every routed tool
    pub fn definitions(&self) -> Vec<Tool> {
        self.specs
            .iter()
            .map(|s| Tool::new(&s.name, &s.description, s.input_schema.clone()))
            .collect()
    }

    /// Dispatch one call; unknown names are an error value, never a panic
    pub async fn call(&self, name: &str, args: Value) -> Result<ToolContent, ToolError> {
        let index = self
            .routes
            .get(name)
            .copied()
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;
        self.providers[index].call_tool(name, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedProvider {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl ToolProvider for FixedProvider {
        fn list_tools(&self) -> Vec<ToolSpec> {
            vec![ToolSpec::new(self.name, "fixed", json!({"type": "object"}))]
        }

        async fn call_tool(&self, _name: &str, _args: Value) -> Result<ToolContent, ToolError> {
            Ok(ToolContent::text(self.reply))
        }
    }

    #[tokio::test]
    async fn routes_calls_to_registering_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FixedProvider {
            name: "alpha",
            reply: "from alpha",
        }));
        registry.register(Arc::new(FixedProvider {
            name: "beta",
            reply: "from beta",
        }));

        assert!(registry.has("alpha"));
        assert_eq!(registry.definitions().len(), 2);

        let result = registry.call("beta", json!({})).await.unwrap();
        assert_eq!(result.joined(), "from beta");
    }

    #[tokio::test]
    async fn unknown_name_is_an_error_value() {
        let registry = ProviderRegistry::new();
        let result = registry.call("ghost", json!({})).await;
        assert!(matches!(result, Err(ToolError::Unknown(name)) if name == "ghost"));
    }

    #[tokio::test]
    async fn reregistering_a_name_overwrites_the_route() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FixedProvider {
            name: "tool",
            reply: "old",
        }));
        registry.register(Arc::new(FixedProvider {
            name: "tool",
            reply: "new",
        }));

        assert_eq!(registry.definitions().len(), 1);
        let result = registry.call("tool", json!({})).await.unwrap();
        assert_eq!(result.joined(), "new");
    }
}
