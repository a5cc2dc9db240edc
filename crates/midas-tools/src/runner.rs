//! Runner - Tool execution engine
//!
//! Wraps every tool invocation in a bounded timeout and input validation.
//! Adapter failures come back as a failed `ToolResult`; only structural
//! problems (unknown name, disabled tool, timeout) surface as errors.

use crate::error::{Error, Result};
use crate::registry::{ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

/// Configuration for the tool runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Default timeout for tool execution
    pub default_timeout: Duration,
    /// Maximum timeout allowed
    pub max_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(300),
        }
    }
}

impl RunnerConfig {
    /// Create a new configuration with default timeout
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            ..Default::default()
        }
    }

    /// Set the default timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the maximum timeout
    #[must_use]
    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }
}

/// Options for a single tool execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Custom timeout for this execution
    pub timeout: Option<Duration>,
    /// Skip validation
    pub skip_validation: bool,
}

impl ExecutionOptions {
    /// Create options with a specific timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }
}

/// Tool execution result with additional metadata
#[derive(Debug)]
pub struct ExecutionResult {
    /// The tool result
    pub result: ToolResult,
    /// Tool name
    pub tool_name: String,
}

/// Tool runner for executing tools with safety measures
pub struct ToolRunner {
    registry: Arc<ToolRegistry>,
    config: RunnerConfig,
}

impl ToolRunner {
    /// Create a new tool runner
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: RunnerConfig) -> Self {
        Self { registry, config }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(registry: Arc<ToolRegistry>) -> Self {
        Self::new(registry, RunnerConfig::default())
    }

    /// Get the registry
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Execute a tool by name
    #[instrument(skip(self, input), fields(tool = %tool_name))]
    pub async fn execute(
        &self,
        tool_name: &str,
        input: serde_json::Value,
    ) -> Result<ExecutionResult> {
        self.execute_with_options(tool_name, input, ExecutionOptions::default())
            .await
    }

    /// Execute a tool with custom options
    #[instrument(skip(self, input, options), fields(tool = %tool_name))]
    pub async fn execute_with_options(
        &self,
        tool_name: &str,
        input: serde_json::Value,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| Error::UnknownTool(tool_name.to_string()))?;

        let definition = tool.definition();

        if !definition.enabled {
            return Err(Error::Disabled(tool_name.to_string()));
        }

        if !options.skip_validation {
            tool.validate_input(&input)?;
        }

        let execution_timeout = options
            .timeout
            .unwrap_or(self.config.default_timeout)
            .min(self.config.max_timeout);

        let start = Instant::now();
        debug!(tool = %tool_name, timeout_ms = %execution_timeout.as_millis(), "Executing tool");

        let result = match timeout(execution_timeout, tool.execute(input)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let duration = start.elapsed().as_millis() as u64;
                error!(tool = %tool_name, error = %e, "Tool execution failed");
                ToolResult::failure(e.to_string(), duration)
            }
            Err(_) => {
                let duration = start.elapsed().as_millis() as u64;
                warn!(tool = %tool_name, timeout_ms = %execution_timeout.as_millis(), "Tool execution timed out");
                return Err(Error::Timeout(duration));
            }
        };

        debug!(
            tool = %tool_name,
            success = %result.success,
            duration_ms = %result.duration_ms,
            "Tool execution completed"
        );

        Ok(ExecutionResult {
            result,
            tool_name: tool_name.to_string(),
        })
    }

    /// Check if a tool can be executed (without actually executing)
    pub fn can_execute(&self, tool_name: &str) -> Result<bool> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| Error::UnknownTool(tool_name.to_string()))?;

        Ok(tool.definition().enabled)
    }
}

impl Clone for ToolRunner {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Tool, ToolDefinition};

    struct SlowTool {
        definition: ToolDefinition,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl Tool for SlowTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
            tokio::time::sleep(self.delay).await;
            Ok(ToolResult::success(serde_json::json!({"done": true}), 0))
        }
    }

    struct FailingTool {
        definition: ToolDefinition,
    }

    #[async_trait::async_trait]
    impl Tool for FailingTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
            Err(Error::Execution("backend unavailable".to_string()))
        }
    }

    fn registry_with(tool: Arc<dyn Tool>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let runner = ToolRunner::with_defaults(Arc::new(ToolRegistry::new()));
        let err = runner
            .execute("missing", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool(_)));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_error() {
        let registry = registry_with(Arc::new(SlowTool {
            definition: ToolDefinition::new("slow", "Sleeps"),
            delay: Duration::from_secs(5),
        }));
        let runner = ToolRunner::new(registry, RunnerConfig::default());
        let err = runner
            .execute_with_options(
                "slow",
                serde_json::json!({}),
                ExecutionOptions::with_timeout(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_adapter_error_becomes_failed_result() {
        let registry = registry_with(Arc::new(FailingTool {
            definition: ToolDefinition::new("flaky", "Always fails"),
        }));
        let runner = ToolRunner::with_defaults(registry);
        let exec = runner.execute("flaky", serde_json::json!({})).await.unwrap();
        assert!(!exec.result.success);
        assert!(exec
            .result
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_disabled_tool_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SlowTool {
            definition: ToolDefinition::new("slow", "Sleeps"),
            delay: Duration::from_millis(1),
        }));
        registry.disable("slow");
        let runner = ToolRunner::with_defaults(Arc::new(registry));
        let err = runner
            .execute("slow", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Disabled(_)));
    }
}
