//! Named, schema-checked flows and the engine that runs them.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::{cancel::CancelToken, error::FlowError, invoker::ModelInvoker, schema::Shape};

/// Environment handed to a flow body.
#[derive(Clone)]
pub struct FlowContext {
    /// Model invoker shared by every flow.
    pub invoker: Arc<ModelInvoker>,
    /// Fires when the caller abandons the invocation.
    pub cancel: CancelToken,
}

/// A named unit of orchestration with typed input and output.
#[async_trait]
pub trait Flow: Send + Sync {
    /// Unique name the flow is invoked by.
    fn name(&self) -> &str;

    /// Shape the raw input must match.
    fn input_shape(&self) -> &Shape;

    /// Shape the result must match; may be nullable.
    fn output_shape(&self) -> &Shape;

    /// Runs the body with validated input.
    async fn run(&self, input: Value, context: &FlowContext) -> Result<Value, FlowError>;
}

/// Name and contract of a registered flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowDescriptor {
    /// Flow name.
    pub name: String,
    /// Input shape.
    pub input: Shape,
    /// Output shape.
    pub output: Shape,
}

/// Registry and runner of flows.
pub struct FlowEngine {
    invoker: Arc<ModelInvoker>,
    flows: BTreeMap<String, Arc<dyn Flow>>,
}

impl FlowEngine {
    /// An engine with no flows.
    pub fn new(invoker: Arc<ModelInvoker>) -> Self {
        Self {
            invoker,
            flows: BTreeMap::new(),
        }
    }

    /// Registers `flow` under its name.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::DuplicateFlow`] if the name is taken.
    pub fn register(&mut self, flow: Arc<dyn Flow>) -> Result<(), FlowError> {
        let name = flow.name().to_string();
        if self.flows.contains_key(&name) {
            return Err(FlowError::DuplicateFlow { name });
        }
        self.flows.insert(name, flow);
        Ok(())
    }

    /// Registered flows, ordered by name.
    pub fn flows(&self) -> Vec<FlowDescriptor> {
        self.flows
            .values()
            .map(|flow| FlowDescriptor {
                name: flow.name().to_string(),
                input: flow.input_shape().clone(),
                output: flow.output_shape().clone(),
            })
            .collect()
    }

    /// Runs the flow `name` with `input`.
    ///
    /// # Errors
    ///
    /// See [`FlowEngine::invoke_with_cancel`].
    pub async fn invoke(&self, name: &str, input: Value) -> Result<Value, FlowError> {
        self.invoke_with_cancel(name, input, CancelToken::new()).await
    }

    /// Runs the flow `name` with `input`, abandoning it when `cancel` fires.
    ///
    /// # Errors
    ///
    /// * [`FlowError::FlowNotFound`] for an unknown name,
    /// * [`FlowError::InputInvalid`] when `input` fails the input shape; the body does not run,
    /// * [`FlowError::OutputInvalid`] when the body's result fails the output shape,
    /// * any error raised by the body.
    pub async fn invoke_with_cancel(
        &self,
        name: &str,
        input: Value,
        cancel: CancelToken,
    ) -> Result<Value, FlowError> {
        let flow = self.flows.get(name).ok_or_else(|| FlowError::FlowNotFound {
            name: name.to_string(),
        })?;

        let input = flow.input_shape().validate(&input).map_err(|violations| {
            warn!(flow = name, ?violations, "rejected flow input");
            FlowError::InputInvalid {
                flow: name.to_string(),
                violations,
            }
        })?;

        info!(flow = name, %input, "flow started");
        let context = FlowContext {
            invoker: Arc::clone(&self.invoker),
            cancel,
        };
        let output = match flow.run(input, &context).await {
            Ok(output) => output,
            Err(e) => {
                warn!(flow = name, error = %e, "flow failed");
                return Err(e);
            }
        };

        let output = flow.output_shape().validate(&output).map_err(|violations| {
            warn!(flow = name, ?violations, "flow produced invalid output");
            FlowError::OutputInvalid {
                flow: name.to_string(),
                violations,
            }
        })?;
        info!(flow = name, is_null = output.is_null(), "flow finished");
        Ok(output)
    }
}
