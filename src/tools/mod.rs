//! Tools the model may call mid-generation, and the registry that dispatches them.
//!
//! Every tool implements the same validate-then-invoke contract: the registry checks
//! the model's raw arguments against [`Tool::input_shape`] and only then calls
//! [`Tool::call`]. Tools are addressed by the closed [`ToolId`] set.

mod image;
mod search;
mod transcription;

use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    error::ToolError,
    models::{FunctionCall, FunctionDeclaration, FunctionResponse},
    schema::{Shape, Violation},
};

pub use image::CreateImageBlog;
pub use search::SearchYoutubeVideos;
pub use transcription::GetTranscription;

/// Identifier of every tool known to the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolId {
    /// Video search, see [`SearchYoutubeVideos`].
    SearchYoutubeVideos,
    /// Video transcription, see [`GetTranscription`].
    GetTranscription,
    /// Blog illustration, see [`CreateImageBlog`].
    CreateImageBlog,
}

impl ToolId {
    /// All tool identifiers.
    pub const ALL: [ToolId; 3] = [
        ToolId::SearchYoutubeVideos,
        ToolId::GetTranscription,
        ToolId::CreateImageBlog,
    ];

    /// The name advertised to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchYoutubeVideos => "searchYoutubeVideos",
            Self::GetTranscription => "getTranscription",
            Self::CreateImageBlog => "createImageBlog",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ToolError::NotFound { name: s.to_string() })
    }
}

/// What a tool hands back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputKind {
    /// Free text, passed back without validation.
    Text,
    /// A value that must match the shape before it is passed back.
    Shape(Shape),
}

/// A capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Identifier, also the name the model uses to call the tool.
    fn id(&self) -> ToolId;

    /// Tells the model when and how to use the tool.
    fn description(&self) -> &str;

    /// Shape the call arguments must match.
    fn input_shape(&self) -> &Shape;

    /// Contract of the tool's output.
    fn output_kind(&self) -> OutputKind {
        OutputKind::Text
    }

    /// Runs the tool with already validated arguments.
    async fn call(&self, input: Value) -> anyhow::Result<Value>;
}

/// Result of dispatching one function call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The handler succeeded.
    Output(Value),
    /// The arguments failed the input shape; the handler was not run.
    InvalidArguments(Vec<Violation>),
    /// The handler failed or returned a value outside its declared output shape.
    Failed(String),
}

impl ToolOutcome {
    /// Converts the outcome into the JSON object sent back as a function response.
    pub fn to_response(&self) -> Value {
        match self {
            Self::Output(output) => json!({ "output": output }),
            Self::InvalidArguments(violations) => json!({
                "error": "ToolArgumentInvalid",
                "violations": violations.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }),
            Self::Failed(message) => json!({ "error": message }),
        }
    }
}

/// A set of tools, keyed by [`ToolId`].
///
/// Cloning is cheap; flows keep one process-wide registry and hand a
/// [`ToolRegistry::subset`] to each generation request.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolId, Arc<dyn Tool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tools.keys()).finish()
    }
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, returning the tool previously registered under the same id.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        self.tools.insert(tool.id(), tool)
    }

    /// Builder form of [`ToolRegistry::register`].
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// A registry holding only the listed tools that are registered here.
    pub fn subset(&self, ids: &[ToolId]) -> Self {
        Self {
            tools: ids
                .iter()
                .filter_map(|id| self.tools.get(id).map(|tool| (*id, Arc::clone(tool))))
                .collect(),
        }
    }

    /// Registered identifiers.
    pub fn ids(&self) -> Vec<ToolId> {
        self.tools.keys().copied().collect()
    }

    /// Whether no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Looks up a tool by the name the model used.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        let id = name.parse::<ToolId>().ok()?;
        self.tools.get(&id)
    }

    /// Function declarations advertised to the model.
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools
            .values()
            .map(|tool| {
                FunctionDeclaration::builder()
                    .name(tool.id().as_str())
                    .description(tool.description())
                    .parameters(tool.input_shape().to_wire())
                    .build()
            })
            .collect()
    }

    /// Validates `args` against the tool's input shape and runs the handler.
    pub async fn invoke(tool: &dyn Tool, args: &Value) -> ToolOutcome {
        let args = if args.is_null() { json!({}) } else { args.clone() };
        let input = match tool.input_shape().validate(&args) {
            Ok(input) => input,
            Err(violations) => {
                warn!(tool = %tool.id(), ?violations, "rejected tool arguments");
                return ToolOutcome::InvalidArguments(violations);
            }
        };

        debug!(tool = %tool.id(), %input, "invoking tool");
        let output = match tool.call(input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %tool.id(), error = %e, "tool failed");
                return ToolOutcome::Failed(format!("{e:#}"));
            }
        };

        match tool.output_kind() {
            OutputKind::Text => ToolOutcome::Output(output),
            OutputKind::Shape(shape) => match shape.validate(&output) {
                Ok(output) => ToolOutcome::Output(output),
                Err(violations) => ToolOutcome::Failed(format!(
                    "tool output does not match its schema: {}",
                    violations
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                )),
            },
        }
    }

    /// Dispatches a single call.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] if the call names a tool outside this registry.
    pub async fn dispatch(&self, call: &FunctionCall) -> Result<ToolOutcome, ToolError> {
        let tool = self.get(&call.name).ok_or_else(|| ToolError::NotFound {
            name: call.name.clone(),
        })?;
        Ok(Self::invoke(tool.as_ref(), &call.args).await)
    }

    /// Dispatches all calls of one model turn concurrently.
    ///
    /// Every name is resolved before any handler runs, so a turn naming an unknown tool
    /// invokes nothing. Responses are returned in call order.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for the first unknown tool name.
    pub async fn dispatch_all(
        &self,
        calls: &[FunctionCall],
    ) -> Result<Vec<(FunctionResponse, ToolOutcome)>, ToolError> {
        let resolved = calls
            .iter()
            .map(|call| {
                self.get(&call.name)
                    .map(|tool| (Arc::clone(tool), call))
                    .ok_or_else(|| ToolError::NotFound {
                        name: call.name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let outcomes = join_all(
            resolved
                .iter()
                .map(|(tool, call)| Self::invoke(tool.as_ref(), &call.args)),
        )
        .await;

        Ok(resolved
            .into_iter()
            .zip(outcomes)
            .map(|((_, call), outcome)| {
                let response = FunctionResponse {
                    name: call.name.clone(),
                    response: outcome.to_response(),
                };
                (response, outcome)
            })
            .collect())
    }
}
