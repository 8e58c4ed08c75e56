//! Error types for the Gemini client, the tool protocol and flow execution.

use thiserror::Error;

use crate::schema::Violation;

/// Errors raised by the Gemini HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status.
    #[error("[GoogleGenerativeAI Error]: {message}")]
    Api {
        /// Error message, including the HTTP status and response body
        message: String,
    },

    /// Error occurred during an API request.
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error occurred when parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ClientError {
    /// Creates a new API error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }
}

/// Failures of the tool-invocation protocol.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model requested a tool that is not part of the request's tool set.
    #[error("tool '{name}' not found")]
    NotFound {
        /// Name requested by the model
        name: String,
    },

    /// The model supplied arguments that fail the tool's input schema.
    #[error("invalid arguments for tool '{tool}': {}", join_violations(.violations))]
    ArgumentInvalid {
        /// Tool name
        tool: String,
        /// Field-level violations
        violations: Vec<Violation>,
    },

    /// The tool handler failed, usually because its external collaborator did.
    #[error("tool '{tool}' failed: {message}")]
    HandlerFailure {
        /// Tool name
        tool: String,
        /// Rendered handler error
        message: String,
    },
}

/// Errors surfaced to callers of [`crate::FlowEngine`] and [`crate::ModelInvoker`].
#[derive(Debug, Error)]
pub enum FlowError {
    /// No flow is registered under the requested name.
    #[error("flow '{name}' not found")]
    FlowNotFound {
        /// Requested flow name
        name: String,
    },

    /// A flow with the same name was already registered.
    #[error("flow '{name}' is already registered")]
    DuplicateFlow {
        /// Flow name
        name: String,
    },

    /// Flow input failed the flow's input schema; the body was not run.
    #[error("invalid input for flow '{flow}': {}", join_violations(.violations))]
    InputInvalid {
        /// Flow name
        flow: String,
        /// Field-level violations
        violations: Vec<Violation>,
    },

    /// The flow body returned a value that fails the flow's output schema.
    #[error("flow '{flow}' produced invalid output: {}", join_violations(.violations))]
    OutputInvalid {
        /// Flow name
        flow: String,
        /// Field-level violations
        violations: Vec<Violation>,
    },

    /// The model could not produce output matching the requested schema.
    #[error("model output does not conform to schema after {attempts} attempt(s): {}", join_violations(.violations))]
    SchemaConformance {
        /// Number of model answers that were checked
        attempts: usize,
        /// Violations of the last answer
        violations: Vec<Violation>,
    },

    /// Tool protocol failure that aborts the model turn.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Transport or provider failure while calling the model.
    #[error("generation failed: {0}")]
    Generation(#[from] ClientError),

    /// The refinement loop ran out of iterations without an accepted candidate.
    #[error("no accepted candidate after {iterations} iteration(s)")]
    MaxIterationsExceeded {
        /// Iterations performed
        iterations: usize,
        /// Candidate produced by the final iteration
        last_candidate: String,
    },

    /// The model kept requesting tools past the configured turn bound.
    #[error("model requested tools for more than {turns} turn(s)")]
    MaxTurnsExceeded {
        /// Configured bound
        turns: usize,
    },

    /// The caller cancelled the invocation.
    #[error("invocation cancelled")]
    Cancelled,

    /// A prompt template failed to render.
    #[error("prompt template error: {0}")]
    Prompt(#[from] minijinja::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other failure raised by a flow body.
    #[error("flow failed: {0}")]
    FlowFailure(#[from] anyhow::Error),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
