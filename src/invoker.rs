//! A single generative-model invocation, including structured output and tool calls.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::{
    cancel::CancelToken,
    config::Config,
    error::{ClientError, FlowError, ToolError},
    models::{Content, GenerationConfig, InlineData, Part, Request, Response, Role, Tool},
    schema::{Shape, Violation, ViolationKind},
    tools::ToolRegistry,
};

/// Tool round-trips allowed per generation unless configured otherwise.
pub const DEFAULT_MAX_TOOL_TURNS: usize = 20;
/// Correction prompts allowed per generation unless configured otherwise.
pub const DEFAULT_MAX_CORRECTION_ATTEMPTS: usize = 2;

/// Content type assumed for media URLs whose type cannot be guessed.
const FALLBACK_MEDIA_TYPE: &str = "video/mp4";

/// Guesses the MIME type of the media behind `url` from its path extension.
///
/// Query strings and fragments are ignored. URLs without a known extension, such as
/// YouTube watch pages, are assumed to be `video/mp4`.
pub fn guess_media_type(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string())
}

/// The transport the invoker talks to.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Sends one `generateContent` request for `model`.
    async fn generate_content(&self, model: &str, request: Request) -> Result<Response, ClientError>;
}

/// One element of a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    /// Plain text.
    Text(String),
    /// A reference to external media.
    Media {
        /// Where the media lives.
        url: String,
        /// Its MIME type.
        content_type: String,
    },
}

impl PromptPart {
    /// A text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A media part with an explicit content type.
    pub fn media(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::Media {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// A media part whose content type is guessed from the URL's extension.
    pub fn media_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let content_type = guess_media_type(&url);
        Self::Media { url, content_type }
    }

    fn to_part(&self) -> Part {
        match self {
            Self::Text(text) => Part::text(text.clone()),
            Self::Media { url, content_type } => Part::file_data(content_type.clone(), url.clone()),
        }
    }
}

/// Sampling configuration, passed through to the provider unchecked.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingParams {
    /// Randomness of the output.
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,
    /// Top-k sampling limit.
    pub top_k: Option<u32>,
    /// Output length limit.
    pub max_output_tokens: Option<u32>,
}

impl SamplingParams {
    /// Only sets the temperature.
    pub fn with_temperature(temperature: Option<f32>) -> Self {
        Self {
            temperature,
            ..Self::default()
        }
    }
}

/// Everything needed for one model invocation. Built fresh for every call.
#[derive(Debug, Clone, TypedBuilder)]
pub struct GenerationRequest {
    /// Ordered prompt parts.
    #[builder(setter(into))]
    pub prompt: Vec<PromptPart>,

    /// System instruction.
    #[builder(default, setter(strip_option, into))]
    pub system: Option<String>,

    /// Model identifier.
    #[builder(setter(into))]
    pub model: String,

    /// Sampling parameters.
    #[builder(default)]
    pub sampling: SamplingParams,

    /// Shape the answer must match; requests a structured result.
    #[builder(default, setter(strip_option))]
    pub output: Option<Shape>,

    /// Tools the model may call.
    #[builder(default, setter(strip_option))]
    pub tools: Option<ToolRegistry>,
}

/// What a generation produced.
///
/// Exactly one of `text` and `output` is set: `output` when the request carried an
/// output shape, `text` otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
    /// Free-text answer.
    pub text: Option<String>,
    /// Validated structured answer; `Value::Null` for a declined nullable answer.
    pub output: Option<Value>,
    /// Media returned inline by the model, as a `data:` URL.
    pub media_url: Option<String>,
}

impl GenerationResult {
    /// Deserializes the structured output into `T`.
    ///
    /// # Errors
    ///
    /// Fails with [`FlowError::SchemaConformance`] when there is no structured output or
    /// it does not deserialize into `T`.
    pub fn output_as<T: DeserializeOwned>(&self) -> Result<T, FlowError> {
        let value = self.output.clone().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| FlowError::SchemaConformance {
            attempts: 1,
            violations: vec![Violation {
                path: "$".to_string(),
                kind: ViolationKind::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                    found: if e.is_data() { "different data" } else { "malformed value" },
                },
            }],
        })
    }
}

/// Runs [`GenerationRequest`]s against a [`ModelBackend`].
///
/// Tool calls requested by the model are dispatched through the request's
/// [`ToolRegistry`] and folded back into the conversation until the model answers.
/// Structured answers are validated and, if needed, corrected by re-prompting.
pub struct ModelInvoker {
    backend: Arc<dyn ModelBackend>,
    max_tool_turns: usize,
    max_correction_attempts: usize,
}

impl ModelInvoker {
    /// An invoker with the default bounds.
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
            max_correction_attempts: DEFAULT_MAX_CORRECTION_ATTEMPTS,
        }
    }

    /// An invoker with the bounds from `config`.
    pub fn from_config(backend: Arc<dyn ModelBackend>, config: &Config) -> Self {
        Self::new(backend).with_limits(config.max_tool_turns, config.max_correction_attempts)
    }

    /// Overrides the tool-turn and correction bounds.
    pub fn with_limits(mut self, max_tool_turns: usize, max_correction_attempts: usize) -> Self {
        self.max_tool_turns = max_tool_turns;
        self.max_correction_attempts = max_correction_attempts;
        self
    }

    /// Runs the request to completion.
    ///
    /// # Errors
    ///
    /// * [`FlowError::Generation`] when the backend fails,
    /// * [`FlowError::Tool`] when the model names an unknown tool,
    /// * [`FlowError::MaxTurnsExceeded`] when the model keeps calling tools,
    /// * [`FlowError::SchemaConformance`] when no conforming answer was produced,
    /// * [`FlowError::Cancelled`] when `cancel` fires.
    pub async fn generate(
        &self,
        request: GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<GenerationResult, FlowError> {
        let GenerationRequest {
            prompt,
            system,
            model,
            sampling,
            output,
            tools,
        } = request;
        let tools = tools.filter(|registry| !registry.is_empty());

        let mut parts: Vec<Part> = prompt.iter().map(PromptPart::to_part).collect();
        let mut generation_config = GenerationConfig {
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            top_k: sampling.top_k,
            max_output_tokens: sampling.max_output_tokens,
            ..GenerationConfig::default()
        };
        if let Some(shape) = &output {
            if tools.is_some() {
                parts.push(Part::text(format_instruction(shape)));
            } else {
                generation_config.response_mime_type = Some("application/json".to_string());
                generation_config.response_schema = Some(shape.to_wire());
            }
        }

        let system_instruction = system.map(Content::system);
        let wire_tools = tools
            .as_ref()
            .map(|registry| vec![Tool::from(registry.declarations())]);
        let mut contents = vec![Content::user(parts)];
        let mut tool_turns = 0;
        let mut rejected_answers = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(FlowError::Cancelled);
            }
            let wire = Request::builder()
                .contents(contents.clone())
                .system_instruction(system_instruction.clone())
                .tools(wire_tools.clone())
                .generation_config(Some(generation_config.clone()))
                .build();

            debug!(%model, turn = contents.len(), "sending generation request");
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FlowError::Cancelled),
                response = self.backend.generate_content(&model, wire) => response?,
            };

            let calls = response.function_calls();
            if !calls.is_empty() {
                let Some(registry) = &tools else {
                    return Err(ToolError::NotFound {
                        name: calls[0].name.clone(),
                    }
                    .into());
                };
                if tool_turns >= self.max_tool_turns {
                    return Err(FlowError::MaxTurnsExceeded {
                        turns: self.max_tool_turns,
                    });
                }
                tool_turns += 1;
                info!(
                    %model,
                    turn = tool_turns,
                    tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "model requested tools"
                );

                let dispatched = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FlowError::Cancelled),
                    dispatched = registry.dispatch_all(&calls) => dispatched?,
                };
                contents.push(model_turn(&response));
                contents.push(Content {
                    role: Some(Role::Function),
                    parts: dispatched
                        .into_iter()
                        .map(|(function_response, _)| Part::FunctionResponse { function_response })
                        .collect(),
                });
                continue;
            }

            let text = response.text();
            let media_url = response.inline_data().map(InlineData::to_data_url);
            let Some(shape) = &output else {
                return Ok(GenerationResult {
                    text: Some(text),
                    output: None,
                    media_url,
                });
            };

            match parse_structured(shape, &text) {
                Ok(value) => {
                    return Ok(GenerationResult {
                        text: None,
                        output: Some(value),
                        media_url,
                    })
                }
                Err(violations) => {
                    rejected_answers += 1;
                    if rejected_answers > self.max_correction_attempts {
                        if shape.is_nullable() && declined(&violations) {
                            info!(
                                %model,
                                attempts = rejected_answers,
                                "model declined to answer in JSON, returning null"
                            );
                            return Ok(GenerationResult {
                                text: None,
                                output: Some(Value::Null),
                                media_url,
                            });
                        }
                        return Err(FlowError::SchemaConformance {
                            attempts: rejected_answers,
                            violations,
                        });
                    }
                    warn!(
                        %model,
                        attempt = rejected_answers,
                        ?violations,
                        "answer does not match output schema, asking for a correction"
                    );
                    let echoed = model_turn(&response);
                    if !echoed.parts.is_empty() {
                        contents.push(echoed);
                    }
                    contents.push(Content::user(vec![Part::text(correction_prompt(
                        shape,
                        &violations,
                    ))]));
                }
            }
        }
    }
}

/// The model's turn, echoed back so follow-up turns keep the conversation intact.
fn model_turn(response: &Response) -> Content {
    let mut content = response.content().cloned().unwrap_or_default();
    content.role = Some(Role::Model);
    content
}

fn format_instruction(shape: &Shape) -> String {
    let schema = serde_json::to_string_pretty(&shape.to_json_schema()).unwrap_or_default();
    let mut instruction = format!(
        "Output should be in JSON format and conform to the following schema:\n\n```\n{schema}\n```\n"
    );
    if shape.is_nullable() {
        instruction.push_str("If no suitable output can be produced, respond with null.\n");
    }
    instruction
}

fn correction_prompt(shape: &Shape, violations: &[Violation]) -> String {
    let problems = violations
        .iter()
        .map(|v| format!("- {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Your previous answer did not match the required output schema:\n{problems}\n\n{}Respond again with only the corrected JSON.",
        format_instruction(shape)
    )
}

/// True when the answer held no JSON at all, as opposed to JSON of the wrong shape.
fn declined(violations: &[Violation]) -> bool {
    violations
        .iter()
        .all(|violation| violation.kind == ViolationKind::NotJson)
}

/// Parses a model answer as JSON and validates it against `shape`.
pub(crate) fn parse_structured(shape: &Shape, text: &str) -> Result<Value, Vec<Violation>> {
    let trimmed = text.trim();
    if trimmed.is_empty() && shape.is_nullable() {
        return Ok(Value::Null);
    }
    let value = extract_json(trimmed).ok_or_else(|| {
        vec![Violation {
            path: "$".to_string(),
            kind: ViolationKind::NotJson,
        }]
    })?;
    shape.validate(&value)
}

/// Finds the JSON document in a model answer, tolerating code fences and prose.
fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    if let Some(fenced) = text.strip_prefix("```") {
        let body = fenced.split_once('\n').map_or("", |(_, rest)| rest);
        let body = body.trim_end().trim_end_matches("```");
        if let Ok(value) = serde_json::from_str(body.trim()) {
            return Some(value);
        }
    }
    // Braces inside prose ("Note {x}: {...}") are skipped until a candidate parses.
    text.match_indices(['{', '[']).find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
    })
}
