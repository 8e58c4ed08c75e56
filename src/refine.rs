//! The evaluator-optimizer loop.
//!
//! A generator model proposes a candidate, an evaluator model judges it, and a
//! rejected candidate's feedback becomes the next prompt. The loop is an explicit
//! state machine:
//!
//! ```text
//! Generate --ok--> Evaluate --Good--> Accept
//!    ^                 |
//!    +------Bad--------+
//! ```
//!
//! Any model failure ends the loop with that error, and running out of iterations
//! ends it with [`FlowError::MaxIterationsExceeded`]. Each revision prompt depends
//! only on the task and the latest feedback, so prompts do not grow with the number of
//! iterations.

use minijinja::context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    cancel::CancelToken,
    config::ModelSettings,
    error::FlowError,
    invoker::{GenerationRequest, ModelInvoker, PromptPart, SamplingParams},
    prompt::PromptLibrary,
    schema::{self, Field, Shape},
};

/// Evaluator's overall judgement of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Accept the candidate.
    Good,
    /// Try again.
    Bad,
}

/// Structured critique produced by the evaluator each iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// Comments on accuracy.
    pub accuracy: String,
    /// Comments on fluency.
    pub fluency: String,
    /// Comments on grammatical correctness.
    pub grammatical_correctness: String,
    /// Overall verdict.
    pub overall_impression: Verdict,
}

impl Feedback {
    /// Output shape of the evaluation request.
    pub fn shape() -> Shape {
        Shape::object([
            Field::required("accuracy", Shape::string()),
            Field::required("fluency", Shape::string()),
            Field::required("grammaticalCorrectness", Shape::string()),
            Field::required(
                "overallImpression",
                Shape::enumeration(["Good", "Bad"]).describe("Good or Bad"),
            ),
        ])
    }
}

/// Output shape of the generation request.
pub fn candidate_shape() -> Shape {
    Shape::object([Field::required("candidate", Shape::string())])
}

#[derive(Deserialize)]
struct Candidate {
    candidate: String,
}

/// Names of the templates the loop renders.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementPrompts {
    /// First prompt; receives `instruction` and `source`.
    pub generate: String,
    /// Evaluation prompt; receives `instruction`, `source` and `candidate`.
    pub evaluate: String,
    /// Revision prompt; receives `instruction`, `source` and `feedback`.
    pub revise: String,
}

/// Models, personas and bounds of a refinement loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementConfig {
    /// Generator model.
    pub generator: ModelSettings,
    /// Generator system instruction.
    pub generator_system: String,
    /// Evaluator model; a temperature of 0 keeps verdicts stable.
    pub evaluator: ModelSettings,
    /// Evaluator persona.
    pub evaluator_system: String,
    /// Maximum Generate/Evaluate rounds.
    pub max_iterations: usize,
    /// Templates to render.
    pub prompts: RefinementPrompts,
}

/// What to refine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementTask {
    /// The task description, e.g. "Translate the following text to English".
    pub instruction: String,
    /// The text the task applies to.
    pub source: String,
}

/// Mutable state owned by one loop run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopState {
    /// Prompt for the next Generate step.
    pub current_prompt: String,
    /// Most recent candidate.
    pub last_candidate: String,
    /// Verdict on the most recent candidate.
    pub last_verdict: Option<Verdict>,
    /// Generate steps performed so far.
    pub iteration_count: usize,
}

enum Step {
    Generate,
    Evaluate,
    Accept(Feedback),
}

/// An accepted candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    /// The accepted candidate.
    pub candidate: String,
    /// Rounds needed, at least 1.
    pub iterations: usize,
    /// The evaluator's accepting feedback.
    pub feedback: Feedback,
}

/// Runs the evaluator-optimizer loop for one task.
pub struct RefinementLoop<'a> {
    invoker: &'a ModelInvoker,
    prompts: &'a PromptLibrary,
    config: &'a RefinementConfig,
}

impl<'a> RefinementLoop<'a> {
    /// Binds the loop to its model invoker, templates and configuration.
    pub fn new(
        invoker: &'a ModelInvoker,
        prompts: &'a PromptLibrary,
        config: &'a RefinementConfig,
    ) -> Self {
        Self {
            invoker,
            prompts,
            config,
        }
    }

    /// Runs until the evaluator accepts a candidate.
    ///
    /// # Errors
    ///
    /// Propagates generation failures, returns [`FlowError::MaxIterationsExceeded`]
    /// after `max_iterations` rejected candidates and [`FlowError::Cancelled`] when
    /// `cancel` fires.
    pub async fn run(
        &self,
        task: &RefinementTask,
        cancel: &CancelToken,
    ) -> Result<Refinement, FlowError> {
        let mut state = LoopState {
            current_prompt: self.prompts.render(&self.config.prompts.generate, task)?,
            last_candidate: String::new(),
            last_verdict: None,
            iteration_count: 0,
        };
        let mut step = Step::Generate;

        loop {
            if cancel.is_cancelled() {
                return Err(FlowError::Cancelled);
            }
            step = match step {
                Step::Generate => {
                    if state.iteration_count >= self.config.max_iterations {
                        return Err(FlowError::MaxIterationsExceeded {
                            iterations: state.iteration_count,
                            last_candidate: state.last_candidate,
                        });
                    }
                    state.iteration_count += 1;
                    debug!(iteration = state.iteration_count, prompt = %state.current_prompt, "generating candidate");
                    state.last_candidate = self.generate(&state.current_prompt, cancel).await?;
                    state.last_verdict = None;
                    Step::Evaluate
                }
                Step::Evaluate => {
                    let feedback = self.evaluate(task, &state.last_candidate, cancel).await?;
                    state.last_verdict = Some(feedback.overall_impression);
                    info!(
                        iteration = state.iteration_count,
                        verdict = ?feedback.overall_impression,
                        accuracy = %feedback.accuracy,
                        fluency = %feedback.fluency,
                        grammatical_correctness = %feedback.grammatical_correctness,
                        "candidate evaluated"
                    );
                    match state.last_verdict {
                        Some(Verdict::Good) => Step::Accept(feedback),
                        Some(Verdict::Bad) | None => {
                            state.current_prompt = self.prompts.render(
                                &self.config.prompts.revise,
                                context! {
                                    instruction => &task.instruction,
                                    source => &task.source,
                                    feedback => &feedback,
                                },
                            )?;
                            Step::Generate
                        }
                    }
                }
                Step::Accept(feedback) => {
                    return Ok(Refinement {
                        candidate: state.last_candidate,
                        iterations: state.iteration_count,
                        feedback,
                    })
                }
            };
        }
    }

    async fn generate(&self, prompt: &str, cancel: &CancelToken) -> Result<String, FlowError> {
        let generator = &self.config.generator;
        let request = GenerationRequest::builder()
            .prompt(vec![PromptPart::text(prompt)])
            .system(self.config.generator_system.clone())
            .model(generator.model.clone())
            .sampling(SamplingParams::with_temperature(generator.temperature))
            .output(candidate_shape())
            .build();
        let result = self.invoker.generate(request, cancel).await?;
        let Candidate { candidate } = result.output_as()?;
        Ok(candidate)
    }

    async fn evaluate(
        &self,
        task: &RefinementTask,
        candidate: &str,
        cancel: &CancelToken,
    ) -> Result<Feedback, FlowError> {
        let evaluator = &self.config.evaluator;
        let prompt = self.prompts.render(
            &self.config.prompts.evaluate,
            context! {
                instruction => &task.instruction,
                source => &task.source,
                candidate => candidate,
            },
        )?;
        let request = GenerationRequest::builder()
            .prompt(vec![PromptPart::text(prompt)])
            .system(self.config.evaluator_system.clone())
            .model(evaluator.model.clone())
            .sampling(SamplingParams::with_temperature(evaluator.temperature))
            .output(Feedback::shape())
            .build();
        let result = self.invoker.generate(request, cancel).await?;
        let output = result.output.unwrap_or(Value::Null);
        schema::validate_as(&Feedback::shape(), &output).map_err(|violations| {
            FlowError::SchemaConformance {
                attempts: 1,
                violations,
            }
        })
    }
}
