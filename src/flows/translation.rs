use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{text_input, FlowDeps};
use crate::{
    error::FlowError,
    flow::{Flow, FlowContext},
    prompt::{self, PromptLibrary},
    refine::{RefinementConfig, RefinementLoop, RefinementPrompts, RefinementTask},
    schema::Shape,
};

/// Task given to the generator for every source text.
pub const TRANSLATE_INSTRUCTION: &str = "Translate the following text to English";

const GENERATOR_SYSTEM: &str = "You are an expert translator. Spanish to English. ";
const EVALUATOR_SYSTEM: &str =
    "You are an expert translator. English to Spanish. You are native Spanish.";

/// Spanish to English translation refined until the evaluator accepts it.
pub struct TranslationFlow {
    input: Shape,
    output: Shape,
    config: RefinementConfig,
    prompts: Arc<PromptLibrary>,
}

impl TranslationFlow {
    /// Flow name.
    pub const NAME: &'static str = "translationFlow";

    /// Builds the flow from the translation settings.
    pub fn new(deps: &FlowDeps) -> Self {
        let settings = &deps.config.translation;
        Self {
            input: text_input(),
            output: Shape::string(),
            config: RefinementConfig {
                generator: settings.generator.clone(),
                generator_system: GENERATOR_SYSTEM.to_string(),
                evaluator: settings.evaluator.clone(),
                evaluator_system: EVALUATOR_SYSTEM.to_string(),
                max_iterations: settings.max_iterations,
                prompts: RefinementPrompts {
                    generate: prompt::TRANSLATE.to_string(),
                    evaluate: prompt::TRANSLATE_EVALUATE.to_string(),
                    revise: prompt::TRANSLATE_REVISE.to_string(),
                },
            },
            prompts: Arc::clone(&deps.prompts),
        }
    }
}

#[async_trait]
impl Flow for TranslationFlow {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn input_shape(&self) -> &Shape {
        &self.input
    }

    fn output_shape(&self) -> &Shape {
        &self.output
    }

    async fn run(&self, input: Value, context: &FlowContext) -> Result<Value, FlowError> {
        let task = RefinementTask {
            instruction: TRANSLATE_INSTRUCTION.to_string(),
            source: input["text"].as_str().unwrap_or_default().to_string(),
        };
        let refinement = RefinementLoop::new(&context.invoker, &self.prompts, &self.config)
            .run(&task, &context.cancel)
            .await?;
        info!(
            flow = Self::NAME,
            iterations = refinement.iterations,
            "translation accepted"
        );
        Ok(Value::String(refinement.candidate))
    }
}
