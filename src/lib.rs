#![deny(missing_docs)]

//! Schema-validated LLM flows on the Google Gemini API.
//!
//! A [`FlowEngine`] runs named flows. Each flow validates its input, issues one or more
//! [`ModelInvoker`] calls (which may dispatch tools from a [`ToolRegistry`] on the
//! model's behalf) and validates its output. The translation flow is an
//! evaluator-optimizer loop built on [`refine::RefinementLoop`].

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod flows;
pub mod invoker;
pub mod logging;
pub mod models;
pub mod prompt;
pub mod refine;
pub mod schema;
pub mod services;
pub mod tools;

pub use cancel::CancelToken;
pub use client::GenerativeModel;
pub use config::Config;
pub use error::{ClientError, FlowError, ToolError};
pub use flow::{Flow, FlowContext, FlowEngine};
pub use invoker::{GenerationRequest, GenerationResult, ModelBackend, ModelInvoker, PromptPart};
pub use schema::{Field, Shape};
pub use tools::{ToolId, ToolRegistry};
