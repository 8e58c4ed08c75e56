//! Data structures for the Gemini AI API requests and responses.

mod function;
mod imagen;
mod part;
mod request;
mod request_type;
mod response;
mod schema;
mod tool;

pub use function::{FunctionCall, FunctionDeclaration, FunctionResponse};
pub use imagen::{PredictInstance, PredictParameters, PredictRequest, PredictResponse, Prediction};
pub use part::{FileData, InlineData, Part};
pub use request::{Content, GenerationConfig, Request, Role};
pub use request_type::RequestType;
pub use response::{Candidate, FinishReason, Response, UsageMetadata};
pub use schema::{Schema, SchemaType};
pub use tool::Tool;
