use serde::{Deserialize, Serialize};

use super::function::FunctionDeclaration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
/// Tools data sent as part of the request.
pub enum Tool {
    /// A list of function declarations the model may call.
    FunctionDeclarationsTool {
        /// The list of function declarations
        #[serde(rename = "functionDeclarations")]
        function_declarations: Vec<FunctionDeclaration>,
    },
}

impl From<Vec<FunctionDeclaration>> for Tool {
    fn from(function_declarations: Vec<FunctionDeclaration>) -> Self {
        Self::FunctionDeclarationsTool {
            function_declarations,
        }
    }
}
