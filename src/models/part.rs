//! Common part model used in both requests and responses.

use serde::{Deserialize, Serialize};

use super::{FunctionCall, FunctionResponse};

/// One piece of a message: text, media or a function call round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// A text part containing a string value
    Text {
        /// The text content of the part
        text: String,
    },
    /// A part containing inline base64 data
    InlineData {
        /// The inline data content of the part
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
    },
    /// A part referencing media by URI
    FileData {
        /// The referenced file
        #[serde(rename = "fileData", alias = "file_data")]
        file_data: FileData,
    },
    /// A function call requested by the model
    FunctionCall {
        /// The call
        #[serde(rename = "functionCall", alias = "function_call")]
        function_call: FunctionCall,
    },
    /// The result of a function call
    FunctionResponse {
        /// The response
        #[serde(rename = "functionResponse", alias = "function_response")]
        function_response: FunctionResponse,
    },
    /// A part kind this crate does not model, such as `executableCode`; kept verbatim
    Other(serde_json::Value),
}

impl Part {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a part that references media by URI.
    pub fn file_data(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Self::FileData {
            file_data: FileData {
                mime_type: mime_type.into(),
                file_uri: file_uri.into(),
            },
        }
    }
}

/// A part containing inline data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// The MIME type of the inline data
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// The base64 encoded content
    pub data: String,
}

impl InlineData {
    /// Renders the data as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Media referenced by URI, such as an uploaded file or a video URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// The MIME type of the referenced media
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// The URI of the media
    #[serde(alias = "file_uri")]
    pub file_uri: String,
}
