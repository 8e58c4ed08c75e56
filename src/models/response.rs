//! Response models for the Gemini AI API.

use serde::Deserialize;

use super::{Content, FunctionCall, InlineData, Part};

/// A response from the `generateContent` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// The generated candidates from the model.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Metadata about token usage.
    pub usage_metadata: Option<UsageMetadata>,
    /// The version of the model used.
    pub model_version: Option<String>,
}

impl Response {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .into_iter()
            .flat_map(|candidate| candidate.content.parts.iter())
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> String {
        self.parts()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Function calls requested by the first candidate, in order.
    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.parts()
            .filter_map(|part| match part {
                Part::FunctionCall { function_call } => Some(function_call.clone()),
                _ => None,
            })
            .collect()
    }

    /// The first inline media part of the first candidate.
    pub fn inline_data(&self) -> Option<&InlineData> {
        self.parts().find_map(|part| match part {
            Part::InlineData { inline_data } => Some(inline_data),
            _ => None,
        })
    }

    /// The content of the first candidate, to be echoed back in a follow-up turn.
    pub fn content(&self) -> Option<&Content> {
        self.candidates.first().map(|candidate| &candidate.content)
    }
}

/// A candidate response from the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of the candidate response.
    #[serde(default)]
    pub content: Content,
    /// The reason why the generation finished.
    pub finish_reason: Option<FinishReason>,
}

/// Reason why the generation finished.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// Natural stop point of the model or provided stop sequence.
    Stop,
    /// The maximum number of tokens as specified in the request was reached.
    MaxTokens,
    /// The response candidate content was flagged for safety reasons.
    Safety,
    /// The response candidate content was flagged for recitation reasons.
    Recitation,
    /// The function call generated by the model is invalid.
    MalformedFunctionCall,
    /// Any other reason.
    #[serde(other)]
    Other,
}

/// Metadata about token usage in the request and response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Number of tokens in the prompt.
    #[serde(default)]
    pub prompt_token_count: u32,
    /// Number of tokens in the generated candidates.
    #[serde(default)]
    pub candidates_token_count: u32,
    /// Total number of tokens used.
    #[serde(default)]
    pub total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_function_calls_and_text() {
        let response: Response = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Searching"},
                        {"functionCall": {"name": "searchYoutubeVideos", "args": {"text": "qubits"}}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "totalTokenCount": 12},
            "modelVersion": "gemini-2.5-flash"
        }))
        .unwrap();

        assert_eq!(response.text(), "Searching");
        let calls = response.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "searchYoutubeVideos");
        assert_eq!(calls[0].args, json!({"text": "qubits"}));
        assert_eq!(
            response.candidates[0].finish_reason,
            Some(FinishReason::Stop)
        );
    }

    #[test]
    fn unknown_part_kinds_are_skipped() {
        let response: Response = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"executableCode": {"language": "PYTHON", "code": "print(1)"}},
                        {"codeExecutionResult": {"outcome": "OUTCOME_OK", "output": "1"}},
                        {"text": "hi"}
                    ]
                }
            }]
        }))
        .unwrap();

        assert_eq!(response.text(), "hi");
        assert!(response.function_calls().is_empty());
        assert!(matches!(
            response.content().unwrap().parts[0],
            Part::Other(ref raw) if raw["executableCode"]["code"] == "print(1)"
        ));
    }

    #[test]
    fn tolerates_blocked_candidates_and_unknown_reasons() {
        let response: Response = serde_json::from_value(json!({
            "candidates": [{"finishReason": "PROHIBITED_CONTENT"}]
        }))
        .unwrap();
        assert_eq!(response.text(), "");
        assert_eq!(
            response.candidates[0].finish_reason,
            Some(FinishReason::Other)
        );
    }
}
