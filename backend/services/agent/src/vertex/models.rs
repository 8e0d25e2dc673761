use ctxwatch_correlation::{Candidate, GenerationRequest, GenerationResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
pub struct RequestPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl From<&GenerationRequest> for GenerateContentRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![RequestPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseCandidate {
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl From<GenerateContentResponse> for GenerationResponse {
    fn from(response: GenerateContentResponse) -> Self {
        let candidates = response
            .candidates
            .into_iter()
            .map(|candidate| Candidate {
                parts: candidate
                    .content
                    .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
                    .unwrap_or_default(),
            })
            .collect();
        GenerationResponse { candidates }
    }
}
