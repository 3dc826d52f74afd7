//! Gemini `generateContent` client.
//!
//! The request carries the image as inline base64, an optional PNG mask and
//! the prompt text, in that order. The first inline image in the response is
//! the result.

use base64::{engine::general_purpose, Engine as _};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use retouch_core::{EncodedImage, ImagePart, ProcessingRequest};

use crate::client::EditService;
use crate::config::ServiceConfig;
use crate::error::ServiceError;

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    image_size: &'static str,
    aspect_ratio: &'static str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

fn inline_part(image: &ImagePart) -> Part {
    Part {
        inline_data: Some(InlineData {
            mime_type: image.mime.clone(),
            data: general_purpose::STANDARD.encode(&image.bytes),
        }),
        ..Default::default()
    }
}

fn build_body(request: &ProcessingRequest) -> GenerateRequest {
    let mut parts = vec![inline_part(&request.source)];
    if let Some(mask) = &request.mask {
        parts.push(inline_part(mask));
    }
    parts.push(Part {
        text: Some(request.prompt.clone()),
        ..Default::default()
    });

    GenerateRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_modalities: ["TEXT", "IMAGE"],
            image_config: ImageConfig {
                image_size: request.resolution.as_str(),
                aspect_ratio: request.aspect.as_str(),
            },
        },
        safety_settings: SAFETY_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: "BLOCK_NONE",
            })
            .collect(),
    }
}

/// Serialize the JSON body for a request.
pub fn request_body(request: &ProcessingRequest) -> serde_json::Value {
    // Serializing plain structs of strings cannot fail
    serde_json::to_value(build_body(request)).unwrap_or(serde_json::Value::Null)
}

/// Extract the result image from a successful response body.
///
/// # Errors
///
/// - `ServiceError::Terminal` when the prompt was blocked
/// - `ServiceError::EmptyResponse` when no candidate carries an image; any
///   text the model returned is kept as detail
/// - `ServiceError::InvalidResponse` for undecodable bodies or image data
pub fn parse_response(body: &[u8]) -> Result<EncodedImage, ServiceError> {
    let response: GenerateResponse = serde_json::from_slice(body)
        .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ServiceError::Terminal {
            status: None,
            message: format!("request blocked ({})", reason),
        });
    }

    let mut text = Vec::new();
    let mut finish_reason = None;
    for candidate in response.candidates {
        finish_reason = finish_reason.or(candidate.finish_reason);
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(inline) = part.inline_data {
                let bytes = general_purpose::STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
                return EncodedImage::from_bytes(bytes)
                    .map_err(|e| ServiceError::InvalidResponse(e.to_string()));
            }
            if let Some(t) = part.text.filter(|t| !t.trim().is_empty()) {
                text.push(t);
            }
        }
    }

    let detail = if text.is_empty() {
        finish_reason.map(|r| format!("finish reason {}", r))
    } else {
        Some(text.join(" "))
    };
    Err(ServiceError::EmptyResponse(detail))
}

/// Classify a non-success response.
pub fn parse_error(status: u16, body: &str) -> ServiceError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ServiceError::classify(
            Some(status),
            envelope.error.status.as_deref(),
            &envelope.error.message,
        ),
        Err(_) => ServiceError::classify(Some(status), None, body),
    }
}

/// HTTP client for the Gemini image model.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    /// Use a preconfigured `reqwest::Client` (proxies, TLS roots).
    pub fn with_http(http: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn send(&self, request: &ProcessingRequest) -> Result<EncodedImage, ServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::Credential("no API key configured".to_string()))?;

        debug!(
            "POST {} for {} (masked: {}, {} {})",
            self.url(),
            request.asset,
            request.is_masked(),
            request.resolution.as_str(),
            request.aspect
        );
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        let image = parse_response(&body)?;
        info!(
            "{} edited: {} {}x{}",
            request.asset, image.mime, image.width, image.height
        );
        Ok(image)
    }
}

impl EditService for GeminiClient {
    fn edit(
        &self,
        request: &ProcessingRequest,
    ) -> impl std::future::Future<Output = Result<EncodedImage, ServiceError>> + Send {
        self.send(request)
    }
}
