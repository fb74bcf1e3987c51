//! Google Cloud Vision OCR client (`images:annotate`, TEXT_DETECTION).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pantry_config::defaults::GOOGLE_VISION_ENDPOINT;
use pantry_core::{RawTextEntry, ServiceError, TextExtractor, Vertex};

use crate::http::{decode_error, error_from_response, transport_error};

pub struct GoogleVisionExtractor {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GoogleVisionExtractor {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: GOOGLE_VISION_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<RpcStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    confidence: Option<f32>,
    bounding_poly: Option<WirePoly>,
}

#[derive(Deserialize)]
struct WirePoly {
    #[serde(default)]
    vertices: Vec<WireVertex>,
}

/// Vision omits zero coordinates.
#[derive(Deserialize)]
struct WireVertex {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

#[derive(Deserialize)]
struct RpcStatus {
    code: Option<i32>,
    #[serde(default)]
    message: String,
}

/// Map an annotate response to raw entries, surfacing an embedded error.
fn entries_from_response(response: AnnotateResponse) -> Result<Vec<RawTextEntry>, ServiceError> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Vec::new());
    };

    if let Some(status) = first.error {
        if !status.message.is_empty() {
            return Err(ServiceError::Reported {
                code: status.code,
                message: status.message,
            });
        }
    }

    Ok(first
        .text_annotations
        .into_iter()
        .map(|annotation| RawTextEntry {
            description: annotation.description,
            confidence: annotation.confidence,
            vertices: annotation
                .bounding_poly
                .map(|poly| {
                    poly.vertices
                        .into_iter()
                        .map(|v| Vertex::new(v.x, v.y))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect())
}

#[async_trait]
impl TextExtractor for GoogleVisionExtractor {
    fn name(&self) -> &str {
        "google-vision"
    }

    async fn detect_text(&self, image: &[u8]) -> Result<Vec<RawTextEntry>, ServiceError> {
        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };

        debug!(bytes = image.len(), "Sending image to Google Vision");

        let response = self
            .client
            .post(format!("{}/images:annotate", self.endpoint))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let annotated: AnnotateResponse = response.json().await.map_err(decode_error)?;
        entries_from_response(annotated)
    }
}
