//! Client for the multimodal inference API (OpenAI Responses API).
//!
//! One request per uploaded image: the fixed diagnostic prompt plus the image as a data URI,
//! with the answer constrained to the [`response_schema`](crate::model::response_schema). The
//! client hands back the raw answer text; parsing it is the caller's job.

use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::Config,
    model::{response_schema, SCHEMA_NAME},
    utils::data_uri,
};

pub const PROMPT: &str = "I am sending an image of a leaf. Check whether the leaf is diseased or not. \
If diseased then give me the treatment for the disease. Also consider the weather condition like temperature, humidity etc., \
Give me the reason for the disease also and provide me the response by following structure";

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// Anything that can turn an image into raw diagnosis text.
pub trait Inference: Send + Sync {
    fn diagnose<'a>(
        &'a self,
        image_data: &'a [u8],
        base64_image: &'a str,
    ) -> BoxFuture<'a, Result<String, InferenceError>>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.clone(),
        })
    }

    async fn request(&self, image_data: &[u8], base64_image: &str) -> Result<String, InferenceError> {
        let url = format!("{}/responses", self.base_url);
        let body = request_body(&self.model, &data_uri(image_data, base64_image));

        info!(model = %self.model, image_bytes = image_data.len(), "Sending inference request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api { status, body });
        }

        let parsed: ResponsesBody = response.json().await?;
        let text = parsed.output_text();
        debug!(chars = text.len(), "Inference response received");

        Ok(text)
    }
}

impl Inference for OpenAiClient {
    fn diagnose<'a>(
        &'a self,
        image_data: &'a [u8],
        base64_image: &'a str,
    ) -> BoxFuture<'a, Result<String, InferenceError>> {
        self.request(image_data, base64_image).boxed()
    }
}

pub fn request_body(model: &str, image_url: &str) -> Value {
    json!({
        "model": model,
        "input": [
            {
                "role": "user",
                "content": [
                    { "type": "input_text", "text": PROMPT },
                    { "type": "input_image", "image_url": image_url }
                ]
            }
        ],
        "text": {
            "format": {
                "type": "json_schema",
                "name": SCHEMA_NAME,
                "strict": true,
                "schema": response_schema()
            }
        }
    })
}

#[derive(Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesBody {
    /// Concatenation of every `output_text` part, in order. Empty when the model refused.
    fn output_text(&self) -> String {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}
