use crate::core::config::Config;
use crate::services::llm::{resolve_api_key, OPENAI_BASE_URL};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use url::Url;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageConfig {
    #[serde(default = "default_image_provider")]
    pub provider: String, // "openai" or "none"
    pub openai: Option<OpenAIImageConfig>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            provider: default_image_provider(),
            openai: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIImageConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_image_size")]
    pub size: String,
    pub base_url: Option<String>,
}

fn default_image_provider() -> String {
    "none".to_string()
}
fn default_image_model() -> String {
    "dall-e-3".to_string()
}
fn default_image_size() -> String {
    "1024x1024".to_string()
}

#[async_trait]
pub trait ImageGenerator: Send + Sync + Debug {
    /// Returns a retrievable location for an image matching `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
    async fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

/// `None` when cover art is disabled.
pub fn create_image_generator(config: &Config) -> Result<Option<Box<dyn ImageGenerator>>> {
    match config.image.provider.as_str() {
        "none" | "" => Ok(None),
        "openai" => {
            let cfg = config.image.openai.as_ref().context("OpenAI image config missing")?;
            let api_key = resolve_api_key(&cfg.api_key, "OPENAI_API_KEY")?;
            Ok(Some(Box::new(OpenAIImageClient::new(&api_key, cfg))))
        }
        _ => Err(anyhow!("Unknown image provider: {}", config.image.provider)),
    }
}

#[derive(Debug)]
struct OpenAIImageClient {
    api_key: String,
    model: String,
    size: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIImageClient {
    fn new(api_key: &str, config: &OpenAIImageConfig) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: config.model.clone(),
            size: config.size.clone(),
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

fn first_image_url(response: ImageResponse) -> Result<String> {
    response
        .data
        .into_iter()
        .find_map(|d| d.url)
        .ok_or_else(|| anyhow!("Image response contained no URL"))
}

#[async_trait]
impl ImageGenerator for OpenAIImageClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/images/generations", self.base_url);
        let request_body = ImageRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.size.clone(),
        };

        let resp = self.client.post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("OpenAI image API error: {}", error_text));
        }

        let result: ImageResponse = resp.json().await?;
        first_image_url(result)
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let url = Url::parse(location).with_context(|| format!("Invalid image location: {}", location))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("Unsupported image location scheme: {}", url.scheme()));
        }
        debug!("Downloading image from {}", url.host_str().unwrap_or("?"));

        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("Image download failed with status {}", resp.status()));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_response_parsing() {
        let json = r#"{
            "created": 1700000000,
            "data": [
                { "revised_prompt": "A lone figure", "url": "https://example.com/cover.png" }
            ]
        }"#;
        let response: ImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_image_url(response).unwrap(), "https://example.com/cover.png");
    }

    #[test]
    fn test_image_response_without_url_is_error() {
        let response: ImageResponse = serde_json::from_str(r#"{"data": [{"b64_json": "AAAA"}]}"#).unwrap();
        assert!(first_image_url(response).is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_locations() {
        let client = OpenAIImageClient::new(
            "sk-test",
            &OpenAIImageConfig {
                api_key: String::new(),
                model: default_image_model(),
                size: default_image_size(),
                base_url: None,
            },
        );
        assert!(client.fetch("file:///etc/passwd").await.is_err());
        assert!(client.fetch("not a url").await.is_err());
    }
}
