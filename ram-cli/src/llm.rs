use anyhow::{Context, Result, bail};
use ram_core::{LanguageModel, ModelRequest};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::auth;
use crate::config::LlmSection;

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct HttpModel {
    config: LlmSection,
    api_key: String,
}

/// What the classifier talks to. Without a key every call fails fast and
/// the classifier falls back to its offline defaults.
#[derive(Debug, Clone)]
pub enum Backend {
    Http(HttpModel),
    Unconfigured,
}

impl Backend {
    pub fn from_config(config: &LlmSection) -> Result<Self> {
        Ok(match auth::resolve_api_key()? {
            Some(api_key) => Backend::Http(HttpModel {
                config: config.clone(),
                api_key,
            }),
            None => Backend::Unconfigured,
        })
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Backend::Http(_))
    }
}

impl LanguageModel for Backend {
    fn generate(&self, request: &ModelRequest) -> Result<String> {
        match self {
            Backend::Http(m) => m.generate(request),
            Backend::Unconfigured => {
                bail!("no API key configured; run: ram auth paste-api-key (or set {})", auth::API_KEY_ENV)
            }
        }
    }
}

impl LanguageModel for HttpModel {
    fn generate(&self, request: &ModelRequest) -> Result<String> {
        // The CLI runs under #[tokio::main]; a nested block_on would panic.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(self.complete(request)))
        } else {
            let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
            rt.block_on(self.complete(request))
        }
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    t: &'static str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: Option<String>,
}

fn build_request<'a>(config: &'a LlmSection, request: &'a ModelRequest) -> Req<'a> {
    let mut messages = Vec::new();
    if let Some(system) = &request.system {
        messages.push(Msg {
            role: "system",
            content: system,
        });
    }
    messages.push(Msg {
        role: "user",
        content: &request.prompt,
    });

    Req {
        model: &config.model,
        messages,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        response_format: request.json.then_some(ResponseFormat { t: "json_object" }),
    }
}

fn endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

impl HttpModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String> {
        let body = build_request(&self.config, request);
        let url = endpoint(&self.config.base_url);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .context("build http client")?;

        debug!(%url, model = %self.config.model, json = request.json, "model request");
        let resp = client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("model request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("model endpoint error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse model response")?;
        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_chat_completions_shape() {
        let cfg = LlmSection::default();
        let req = ModelRequest {
            system: Some("sys".into()),
            prompt: "hello".into(),
            json: true,
        };
        let v = serde_json::to_value(build_request(&cfg, &req)).unwrap();
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "hello");
        assert_eq!(v["response_format"]["type"], "json_object");

        let plain = ModelRequest {
            system: None,
            prompt: "p".into(),
            json: false,
        };
        let v = serde_json::to_value(build_request(&cfg, &plain)).unwrap();
        assert_eq!(v["messages"].as_array().unwrap().len(), 1);
        assert!(v.get("response_format").is_none());
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        assert_eq!(endpoint("http://localhost:11434/v1/"), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn unconfigured_backend_errors() {
        let req = ModelRequest {
            system: None,
            prompt: "p".into(),
            json: false,
        };
        assert!(Backend::Unconfigured.generate(&req).is_err());
    }
}
