//! OpenAI-compatible chat adjudicator (Groq by default)

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::clients::traits::{AdjudicationRequest, Adjudicator, RawJudgement};
use crate::config::Config;
use crate::error::{Result, VeracityError};
use crate::models::VerdictResult;

const JUDGE_PROMPT: &str = "You are a fact-checking adjudicator. Weigh the research, \
source credibility and validation results for the claim. Reply with JSON only: \
{\"verdict\": one of \"True\", \"False\", \"Partially True\", \"Insufficient Evidence\", \
\"confidence\": a number between 0 and 1}.";

const NARRATE_PROMPT: &str = "You are a fact-checking summary writer. Given the claim, the \
evidence and the decided verdict, write a short objective paragraph explaining the verdict. \
Cite sources by URL. Do not change the verdict.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Pull the JSON object out of a model reply, tolerating code fences and prose.
pub fn parse_judgement(reply: &str) -> Result<RawJudgement> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let body = match (start, end) {
        (Some(s), Some(e)) if e > s => &reply[s..=e],
        _ => {
            return Err(VeracityError::collaborator(
                "adjudicator",
                format!("reply is not JSON: {}", reply.trim()),
            ));
        }
    };
    let judgement: RawJudgement = serde_json::from_str(body)?;
    Ok(judgement)
}

pub struct ChatAdjudicator {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    attempts: u32,
}

impl ChatAdjudicator {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let api_key = config
            .runtime
            .adjudicator_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("Adjudicator API key is not set")?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.runtime.request_timeout_ms))
            .build()
            .context("Failed to build reqwest client for adjudicator")?;
        info!(
            "Adjudicator enabled: model={}, endpoint={}",
            config.runtime.adjudicator_model, config.runtime.adjudicator_url
        );
        Ok(Self {
            http,
            api_key,
            endpoint: config.runtime.adjudicator_url.clone(),
            model: config.runtime.adjudicator_model.clone(),
            attempts: config.runtime.adjudicator_retries.clamp(1, 5),
        })
    }

    async fn complete(&self, system: &str, user: String) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        // Retry with simple exponential backoff
        let mut last_err: Option<anyhow::Error> = None;
        for i in 0..self.attempts {
            let send_res = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .context("Failed to send request to adjudicator");
            let response = match send_res {
                Ok(resp) => resp,
                Err(e) => {
                    last_err = Some(e);
                    let delay_ms = 200u64 * (1u64 << i);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                last_err = Some(anyhow::anyhow!(
                    "Adjudicator API error {}: {}",
                    status,
                    error_text
                ));
                let delay_ms = 200u64 * (1u64 << i);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                continue;
            }

            let parse_res: anyhow::Result<ChatResponse> = response
                .json()
                .await
                .context("Failed to parse adjudicator response");
            match parse_res {
                Ok(result) => {
                    let content = result
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .context("No choices returned from adjudicator")?;
                    return Ok(content);
                }
                Err(e) => {
                    last_err = Some(e);
                    let delay_ms = 200u64 * (1u64 << i);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }

        let err = last_err.unwrap_or_else(|| anyhow::anyhow!("Unknown adjudicator error"));
        Err(VeracityError::collaborator("adjudicator", format!("{err:#}")))
    }

    /// Prompt context: the request as JSON, minus the scraped page markup.
    fn context_of(request: &AdjudicationRequest<'_>) -> Result<String> {
        let mut context = serde_json::to_value(request)?;
        if let Some(page) = context
            .pointer_mut("/research/source_content")
            .and_then(Value::as_object_mut)
        {
            page.remove("html");
        }
        Ok(serde_json::to_string_pretty(&context)?)
    }
}

#[async_trait]
impl Adjudicator for ChatAdjudicator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn judge(&self, request: &AdjudicationRequest<'_>) -> Result<RawJudgement> {
        let reply = self.complete(JUDGE_PROMPT, Self::context_of(request)?).await?;
        debug!("adjudicator reply: {}", reply);
        parse_judgement(&reply)
    }

    async fn narrate(
        &self,
        request: &AdjudicationRequest<'_>,
        verdict: &VerdictResult,
    ) -> Result<String> {
        let user = format!(
            "Verdict: {} (confidence {:.2})\n{}",
            verdict.verdict,
            verdict.confidence,
            Self::context_of(request)?
        );
        self.complete(NARRATE_PROMPT, user).await
    }
}
