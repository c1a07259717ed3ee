//! Client for the optional AI insight service.

use crate::CliResult;
use clap::Args;
use codepulse_core::{HealthReport, Insights, build_insight_prompt, parse_insight_response};
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const DEFAULT_AI_ENDPOINT: &str = "https://models.github.ai/inference";
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f32 = 0.3;

/// CLI arguments for AI insights.
#[derive(Args, Clone, Debug)]
pub struct InsightArgs {
    /// Ask the AI service for insights on each repository.
    #[arg(long = "ai", env = "ENABLE_AI_FEATURES")]
    pub enabled: bool,
    /// Base URL of the chat completion service.
    #[arg(long, env = "AI_ENDPOINT", default_value = DEFAULT_AI_ENDPOINT)]
    pub ai_endpoint: String,
    /// Model to request.
    #[arg(long, env = "AI_MODEL", default_value = DEFAULT_AI_MODEL)]
    pub ai_model: String,
    /// Request timeout in seconds.
    #[arg(long, env = "AI_TIMEOUT", default_value_t = 30)]
    pub ai_timeout: u64,
    /// Token used to authenticate with the service.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

/// Text completion backend.
pub(crate) trait InsightClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = CliResult<String>> + Send + 'a>>;
}

/// Chat-completions client built on reqwest.
pub(crate) struct ReqwestInsightClient {
    client: Client,
    endpoint: String,
    model: String,
    token: String,
}

impl ReqwestInsightClient {
    /// Build a client, or `None` when insights are disabled or unauthenticated.
    pub(crate) fn from_args(args: &InsightArgs) -> CliResult<Option<Self>> {
        if !args.enabled {
            return Ok(None);
        }
        let Some(token) = args.github_token.clone().filter(|token| !token.trim().is_empty())
        else {
            warn!("AI features are enabled but GITHUB_TOKEN is not set");
            return Ok(None);
        };
        let client = Client::builder()
            .user_agent("codepulse-cli")
            .timeout(Duration::from_secs(args.ai_timeout))
            .build()?;
        Ok(Some(Self {
            client,
            endpoint: args.ai_endpoint.trim_end_matches('/').to_string(),
            model: args.ai_model.clone(),
            token,
        }))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

async fn request_completion(
    client: &Client,
    endpoint: &str,
    model: &str,
    token: &str,
    prompt: &str,
) -> CliResult<String> {
    let payload = ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    };
    let response = client
        .post(format!("{endpoint}/chat/completions"))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;
    let completion = response.json::<ChatResponse>().await?;
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| "completion contained no message".into())
}

impl InsightClient for ReqwestInsightClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = CliResult<String>> + Send + 'a>> {
        Box::pin(request_completion(
            &self.client,
            &self.endpoint,
            &self.model,
            &self.token,
            prompt,
        ))
    }
}

/// Insights for a report, falling back to the static payload on any failure.
pub(crate) async fn insights_for<C: InsightClient + ?Sized>(
    client: Option<&C>,
    report: &HealthReport,
) -> Insights {
    let (Some(client), Some(coverage)) = (client, report.coverage.as_ref()) else {
        return Insights::fallback();
    };
    let prompt = build_insight_prompt(None, coverage, report.issues.as_ref());
    match client.complete(&prompt).await {
        Ok(text) => parse_insight_response(&text).unwrap_or_else(|| {
            debug!("unparseable insight response for {}", report.source);
            Insights::fallback()
        }),
        Err(err) => {
            warn!("insight request for {} failed: {err}", report.source);
            Insights::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InsightArgs, InsightClient, ReqwestInsightClient, insights_for};
    use crate::CliResult;
    use codepulse_core::{CoverageAnalysis, HealthReport};
    use std::future::Future;
    use std::path::PathBuf;
    use std::pin::Pin;
    use std::sync::Mutex;

    struct CannedClient {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl InsightClient for CannedClient {
        fn complete<'a>(
            &'a self,
            prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = CliResult<String>> + Send + 'a>> {
            self.prompts
                .lock()
                .expect("prompts lock")
                .push(prompt.to_string());
            let reply: CliResult<String> =
                self.reply.clone().ok_or_else(|| "service unreachable".into());
            Box::pin(async move { reply })
        }
    }

    fn analysed_report() -> HealthReport {
        let mut report = HealthReport::new("repo".to_string(), PathBuf::from("/tmp/repo"));
        report.coverage = Some(CoverageAnalysis::degraded("none"));
        report
    }

    fn args(enabled: bool, token: Option<&str>) -> InsightArgs {
        InsightArgs {
            enabled,
            ai_endpoint: "http://127.0.0.1:9".to_string(),
            ai_model: "test-model".to_string(),
            ai_timeout: 1,
            github_token: token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn parses_service_reply() {
        let client = CannedClient::new(Some(
            "{\"architecture_score\": 8.5, \"key_findings\": [\"modular\"]}",
        ));
        let insights = insights_for(Some(&client), &analysed_report()).await;
        assert_eq!(insights.architecture_score, 8.5);
        assert!(!insights.fallback);
        let prompts = client.prompts.lock().expect("prompts lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("architecture_score"));
    }

    #[tokio::test]
    async fn failures_fall_back() {
        let unreachable = CannedClient::new(None);
        assert!(insights_for(Some(&unreachable), &analysed_report()).await.fallback);

        let garbled = CannedClient::new(Some("I cannot help with that"));
        assert!(insights_for(Some(&garbled), &analysed_report()).await.fallback);

        let disabled: Option<&CannedClient> = None;
        assert!(insights_for(disabled, &analysed_report()).await.fallback);
    }

    #[tokio::test]
    async fn failed_reports_are_not_sent() {
        let client = CannedClient::new(Some("{\"architecture_score\": 9}"));
        let report = HealthReport::failed("repo".to_string(), PathBuf::from("/x"), "boom");
        assert!(insights_for(Some(&client), &report).await.fallback);
        assert!(client.prompts.lock().expect("prompts lock").is_empty());
    }

    #[test]
    fn client_requires_flag_and_token() {
        let built = |enabled, token| {
            ReqwestInsightClient::from_args(&args(enabled, token))
                .expect("build")
                .is_some()
        };
        assert!(!built(false, Some("t")));
        assert!(!built(true, None));
        assert!(!built(true, Some("  ")));
        assert!(built(true, Some("t")));
    }
}
