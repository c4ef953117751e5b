use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::json;

use crate::config::PipelineConfig;

use super::RecognizerError;

pub struct ClassifyRequest {
    pub vendor: String,
    pub raw_description: String,
    /// `(identifier, description)` pairs for the closed category vocabulary.
    pub categories: Vec<(String, &'static str)>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyResponse {
    pub normalized_description: String,
    pub product_category: String,
    pub brand: Option<String>,
    pub confidence: f64,
    #[serde(skip)]
    pub ai_cost_usd: Decimal,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn classify_item(&self, request: ClassifyRequest) -> Result<ClassifyResponse, RecognizerError>;
}

/// Static per-1k-token pricing used to derive `ai_cost_usd` (spec §4.4 step
/// 2). Rates are illustrative placeholders for the configured model family,
/// not a live pricing feed.
pub struct PriceTable {
    input_per_1k: Decimal,
    output_per_1k: Decimal,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            input_per_1k: dec!(0.00025),
            output_per_1k: dec!(0.00125),
        }
    }
}

impl PriceTable {
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> Decimal {
        let input_cost = self.input_per_1k * Decimal::from(input_tokens) / dec!(1000);
        let output_cost = self.output_per_1k * Decimal::from(output_tokens) / dec!(1000);
        input_cost + output_cost
    }
}

/// `reqwest`-backed [`LlmClient`], mirroring the timeout-bounded client
/// construction used for AI-provider calls elsewhere in the corpus.
pub struct ReqwestLlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    prices: PriceTable,
}

impl ReqwestLlmClient {
    pub fn new(endpoint: String, api_key: String, model: String, config: &PipelineConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_call_timeout_s))
            .build()
            .expect("failed to build reqwest client for recognizer LLM calls");

        Self {
            client,
            endpoint,
            api_key,
            model,
            prices: PriceTable::default(),
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: ChatUsage,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl LlmClient for ReqwestLlmClient {
    async fn classify_item(&self, request: ClassifyRequest) -> Result<ClassifyResponse, RecognizerError> {
        let categories: HashMap<&str, &str> = request
            .categories
            .iter()
            .map(|(id, desc)| (id.as_str(), *desc))
            .collect();

        let prompt = format!(
            "Classify this receipt line item into exactly one category.\n\
             Vendor: {}\nItem: {}\nCategories: {:?}\n\
             Respond with JSON: {{\"normalized_description\": ..., \"product_category\": ..., \"brand\": ..., \"confidence\": ...}}",
            request.vendor, request.raw_description, categories
        );

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RecognizerError::Timeout(0)
                } else {
                    RecognizerError::CallFailed(e.to_string())
                }
            })?
            .error_for_status()
            .map_err(|e| RecognizerError::CallFailed(e.to_string()))?
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| RecognizerError::CallFailed(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RecognizerError::CallFailed("empty choices array".to_string()))?
            .message
            .content;

        let mut parsed: ClassifyResponse = serde_json::from_str(&content)
            .map_err(|e| RecognizerError::CallFailed(format!("invalid recognizer output: {e}")))?;

        parsed.ai_cost_usd = self
            .prices
            .cost(response.usage.prompt_tokens, response.usage.completion_tokens);

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_table_computes_blended_cost() {
        let prices = PriceTable::default();
        let cost = prices.cost(1000, 200);
        assert_eq!(cost, dec!(0.00025) + dec!(0.00125) * dec!(200) / dec!(1000));
    }
}
