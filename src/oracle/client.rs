//! Claude API HTTP Client
//!
//! Backs the naming, discovery and analysis oracles with the Anthropic
//! Messages API. Each call is a single short completion; retries are left to
//! the fallback path.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::response::{parse_analysis, parse_body_profile, parse_constellation_name};
use super::{DiscoveryOracle, NamingOracle, OracleError};
use crate::config::OracleConfig;
use crate::sky::body::{BodyProfile, CelestialBody};
use crate::util::vec2::Vec2;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 512;

const SYSTEM_PROMPT: &str = r#"You are the cataloguing voice of a small observatory in an idle astronomy game.
You invent evocative but plausible names and short descriptions for celestial objects.
Keep every text under 60 words. Never use real catalogue designations.
Respond with valid JSON only, exactly in the shape requested."#;

/// Claude API client implementing every oracle
pub struct ClaudeOracle {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeOracle {
    /// Create a new Claude API client
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(config.api_key.clone().unwrap_or_default(), config.model.clone())
    }

    /// Send one user message and return the first text block
    async fn complete(&self, user_message: String) -> Result<String, OracleError> {
        if self.api_key.is_empty() {
            return Err(OracleError::NotConfigured);
        }

        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message,
            }],
        };

        debug!("Sending oracle request to Claude API");

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OracleError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Claude API error: {} - {}", status, body);
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Parse(e.to_string()))?;

        claude_response
            .content
            .into_iter()
            .find_map(|c| match c {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| OracleError::Parse("No text content in response".to_string()))
    }
}

impl NamingOracle for ClaudeOracle {
    async fn constellation_name(&self, cluster_size: usize) -> Result<String, OracleError> {
        let prompt = format!(
            "A new constellation of {} stars has just been charted. \
             Name it. Respond as {{\"name\": \"...\"}}.",
            cluster_size
        );
        let text = self.complete(prompt).await?;
        parse_constellation_name(&text)
    }
}

impl DiscoveryOracle for ClaudeOracle {
    async fn describe_body(
        &self,
        position: Vec2,
        existing_count: usize,
    ) -> Result<BodyProfile, OracleError> {
        let prompt = format!(
            "The observatory has catalogued {} objects. A new one appears at map \
             coordinates ({:.0}, {:.0}) on a 1000x1000 chart. Describe it. \
             Respond as {{\"name\": string, \"kind\": one of \"star\", \"nebula\", \
             \"black_hole\", \"galaxy\", \"anomaly\", \"description\": string, \
             \"distance_ly\": number, \"color\": \"#rrggbb\", \
             \"temperature_k\": number or null, \"spectral_class\": string or null}}.",
            existing_count, position.x, position.y
        );
        let text = self.complete(prompt).await?;
        parse_body_profile(&text)
    }

    async fn analyze_body(&self, body: &CelestialBody) -> Result<String, OracleError> {
        let prompt = format!(
            "Write a short follow-up analysis of {} ({}, {:.0} light years away). \
             Current notes: {}. Respond as {{\"analysis\": \"...\"}}.",
            body.name, body.kind, body.distance_ly, body.description
        );
        let text = self.complete(prompt).await?;
        parse_analysis(&text)
    }
}

// Claude API request/response types

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}
