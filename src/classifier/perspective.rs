// Google Perspective API classifier.
//
// Perspective scores text for toxicity, insults, profanity, etc. It's free
// to use but rate-limited to ~1 QPS, so outbound calls go through a
// RateLimiter shared by every request.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{Classifier, LabelScores};
use crate::output::truncate_chars;

const ANALYZE_URL: &str = "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Perspective attribute names and the model label each one reports as.
/// PROFANITY is Perspective's closest match to "obscene".
const ATTRIBUTE_LABELS: [(&str, &str); 6] = [
    ("TOXICITY", "toxicity"),
    ("SEVERE_TOXICITY", "severe_toxicity"),
    ("IDENTITY_ATTACK", "identity_attack"),
    ("INSULT", "insult"),
    ("PROFANITY", "obscene"),
    ("THREAT", "threat"),
];

/// Perspective API classifier.
pub struct PerspectiveClassifier {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl PerspectiveClassifier {
    /// Create a new Perspective API classifier with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            // Perspective free tier: 1 query per second
            rate_limiter: RateLimiter::new(1.0),
        }
    }
}

#[async_trait]
impl Classifier for PerspectiveClassifier {
    async fn classify(&self, text: &str) -> Result<LabelScores> {
        self.rate_limiter.acquire().await;

        let request = PerspectiveRequest {
            comment: Comment {
                text: text.to_string(),
            },
            requested_attributes: ATTRIBUTE_LABELS
                .iter()
                .map(|&(attribute, _)| (attribute, AttributeConfig {}))
                .collect(),
            languages: vec!["en".to_string()],
        };

        let response = self
            .client
            .post(ANALYZE_URL)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .context("Failed to call Perspective API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Perspective API returned {}: {}", status, body);
        }

        let result: PerspectiveResponse = response
            .json()
            .await
            .context("Failed to parse Perspective API response")?;

        let scores = map_attribute_scores(&result)?;

        debug!(
            toxicity = ?scores.get("toxicity"),
            obscene = ?scores.get("obscene"),
            insult = ?scores.get("insult"),
            text_preview = %truncate_chars(text, 50),
            "Perspective classified text"
        );

        Ok(scores)
    }

    fn name(&self) -> &'static str {
        "perspective"
    }
}

/// Translate Perspective's attribute scores into model label names.
/// Attributes the API didn't return are left out, not zero-filled.
fn map_attribute_scores(response: &PerspectiveResponse) -> Result<LabelScores> {
    LabelScores::from_pairs(ATTRIBUTE_LABELS.iter().filter_map(|&(attribute, label)| {
        response
            .attribute_scores
            .get(attribute)
            .map(|score| (label, score.summary_score.value))
    }))
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest {
    comment: Comment,
    requested_attributes: HashMap<&'static str, AttributeConfig>,
    languages: Vec<String>,
}

#[derive(Serialize)]
struct Comment {
    text: String,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    attribute_scores: HashMap<String, AttributeScore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Deserialize)]
struct SummaryScore {
    value: f64,
}
