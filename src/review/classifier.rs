/// Review classifier backed by an external chat-completion API
use crate::{
    catalog::Ranking,
    config::ClassifierConfig,
    db,
    error::{ApiError, ApiResult},
    review::{Classification, SENTINEL_RANKING_VALUE},
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::time::Duration;

/// Maps free-text admin reviews onto the ranking scale
pub struct ReviewClassifier {
    db: SqlitePool,
    http: HttpClient,
    config: ClassifierConfig,
    query_timeout: Duration,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl ReviewClassifier {
    pub fn new(
        db: SqlitePool,
        config: ClassifierConfig,
        query_timeout: Duration,
    ) -> ApiResult<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            db,
            http,
            config,
            query_timeout,
        })
    }

    /// Classify a review against the stored ranking scale.
    ///
    /// Builds a prompt listing every non-sentinel label, sends it with
    /// the review to the completion API, and matches the reply back to
    /// the scale.
    pub async fn classify(&self, review: &str) -> ApiResult<Classification> {
        let rankings = self.load_rankings().await?;
        let prompt = build_prompt(&self.config.prompt_template, &rankings, review);

        let completion = self.complete(&prompt).await?;
        let classification = match_label(&rankings, &completion);

        if classification.value == 0 {
            tracing::warn!(completion = %completion, "completion did not match any ranking label");
        }

        Ok(classification)
    }

    /// The full ranking scale, sentinel row included
    pub async fn load_rankings(&self) -> ApiResult<Vec<Ranking>> {
        let rows = db::with_timeout(
            self.query_timeout,
            sqlx::query("SELECT ranking_name, ranking_value FROM rankings").fetch_all(&self.db),
        )
        .await?;

        Ok(rows
            .iter()
            .map(|row| Ranking {
                ranking_name: row.get("ranking_name"),
                ranking_value: row.get("ranking_value"),
            })
            .collect())
    }

    async fn complete(&self, prompt: &str) -> ApiResult<String> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Classifier(format!("completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Classifier(format!(
                "completion API returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Classifier(format!("unreadable completion response: {}", e)))?;

        Ok(parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default())
    }
}

/// Substitute the comma-joined non-sentinel labels into the template and
/// append the review text.
fn build_prompt(template: &str, rankings: &[Ranking], review: &str) -> String {
    let labels = rankings
        .iter()
        .filter(|r| r.ranking_value != SENTINEL_RANKING_VALUE)
        .map(|r| r.ranking_name.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let mut prompt = template.replacen("{rankings}", &labels, 1);
    prompt.push_str(review);
    prompt
}

/// Exact-match the completion text against the scale; anything else
/// degrades to rank 0 with the raw text as label.
fn match_label(rankings: &[Ranking], completion: &str) -> Classification {
    for ranking in rankings {
        if ranking.ranking_name == completion {
            return Classification {
                label: ranking.ranking_name.clone(),
                value: ranking.ranking_value,
            };
        }
    }

    Classification {
        label: completion.to_string(),
        value: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> Vec<Ranking> {
        vec![
            Ranking {
                ranking_name: "Positive".to_string(),
                ranking_value: 1,
            },
            Ranking {
                ranking_name: "Negative".to_string(),
                ranking_value: 2,
            },
            Ranking {
                ranking_name: "Neutral".to_string(),
                ranking_value: 3,
            },
            Ranking {
                ranking_name: "Unrated".to_string(),
                ranking_value: SENTINEL_RANKING_VALUE,
            },
        ]
    }

    #[test]
    fn prompt_excludes_sentinel_label() {
        let prompt = build_prompt(
            "Pick one of: {rankings}. Review: ",
            &scale(),
            "loved every minute",
        );

        assert_eq!(
            prompt,
            "Pick one of: Positive,Negative,Neutral. Review: loved every minute"
        );
        assert!(!prompt.contains("Unrated"));
    }

    #[test]
    fn exact_match_returns_scale_value() {
        let classification = match_label(&scale(), "Positive");
        assert_eq!(
            classification,
            Classification {
                label: "Positive".to_string(),
                value: 1
            }
        );
    }

    #[test]
    fn unmatched_completion_degrades_to_zero() {
        let classification = match_label(&scale(), "Mostly positive, I think");
        assert_eq!(classification.value, 0);
        assert_eq!(classification.label, "Mostly positive, I think");

        // Matching is case-sensitive by construction
        let classification = match_label(&scale(), "positive");
        assert_eq!(classification.value, 0);
    }

    #[tokio::test]
    async fn rankings_load_from_seeded_scale() {
        let classifier = ReviewClassifier::new(
            db::test_pool().await,
            ClassifierConfig {
                api_key: "test-key".to_string(),
                api_base: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                prompt_template: "{rankings}: ".to_string(),
            },
            Duration::from_secs(5),
        )
        .expect("classifier");

        let rankings = classifier.load_rankings().await.expect("rankings");
        assert_eq!(rankings.len(), 4);
        assert!(rankings
            .iter()
            .any(|r| r.ranking_value == SENTINEL_RANKING_VALUE));
    }
}
