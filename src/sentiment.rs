//! Sentiment classification and bucketing.
//!
//! The actual model is a pretrained text-classification model hosted on the
//! Hugging Face inference API; this module consumes it as a remote capability
//! behind the [`SentimentClassifier`] trait so tests can swap in a stub.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use axum::async_trait;
use serde::Deserialize;

use crate::error::AnalyzeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Negative,
    Positive,
    Neutral,
}

/// Comments partitioned by sentiment. Within each bucket, order follows the
/// order comments came out of the fetch pipeline.
#[derive(Debug, Default)]
pub struct BucketedComments {
    pub negative: Vec<String>,
    pub positive: Vec<String>,
    pub neutral: Vec<String>,
}

/// One sentiment inference. Implementations must be safe for concurrent
/// read-only use; expensive state (model weights, connections) is loaded
/// once at process start.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Whether `initialize` has completed successfully.
    fn ready(&self) -> bool;

    async fn classify(&self, text: &str) -> Result<SentimentLabel>;
}

/// Route each comment into its sentiment bucket.
///
/// Fails up front if the classifier is not initialized. Any single
/// classification error aborts the whole batch — unlike page fetching,
/// a classifier failure is systemic, not per-item transient.
pub async fn analyze_comments(
    classifier: &dyn SentimentClassifier,
    comments: &[String],
) -> Result<BucketedComments, AnalyzeError> {
    if !classifier.ready() {
        return Err(AnalyzeError::ClassifierUnavailable);
    }

    let mut buckets = BucketedComments::default();
    for comment in comments {
        let label = classifier
            .classify(comment)
            .await
            .map_err(|e| AnalyzeError::ClassificationFailed(e.to_string()))?;

        match label {
            SentimentLabel::Negative => buckets.negative.push(comment.clone()),
            SentimentLabel::Positive => buckets.positive.push(comment.clone()),
            SentimentLabel::Neutral => buckets.neutral.push(comment.clone()),
        }
    }

    Ok(buckets)
}

// ============================================================================
// Hugging Face Inference API backend
// ============================================================================

const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Remote classifier backed by a hosted text-classification model.
pub struct HfClassifier {
    client: reqwest::Client,
    model_url: String,
    api_token: Option<String>,
    ready: AtomicBool,
}

impl HfClassifier {
    /// Build from environment: `HUGGINGFACE_MODEL` (required) and
    /// `HUGGINGFACE_API_TOKEN` (optional).
    pub fn from_env() -> Result<Self> {
        let model = std::env::var("HUGGINGFACE_MODEL")
            .map_err(|_| anyhow::anyhow!("HUGGINGFACE_MODEL must be set"))?;
        Ok(Self::new(
            format!("{}/{}", HF_INFERENCE_BASE, model),
            std::env::var("HUGGINGFACE_API_TOKEN").ok(),
        ))
    }

    pub fn new(model_url: String, api_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model_url,
            api_token,
            ready: AtomicBool::new(false),
        }
    }

    /// Warm up the hosted model with one inference and mark the capability
    /// ready. Must succeed before the process starts serving.
    pub async fn initialize(&self) -> Result<()> {
        self.infer("sản phẩm tốt").await?;
        self.ready.store(true, Ordering::Release);
        println!("🧠 Sentiment model ready: {}", self.model_url);
        Ok(())
    }

    async fn infer(&self, text: &str) -> Result<SentimentLabel> {
        let mut request = self
            .client
            .post(&self.model_url)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        let scores: Vec<Vec<LabelScore>> = response.json().await?;

        let best = scores
            .into_iter()
            .flatten()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| anyhow::anyhow!("empty classification response"))?;

        Ok(label_from_str(&best.label))
    }
}

/// Map the model's label vocabulary onto our three classes. The pretrained
/// model orders its classes negative/positive/neutral (indices 0/1/2).
fn label_from_str(label: &str) -> SentimentLabel {
    let upper = label.to_uppercase();
    if upper.starts_with("NEG") || upper == "LABEL_0" {
        SentimentLabel::Negative
    } else if upper.starts_with("POS") || upper == "LABEL_1" {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Neutral
    }
}

#[async_trait]
impl SentimentClassifier for HfClassifier {
    fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn classify(&self, text: &str) -> Result<SentimentLabel> {
        self.infer(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubClassifier {
        ready: bool,
        labels: Vec<SentimentLabel>,
    }

    #[async_trait]
    impl SentimentClassifier for StubClassifier {
        fn ready(&self) -> bool {
            self.ready
        }

        async fn classify(&self, text: &str) -> Result<SentimentLabel> {
            if text == "boom" {
                anyhow::bail!("model exploded");
            }
            // Cycle through the scripted labels by position.
            let idx = text.len() % self.labels.len();
            Ok(self.labels[idx])
        }
    }

    #[tokio::test]
    async fn test_buckets_are_disjoint_partition() {
        let classifier = StubClassifier {
            ready: true,
            labels: vec![
                SentimentLabel::Negative,
                SentimentLabel::Positive,
                SentimentLabel::Neutral,
            ],
        };
        let comments: Vec<String> = vec!["a", "bb", "ccc", "dddd", "eeeee", "ffffff"]
            .into_iter()
            .map(String::from)
            .collect();

        let buckets = analyze_comments(&classifier, &comments).await.unwrap();
        let total = buckets.negative.len() + buckets.positive.len() + buckets.neutral.len();
        assert_eq!(total, comments.len());

        for comment in &comments {
            let hits = buckets.negative.iter().filter(|c| *c == comment).count()
                + buckets.positive.iter().filter(|c| *c == comment).count()
                + buckets.neutral.iter().filter(|c| *c == comment).count();
            assert_eq!(hits, 1, "comment {:?} should land in exactly one bucket", comment);
        }
    }

    #[tokio::test]
    async fn test_unready_classifier_is_rejected() {
        let classifier = StubClassifier {
            ready: false,
            labels: vec![SentimentLabel::Neutral],
        };
        let result = analyze_comments(&classifier, &["hello".to_string()]).await;
        assert!(matches!(result, Err(AnalyzeError::ClassifierUnavailable)));
    }

    #[tokio::test]
    async fn test_single_failure_aborts_batch() {
        let classifier = StubClassifier {
            ready: true,
            labels: vec![SentimentLabel::Positive],
        };
        let comments = vec!["fine".to_string(), "boom".to_string(), "also fine".to_string()];
        let result = analyze_comments(&classifier, &comments).await;
        assert!(matches!(result, Err(AnalyzeError::ClassificationFailed(_))));
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_buckets() {
        let classifier = StubClassifier {
            ready: true,
            labels: vec![SentimentLabel::Neutral],
        };
        let buckets = analyze_comments(&classifier, &[]).await.unwrap();
        assert!(buckets.negative.is_empty());
        assert!(buckets.positive.is_empty());
        assert!(buckets.neutral.is_empty());
    }

    #[test]
    fn test_label_vocabulary_mapping() {
        assert_eq!(label_from_str("NEGATIVE"), SentimentLabel::Negative);
        assert_eq!(label_from_str("LABEL_0"), SentimentLabel::Negative);
        assert_eq!(label_from_str("POS"), SentimentLabel::Positive);
        assert_eq!(label_from_str("LABEL_1"), SentimentLabel::Positive);
        assert_eq!(label_from_str("LABEL_2"), SentimentLabel::Neutral);
        assert_eq!(label_from_str("NEU"), SentimentLabel::Neutral);
    }
}
