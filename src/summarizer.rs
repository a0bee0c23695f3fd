//! Comment summarization via the Gemini API.

use pulldown_cmark::{html, Parser};
use serde_json::{json, Value};

use crate::error::AnalyzeError;
use crate::sentiment::BucketedComments;

const GEMINI_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Gemini summarizer. The prompt and response handling follow the product
/// audience: Vietnamese reviews in, a ~100-word Vietnamese summary out,
/// rendered to HTML for the landing page.
#[derive(Debug, Clone)]
pub struct Summarizer {
    client: reqwest::Client,
    endpoint: String,
}

impl Summarizer {
    pub fn new(endpoint: impl Into<String>, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}?key={}", endpoint.into(), api_key),
        }
    }

    /// Endpoint from `GEMINI_API_URL` (optional, for tests) and key from
    /// `GEMINI_API`.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API")
            .map_err(|_| anyhow::anyhow!("GEMINI_API must be set"))?;
        let endpoint =
            std::env::var("GEMINI_API_URL").unwrap_or_else(|_| GEMINI_BASE_URL.to_string());
        Ok(Self::new(endpoint, &api_key))
    }

    /// Summarize the bucketed comments into an HTML fragment.
    pub async fn summarize_comments(&self, buckets: &BucketedComments) -> Result<String, AnalyzeError> {
        let payload = json!({
            "contents": [
                { "parts": [ { "text": build_prompt(buckets) } ] }
            ]
        });

        let response = self.client.post(&self.endpoint).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(AnalyzeError::UpstreamUnavailable(format!(
                "Gemini API returned status {}",
                response.status()
            )));
        }

        let data: Value = response.json().await?;
        let markdown = data
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or(AnalyzeError::InvalidSummaryResponse)?;

        Ok(markdown_to_html(markdown))
    }
}

fn build_prompt(buckets: &BucketedComments) -> String {
    format!(
        "Hãy tóm tắt các ý chính về sản phẩm dựa trên các bình luận sau đây, dài khoảng 100 từ.\n\n\
         Bình luận tiêu cực:\n{}\n\n\
         Bình luận tích cực:\n{}\n\n\
         Bình luận trung lập:\n{}",
        join_or_placeholder(&buckets.negative, "Không có bình luận tiêu cực."),
        join_or_placeholder(&buckets.positive, "Không có bình luận tích cực."),
        join_or_placeholder(&buckets.neutral, "Không có bình luận trung lập."),
    )
}

fn join_or_placeholder(comments: &[String], placeholder: &str) -> String {
    if comments.is_empty() {
        placeholder.to_string()
    } else {
        comments.join("\n")
    }
}

fn markdown_to_html(markdown: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new(markdown));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_uses_placeholder_for_empty_bucket() {
        let buckets = BucketedComments {
            negative: vec![],
            positive: vec!["Hàng đẹp".to_string(), "Giao nhanh".to_string()],
            neutral: vec![],
        };
        let prompt = build_prompt(&buckets);
        assert!(prompt.contains("Không có bình luận tiêu cực."));
        assert!(prompt.contains("Hàng đẹp\nGiao nhanh"));
        assert!(prompt.contains("Không có bình luận trung lập."));
    }

    #[test]
    fn test_markdown_renders_to_html() {
        let html = markdown_to_html("**Tốt**: giao hàng nhanh");
        assert!(html.contains("<strong>Tốt</strong>"));
    }
}
