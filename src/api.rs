//! HTTP surface: the analyze endpoint and its request/response envelopes.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AnalyzeError;
use crate::sentiment::{self, SentimentClassifier};
use crate::summarizer::Summarizer;
use crate::tiki::{ProductInfo, TikiClient};

pub struct AppState {
    pub tiki: TikiClient,
    pub classifier: Arc<dyn SentimentClassifier>,
    pub summarizer: Summarizer,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Product page URL, e.g. https://tiki.vn/san-pham-p123456.html?spid=789
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub status: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalyzeData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeData {
    pub negative_comments: Vec<String>,
    pub positive_comments: Vec<String>,
    pub neutral_comments: Vec<String>,
    pub information: ProductInfo,
    pub summary: String,
}

/// Analyze a Tiki product: resolve its identity, sample its reviews,
/// bucket them by sentiment, and summarize.
#[utoipa::path(
    post,
    path = "/api/tiki/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis complete", body = AnalyzeResponse),
        (status = 400, description = "Invalid product URL", body = AnalyzeResponse),
        (status = 500, description = "Upstream or classifier failure", body = AnalyzeResponse),
    ),
    tag = "analysis"
)]
pub async fn analyze_tiki_product(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> (StatusCode, Json<AnalyzeResponse>) {
    match run_analysis(&state, &request.url).await {
        Ok(data) => (
            StatusCode::OK,
            Json(AnalyzeResponse {
                status: "success".to_string(),
                status_code: StatusCode::OK.as_u16(),
                data: Some(data),
                message: None,
            }),
        ),
        Err(e) => {
            eprintln!("❌ [Analyze] {}", e);
            let code = e.status_code();
            (
                code,
                Json(AnalyzeResponse {
                    status: "fail".to_string(),
                    status_code: code.as_u16(),
                    data: None,
                    message: Some(e.to_string()),
                }),
            )
        }
    }
}

async fn run_analysis(state: &AppState, product_url: &str) -> Result<AnalyzeData, AnalyzeError> {
    if !product_url.starts_with("https://tiki.vn/") {
        return Err(AnalyzeError::MalformedUrl(
            "not a Tiki product URL".to_string(),
        ));
    }

    let identity = state.tiki.product_identity(product_url).await?;
    println!(
        "🔎 [Analyze] product_id={} variant_id={} seller_id={}",
        identity.product_id, identity.variant_id, identity.seller_id
    );

    let information = state.tiki.product_info(&identity).await?;
    let comments = state.tiki.fetch_comments(&identity).await?;
    println!("💬 [Analyze] {} comments collected", comments.len());

    let buckets = sentiment::analyze_comments(state.classifier.as_ref(), &comments).await?;
    let summary = state.summarizer.summarize_comments(&buckets).await?;

    Ok(AnalyzeData {
        negative_comments: buckets.negative,
        positive_comments: buckets.positive,
        neutral_comments: buckets.neutral,
        information,
        summary,
    })
}
