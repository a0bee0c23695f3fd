//! Error taxonomy for the analysis pipeline.

use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can go wrong between receiving a product URL and
/// returning sentiment buckets.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The product URL lacks an extractable product_id or spid.
    #[error("invalid product URL: {0}")]
    MalformedUrl(String),

    /// A Tiki or Gemini call failed (network error or non-success status).
    #[error("upstream request failed: {0}")]
    UpstreamUnavailable(String),

    /// The product response carried no usable `current_seller.id`.
    #[error("no seller information found for the product")]
    SellerNotFound,

    /// The reviews response reported fewer than one page.
    #[error("invalid paging data from reviews API")]
    InvalidPaging,

    /// A raw review record was not a JSON object.
    #[error("expected a JSON object for comment, got: {0}")]
    InvalidCommentShape(String),

    /// The classifier was asked to work before initialization finished.
    #[error("sentiment classifier is not initialized")]
    ClassifierUnavailable,

    /// A single classification error aborts the whole batch.
    #[error("error analyzing comments: {0}")]
    ClassificationFailed(String),

    /// The Gemini response did not contain the expected candidate text.
    #[error("invalid response from Gemini API")]
    InvalidSummaryResponse,
}

impl AnalyzeError {
    /// HTTP status the request handler maps this error to. Client input
    /// problems are 400, everything else is an upstream/server fault.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalyzeError::MalformedUrl(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for AnalyzeError {
    fn from(e: reqwest::Error) -> Self {
        AnalyzeError::UpstreamUnavailable(e.to_string())
    }
}
