//! Tiki.vn API client: product identity resolution, product info, and
//! concurrent randomized review fetching.

use futures::future::join_all;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;
use utoipa::ToSchema;

use crate::comments::parse_comment;
use crate::error::AnalyzeError;

const DEFAULT_BASE_URL: &str = "https://tiki.vn/api/v2";

/// Pages sampled per product, capped regardless of how many exist.
const MAX_SAMPLED_PAGES: i64 = 100;

/// Reviews requested per page.
const REVIEWS_PER_PAGE: u32 = 5;

// Tiki rejects plain library user agents, so every call impersonates a
// desktop Chrome client.
static DEFAULT_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static(r#""Windows""#));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    headers.insert(
        "user-agent",
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        ),
    );
    headers
});

/// Identifiers resolved from a product URL. Immutable once built; all three
/// fields are non-empty or resolution has already failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIdentity {
    pub product_id: String,
    pub variant_id: String,
    pub seller_id: String,
}

/// Product details shown alongside the sentiment buckets.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductInfo {
    pub name: String,
    pub price: i64,
    pub sold: i64,
    pub categories: String,
    pub description: String,
    pub images: Vec<String>,
    pub rating: f64,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    current_seller: Option<CurrentSeller>,
    name: Option<String>,
    price: Option<i64>,
    all_time_quantity_sold: Option<i64>,
    categories: Option<Categories>,
    description: Option<String>,
    images: Option<Vec<ProductImage>>,
    rating_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CurrentSeller {
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Categories {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductImage {
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewsResponse {
    #[serde(default)]
    paging: Paging,
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default = "default_last_page")]
    last_page: i64,
}

impl Default for Paging {
    fn default() -> Self {
        Paging { last_page: default_last_page() }
    }
}

fn default_last_page() -> i64 {
    1
}

/// Pull `product_id` and `spid` (variant id) out of a product URL.
///
/// The product id is the final path segment's substring after the last `-`
/// and before the first `.`, minus its leading marker character, e.g.
/// `/san-pham-p123456.html` -> `123456`. Pure: no network I/O, so a
/// malformed URL is rejected before any upstream call happens.
pub fn extract_url_ids(product_url: &str) -> Result<(String, String), AnalyzeError> {
    let parsed = Url::parse(product_url)
        .map_err(|_| AnalyzeError::MalformedUrl(format!("unparseable URL: {}", product_url)))?;

    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("");
    let tail = segment
        .rsplit_once('-')
        .map(|(_, tail)| tail)
        .ok_or_else(|| {
            AnalyzeError::MalformedUrl("product path has no '-'-separated segment".to_string())
        })?;
    let stem = tail.split('.').next().unwrap_or("");
    let product_id: String = stem.chars().skip(1).collect();

    let variant_id = parsed
        .query_pairs()
        .find(|(key, _)| key == "spid")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    if product_id.is_empty() || variant_id.is_empty() {
        return Err(AnalyzeError::MalformedUrl(
            "missing product_id or spid".to_string(),
        ));
    }

    Ok((product_id, variant_id))
}

/// Thin client over the Tiki JSON API. One instance per process; its
/// reqwest client is the shared connection pool for all page fetches.
#[derive(Debug, Clone)]
pub struct TikiClient {
    client: reqwest::Client,
    base_url: String,
}

impl TikiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Base URL from `TIKI_BASE_URL`, falling back to the live API.
    pub fn from_env() -> Self {
        Self::new(std::env::var("TIKI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()))
    }

    fn product_params(variant_id: &str) -> Vec<(&'static str, String)> {
        vec![
            ("platform", "web".to_string()),
            ("version", "3".to_string()),
            ("spid", variant_id.to_string()),
        ]
    }

    fn review_params(identity: &ProductIdentity, page: Option<i64>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", REVIEWS_PER_PAGE.to_string()),
            ("include", "comments,contribute_info,attribute_vote_summary".to_string()),
            ("sort", "score|desc,id|desc,stars|all".to_string()),
            ("spid", identity.variant_id.clone()),
            ("product_id", identity.product_id.clone()),
            ("seller_id", identity.seller_id.clone()),
        ];
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        params
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, AnalyzeError> {
        let response = self
            .client
            .get(url)
            .headers(DEFAULT_HEADERS.clone())
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnalyzeError::UpstreamUnavailable(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Resolve a product URL into `(product_id, variant_id, seller_id)`.
    ///
    /// One lookup call, no retries — a failed lookup fails the resolution.
    pub async fn product_identity(&self, product_url: &str) -> Result<ProductIdentity, AnalyzeError> {
        let (product_id, variant_id) = extract_url_ids(product_url)?;

        let url = format!("{}/products/{}", self.base_url, product_id);
        let data: ProductResponse = self.get_json(&url, &Self::product_params(&variant_id)).await?;

        let seller_id = data
            .current_seller
            .and_then(|seller| seller.id)
            .and_then(seller_id_string)
            .ok_or(AnalyzeError::SellerNotFound)?;

        Ok(ProductIdentity {
            product_id,
            variant_id,
            seller_id,
        })
    }

    /// Fetch the product details shown next to the analysis result.
    pub async fn product_info(&self, identity: &ProductIdentity) -> Result<ProductInfo, AnalyzeError> {
        let url = format!("{}/products/{}", self.base_url, identity.product_id);
        let data: ProductResponse = self
            .get_json(&url, &Self::product_params(&identity.variant_id))
            .await?;

        Ok(ProductInfo {
            name: data.name.unwrap_or_default(),
            price: data.price.unwrap_or(0),
            sold: data.all_time_quantity_sold.unwrap_or(0),
            categories: data.categories.and_then(|c| c.name).unwrap_or_default(),
            description: data.description.unwrap_or_default(),
            images: data
                .images
                .unwrap_or_default()
                .into_iter()
                .filter_map(|img| img.base_url)
                .collect(),
            rating: data.rating_average.unwrap_or(0.0),
        })
    }

    /// Fetch a random sample of review pages concurrently and return the
    /// cleaned comment texts.
    ///
    /// The first (unsampled) fetch is fail-fast: it establishes how many
    /// pages exist. Every sampled page after that is best effort — a failed
    /// page is logged and skipped, partial data beats no data.
    pub async fn fetch_comments(&self, identity: &ProductIdentity) -> Result<Vec<String>, AnalyzeError> {
        let url = format!("{}/reviews", self.base_url);

        let first: ReviewsResponse = self
            .get_json(&url, &Self::review_params(identity, None))
            .await?;
        let total_pages = first.paging.last_page;
        if total_pages < 1 {
            return Err(AnalyzeError::InvalidPaging);
        }

        let pages = sample_pages(total_pages);
        println!(
            "📄 [Tiki] {} review pages reported, sampling {}",
            total_pages,
            pages.len()
        );

        let fetches = pages.iter().map(|&page| {
            let url = url.clone();
            let params = Self::review_params(identity, Some(page));
            async move {
                let result = self.get_json::<ReviewsResponse>(&url, &params).await;
                (page, result)
            }
        });
        let responses = join_all(fetches).await;

        let mut comments = Vec::new();
        for (page, result) in responses {
            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!("⚠️ [Tiki] Skipping review page {}: {}", page, e);
                    continue;
                }
            };
            for record in &response.data {
                if raw_content_len(record) > 10 {
                    comments.push(parse_comment(record)?);
                }
            }
        }

        Ok(comments)
    }
}

/// Distinct page numbers drawn uniformly without replacement from
/// `[1, total_pages]`, at most [`MAX_SAMPLED_PAGES`] of them.
fn sample_pages(total_pages: i64) -> Vec<i64> {
    let amount = total_pages.min(MAX_SAMPLED_PAGES) as usize;
    rand::seq::index::sample(&mut rand::thread_rng(), total_pages as usize, amount)
        .into_iter()
        .map(|i| i as i64 + 1)
        .collect()
}

/// Character length of the raw `content` field, before any cleanup.
/// The length filter applies to the raw text, not the normalized text.
fn raw_content_len(record: &Value) -> usize {
    record
        .get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.chars().count())
        .unwrap_or(0)
}

fn seller_id_string(id: Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_extract_ids_from_valid_url() {
        let (product_id, variant_id) =
            extract_url_ids("https://tiki.vn/san-pham-p123456.html?spid=789").unwrap();
        assert_eq!(product_id, "123456");
        assert_eq!(variant_id, "789");
    }

    #[test]
    fn test_extract_ids_ignores_other_query_params() {
        let (product_id, variant_id) = extract_url_ids(
            "https://tiki.vn/dien-thoai-abc-p98765.html?utm_source=x&spid=42&ref=home",
        )
        .unwrap();
        assert_eq!(product_id, "98765");
        assert_eq!(variant_id, "42");
    }

    #[test]
    fn test_missing_spid_is_malformed() {
        let result = extract_url_ids("https://tiki.vn/san-pham-p123456.html");
        assert!(matches!(result, Err(AnalyzeError::MalformedUrl(_))));
    }

    #[test]
    fn test_path_without_dash_segment_is_malformed() {
        let result = extract_url_ids("https://tiki.vn/product.html?spid=789");
        assert!(matches!(result, Err(AnalyzeError::MalformedUrl(_))));
    }

    #[test]
    fn test_empty_product_id_is_malformed() {
        // Segment ends with "-p": nothing left after dropping the marker char.
        let result = extract_url_ids("https://tiki.vn/san-pham-p.html?spid=789");
        assert!(matches!(result, Err(AnalyzeError::MalformedUrl(_))));
    }

    #[test]
    fn test_sampled_pages_are_distinct_and_in_range() {
        for total in [1i64, 5, 100, 250] {
            let pages = sample_pages(total);
            assert_eq!(pages.len(), total.min(100) as usize);

            let unique: HashSet<i64> = pages.iter().copied().collect();
            assert_eq!(unique.len(), pages.len(), "pages must be distinct");
            assert!(pages.iter().all(|&p| p >= 1 && p <= total));
        }
    }

    #[test]
    fn test_raw_content_length_counts_chars() {
        assert_eq!(raw_content_len(&json!({"content": "hàng tốt"})), 8);
        assert_eq!(raw_content_len(&json!({"content": ""})), 0);
        assert_eq!(raw_content_len(&json!({"rating": 5})), 0);
    }

    #[test]
    fn test_seller_id_accepts_number_or_string() {
        assert_eq!(seller_id_string(json!(555)), Some("555".to_string()));
        assert_eq!(seller_id_string(json!("555")), Some("555".to_string()));
        assert_eq!(seller_id_string(json!("")), None);
        assert_eq!(seller_id_string(json!(null)), None);
    }

    #[test]
    fn test_review_params_shape() {
        let identity = ProductIdentity {
            product_id: "123456".to_string(),
            variant_id: "789".to_string(),
            seller_id: "555".to_string(),
        };

        let params = TikiClient::review_params(&identity, None);
        assert!(!params.iter().any(|(k, _)| *k == "page"));
        assert!(params.contains(&("limit", "5".to_string())));
        assert!(params.contains(&("sort", "score|desc,id|desc,stars|all".to_string())));

        let params = TikiClient::review_params(&identity, Some(7));
        assert!(params.contains(&("page", "7".to_string())));
    }
}
