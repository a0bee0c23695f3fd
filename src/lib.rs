//! Tiki.vn product review sentiment analysis service.
//!
//! One endpoint in, three sentiment buckets plus an AI summary out. The
//! pipeline: resolve the product identity from the URL, sample review pages
//! concurrently from the Tiki API, classify each comment with a hosted
//! sentiment model, summarize the buckets with Gemini.

pub mod api;
pub mod comments;
pub mod error;
pub mod sentiment;
pub mod summarizer;
pub mod tiki;
