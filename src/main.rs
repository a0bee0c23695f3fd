use axum::{routing::post, Router};
use dotenv::dotenv;
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tiki_sentiment_api::{api, sentiment, summarizer, tiki};

#[derive(OpenApi)]
#[openapi(
    paths(api::analyze_tiki_product),
    components(
        schemas(
            api::AnalyzeRequest,
            api::AnalyzeResponse,
            api::AnalyzeData,
            tiki::ProductInfo
        )
    ),
    tags(
        (name = "analysis", description = "Tiki product review sentiment analysis")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    // The classifier is process-lifetime state: warm it up before serving,
    // refuse to start if the model is unreachable.
    let classifier = Arc::new(sentiment::HfClassifier::from_env()?);
    if let Err(e) = classifier.initialize().await {
        eprintln!("🔥 Classifier initialization failed: {}", e);
        std::process::exit(1);
    }

    let state = Arc::new(api::AppState {
        tiki: tiki::TikiClient::from_env(),
        classifier,
        summarizer: summarizer::Summarizer::from_env()?,
    });

    let app = Router::new()
        .merge(SwaggerUi::new("/tiki-sentiment-swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/tiki/analyze", post(api::analyze_tiki_product))
        .nest_service("/", ServeDir::new("static")) // Landing page
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    println!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
