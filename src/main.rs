use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use voiceline::config::{AppConfig, BusinessProfile};
use voiceline::handlers;
use voiceline::services::ai::ollama::OllamaProvider;
use voiceline::services::ai::openai::OpenAiProvider;
use voiceline::services::ai::LlmProvider;
use voiceline::services::calendar::HttpCalendarProvider;
use voiceline::services::synthesis::ElevenLabsProvider;
use voiceline::services::transcode::FfmpegTranscoder;
use voiceline::services::transcription::WhisperHttpProvider;
use voiceline::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    let business = BusinessProfile::from_file(&config.business_info_path)?;
    tracing::info!(
        business = %business.name,
        staff = ?business.staff,
        "loaded business profile"
    );

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {})", config.ollama_url);
            Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                "llama3.2".to_string(),
            ))
        }
        _ => {
            anyhow::ensure!(
                !config.openai_api_key.is_empty(),
                "OPENAI_API_KEY must be set when LLM_PROVIDER=openai"
            );
            tracing::info!("using OpenAI LLM provider (model: {})", config.openai_model);
            Box::new(OpenAiProvider::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
            ))
        }
    };

    let state = Arc::new(AppState {
        business,
        llm,
        transcriber: Box::new(WhisperHttpProvider::new(config.whisper_url.clone())),
        synthesizer: Box::new(ElevenLabsProvider::new(
            config.elevenlabs_api_key.clone(),
            config.elevenlabs_voice_id.clone(),
        )),
        transcoder: Box::new(FfmpegTranscoder),
        calendar: Box::new(HttpCalendarProvider::new(config.calendar_url.clone())),
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/voice", post(handlers::webhook::voice_webhook))
        .route("/media", get(handlers::media::media_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
