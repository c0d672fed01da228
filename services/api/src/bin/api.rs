//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        tts::parse_voice, AllowListValidator, JsonFileReportStore, OpenAiCompletionAdapter,
        OpenAiSstAdapter, OpenAiTtsAdapter, PgReportStore,
    },
    config::{Config, ConfigError},
    error::ApiError,
    web::{build_router, state::AppState},
};
use async_openai::{config::OpenAIConfig, types::audio::SpeechModel, Client};
use onboarding_core::{
    ai::LlmConversationService,
    ports::{CompletionService, ReportStore},
    slots::SlotSchema,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Load the Slot Schema ---
    let schema = match &config.slots_path {
        Some(path) => {
            info!("Loading slot schema from {}", path.display());
            let raw = tokio::fs::read_to_string(path).await?;
            SlotSchema::from_json(&raw)?
        }
        None => SlotSchema::default(),
    };
    info!("Slot schema ready with {} questions", schema.len());

    // --- 3. Choose the Report Store ---
    let store: Arc<dyn ReportStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let pg_store = PgReportStore::new(db_pool);
            info!("Running database migrations...");
            pg_store.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(pg_store)
        }
        None => {
            info!(
                "DATABASE_URL not set; reports will be written to {}",
                config.report_path.display()
            );
            Arc::new(JsonFileReportStore::new(config.report_path.clone()))
        }
    };

    // --- 4. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());
    let openai_client = Client::with_config(openai_config);

    let transcription = Arc::new(OpenAiSstAdapter::new(
        openai_client.clone(),
        config.sst_model.clone(),
    ));

    let tts_voice = parse_voice(&config.tts_voice).ok_or_else(|| {
        ConfigError::InvalidValue(
            "TTS_VOICE".to_string(),
            format!("'{}' is not a known voice", config.tts_voice),
        )
    })?;
    let synthesis = Arc::new(OpenAiTtsAdapter::new(
        openai_client.clone(),
        SpeechModel::Tts1Hd,
        tts_voice,
    ));

    let completion: Arc<dyn CompletionService> = Arc::new(OpenAiCompletionAdapter::new(
        openai_client,
        config.ai_model.clone(),
    ));
    let ai = Arc::new(LlmConversationService::new(
        completion.clone(),
        config.ai_temperature,
    ));
    let validator = Arc::new(AllowListValidator::new(&config.known_companies));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        schema: Arc::new(schema),
        ai,
        completion,
        validator,
        store,
        transcription,
        synthesis,
    });

    // --- 6. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
