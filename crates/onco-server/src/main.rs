mod auth;
mod db;
mod dto;
mod error;
mod handlers;
mod services;
mod state;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use onco_agents::{AgentTeam, KnowledgeAgent, SearchAgent};
use onco_config::Settings;
use onco_core::TextEmbedder;
use onco_inference::{MiniLmEmbedder, Summarizer, TabularPredictor, VisionClient};
use onco_llm::ChatClient;
use onco_rag::{DiagnosticAnalyzer, KeywordClassifier, VectorStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::services::analysis;
use crate::services::supervisor::Supervisor;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .compact()
        .init();

    let settings = Settings::from_env().context("configuration")?;
    let addr = settings.server_addr.clone();

    let (analysis_tx, analysis_rx) = tokio::sync::mpsc::unbounded_channel();
    let state = Arc::new(init_app_state(settings, analysis_tx)?);
    analysis::spawn_worker(state.clone(), analysis_rx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let app = Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/predict", post(handlers::predict::predict))
        .route("/upload", post(handlers::upload::upload))
        .route("/login", post(handlers::login::login))
        .layer(DefaultBodyLimit::max(handlers::upload::MAX_FILE_SIZE + 1024 * 1024))
        .layer(trace_layer)
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_app_state(
    settings: Settings,
    analysis_tx: tokio::sync::mpsc::UnboundedSender<analysis::AnalysisJob>,
) -> Result<AppState> {
    let http = reqwest::Client::new();

    let conn = db::init_db(&settings.database_path)?;

    let supervisor = build_supervisor(&settings, &http);

    let summarizer = Summarizer::spawn();

    let vision = VisionClient::new(http.clone(), &settings.vision.base_url, &settings.vision.model);

    let predictor = settings.cancer_model_path.as_deref().and_then(|path| {
        match TabularPredictor::load(std::path::Path::new(path)) {
            Ok(predictor) => Some(predictor),
            Err(e) => {
                warn!("Tabular classifier unavailable: {}", e);
                None
            }
        }
    });

    Ok(AppState {
        settings,
        http,
        db: Mutex::new(conn),
        supervisor,
        summarizer,
        vision,
        predictor,
        analysis_tx,
    })
}

fn build_supervisor(settings: &Settings, http: &reqwest::Client) -> Supervisor {
    let llm = &settings.llm;

    let store = build_vector_store(settings);
    let analyzer = DiagnosticAnalyzer::new(
        ChatClient::new(&llm.api_key, &llm.api_base, &llm.chat_model),
        store,
    );

    let knowledge = KnowledgeAgent::new(ChatClient::new(&llm.api_key, &llm.api_base, &llm.team_model));
    let search = settings.serpapi_key.clone().and_then(|key| {
        match SearchAgent::new(
            ChatClient::new(&llm.api_key, &llm.api_base, &llm.team_model),
            http.clone(),
            key,
        ) {
            Ok(agent) => Some(Box::new(agent) as Box<dyn onco_agents::TeamMember>),
            Err(e) => {
                warn!("Search member unavailable: {}", e);
                None
            }
        }
    });
    if search.is_none() {
        info!("Agent team running without the web-search member");
    }

    let team = AgentTeam::new(
        ChatClient::new(&llm.api_key, &llm.api_base, &llm.team_model),
        Box::new(knowledge),
        search,
    );

    Supervisor::new(
        Box::new(KeywordClassifier::new()),
        Box::new(analyzer),
        Box::new(team),
    )
}

/// The vector store is a best-effort capability: missing configuration or a
/// failed embedder load leaves the diagnostic path running with empty
/// context instead of refusing to start.
fn build_vector_store(settings: &Settings) -> Option<VectorStore> {
    let qdrant = settings.qdrant.as_ref()?;

    let embed_dir = match settings.embed_model_dir.as_deref() {
        Some(dir) => dir,
        None => {
            warn!("EMBED_MODEL_DIR not set; retrieval disabled");
            return None;
        }
    };

    let embedder: Arc<dyn TextEmbedder> =
        match MiniLmEmbedder::load(std::path::Path::new(embed_dir)) {
            Ok(embedder) => Arc::new(embedder),
            Err(e) => {
                warn!("Embedder unavailable, retrieval disabled: {}", e);
                return None;
            }
        };

    match VectorStore::connect(
        &qdrant.url,
        qdrant.api_key.as_deref(),
        &qdrant.collection,
        embedder,
    ) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Qdrant connection failed, retrieval disabled: {}", e);
            None
        }
    }
}
